//! DNS wire format (RFC 1035)
//!
//! Just enough of the DNS message format to ask a DoH resolver one
//! question and read the answers back, without a resolver library:
//!
//! - [`encode_query`]: build the binary query for a `(name, type)` pair
//! - [`decode_answers`]: walk a binary response and return the values of
//!   the answers that match the requested type
//!
//! ```text
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! |                      ID                         |  2 bytes
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! |QR|   Opcode  |AA|TC|RD|RA|   Z    |   RCODE    |  2 bytes (flags)
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! |                    QDCOUNT                       |  2 bytes
//! |                    ANCOUNT                       |  2 bytes
//! |                    NSCOUNT                       |  2 bytes
//! |                    ARCOUNT                       |  2 bytes
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! |                   Questions ...                  |
//! |                   Answers ...                    |
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! ```

mod decode;
mod encode;
mod name;

pub use decode::{decode_answers, Reader};
pub use encode::MessageBuilder;
pub use name::{absolute, Name};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// DNS header size in bytes
pub const HEADER_SIZE: usize = 12;

/// Class IN (Internet)
pub const CLASS_IN: u16 = 1;

/// Media type of RFC 8484 request and response bodies
pub const DNS_MESSAGE_MEDIA_TYPE: &str = "application/dns-message";

/// Record types the query engine understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    /// IPv4 address
    A,
    /// IPv6 address
    Aaaa,
    /// Canonical name
    Cname,
    /// Text strings
    Txt,
}

impl RecordType {
    /// All supported record types
    pub const ALL: [RecordType; 4] = [
        RecordType::A,
        RecordType::Aaaa,
        RecordType::Cname,
        RecordType::Txt,
    ];

    /// Numeric TYPE code
    pub fn code(self) -> u16 {
        match self {
            RecordType::A => 1,
            RecordType::Cname => 5,
            RecordType::Txt => 16,
            RecordType::Aaaa => 28,
        }
    }

    /// Look up a supported type by its TYPE code
    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    /// Presentation mnemonic ("A", "AAAA", ...)
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Txt => "TXT",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                Error::invalid_input(format!(
                    "unsupported record type {s:?} (supported: A, AAAA, CNAME, TXT)"
                ))
            })
    }
}

/// Message header without the section counts
///
/// The counts are derived from the section contents when encoding and
/// reported separately by the decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Header {
    pub id: u16,
    pub response: bool,
    pub opcode: u8,
    pub authoritative: bool,
    pub truncated: bool,
    pub recursion_desired: bool,
    pub recursion_available: bool,
    pub rcode: u8,
}

impl Header {
    /// Header of a standard recursive query
    ///
    /// The ID is 0 as recommended by RFC 8484 §4.1 so identical queries
    /// produce identical, cacheable requests.
    pub fn query() -> Self {
        Self {
            recursion_desired: true,
            ..Self::default()
        }
    }

    /// Pack the second header word
    pub fn flags(&self) -> u16 {
        let mut flags = (u16::from(self.opcode & 0x0F) << 11) | u16::from(self.rcode & 0x0F);
        if self.response {
            flags |= 0x8000;
        }
        if self.authoritative {
            flags |= 0x0400;
        }
        if self.truncated {
            flags |= 0x0200;
        }
        if self.recursion_desired {
            flags |= 0x0100;
        }
        if self.recursion_available {
            flags |= 0x0080;
        }
        flags
    }

    /// Unpack the ID and flags words
    pub fn from_words(id: u16, flags: u16) -> Self {
        Self {
            id,
            response: flags & 0x8000 != 0,
            opcode: ((flags >> 11) & 0x0F) as u8,
            authoritative: flags & 0x0400 != 0,
            truncated: flags & 0x0200 != 0,
            recursion_desired: flags & 0x0100 != 0,
            recursion_available: flags & 0x0080 != 0,
            rcode: (flags & 0x000F) as u8,
        }
    }
}

/// A question section entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub name: Name,
    pub record_type: RecordType,
    pub class: u16,
}

/// Type-specific payload of a resource record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Cname(Name),
    Txt(Vec<String>),
    /// Any other type, carried as raw RDATA
    Unknown { rtype: u16, rdata: Vec<u8> },
}

impl RecordData {
    /// TYPE code of this payload
    pub fn rtype(&self) -> u16 {
        match self {
            RecordData::A(_) => RecordType::A.code(),
            RecordData::Aaaa(_) => RecordType::Aaaa.code(),
            RecordData::Cname(_) => RecordType::Cname.code(),
            RecordData::Txt(_) => RecordType::Txt.code(),
            RecordData::Unknown { rtype, .. } => *rtype,
        }
    }
}

/// A resource record as it appears in the answer section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub name: Name,
    pub class: u16,
    pub ttl: u32,
    pub data: RecordData,
}

impl ResourceRecord {
    /// An IN-class record
    pub fn new(name: Name, ttl: u32, data: RecordData) -> Self {
        Self {
            name,
            class: CLASS_IN,
            ttl,
            data,
        }
    }
}

/// A DNS message restricted to the question and answer sections
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: Header,
    pub questions: Vec<Question>,
    pub answers: Vec<ResourceRecord>,
}

impl Message {
    /// A recursive query with exactly one IN-class question
    pub fn query(name: Name, record_type: RecordType) -> Self {
        Self {
            header: Header::query(),
            questions: vec![Question {
                name,
                record_type,
                class: CLASS_IN,
            }],
            answers: Vec::new(),
        }
    }

    /// Serialize to wire format, compressing repeated names
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut builder = MessageBuilder::new(self.header);
        for question in &self.questions {
            builder.question(question)?;
        }
        for answer in &self.answers {
            builder.answer(answer)?;
        }
        builder.finish()
    }
}

/// Build the binary query for `name` / `record_type`
///
/// `name` may be given with or without the trailing dot; it is made
/// absolute before encoding. The output is deterministic for a given pair.
pub fn encode_query(name: &str, record_type: RecordType) -> Result<Vec<u8>> {
    let name = Name::parse(name)?;
    Message::query(name, record_type).encode()
}
