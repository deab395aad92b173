//! Message serialization with name compression

use super::{Header, Name, Question, RecordData, ResourceRecord, HEADER_SIZE};
use crate::error::{Error, Result};
use std::collections::HashMap;

/// Compression pointers can only address the first 16 KiB of a message
const MAX_POINTER_OFFSET: usize = 0x3FFF;

/// Incremental message writer
///
/// Sections must be written in order: all questions, then all answers.
/// Every name written is remembered by suffix so later occurrences of the
/// same suffix become a two-byte pointer (RFC 1035 §4.1.4).
#[derive(Debug)]
pub struct MessageBuilder {
    buf: Vec<u8>,
    suffixes: HashMap<String, u16>,
    qdcount: u16,
    ancount: u16,
}

impl MessageBuilder {
    pub fn new(header: Header) -> Self {
        let mut buf = Vec::with_capacity(512);
        buf.extend_from_slice(&header.id.to_be_bytes());
        buf.extend_from_slice(&header.flags().to_be_bytes());
        // QDCOUNT/ANCOUNT are patched in finish(); NSCOUNT/ARCOUNT stay 0
        buf.extend_from_slice(&[0u8; HEADER_SIZE - 4]);

        Self {
            buf,
            suffixes: HashMap::new(),
            qdcount: 0,
            ancount: 0,
        }
    }

    /// Append a question
    pub fn question(&mut self, question: &Question) -> Result<()> {
        if self.ancount > 0 {
            return Err(Error::invalid_input("questions must precede answers"));
        }
        self.qdcount = self
            .qdcount
            .checked_add(1)
            .ok_or_else(|| Error::invalid_input("too many questions"))?;

        self.name(&question.name);
        self.u16(question.record_type.code());
        self.u16(question.class);
        Ok(())
    }

    /// Append an answer resource record
    pub fn answer(&mut self, record: &ResourceRecord) -> Result<()> {
        self.ancount = self
            .ancount
            .checked_add(1)
            .ok_or_else(|| Error::invalid_input("too many answers"))?;

        self.name(&record.name);
        self.u16(record.data.rtype());
        self.u16(record.class);
        self.buf.extend_from_slice(&record.ttl.to_be_bytes());

        let length_at = self.buf.len();
        self.u16(0);
        match &record.data {
            RecordData::A(addr) => self.buf.extend_from_slice(&addr.octets()),
            RecordData::Aaaa(addr) => self.buf.extend_from_slice(&addr.octets()),
            RecordData::Cname(target) => self.name(target),
            RecordData::Txt(strings) => {
                for s in strings {
                    let len = u8::try_from(s.len()).map_err(|_| {
                        Error::invalid_input(format!(
                            "TXT character-string is {} bytes (max 255)",
                            s.len()
                        ))
                    })?;
                    self.buf.push(len);
                    self.buf.extend_from_slice(s.as_bytes());
                }
            }
            RecordData::Unknown { rdata, .. } => self.buf.extend_from_slice(rdata),
        }

        let rdlength = u16::try_from(self.buf.len() - length_at - 2)
            .map_err(|_| Error::invalid_input("RDATA exceeds 65535 bytes"))?;
        self.buf[length_at..length_at + 2].copy_from_slice(&rdlength.to_be_bytes());
        Ok(())
    }

    /// Patch the section counts and return the encoded message
    pub fn finish(mut self) -> Result<Vec<u8>> {
        if self.buf.len() > usize::from(u16::MAX) {
            return Err(Error::invalid_input(format!(
                "message is {} bytes (max 65535)",
                self.buf.len()
            )));
        }
        self.buf[4..6].copy_from_slice(&self.qdcount.to_be_bytes());
        self.buf[6..8].copy_from_slice(&self.ancount.to_be_bytes());
        Ok(self.buf)
    }

    fn u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    fn name(&mut self, name: &Name) {
        let labels = name.labels();
        for i in 0..labels.len() {
            let suffix = labels[i..].join(".").to_ascii_lowercase();
            if let Some(&offset) = self.suffixes.get(&suffix) {
                self.u16(0xC000 | offset);
                return;
            }
            if self.buf.len() <= MAX_POINTER_OFFSET {
                self.suffixes.insert(suffix, self.buf.len() as u16);
            }
            // Name::parse caps labels at 63 octets
            self.buf.push(labels[i].len() as u8);
            self.buf.extend_from_slice(labels[i].as_bytes());
        }
        self.buf.push(0);
    }
}
