//! Response parsing
//!
//! A cursor over the raw message. Every skip is derived from the lengths
//! on the wire: a name ends at its root label or at a compression pointer,
//! a question is a name plus four octets, a resource record is a name plus
//! ten octets plus RDLENGTH. Getting any of these wrong shifts the cursor
//! and corrupts everything parsed after it.

use super::name::MAX_NAME_LEN;
use super::{Header, RecordType, CLASS_IN, HEADER_SIZE};
use crate::error::{Error, Result};
use std::net::{Ipv4Addr, Ipv6Addr};
use tracing::debug;

/// Upper bound on compression pointers followed while reading one name
const MAX_POINTER_HOPS: usize = 64;

const RCODE_NOERROR: u8 = 0;
const RCODE_NXDOMAIN: u8 = 3;

/// Byte cursor over a DNS message
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current offset from the start of the message
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Consume `n` bytes
    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::malformed(format!(
                "need {n} bytes at offset {}, only {} left",
                self.pos,
                self.remaining()
            )));
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Read the header and the four section counts
    pub fn read_header(&mut self) -> Result<(Header, [u16; 4])> {
        if self.remaining() < HEADER_SIZE {
            return Err(Error::malformed(format!(
                "message is {} bytes, shorter than the {HEADER_SIZE}-byte header",
                self.remaining()
            )));
        }
        let id = self.read_u16()?;
        let flags = self.read_u16()?;
        let counts = [
            self.read_u16()?,
            self.read_u16()?,
            self.read_u16()?,
            self.read_u16()?,
        ];
        Ok((Header::from_words(id, flags), counts))
    }

    /// Advance past an encoded name without decoding it
    pub fn skip_name(&mut self) -> Result<()> {
        let start = self.pos;
        loop {
            let len = self.read_u8()?;
            match len & 0xC0 {
                0x00 if len == 0 => return Ok(()),
                0x00 => {
                    self.take(usize::from(len))?;
                    if self.pos - start > MAX_NAME_LEN {
                        return Err(Error::malformed(format!(
                            "name at offset {start} exceeds {MAX_NAME_LEN} bytes"
                        )));
                    }
                }
                // A pointer always terminates the name
                0xC0 => {
                    self.read_u8()?;
                    return Ok(());
                }
                _ => {
                    return Err(Error::malformed(format!(
                        "reserved label type {len:#04x} at offset {}",
                        self.pos - 1
                    )));
                }
            }
        }
    }

    /// Decode a possibly compressed name into absolute presentation form
    ///
    /// The cursor ends up just past the name as stored at the current
    /// position; pointer targets are read without moving it.
    pub fn read_name(&mut self) -> Result<String> {
        let start = self.pos;
        let mut text = String::new();
        let mut wire_len = 1;
        let mut cursor = self.pos;
        let mut resume_at = None;
        let mut hops = 0;

        loop {
            let len = *self.buf.get(cursor).ok_or_else(|| {
                Error::malformed(format!("name at offset {start} runs past the message"))
            })?;
            match len & 0xC0 {
                0x00 if len == 0 => {
                    cursor += 1;
                    break;
                }
                0x00 => {
                    let len = usize::from(len);
                    let label = self.buf.get(cursor + 1..cursor + 1 + len).ok_or_else(|| {
                        Error::malformed(format!("label at offset {cursor} runs past the message"))
                    })?;
                    wire_len += len + 1;
                    if wire_len > MAX_NAME_LEN {
                        return Err(Error::malformed(format!(
                            "name at offset {start} exceeds {MAX_NAME_LEN} bytes"
                        )));
                    }
                    push_label(&mut text, label);
                    cursor += 1 + len;
                }
                0xC0 => {
                    let low = *self.buf.get(cursor + 1).ok_or_else(|| {
                        Error::malformed(format!("pointer at offset {cursor} is truncated"))
                    })?;
                    hops += 1;
                    if hops > MAX_POINTER_HOPS {
                        return Err(Error::malformed(format!(
                            "compression loop in name at offset {start}"
                        )));
                    }
                    if resume_at.is_none() {
                        resume_at = Some(cursor + 2);
                    }
                    let target = usize::from(u16::from_be_bytes([len & 0x3F, low]));
                    if target >= self.buf.len() {
                        return Err(Error::malformed(format!(
                            "pointer at offset {cursor} targets {target}, past the message"
                        )));
                    }
                    cursor = target;
                }
                _ => {
                    return Err(Error::malformed(format!(
                        "reserved label type {len:#04x} at offset {cursor}"
                    )));
                }
            }
        }

        self.pos = resume_at.unwrap_or(cursor);
        if text.is_empty() {
            text.push('.');
        }
        Ok(text)
    }
}

/// Append one label in presentation form, escaping what would be ambiguous
fn push_label(text: &mut String, label: &[u8]) {
    for &b in label {
        match b {
            b'.' | b'\\' => {
                text.push('\\');
                text.push(char::from(b));
            }
            0x21..=0x7E => text.push(char::from(b)),
            _ => text.push_str(&format!("\\{b:03}")),
        }
    }
    text.push('.');
}

/// Parse `message` and return the values of all answers of `expected` type
///
/// Answers of other types (for example the CNAME chain in front of an A
/// record) or other classes are skipped by their RDLENGTH. Values come out
/// in answer-section order:
///
/// - A / AAAA: canonical address text
/// - CNAME: absolute target name
/// - TXT: the character-strings joined by a single space
///
/// # Errors
///
/// - [`Error::MalformedMessage`] if any field or length cannot be read,
///   including fewer answers on the wire than ANCOUNT announces
/// - [`Error::ServerFailure`] if the RCODE is neither NOERROR nor NXDOMAIN
/// - [`Error::NoData`] if the answer section holds no matching record
///   (an NXDOMAIN response included)
pub fn decode_answers(message: &[u8], expected: RecordType) -> Result<Vec<String>> {
    let mut reader = Reader::new(message);
    let (header, [qdcount, ancount, _, _]) = reader.read_header()?;

    match header.rcode {
        RCODE_NOERROR => {}
        RCODE_NXDOMAIN => debug!("response carries NXDOMAIN"),
        rcode => return Err(Error::server_failure(question_name(message, qdcount), rcode)),
    }

    for _ in 0..qdcount {
        reader.skip_name()?;
        reader.take(4)?;
    }

    let mut values = Vec::new();
    for index in 0..ancount {
        reader.skip_name()?;
        let rtype = reader.read_u16()?;
        let class = reader.read_u16()?;
        let _ttl = reader.read_u32()?;
        let rdlength = usize::from(reader.read_u16()?);
        if rdlength > reader.remaining() {
            return Err(Error::malformed(format!(
                "answer {index} declares {rdlength} bytes of RDATA, only {} left",
                reader.remaining()
            )));
        }

        if rtype != expected.code() || class != CLASS_IN {
            debug!(
                "skipping answer {} (type {}, class {}, {} bytes)",
                index, rtype, class, rdlength
            );
            reader.take(rdlength)?;
            continue;
        }

        values.push(read_value(&mut reader, expected, rdlength)?);
    }

    if values.is_empty() {
        return Err(Error::no_data(question_name(message, qdcount), expected));
    }
    Ok(values)
}

fn read_value(reader: &mut Reader<'_>, rtype: RecordType, rdlength: usize) -> Result<String> {
    let start = reader.position();
    let value = match rtype {
        RecordType::A => {
            let octets: [u8; 4] = reader.take(rdlength)?.try_into().map_err(|_| {
                Error::malformed(format!("A record RDATA is {rdlength} bytes, expected 4"))
            })?;
            Ipv4Addr::from(octets).to_string()
        }
        RecordType::Aaaa => {
            let octets: [u8; 16] = reader.take(rdlength)?.try_into().map_err(|_| {
                Error::malformed(format!("AAAA record RDATA is {rdlength} bytes, expected 16"))
            })?;
            Ipv6Addr::from(octets).to_string()
        }
        RecordType::Cname => reader.read_name()?,
        RecordType::Txt => {
            let mut rdata = Reader::new(reader.take(rdlength)?);
            let mut strings = Vec::new();
            while rdata.remaining() > 0 {
                let len = usize::from(rdata.read_u8()?);
                strings.push(String::from_utf8_lossy(rdata.take(len)?).into_owned());
            }
            strings.join(" ")
        }
    };

    if reader.position() - start != rdlength {
        return Err(Error::malformed(format!(
            "{rtype} RDATA at offset {start} is {rdlength} bytes, consumed {}",
            reader.position() - start
        )));
    }
    Ok(value)
}

/// Name of the first question, for diagnostics only
fn question_name(message: &[u8], qdcount: u16) -> String {
    if qdcount == 0 {
        return ".".to_string();
    }
    let mut reader = Reader::new(message);
    reader.pos = HEADER_SIZE;
    reader.read_name().unwrap_or_else(|_| "?".to_string())
}
