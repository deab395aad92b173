//! Validated absolute domain names

use crate::error::{Error, Result};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Maximum length of a single label in octets
pub const MAX_LABEL_LEN: usize = 63;

/// Maximum length of an encoded name in octets, root label included
pub const MAX_NAME_LEN: usize = 255;

/// Append the root label separator unless `name` already ends with it
pub fn absolute(name: &str) -> Cow<'_, str> {
    if name.ends_with('.') {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("{name}."))
    }
}

/// An absolute domain name that can be written to the wire
///
/// Labels are restricted to letters, digits, `-`, `_` (service labels such
/// as `_acme-challenge`) and `*` (wildcards).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name {
    labels: Vec<String>,
}

impl Name {
    /// The root name `.`
    pub fn root() -> Self {
        Self { labels: Vec::new() }
    }

    /// Parse a presentation-format name, relative or absolute
    pub fn parse(input: &str) -> Result<Self> {
        if input.is_empty() {
            return Err(Error::invalid_name(input, "name is empty"));
        }
        if input == "." {
            return Ok(Self::root());
        }

        let trimmed = input.strip_suffix('.').unwrap_or(input);
        let mut labels = Vec::new();
        for label in trimmed.split('.') {
            if label.is_empty() {
                return Err(Error::invalid_name(input, "empty label"));
            }
            if label.len() > MAX_LABEL_LEN {
                return Err(Error::invalid_name(
                    input,
                    format!("label {label:?} is {} octets (max {MAX_LABEL_LEN})", label.len()),
                ));
            }
            if let Some(c) = label
                .chars()
                .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '*')))
            {
                return Err(Error::invalid_name(
                    input,
                    format!("label {label:?} contains {c:?}"),
                ));
            }
            labels.push(label.to_string());
        }

        let name = Self { labels };
        if name.wire_len() > MAX_NAME_LEN {
            return Err(Error::invalid_name(
                input,
                format!("name is {} octets on the wire (max {MAX_NAME_LEN})", name.wire_len()),
            ));
        }
        Ok(name)
    }

    /// Labels from the leftmost to the one below the root
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn is_root(&self) -> bool {
        self.labels.is_empty()
    }

    /// Uncompressed encoded length, including the root label
    pub fn wire_len(&self) -> usize {
        self.labels.iter().map(|l| l.len() + 1).sum::<usize>() + 1
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.labels.is_empty() {
            return f.write_str(".");
        }
        for label in &self.labels {
            write!(f, "{label}.")?;
        }
        Ok(())
    }
}

impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
