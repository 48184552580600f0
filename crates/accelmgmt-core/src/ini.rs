//! INI serialization for config records
//!
//! Only the subset the dump needs: `[section]` headers, `key = value`
//! lines, blank lines and `;`/`#` comments.

use std::io::{self, Write};

use thiserror::Error;

use crate::attribute::{parse_number, AttributeValue};
use crate::config::ConfigRecord;

/// INI parse failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IniError {
    /// A `[` line without a closing `]` or with an empty name
    #[error("line {line}: malformed section header")]
    BadSection { line: usize },

    /// A non-blank line that is neither a header nor `key = value`
    #[error("line {line}: expected 'key = value'")]
    BadEntry { line: usize },

    /// A `key = value` line before the first section header
    #[error("line {line}: entry outside of any section")]
    EntryOutsideSection { line: usize },

    /// A value that is not a number
    #[error("{key}: '{value}' is not a number")]
    BadValue { key: String, value: String },

    /// The input has no sections at all
    #[error("no section found")]
    Empty,
}

/// One parsed `[section]` and its raw entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IniSection {
    pub name: String,
    pub entries: Vec<(String, String)>,
}

/// Write `record` as a single INI section
pub fn write_ini<W: Write + ?Sized>(record: &ConfigRecord, writer: &mut W) -> io::Result<()> {
    writeln!(writer, "[{}]", record.group())?;
    for (key, value) in record.entries() {
        writeln!(writer, "{} = {}", key, value)?;
    }
    Ok(())
}

/// Render `record` to a string
pub fn to_ini_string(record: &ConfigRecord) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail
    let _ = write_ini(record, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Parse INI text into sections
pub fn parse_ini(text: &str) -> Result<Vec<IniSection>, IniError> {
    let mut sections: Vec<IniSection> = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();

        if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('#') {
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix('[') {
            let name = rest
                .strip_suffix(']')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .ok_or(IniError::BadSection { line })?;
            sections.push(IniSection {
                name: name.to_string(),
                entries: Vec::new(),
            });
            continue;
        }

        let (key, value) = trimmed
            .split_once('=')
            .ok_or(IniError::BadEntry { line })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(IniError::BadEntry { line });
        }

        let section = sections
            .last_mut()
            .ok_or(IniError::EntryOutsideSection { line })?;
        section
            .entries
            .push((key.to_string(), value.trim().to_string()));
    }

    Ok(sections)
}

impl ConfigRecord {
    /// Rebuild a record from INI text
    ///
    /// Uses the first section. Values are read back as integers since
    /// flags and numbers share the same rendering.
    pub fn from_ini(text: &str) -> Result<Self, IniError> {
        let sections = parse_ini(text)?;
        let section = sections.into_iter().next().ok_or(IniError::Empty)?;

        let mut record = ConfigRecord::new(section.name);
        for (key, value) in section.entries {
            match parse_number(&value) {
                Some(n) => record.push(key, AttributeValue::Int(n)),
                None => return Err(IniError::BadValue { key, value }),
            }
        }
        Ok(record)
    }
}
