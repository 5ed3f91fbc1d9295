use std::io::{self, BufRead, Lines};

use indexmap::IndexMap;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Where a new top-level record begins in a large document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Mapping keyed by numeric ID: `587:` at column zero
    Digit,
    /// Top-level sequence: `- itemID: ...` at column zero
    Dash,
}

impl Boundary {
    fn starts_record(self, line: &str) -> bool {
        match self {
            Boundary::Digit => line.starts_with(|c: char| c.is_ascii_digit()),
            Boundary::Dash => line.starts_with('-'),
        }
    }
}

/// Splits a large YAML document into one text chunk per top-level record,
/// so each record can be parsed on its own without holding the whole
/// document tree in memory.
pub struct Records<R> {
    lines: Lines<R>,
    boundary: Boundary,
    buffer: String,
    in_record: bool,
}

impl<R: BufRead> Records<R> {
    pub fn new(reader: R, boundary: Boundary) -> Self {
        Self {
            lines: reader.lines(),
            boundary,
            buffer: String::new(),
            in_record: false,
        }
    }
}

impl<R: BufRead> Iterator for Records<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(err)) => return Some(Err(err)),
                None if !self.in_record => return None,
                None => {
                    self.in_record = false;
                    return Some(Ok(std::mem::take(&mut self.buffer)));
                }
            };

            if self.boundary.starts_record(&line) {
                if self.in_record {
                    let record = std::mem::replace(&mut self.buffer, line);
                    self.buffer.push('\n');
                    return Some(Ok(record));
                }
                self.in_record = true;
            }
            // Anything before the first record is blank or a comment
            if self.in_record {
                self.buffer.push_str(&line);
                self.buffer.push('\n');
            }
        }
    }
}

/// Parse an ID-keyed document record by record, handing each entry to `f`.
///
/// Returns the number of records read.
pub fn for_each_entry<T: DeserializeOwned>(
    reader: &mut dyn BufRead,
    document: &str,
    mut f: impl FnMut(i32, T) -> Result<()>,
) -> Result<usize> {
    let mut count = 0;
    for record in Records::new(reader, Boundary::Digit) {
        let record = record?;
        let entries: IndexMap<i32, T> =
            serde_yaml::from_str(&record).map_err(|err| Error::yaml(document, err))?;
        if entries.len() != 1 {
            return Err(Error::schema(
                document,
                format!("expected one entry per record, found {}", entries.len()),
            ));
        }
        for (id, entry) in entries {
            f(id, entry)?;
        }
        count += 1;
    }
    Ok(count)
}

/// Parse a top-level sequence element by element
pub fn for_each_item<T: DeserializeOwned>(
    reader: &mut dyn BufRead,
    document: &str,
    mut f: impl FnMut(T) -> Result<()>,
) -> Result<usize> {
    let mut count = 0;
    for record in Records::new(reader, Boundary::Dash) {
        let items: Vec<T> =
            serde_yaml::from_str(&record?).map_err(|err| Error::yaml(document, err))?;
        for item in items {
            f(item)?;
            count += 1;
        }
    }
    Ok(count)
}

/// Parse a small document in one go
pub fn parse_whole<T: DeserializeOwned>(text: &str, document: &str) -> Result<T> {
    serde_yaml::from_str(text).map_err(|err| Error::yaml(document, err))
}
