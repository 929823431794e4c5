//! FASTA input reader.
//!
//! The design service takes the reference as raw FASTA text. This module
//! reads that text from a file or from what the user pasted, and checks it
//! holds at least one non-empty sequence before anything is sent.
//!
//! ## FASTA Format
//!
//! ```text
//! >sequence_identifier optional description
//! ACGUACGUACGU...
//! >another_sequence
//! UGCAUGCAUGCA...
//! ```
//!
//! A bare sequence without any header line is accepted as a single record.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use thiserror::Error;

/// Errors that can occur during FASTA parsing.
#[derive(Error, Debug)]
pub enum FastaError {
    #[error("Failed to open file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Empty FASTA input")]
    EmptyFile,

    #[error("Invalid FASTA format: {0}")]
    InvalidFormat(String),

    #[error("Sequence without header at line {0}")]
    SequenceWithoutHeader(usize),
}

/// Result type for FASTA operations.
pub type FastaResult<T> = Result<T, FastaError>;

/// One FASTA entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    /// Identifier (first word of the header, without '>')
    pub id: String,
    /// Residues with whitespace removed
    pub sequence: String,
}

impl FastaRecord {
    pub fn new(id: impl Into<String>, sequence: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sequence: sequence.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

/// Parses FASTA content from a reader.
///
/// This function handles both single-line and multi-line sequences.
pub fn parse_fasta<R: BufRead>(reader: R) -> FastaResult<Vec<FastaRecord>> {
    let mut records = Vec::new();
    let mut current_id: Option<String> = None;
    let mut current_seq = String::new();
    let mut line_number = 0;

    for line_result in reader.lines() {
        line_number += 1;
        let line = line_result?;
        let line = line.trim();

        if line.is_empty() || line.starts_with(';') {
            continue;
        }

        if let Some(header) = line.strip_prefix('>') {
            if let Some(id) = current_id.take() {
                if !current_seq.is_empty() {
                    records.push(FastaRecord::new(id, std::mem::take(&mut current_seq)));
                }
            }

            let id = header.split_whitespace().next().unwrap_or("").to_string();
            if id.is_empty() {
                return Err(FastaError::InvalidFormat(format!(
                    "Empty sequence identifier at line {}",
                    line_number
                )));
            }

            current_id = Some(id);
            current_seq.clear();
        } else {
            if current_id.is_none() {
                return Err(FastaError::SequenceWithoutHeader(line_number));
            }
            current_seq.extend(line.chars().filter(|c| !c.is_whitespace()));
        }
    }

    if let Some(id) = current_id {
        if !current_seq.is_empty() {
            records.push(FastaRecord::new(id, current_seq));
        }
    }

    if records.is_empty() {
        return Err(FastaError::EmptyFile);
    }

    Ok(records)
}

/// Parses FASTA content from a string.
pub fn parse_fasta_str(content: &str) -> FastaResult<Vec<FastaRecord>> {
    parse_fasta(content.as_bytes())
}

/// Parses pasted reference input: FASTA, or a bare sequence.
pub fn parse_reference(content: &str) -> FastaResult<Vec<FastaRecord>> {
    let first = content.lines().map(str::trim).find(|l| !l.is_empty());
    match first {
        None => Err(FastaError::EmptyFile),
        Some(line) if line.starts_with('>') || line.starts_with(';') => parse_fasta_str(content),
        Some(_) => {
            let sequence: String = content.chars().filter(|c| !c.is_whitespace()).collect();
            Ok(vec![FastaRecord::new("input", sequence)])
        }
    }
}

/// Reads a reference file, returning its text once it parses.
pub fn read_reference_file<P: AsRef<Path>>(path: P) -> FastaResult<String> {
    let file = File::open(path)?;
    let mut content = String::new();
    BufReader::new(file).read_to_string(&mut content)?;
    parse_reference(&content)?;
    Ok(content)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_parse_simple_fasta() {
        let content = ">seq1\nACGU\n>seq2\nUGCA\n";
        let records = parse_fasta_str(content).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0], FastaRecord::new("seq1", "ACGU"));
        assert_eq!(records[1], FastaRecord::new("seq2", "UGCA"));
    }

    #[test]
    fn test_parse_multiline_sequence() {
        let content = ">seq1 target protein\nACGU\nUGCA\nAAAA\n";
        let records = parse_fasta_str(content).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "seq1");
        assert_eq!(records[0].sequence, "ACGUUGCAAAAA");
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(parse_fasta_str(""), Err(FastaError::EmptyFile)));
        assert!(matches!(parse_reference("  \n\n"), Err(FastaError::EmptyFile)));
        assert!(matches!(parse_fasta_str(">only_header\n"), Err(FastaError::EmptyFile)));
    }

    #[test]
    fn test_sequence_without_header() {
        let result = parse_fasta_str("ACGT\n>seq1\nTGCA\n");
        assert!(matches!(result, Err(FastaError::SequenceWithoutHeader(1))));
    }

    #[test]
    fn test_empty_identifier() {
        let result = parse_fasta_str(">\nACGU\n");
        assert!(matches!(result, Err(FastaError::InvalidFormat(_))));
    }

    #[test]
    fn test_bare_reference() {
        let records = parse_reference("MKT LLV\nAAG\n").unwrap();
        assert_eq!(records, vec![FastaRecord::new("input", "MKTLLVAAG")]);
    }

    #[test]
    fn test_read_reference_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, ">target\nMKTAYIAKQR").unwrap();
        let content = read_reference_file(file.path()).unwrap();
        assert!(content.starts_with(">target"));

        let empty = tempfile::NamedTempFile::new().unwrap();
        assert!(read_reference_file(empty.path()).is_err());
    }
}
