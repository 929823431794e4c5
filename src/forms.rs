//! Request inputs and their validation.
//!
//! Forms hold what the user typed. Nothing reaches the service until
//! `to_request` accepts it.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::client::{GenerateRequest, MutateRequest};
use crate::fasta::{parse_reference, FastaError};

pub const DEFAULT_COUNT: usize = 10;
pub const MAX_COUNT: usize = 100;
pub const MIN_APTAMER_LEN: usize = 20;
pub const MAX_APTAMER_LEN: usize = 80;

/// Shown next to the mutation inputs.
pub const POINT_MUTATION_NOTE: &str = "Point mutation changes single nucleotides of the aptamer. \
Each run is random, so fewer usable mutations than requested may come back: \
try again or adjust the aptamer.";

/// Invalid user input, detected before any request is sent.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("Please provide a FASTA sequence.")]
    EmptyReference,

    #[error("Invalid FASTA input: {0}")]
    InvalidReference(String),

    #[error("Please provide an aptamer sequence.")]
    EmptyAptamer,

    #[error("Aptamer contains '{ch}' at position {position}; only A, C, G, U and T are allowed.")]
    InvalidNucleotide { ch: char, position: usize },

    #[error("Aptamer length must be between 20 and 80 (got {0}).")]
    AptamerLength(usize),

    #[error("Number of mutations must be between 1 and 100 (got {0}).")]
    MutationCount(usize),

    #[error("Number of aptamers must be between 1 and 100 (got {0}).")]
    AptamerCount(usize),

    #[error("Minimum {name} ({min}) must not exceed maximum ({max}).")]
    InvertedRange { name: &'static str, min: f64, max: f64 },

    #[error("GC content must be between 0 and 100 (got {0}).")]
    GcOutOfRange(f64),
}

impl From<FastaError> for InputError {
    fn from(e: FastaError) -> Self {
        match e {
            FastaError::EmptyFile => InputError::EmptyReference,
            other => InputError::InvalidReference(other.to_string()),
        }
    }
}

/// An optional lower and upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T: Copy + PartialOrd + Into<f64>> Bounds<T> {
    pub fn new(min: Option<T>, max: Option<T>) -> Self {
        Self { min, max }
    }

    fn check(&self, name: &'static str) -> Result<(), InputError> {
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(InputError::InvertedRange {
                    name,
                    min: min.into(),
                    max: max.into(),
                });
            }
        }
        Ok(())
    }
}

impl<T: fmt::Display> fmt::Display for Bounds<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.min, &self.max) {
            (None, None) => write!(f, "any"),
            (Some(min), None) => write!(f, ">= {}", min),
            (None, Some(max)) => write!(f, "<= {}", max),
            (Some(min), Some(max)) => write!(f, "{}-{}", min, max),
        }
    }
}

/// Inputs of a generate request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateForm {
    /// FASTA text or a bare sequence
    pub reference: String,
    pub count: usize,
    pub gc: Bounds<f64>,
    pub length: Bounds<u32>,
    pub tm: Bounds<f64>,
}

impl Default for GenerateForm {
    fn default() -> Self {
        Self {
            reference: String::new(),
            count: DEFAULT_COUNT,
            gc: Bounds::default(),
            length: Bounds::default(),
            tm: Bounds::default(),
        }
    }
}

impl GenerateForm {
    pub fn to_request(&self) -> Result<GenerateRequest, InputError> {
        let reference = self.reference.trim();
        if reference.is_empty() {
            return Err(InputError::EmptyReference);
        }
        parse_reference(reference)?;

        if self.count == 0 || self.count > MAX_COUNT {
            return Err(InputError::AptamerCount(self.count));
        }
        for gc in [self.gc.min, self.gc.max].into_iter().flatten() {
            if !(0.0..=100.0).contains(&gc) {
                return Err(InputError::GcOutOfRange(gc));
            }
        }
        self.gc.check("GC content")?;
        self.length.check("length")?;
        self.tm.check("melting temperature")?;

        Ok(GenerateRequest {
            fasta_sequence: reference.to_string(),
            num_aptamers: self.count,
            min_gc: self.gc.min,
            max_gc: self.gc.max,
            min_length: self.length.min,
            max_length: self.length.max,
            min_tm: self.tm.min,
            max_tm: self.tm.max,
        })
    }
}

/// Which mutation endpoint to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationKind {
    #[default]
    Point,
    Random,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationKind::Point => write!(f, "point"),
            MutationKind::Random => write!(f, "random"),
        }
    }
}

impl FromStr for MutationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "point" | "p" => Ok(MutationKind::Point),
            "random" | "r" => Ok(MutationKind::Random),
            other => Err(format!("unknown mutation kind '{}' (expected point or random)", other)),
        }
    }
}

/// Inputs of a mutation request.
#[derive(Debug, Clone, PartialEq)]
pub struct MutateForm {
    pub aptamer: String,
    pub count: usize,
    pub kind: MutationKind,
}

impl Default for MutateForm {
    fn default() -> Self {
        Self {
            aptamer: String::new(),
            count: DEFAULT_COUNT,
            kind: MutationKind::Point,
        }
    }
}

impl MutateForm {
    pub fn to_request(&self) -> Result<MutateRequest, InputError> {
        let aptamer = clean_aptamer(&self.aptamer)?;
        if self.count == 0 || self.count > MAX_COUNT {
            return Err(InputError::MutationCount(self.count));
        }
        Ok(MutateRequest {
            aptamer,
            count: self.count,
            kind: self.kind,
        })
    }
}

/// Uppercases an aptamer, drops whitespace and checks its alphabet and length.
pub fn clean_aptamer(input: &str) -> Result<String, InputError> {
    let aptamer: String = input
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if aptamer.is_empty() {
        return Err(InputError::EmptyAptamer);
    }
    if let Some((i, ch)) = aptamer
        .chars()
        .enumerate()
        .find(|(_, c)| !matches!(c, 'A' | 'C' | 'G' | 'U' | 'T'))
    {
        return Err(InputError::InvalidNucleotide {
            ch,
            position: i + 1,
        });
    }
    let len = aptamer.chars().count();
    if !(MIN_APTAMER_LEN..=MAX_APTAMER_LEN).contains(&len) {
        return Err(InputError::AptamerLength(len));
    }
    Ok(aptamer)
}
