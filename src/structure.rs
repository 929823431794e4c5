//! Secondary structure validation and drawing.
//!
//! A sequence/structure pair coming from the service (or typed by a user)
//! is cleaned and checked before any renderer sees it:
//!
//! 1. the sequence is upper-cased, `T` becomes `U`, anything outside
//!    `AUGC` is dropped; the structure keeps only `(`, `)` and `.`
//! 2. brackets must be balanced and properly nested
//! 3. both strings must have the same length
//! 4. every bracket pair must join a Watson-Crick pair (AU, GC), a G-U
//!    wobble, or an A-C wobble, in either orientation
//!
//! The [`StructureSurface`] holds whatever the user currently sees for the
//! selected record: nothing, a diagram, or an alert explaining why there is
//! no diagram.

use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;

/// Base pairs accepted in a structure: Watson-Crick, G-U wobble and the
/// (protonated) A-C wobble.
const ALLOWED_PAIRS: [(u8, u8); 8] = [
    (b'A', b'U'),
    (b'U', b'A'),
    (b'G', b'C'),
    (b'C', b'G'),
    (b'G', b'U'),
    (b'U', b'G'),
    (b'A', b'C'),
    (b'C', b'A'),
];

/// Why a structure could not be drawn.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructureError {
    #[error("Missing sequence or structure input.")]
    MissingInput,

    #[error("Sequence length ({sequence}) and structure length ({structure}) do not match.")]
    LengthMismatch { sequence: usize, structure: usize },

    #[error("Invalid structure: unbalanced parentheses.")]
    UnbalancedBrackets,

    #[error("Incompatible base pair at position {position}: {five_prime}-{three_prime}")]
    IncompatibleBasePair {
        /// 1-based index of the opening bracket
        position: usize,
        five_prime: char,
        three_prime: char,
    },

    #[error("Initialization failed: {0}")]
    InitializationFailed(String),
}

/// A validated, cleaned sequence/structure pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanStructure {
    pub sequence: String,
    pub structure: String,
    /// 0-based (open, close) index pairs, ordered by closing position
    pub pairs: Vec<(usize, usize)>,
}

/// Normalizes a sequence to the RNA alphabet.
pub fn clean_sequence(sequence: &str) -> String {
    sequence
        .chars()
        .map(|c| match c.to_ascii_uppercase() {
            'T' => 'U',
            other => other,
        })
        .filter(|c| matches!(c, 'A' | 'U' | 'G' | 'C'))
        .collect()
}

/// Keeps only dot-bracket characters.
pub fn clean_structure(structure: &str) -> String {
    structure
        .chars()
        .filter(|c| matches!(c, '(' | ')' | '.'))
        .collect()
}

/// Matches brackets with a stack of opening positions.
///
/// Returns `None` when a `)` has no opening partner or a `(` is left open.
pub fn bracket_pairs(structure: &str) -> Option<Vec<(usize, usize)>> {
    let mut stack = Vec::new();
    let mut pairs = Vec::new();
    for (i, c) in structure.bytes().enumerate() {
        match c {
            b'(' => stack.push(i),
            b')' => pairs.push((stack.pop()?, i)),
            _ => {}
        }
    }
    stack.is_empty().then_some(pairs)
}

fn is_allowed_pair(a: u8, b: u8) -> bool {
    ALLOWED_PAIRS.contains(&(a, b))
}

/// Cleans and checks a sequence/structure pair.
pub fn validate(sequence: &str, structure: &str) -> Result<CleanStructure, StructureError> {
    if sequence.trim().is_empty() || structure.trim().is_empty() {
        return Err(StructureError::MissingInput);
    }
    let sequence = clean_sequence(sequence);
    let structure = clean_structure(structure);

    let pairs = bracket_pairs(&structure).ok_or(StructureError::UnbalancedBrackets)?;

    if sequence.len() != structure.len() {
        return Err(StructureError::LengthMismatch {
            sequence: sequence.len(),
            structure: structure.len(),
        });
    }

    let bases = sequence.as_bytes();
    // Report the pair that closes first, as a left-to-right scan meets it.
    for &(open, close) in &pairs {
        if !is_allowed_pair(bases[open], bases[close]) {
            return Err(StructureError::IncompatibleBasePair {
                position: open + 1,
                five_prime: bases[open] as char,
                three_prime: bases[close] as char,
            });
        }
    }

    Ok(CleanStructure {
        sequence,
        structure,
        pairs,
    })
}

/// Something that can draw a validated structure.
pub trait StructureRenderer {
    /// Returns the drawing as text lines, or a message if drawing failed.
    fn render(&mut self, structure: &CleanStructure) -> Result<Vec<String>, String>;
}

/// What the structure surface currently shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SurfaceContent {
    #[default]
    Empty,
    Diagram {
        title: String,
        lines: Vec<String>,
    },
    Alert(String),
}

/// The area where structure diagrams are drawn.
#[derive(Debug, Clone, Default)]
pub struct StructureSurface {
    content: SurfaceContent,
}

impl StructureSurface {
    pub fn content(&self) -> &SurfaceContent {
        &self.content
    }

    pub fn clear(&mut self) {
        self.content = SurfaceContent::Empty;
    }

    pub fn is_empty(&self) -> bool {
        self.content == SurfaceContent::Empty
    }

    /// The alert text, if the last attempt failed.
    pub fn alert(&self) -> Option<&str> {
        match &self.content {
            SurfaceContent::Alert(text) => Some(text),
            _ => None,
        }
    }

    /// Validates the pair and draws it with `renderer`.
    ///
    /// The surface is wiped before drawing, so nothing from an earlier
    /// record survives. Validation errors and renderer failures (including
    /// panics) leave an alert on the surface and are returned.
    pub fn show<R: StructureRenderer>(
        &mut self,
        renderer: &mut R,
        sequence: &str,
        structure: &str,
    ) -> Result<(), StructureError> {
        let clean = match validate(sequence, structure) {
            Ok(clean) => clean,
            Err(e) => return Err(self.fail(e)),
        };

        self.clear();
        let drawn = panic::catch_unwind(AssertUnwindSafe(|| renderer.render(&clean)));
        let lines = match drawn {
            Ok(Ok(lines)) => lines,
            Ok(Err(message)) => return Err(self.fail(StructureError::InitializationFailed(message))),
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "Unknown error".to_string());
                return Err(self.fail(StructureError::InitializationFailed(message)));
            }
        };

        log::debug!("rendered structure of {} nt", clean.sequence.len());
        self.content = SurfaceContent::Diagram {
            title: format!("Aptamer ({} nt, {} pairs)", clean.sequence.len(), clean.pairs.len()),
            lines,
        };
        Ok(())
    }

    fn fail(&mut self, error: StructureError) -> StructureError {
        log::warn!("structure not rendered: {}", error);
        self.content = SurfaceContent::Alert(error.to_string());
        error
    }
}

/// Text diagram: sequence, dot-bracket, a mountain profile of nesting depth,
/// and the list of pairs.
#[derive(Debug, Clone)]
pub struct ArcDiagram {
    /// Maximum number of mountain rows drawn
    pub max_height: usize,
    /// Maximum number of pairs listed
    pub max_pairs: usize,
}

impl Default for ArcDiagram {
    fn default() -> Self {
        Self {
            max_height: 8,
            max_pairs: 12,
        }
    }
}

impl ArcDiagram {
    fn depths(structure: &str) -> Vec<usize> {
        let mut depth = 0usize;
        structure
            .bytes()
            .map(|c| match c {
                b'(' => {
                    depth += 1;
                    depth
                }
                b')' => {
                    let d = depth;
                    depth = depth.saturating_sub(1);
                    d
                }
                _ => depth,
            })
            .collect()
    }
}

impl StructureRenderer for ArcDiagram {
    fn render(&mut self, structure: &CleanStructure) -> Result<Vec<String>, String> {
        if self.max_height == 0 {
            return Err("diagram height must be positive".to_string());
        }
        let depths = Self::depths(&structure.structure);
        let peak = depths.iter().copied().max().unwrap_or(0);
        let height = peak.min(self.max_height);

        let mut lines = Vec::new();
        for level in (1..=height).rev() {
            // Scale deep structures down to the available rows.
            let threshold = if peak > height {
                (level * peak).div_ceil(height)
            } else {
                level
            };
            let row: String = depths
                .iter()
                .map(|&d| if d >= threshold { '|' } else { ' ' })
                .collect();
            lines.push(row.trim_end().to_string());
        }
        lines.push(structure.structure.clone());
        lines.push(structure.sequence.clone());

        let ruler: String = (1..=structure.sequence.len())
            .map(|i| if i % 10 == 0 { '+' } else if i % 5 == 0 { ':' } else { '.' })
            .collect();
        lines.push(ruler);

        if !structure.pairs.is_empty() {
            lines.push(String::new());
            let bases = structure.sequence.as_bytes();
            let mut pairs: Vec<&(usize, usize)> = structure.pairs.iter().collect();
            pairs.sort();
            for &&(open, close) in pairs.iter().take(self.max_pairs) {
                lines.push(format!(
                    "{:>4}-{:<4} {}-{}",
                    open + 1,
                    close + 1,
                    bases[open] as char,
                    bases[close] as char
                ));
            }
            if pairs.len() > self.max_pairs {
                lines.push(format!("... {} more pairs", pairs.len() - self.max_pairs));
            }
        }
        Ok(lines)
    }
}
