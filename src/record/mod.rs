//! Typed record model for insertion and match tables.
//!
//! Input files are whitespace-delimited text with two header lines: field
//! names first, then type tags (`bool`, `int`, `float`, `str`) aligned
//! positionally. The headers are interpreted once into a fixed decode plan
//! per file kind, and every subsequent row decodes into a strongly-typed
//! record. A malformed header or row aborts the whole read.

mod parser;

pub use parser::{read_insertions, read_matches, Decode, RecordReader, Row};

use std::fmt;

use thiserror::Error;

/// Declared type of a column in the two-line header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Case-insensitive `true`/`false`.
    Bool,
    /// Decimal integer.
    Int,
    /// Decimal floating point.
    Float,
    /// Bare token (no quoting; tokens are whitespace-delimited).
    Str,
}

impl FieldKind {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "bool" => Some(Self::Bool),
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            "str" => Some(Self::Str),
            _ => None,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
        };
        f.write_str(tag)
    }
}

/// Errors raised while interpreting headers or decoding rows.
///
/// Every variant is fatal for the file being read; there is no
/// partial-record recovery.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Underlying reader failure.
    #[error("i/o error reading records: {0}")]
    Io(#[from] std::io::Error),
    /// The file ended before both header lines were seen.
    #[error("missing {0} header line")]
    MissingHeader(&'static str),
    /// The two header lines declare different numbers of columns.
    #[error("header declares {names} field names but {kinds} type tags")]
    HeaderArity { names: usize, kinds: usize },
    /// A type tag was not one of `bool`, `int`, `float`, `str`.
    #[error("unknown type tag '{tag}' for field '{field}'")]
    UnknownKind { field: String, tag: String },
    /// A column the decode plan requires is absent.
    #[error("required column '{0}' not present in header")]
    MissingColumn(&'static str),
    /// A required column is declared with the wrong type tag.
    #[error("column '{column}' is declared {found}, expected {expected}")]
    ColumnKind {
        column: &'static str,
        expected: FieldKind,
        found: FieldKind,
    },
    /// A data row has fewer tokens than the header declares.
    #[error("line {line}: expected {expected} fields, found {found}")]
    ShortRow {
        line: usize,
        expected: usize,
        found: usize,
    },
    /// A token failed to coerce to its declared type.
    #[error("line {line}: invalid {kind} value '{value}' for '{column}'")]
    BadField {
        line: usize,
        column: &'static str,
        kind: FieldKind,
        value: String,
    },
}

/// Ordered list of `(name, kind)` columns parsed from the two header lines.
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<(String, FieldKind)>,
}

impl Schema {
    /// Interpret the two header lines into an ordered column list.
    pub fn from_headers(names: &str, kinds: &str) -> Result<Self, ParseError> {
        let names: Vec<&str> = names.split_whitespace().collect();
        let tags: Vec<&str> = kinds.split_whitespace().collect();
        if names.len() != tags.len() {
            return Err(ParseError::HeaderArity {
                names: names.len(),
                kinds: tags.len(),
            });
        }

        let mut fields = Vec::with_capacity(names.len());
        for (name, tag) in names.iter().zip(&tags) {
            let kind = FieldKind::from_tag(tag).ok_or_else(|| ParseError::UnknownKind {
                field: (*name).to_string(),
                tag: (*tag).to_string(),
            })?;
            fields.push(((*name).to_string(), kind));
        }
        Ok(Self { fields })
    }

    /// Number of declared columns.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the header declared no columns at all.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Locate a required column by name, checking its declared kind.
    pub fn column(&self, name: &'static str, expected: FieldKind) -> Result<usize, ParseError> {
        let (idx, (_, found)) = self
            .fields
            .iter()
            .enumerate()
            .find(|(_, (n, _))| n == name)
            .ok_or(ParseError::MissingColumn(name))?;
        if *found != expected {
            return Err(ParseError::ColumnKind {
                column: name,
                expected,
                found: *found,
            });
        }
        Ok(idx)
    }
}

/// Field access shared by the filter chain across record kinds.
///
/// Kind-specific fields surface as `Option` so that match-only filters
/// treat their absence on an insertion record as a pass rather than an
/// error.
pub trait Record {
    /// Identifier of the physical insertion event. Recurs across matches.
    fn id(&self) -> u32;
    /// Inserted nucleotide sequence over {A,C,G,T}.
    fn pattern(&self) -> &str;
    /// 1-based genome coordinate of the insertion.
    fn pos(&self) -> u32;
    /// Local recurrence count at this position.
    fn num_here(&self) -> u32;
    /// Strict variant of the local recurrence count.
    fn strict_num_here(&self) -> u32;
    /// Whether the pattern also occurs in the host genome.
    fn in_human(&self) -> bool;
    /// Whether the pattern also occurs in the reference assembly.
    fn in_wh1(&self) -> bool;
    /// Reference organism for a match; insertions carry none.
    fn organism(&self) -> Option<&str> {
        None
    }
    /// Number of distinct sequences the insertion appears in.
    fn seqs(&self) -> Option<u32> {
        None
    }
}

/// A single insertion event observed in the target genome.
#[derive(Debug, Clone, PartialEq)]
pub struct Insertion {
    /// Unique insertion id.
    pub id: u32,
    /// 1-based genome coordinate.
    pub pos: u32,
    /// Inserted nucleotide sequence.
    pub pattern: String,
    /// Number of sequences the insertion was observed in.
    pub nseqs: u32,
    /// Present in the reference assembly.
    pub in_wh1: bool,
    /// Present in the host genome.
    pub in_human: bool,
    /// Local recurrence count.
    pub num_here: u32,
    /// Strict local recurrence count.
    pub strict_num_here: u32,
    /// Number of reference organisms this insertion matched.
    pub num_matches: u32,
}

impl Record for Insertion {
    fn id(&self) -> u32 {
        self.id
    }
    fn pattern(&self) -> &str {
        &self.pattern
    }
    fn pos(&self) -> u32 {
        self.pos
    }
    fn num_here(&self) -> u32 {
        self.num_here
    }
    fn strict_num_here(&self) -> u32 {
        self.strict_num_here
    }
    fn in_human(&self) -> bool {
        self.in_human
    }
    fn in_wh1(&self) -> bool {
        self.in_wh1
    }
}

/// One homology match between an insertion and a reference organism.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    /// Insertion id this match belongs to.
    pub id: u32,
    /// Reference organism name.
    pub name: String,
    /// Inserted nucleotide sequence.
    pub pattern: String,
    /// Match orientation relative to the reference.
    pub forwards: bool,
    /// Full matched sequence, or `-` when none was recorded.
    pub full_match: String,
    /// Number of distinct sequences the insertion appears in.
    pub seqs: u32,
    /// Local recurrence count.
    pub num_here: u32,
    /// Strict local recurrence count.
    pub strict_num_here: u32,
    /// 1-based genome coordinate of the insertion.
    pub pos: u32,
    /// Coordinate of the match in the source organism.
    pub src_pos: u32,
    /// Present in the host genome.
    pub in_human: bool,
    /// Present in the reference assembly.
    pub in_wh1: bool,
    /// Homology run length downstream of the breakpoint.
    pub forwards_h: u32,
    /// Homology run length upstream of the breakpoint.
    pub backwards_h: u32,
    /// Match score assigned by the producer.
    pub score: f64,
    /// Expected-occurrence weight.
    pub e_value: f64,
    /// Expected-occurrence weight of the homology arms.
    pub he_value: f64,
}

impl Match {
    /// Total homology on both sides of the breakpoint.
    pub fn total_homology(&self) -> u32 {
        self.forwards_h + self.backwards_h
    }
}

impl Record for Match {
    fn id(&self) -> u32 {
        self.id
    }
    fn pattern(&self) -> &str {
        &self.pattern
    }
    fn pos(&self) -> u32 {
        self.pos
    }
    fn num_here(&self) -> u32 {
        self.num_here
    }
    fn strict_num_here(&self) -> u32 {
        self.strict_num_here
    }
    fn in_human(&self) -> bool {
        self.in_human
    }
    fn in_wh1(&self) -> bool {
        self.in_wh1
    }
    fn organism(&self) -> Option<&str> {
        Some(&self.name)
    }
    fn seqs(&self) -> Option<u32> {
        Some(self.seqs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_parses_aligned_headers() {
        let schema = Schema::from_headers("id pos pattern", "int int str").unwrap();
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.column("pattern", FieldKind::Str).unwrap(), 2);
    }

    #[test]
    fn schema_rejects_arity_mismatch() {
        let err = Schema::from_headers("id pos", "int").unwrap_err();
        assert!(matches!(err, ParseError::HeaderArity { names: 2, kinds: 1 }));
    }

    #[test]
    fn schema_rejects_unknown_tag() {
        let err = Schema::from_headers("id", "uint64").unwrap_err();
        assert!(matches!(err, ParseError::UnknownKind { .. }));
    }

    #[test]
    fn column_kind_is_checked() {
        let schema = Schema::from_headers("id pos", "int int").unwrap();
        let err = schema.column("pos", FieldKind::Str).unwrap_err();
        assert!(matches!(err, ParseError::ColumnKind { column: "pos", .. }));
    }
}
