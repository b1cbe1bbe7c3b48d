//! Composable structural filters over insertion and match records.
//!
//! Each filter is a pure predicate; the chain is a short-circuit
//! conjunction, so the kept set is independent of filter order. The one
//! stateful filter (the high-homology id exclusion) reports rejections as
//! explicit diagnostic notes instead of printing from inside the predicate,
//! and is evaluated for every candidate so its notes stay complete.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;

use crate::record::Record;

/// Positions at or past this coordinate sit at the assembly edge and are
/// treated as artifacts, as is position zero.
const ASSEMBLY_EDGE: u32 = 29870;

/// Known soil-bacterium contaminant; its matches are never meaningful.
const CONTAMINANT: &str = "Delftia";

/// Run length of identical nucleotides that marks a pattern as noise.
const HOMOPOLYMER_RUN: usize = 6;

/// Contiguous repeat count of a dinucleotide motif that marks a pattern
/// as noise.
const DINUCLEOTIDE_REPEATS: usize = 6;

/// Errors raised while loading filter state.
#[derive(Debug, Error)]
pub enum FilterError {
    /// The id list could not be read.
    #[error("failed to read high-homology id list: {0}")]
    Io(#[from] std::io::Error),
    /// A line of the id list was not an integer.
    #[error("invalid id '{value}' on line {line} of high-homology id list")]
    BadId { line: usize, value: String },
}

/// Ids of insertions with high homology in the host, loaded once from an
/// external one-id-per-line file.
#[derive(Debug, Clone, Default)]
pub struct HighHomologySet {
    ids: HashSet<u32>,
}

impl HighHomologySet {
    /// Load the id list from a file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FilterError> {
        let reader = BufReader::new(File::open(path)?);
        let mut ids = HashSet::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let id = trimmed.parse().map_err(|_| FilterError::BadId {
                line: line_no + 1,
                value: trimmed.to_string(),
            })?;
            ids.insert(id);
        }
        Ok(Self { ids })
    }

    /// Build the set from ids already in memory.
    pub fn from_ids(ids: impl IntoIterator<Item = u32>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    fn contains(&self, id: u32) -> bool {
        self.ids.contains(&id)
    }
}

/// The closed set of record filters.
///
/// `apply` returns `true` to keep a record. Filters that read match-only
/// fields keep insertion records, where those fields are absent.
#[derive(Debug, Clone)]
pub enum Filter {
    /// Reject homopolymer runs and contiguous dinucleotide repeats.
    StructuralNoise,
    /// Reject positions at the genome edges.
    PositionRange,
    /// Keep records recurring locally at least `minimum` times.
    MinRecurrence {
        /// Minimum `num_here`.
        minimum: u32,
    },
    /// As [`Filter::MinRecurrence`] but against the strict count.
    StrictMinRecurrence {
        /// Minimum `strict_num_here`.
        minimum: u32,
    },
    /// Keep records seen in at least `min_seqs` distinct sequences.
    MinSpread {
        /// Minimum `seqs`; records without the field always pass.
        min_seqs: u32,
    },
    /// Keep records passing either of the two held sub-filters.
    RecurrenceOrSpread {
        /// Recurrence arm.
        recurrence: Box<Filter>,
        /// Spread arm.
        spread: Box<Filter>,
    },
    /// Reject matches against the known contaminant organism.
    ExcludedOrganism,
    /// Keep patterns whose length lies in `min..=max`.
    LengthRange {
        /// Inclusive lower bound.
        min: usize,
        /// Inclusive upper bound.
        max: usize,
    },
    /// Keep reading-frame-preserving patterns (length divisible by 3).
    MultipleOfThree,
    /// Keep records not also present in the host genome.
    NotInHost,
    /// Keep records not also present in the reference assembly.
    NotInReference,
    /// Reject ids from an externally loaded high-homology list.
    HighHomology(HighHomologySet),
}

impl Filter {
    /// Recurrence filter with the conventional minimum of 2.
    pub fn min_recurrence() -> Self {
        Filter::MinRecurrence { minimum: 2 }
    }

    /// Strict recurrence filter with the conventional minimum of 2.
    pub fn strict_min_recurrence() -> Self {
        Filter::StrictMinRecurrence { minimum: 2 }
    }

    /// Spread filter with the conventional minimum of 2.
    pub fn min_spread() -> Self {
        Filter::MinSpread { min_seqs: 2 }
    }

    /// Composite keeping records that recur at least `min_recurrence`
    /// times at their position or appear in at least 2 sequences.
    pub fn recurrence_or_spread(min_recurrence: u32) -> Self {
        Filter::RecurrenceOrSpread {
            recurrence: Box::new(Filter::MinRecurrence {
                minimum: min_recurrence,
            }),
            spread: Box::new(Filter::min_spread()),
        }
    }

    /// Short name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Filter::StructuralNoise => "structural-noise",
            Filter::PositionRange => "position-range",
            Filter::MinRecurrence { .. } => "min-recurrence",
            Filter::StrictMinRecurrence { .. } => "strict-min-recurrence",
            Filter::MinSpread { .. } => "min-spread",
            Filter::RecurrenceOrSpread { .. } => "recurrence-or-spread",
            Filter::ExcludedOrganism => "excluded-organism",
            Filter::LengthRange { .. } => "length-range",
            Filter::MultipleOfThree => "multiple-of-three",
            Filter::NotInHost => "not-in-host",
            Filter::NotInReference => "not-in-reference",
            Filter::HighHomology(_) => "high-homology",
        }
    }

    /// Whether this filter must see every candidate so its diagnostics
    /// stay complete, even after an earlier filter already rejected.
    fn emits_notes(&self) -> bool {
        matches!(self, Filter::HighHomology(_))
    }

    /// Evaluate the filter against one record.
    pub fn apply<R: Record>(&self, record: &R) -> Decision {
        match self {
            Filter::StructuralNoise => Decision::verdict(
                !has_homopolymer_run(record.pattern(), HOMOPOLYMER_RUN)
                    && !has_dinucleotide_repeat(record.pattern(), DINUCLEOTIDE_REPEATS),
            ),
            Filter::PositionRange => {
                Decision::verdict(record.pos() < ASSEMBLY_EDGE && record.pos() != 0)
            }
            Filter::MinRecurrence { minimum } => {
                Decision::verdict(record.num_here() >= *minimum)
            }
            Filter::StrictMinRecurrence { minimum } => {
                Decision::verdict(record.strict_num_here() >= *minimum)
            }
            Filter::MinSpread { min_seqs } => match record.seqs() {
                Some(seqs) => Decision::verdict(seqs >= *min_seqs),
                // Insertion records carry no spread; the filter is
                // match-only.
                None => Decision::verdict(true),
            },
            Filter::RecurrenceOrSpread { recurrence, spread } => Decision::verdict(
                recurrence.apply(record).keep || spread.apply(record).keep,
            ),
            Filter::ExcludedOrganism => {
                Decision::verdict(record.organism() != Some(CONTAMINANT))
            }
            Filter::LengthRange { min, max } => {
                let n = record.pattern().len();
                Decision::verdict(*min <= n && n <= *max)
            }
            Filter::MultipleOfThree => Decision::verdict(record.pattern().len() % 3 == 0),
            Filter::NotInHost => Decision::verdict(!record.in_human()),
            Filter::NotInReference => Decision::verdict(!record.in_wh1()),
            Filter::HighHomology(set) => {
                if set.contains(record.id()) {
                    Decision::rejected_with_note(FilterNote {
                        filter: self.name(),
                        id: record.id(),
                    })
                } else {
                    Decision::verdict(true)
                }
            }
        }
    }
}

/// Outcome of applying one filter to one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// `true` to keep the record.
    pub keep: bool,
    /// Diagnostic event, if the filter produced one.
    pub note: Option<FilterNote>,
}

impl Decision {
    fn verdict(keep: bool) -> Self {
        Self { keep, note: None }
    }

    fn rejected_with_note(note: FilterNote) -> Self {
        Self {
            keep: false,
            note: Some(note),
        }
    }
}

/// Diagnostic event produced by a filter rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterNote {
    /// Name of the filter that produced the note.
    pub filter: &'static str,
    /// Id of the rejected record.
    pub id: u32,
}

/// Kept records plus the diagnostic notes produced along the way.
#[derive(Debug, Clone)]
pub struct FilterOutcome<R> {
    /// Records every filter kept.
    pub kept: Vec<R>,
    /// Notes from note-emitting filters, in input order.
    pub notes: Vec<FilterNote>,
}

/// Apply a filter chain, collecting diagnostics for the caller to report.
///
/// The chain short-circuits at the first rejecting filter except for
/// note-emitting filters, which see every candidate.
pub fn apply_chain<R: Record>(records: Vec<R>, filters: &[Filter]) -> FilterOutcome<R> {
    let mut kept = Vec::new();
    let mut notes = Vec::new();

    for record in records {
        let mut keep = true;
        for filter in filters {
            if !keep && !filter.emits_notes() {
                continue;
            }
            let decision = filter.apply(&record);
            if let Some(note) = decision.note {
                notes.push(note);
            }
            if !decision.keep {
                keep = false;
            }
        }
        if keep {
            kept.push(record);
        }
    }

    FilterOutcome { kept, notes }
}

/// Apply a filter chain and log any diagnostics through `tracing`.
pub fn filter_records<R: Record>(records: Vec<R>, filters: &[Filter]) -> Vec<R> {
    let outcome = apply_chain(records, filters);
    for note in &outcome.notes {
        tracing::info!(filter = note.filter, id = note.id, "rejected by id list");
    }
    outcome.kept
}

/// The standard structural chain applied ahead of any optional filters:
/// noise, position edges, the contaminant organism, pattern length
/// 12..=200, and exclusion of reference-assembly members.
pub fn standard_filters() -> Vec<Filter> {
    vec![
        Filter::StructuralNoise,
        Filter::PositionRange,
        Filter::ExcludedOrganism,
        Filter::LengthRange { min: 12, max: 200 },
        Filter::NotInReference,
    ]
}

fn has_homopolymer_run(pattern: &str, min_run: usize) -> bool {
    let bytes = pattern.as_bytes();
    let mut run = 1;
    for pair in bytes.windows(2) {
        if pair[0] == pair[1] {
            run += 1;
            if run >= min_run {
                return true;
            }
        } else {
            run = 1;
        }
    }
    false
}

fn has_dinucleotide_repeat(pattern: &str, min_repeats: usize) -> bool {
    let bytes = pattern.as_bytes();
    let window = 2 * min_repeats;
    if bytes.len() < window {
        return false;
    }
    for start in 0..=(bytes.len() - window) {
        let unit = &bytes[start..start + 2];
        let mut repeats = 1;
        let mut i = start + 2;
        while i + 2 <= bytes.len() && &bytes[i..i + 2] == unit {
            repeats += 1;
            i += 2;
        }
        if repeats >= min_repeats {
            return true;
        }
    }
    false
}
