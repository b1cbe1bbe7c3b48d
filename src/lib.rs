//! # Insertion-Homology Enrichment Engine
//!
//! Ingests records describing short nucleotide insertion matches against
//! reference organisms, filters them by composable structural criteria,
//! and computes the statistical enrichment of homology around each
//! insertion relative to empirically-derived baselines.
//!
//! ## Pipeline
//!
//! 1. **Record model**: two-header tabular files decode into typed
//!    [`Insertion`] and [`Match`] records via a fixed per-file plan
//! 2. **Filter chain**: a conjunction of structural predicates prunes
//!    noise, edge artifacts and contaminants
//! 3. **Enrichment**: pass counts at each homology minimum are tested
//!    against survey and shuffle baselines (odds ratio + one-sided
//!    Fisher's exact test)
//! 4. **Reporting**: deduplication, sorting and the fixed line formats
//!    consumed downstream
//!
//! The codon scorer operates independently on pattern strings, ranking
//! codons by host usage frequency.
//!
//! ## Usage Example
//!
//! ```ignore
//! use homscan::{Analysis, AnalysisConfig};
//!
//! let insertions = homscan::read_insertions("insertion-data.txt")?;
//! let matches = homscan::read_matches("matches.txt")?;
//! let result = Analysis::new(AnalysisConfig::default())
//!     .run(insertions, matches)?;
//! for row in &result.enrichment {
//!     println!("n={}: {} passes", row.minimum, row.passes);
//! }
//! ```

#![warn(missing_docs, missing_debug_implementations)]
#![allow(clippy::new_without_default)]

// Core modules - leaves first, each one stage of the pipeline
pub mod record; // typed records + header-schema parser
pub mod filter; // composable predicate chain
pub mod expect; // compiled-in expectation baselines
pub mod stats; // contingency tables + exact test
pub mod codon; // host codon-usage scoring
pub mod enrich; // enrichment engine
pub mod report; // aggregation and formatting

// Re-exports for convenience
pub use enrich::{OrganismScore, SensitivityTable, ThresholdEnrichment};
pub use expect::Expectation;
pub use filter::{Filter, HighHomologySet};
pub use record::{read_insertions, read_matches, Insertion, Match, Record, RecordReader};
pub use report::{InsertionCensus, MatchCensus, SortKey};
pub use stats::{ContingencyTable, EnrichmentTest};

use thiserror::Error;

/// Errors that can occur during an analysis run.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Malformed header or data row; fatal for the whole read.
    #[error(transparent)]
    Parse(#[from] record::ParseError),

    /// Filter state could not be loaded.
    #[error(transparent)]
    Filter(#[from] filter::FilterError),

    /// A baseline lacked a requested threshold.
    #[error(transparent)]
    Expectation(#[from] expect::ExpectationError),

    /// A pattern held something other than the 64 codons.
    #[error(transparent)]
    Codon(#[from] codon::CodonError),

    /// Report configuration was unusable.
    #[error(transparent)]
    Report(#[from] report::ReportError),
}

/// Configuration for one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Filter chain applied to both record sets.
    pub filters: Vec<Filter>,

    /// Primary sort key for the record listing.
    pub sort_key: SortKey,

    /// Organism names the enrichment sweep is restricted to; empty means
    /// all organisms.
    pub names: Vec<String>,

    /// Organism whose shuffle null the sweep should consult, if any.
    pub organism: Option<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let mut filters = filter::standard_filters();
        filters.push(Filter::min_recurrence());
        Self {
            filters,
            sort_key: SortKey::Homology,
            names: Vec::new(),
            organism: None,
        }
    }
}

/// Result of a full analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    /// Membership census over the insertion set.
    pub insertion_census: InsertionCensus,

    /// Census over the filtered match set.
    pub match_census: MatchCensus,

    /// Filtered matches, sorted by the configured key.
    pub records: Vec<Match>,

    /// Number of filtered insertions; scales the expected-occurrence
    /// sort key.
    pub normalization: u64,

    /// Enrichment rows, one per homology minimum.
    pub enrichment: Vec<ThresholdEnrichment>,

    /// Organisms ranked by observed-over-expected match count.
    pub organisms: Vec<OrganismScore>,
}

/// Main analysis orchestrator.
///
/// Owns the run configuration and drives filtering, the enrichment
/// sweep and the per-organism ranking over already-parsed record sets.
#[derive(Debug)]
pub struct Analysis {
    config: AnalysisConfig,
}

impl Analysis {
    /// Create a new analysis with the given configuration.
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline over parsed insertion and match sets.
    pub fn run(
        &self,
        insertions: Vec<Insertion>,
        matches: Vec<Match>,
    ) -> Result<AnalysisResult, AnalysisError> {
        let insertion_census = report::insertion_census(&insertions, &self.config.filters);
        tracing::info!(
            total = insertion_census.total,
            filtered = insertion_census.filtered,
            "insertion census complete"
        );

        let before = matches.len();
        let mut records = filter::filter_records(matches, &self.config.filters);
        tracing::info!(before, after = records.len(), "match filtering complete");

        let match_census = report::match_census(&records);
        report::sort_records(&mut records, self.config.sort_key, insertion_census.filtered);

        let names: Vec<&str> = self.config.names.iter().map(String::as_str).collect();
        let enrichment =
            enrich::homology_sweep(&records, &names, self.config.organism.as_deref())?;
        let organisms = enrich::rank_organisms(&records);

        Ok(AnalysisResult {
            normalization: insertion_census.filtered,
            insertion_census,
            match_census,
            records,
            enrichment,
            organisms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_sorts_by_homology() {
        let config = AnalysisConfig::default();
        assert_eq!(config.sort_key, SortKey::Homology);
        assert_eq!(config.filters.len(), 6);
    }

    #[test]
    fn empty_run_produces_empty_reports() {
        let result = Analysis::new(AnalysisConfig::default())
            .run(Vec::new(), Vec::new())
            .unwrap();
        assert_eq!(result.records.len(), 0);
        assert_eq!(result.enrichment.len(), 4);
        assert!(result.organisms.is_empty());
        for row in &result.enrichment {
            assert_eq!(row.passes, 0);
            for reference in &row.references {
                assert_eq!(reference.test.p_value, 1.0);
            }
        }
    }
}
