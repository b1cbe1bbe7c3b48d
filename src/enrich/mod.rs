//! Enrichment of homology at filtered matches against reference baselines.
//!
//! For each minimum homology length the engine counts how many matches
//! carry at least that much homology around the breakpoint, then tests the
//! count against up to three baselines: the cross-species survey, the
//! same-host survey, and the organism's own shuffle null where one exists.

use std::collections::HashMap;

use crate::expect::{Expectation, ExpectationError};
use crate::filter::{apply_chain, Filter};
use crate::record::Match;
use crate::stats::{ContingencyTable, EnrichmentTest};

/// Minimum homology lengths the engine sweeps.
pub const SWEEP_MINIMUMS: [u32; 4] = [3, 4, 5, 6];

/// Thresholds reported by the sensitivity table.
const SENSITIVITY_MINIMUMS: [u32; 2] = [3, 6];

/// Upper bound (inclusive) of both sensitivity grid axes.
const SENSITIVITY_GRID_MAX: u32 = 4;

/// Enrichment of one subject count against one baseline.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ReferenceEnrichment {
    /// Baseline name.
    pub baseline: &'static str,
    /// Subject records passing the homology minimum.
    pub passes: u64,
    /// Subject records considered.
    pub total: u64,
    /// Odds ratio and one-sided p-value against the baseline.
    pub test: EnrichmentTest,
}

/// All baseline comparisons at one minimum homology length.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ThresholdEnrichment {
    /// Minimum total homology for a record to count as a pass.
    pub minimum: u32,
    /// Subject records passing the minimum.
    pub passes: u64,
    /// Subject records considered.
    pub total: u64,
    /// One entry per baseline consulted.
    pub references: Vec<ReferenceEnrichment>,
}

/// Count records whose total homology meets `minimum`, optionally
/// restricted to a set of organism names. An empty name list means no
/// restriction. Returns `(passes, total)`.
pub fn count_homology(records: &[Match], names: &[&str], minimum: u32) -> (u64, u64) {
    let mut passes = 0;
    let mut total = 0;
    for record in records {
        if names.is_empty() || names.contains(&record.name.as_str()) {
            if record.total_homology() >= minimum {
                passes += 1;
            }
            total += 1;
        }
    }
    (passes, total)
}

/// Sweep the engine's homology minimums, comparing the subject counts
/// against the cross-species survey, the same-host survey, and the
/// organism's shuffle null when `organism` has one.
pub fn homology_sweep(
    records: &[Match],
    names: &[&str],
    organism: Option<&str>,
) -> Result<Vec<ThresholdEnrichment>, ExpectationError> {
    let shuffle = organism.and_then(Expectation::shuffle_for);
    let mut rows = Vec::with_capacity(SWEEP_MINIMUMS.len());

    for minimum in SWEEP_MINIMUMS {
        let (passes, total) = count_homology(records, names, minimum);

        let mut references = Vec::new();
        for baseline in [Expectation::cod(), Expectation::human()]
            .into_iter()
            .chain(shuffle)
        {
            let (expected, reference_total) = baseline.get(minimum)?;
            let table =
                ContingencyTable::from_counts(passes, total, expected, reference_total);
            references.push(ReferenceEnrichment {
                baseline: baseline.name(),
                passes,
                total,
                test: table.test(),
            });
        }

        rows.push(ThresholdEnrichment {
            minimum,
            passes,
            total,
            references,
        });
    }
    Ok(rows)
}

/// One cell of the sensitivity grid.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SensitivityCell {
    /// Strict local-recurrence minimum applied for this cell.
    pub min_recurrence: u32,
    /// Sequence-spread minimum applied for this cell.
    pub min_seqs: u32,
    /// Records passing the homology minimum after re-filtering.
    pub passes: u64,
    /// Records considered after re-filtering.
    pub total: u64,
    /// Enrichment against the fixed baseline.
    pub test: EnrichmentTest,
}

/// Sensitivity of the enrichment to the recurrence and spread minimums,
/// at one fixed homology minimum.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SensitivityTable {
    /// Minimum total homology for this table.
    pub minimum: u32,
    /// Grid cells in row-major order (recurrence rows, spread columns).
    pub cells: Vec<SensitivityCell>,
}

/// Recompute enrichment over a grid of recurrence and spread minimums.
///
/// The base record set is re-filtered for every cell with the standard
/// structural filters plus the cell's two minimums, then tested against
/// the cross-species survey baseline restricted to A. naeslundii matches.
pub fn sensitivity_tables(
    records: &[Match],
) -> Result<Vec<SensitivityTable>, ExpectationError> {
    let names = ["ANaesl"];
    let baseline = Expectation::cod();
    let mut tables = Vec::with_capacity(SENSITIVITY_MINIMUMS.len());

    for minimum in SENSITIVITY_MINIMUMS {
        let (expected, reference_total) = baseline.get(minimum)?;
        let mut cells = Vec::new();

        for min_recurrence in 0..=SENSITIVITY_GRID_MAX {
            for min_seqs in 0..=SENSITIVITY_GRID_MAX {
                let filters = [
                    Filter::StructuralNoise,
                    Filter::PositionRange,
                    Filter::ExcludedOrganism,
                    Filter::LengthRange { min: 12, max: 24 },
                    Filter::NotInReference,
                    Filter::MultipleOfThree,
                    Filter::MinSpread { min_seqs },
                    Filter::StrictMinRecurrence {
                        minimum: min_recurrence,
                    },
                ];
                let kept = apply_chain(records.to_vec(), &filters).kept;
                let (passes, total) = count_homology(&kept, &names, minimum);
                let table =
                    ContingencyTable::from_counts(passes, total, expected, reference_total);
                cells.push(SensitivityCell {
                    min_recurrence,
                    min_seqs,
                    passes,
                    total,
                    test: table.test(),
                });
            }
        }

        tables.push(SensitivityTable { minimum, cells });
    }
    Ok(tables)
}

/// Match count and accumulated expectation weights for one organism.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct OrganismScore {
    /// Reference organism name.
    pub organism: String,
    /// Number of matches against the organism.
    pub matches: u64,
    /// Sum of expected-occurrence weights.
    pub total_e: f64,
    /// Sum of homology expectation weights, falling back to the plain
    /// weight where no better estimate was recorded.
    pub total_he: f64,
    /// Enrichment score: matches per unit of expectation.
    pub score: f64,
}

/// Group matches by organism and rank descending by how many more times
/// each organism appeared than expected.
///
/// Organisms whose accumulated expectation is zero cannot be scored and
/// are skipped with a diagnostic.
pub fn rank_organisms(records: &[Match]) -> Vec<OrganismScore> {
    struct Tally {
        matches: u64,
        total_e: f64,
        total_he: f64,
    }

    let mut order: Vec<String> = Vec::new();
    let mut tallies: HashMap<String, Tally> = HashMap::new();

    for record in records {
        let tally = tallies.entry(record.name.clone()).or_insert_with(|| {
            order.push(record.name.clone());
            Tally {
                matches: 0,
                total_e: 0.0,
                total_he: 0.0,
            }
        });
        tally.matches += 1;
        tally.total_e += record.e_value;
        // An hE of exactly 1.0 means no better estimate was available.
        if record.he_value == 1.0 {
            tally.total_he += record.e_value;
        } else {
            tally.total_he += record.he_value;
        }
    }

    let mut scores = Vec::with_capacity(order.len());
    for organism in order {
        let tally = &tallies[&organism];
        if tally.total_e == 0.0 {
            tracing::warn!(
                organism = organism.as_str(),
                matches = tally.matches,
                "skipping organism with zero accumulated expectation"
            );
            continue;
        }
        scores.push(OrganismScore {
            score: tally.matches as f64 / tally.total_e,
            organism,
            matches: tally.matches,
            total_e: tally.total_e,
            total_he: tally.total_he,
        });
    }

    scores.sort_by(|x, y| y.score.total_cmp(&x.score));
    scores
}

/// Display name for a short organism tag, for report labelling.
pub fn display_name(short: &str) -> &str {
    match short {
        "ANaesl" => "A.Naeslundii",
        "AIsrael" => "A.Israelii",
        "AVisc" => "A.Viscosus",
        "Treponema" => "T.Denticola",
        "Porphyromonas" => "P.Gingivalis",
        "TForsyth" => "T.Forsythia",
        "AActinom" => "A.Actin.",
        other => other,
    }
}
