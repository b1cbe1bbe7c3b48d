//! Aggregation and text formatting of analysis results.
//!
//! Everything here is plain in-memory transformation: deduplication,
//! sorting, censuses and the line formats consumed by downstream report
//! generation. Numeric formatting is significant: odds ratios print with
//! two decimals, p-values with `%g`-style significant figures.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::codon::{self, CodonError};
use crate::enrich::ReferenceEnrichment;
use crate::expect::{Expectation, ExpectationError};
use crate::filter::{apply_chain, filter_records, Filter};
use crate::record::{Insertion, Match};

/// Attribute value that is never remembered by [`unique_by`]; records
/// carrying it are always emitted.
pub const SENTINEL: &str = "-";

/// Matches with at least this much total homology count as high-homology
/// in the censuses.
const HIGH_HOMOLOGY_MIN: u32 = 3;

/// Usage errors in report configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    /// The cutoff export only makes sense over the homology-sorted list.
    #[error("cutoff export requires sorting by homology")]
    CutoffNeedsHomologySort,
}

/// Primary sort key for the formatted record list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Total homology, descending.
    Homology,
    /// Expected occurrences (`E` times the insertion count), ascending.
    ExpectedOccurrence,
}

/// Sort records in place by the chosen key.
///
/// `normalization` is the number of distinct insertions considered and
/// scales the expected-occurrence key.
pub fn sort_records(records: &mut [Match], key: SortKey, normalization: u64) {
    match key {
        SortKey::Homology => {
            records.sort_by(|x, y| y.total_homology().cmp(&x.total_homology()));
        }
        SortKey::ExpectedOccurrence => {
            let scale = normalization as f64;
            records.sort_by(|x, y| {
                (x.e_value * scale).total_cmp(&(y.e_value * scale))
            });
        }
    }
}

/// Lazily yield each record whose key has not been seen before, in input
/// order. The sentinel value `-` is never remembered, so sentinel-keyed
/// records always come through.
pub fn unique_by<I, F>(records: I, key: F) -> UniqueBy<I::IntoIter, F>
where
    I: IntoIterator,
    F: for<'a> Fn(&'a I::Item) -> &'a str,
{
    UniqueBy {
        iter: records.into_iter(),
        key,
        seen: HashSet::new(),
    }
}

/// Iterator adapter returned by [`unique_by`].
#[derive(Debug)]
pub struct UniqueBy<I, F> {
    iter: I,
    key: F,
    seen: HashSet<String>,
}

impl<I, F> Iterator for UniqueBy<I, F>
where
    I: Iterator,
    F: for<'a> Fn(&'a I::Item) -> &'a str,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let item = self.iter.next()?;
            let key = (self.key)(&item);
            if self.seen.contains(key) {
                continue;
            }
            if key != SENTINEL {
                self.seen.insert(key.to_string());
            }
            return Some(item);
        }
    }
}

/// Ids of the leading homology-sorted records with homology at least
/// `minimum`, deduplicated in order.
///
/// The list is assumed monotonic after sorting, so collection stops at
/// the first record below the minimum. Requesting the cutoff under any
/// other sort key is a usage error.
pub fn cutoff_ids(
    records: &[Match],
    key: SortKey,
    minimum: u32,
) -> Result<Vec<u32>, ReportError> {
    if key != SortKey::Homology {
        return Err(ReportError::CutoffNeedsHomologySort);
    }
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for record in records {
        if record.total_homology() < minimum {
            break;
        }
        if seen.insert(record.id) {
            ids.push(record.id);
        }
    }
    Ok(ids)
}

/// Format a match the way the record listing prints it: `id`, `name` and
/// `pattern` raw, every other field as `key=value` in column order, and
/// the pattern length appended.
pub fn format_record(record: &Match) -> String {
    format!(
        "{} {} {} forwards={} full_match={} seqs={} num_here={} \
         strict_num_here={} pos={} src_pos={} in_human={} in_wh1={} \
         forwards_h={} backwards_h={} score={} E={} hE={} len={}",
        record.id,
        record.name,
        record.pattern,
        record.forwards,
        record.full_match,
        record.seqs,
        record.num_here,
        record.strict_num_here,
        record.pos,
        record.src_pos,
        record.in_human,
        record.in_wh1,
        record.forwards_h,
        record.backwards_h,
        record.score,
        record.e_value,
        record.he_value,
        record.pattern.len(),
    )
}

/// One enrichment comparison as a report line:
/// `<baseline>: <passes>/<total> passes OR=<or> p=<p>`.
pub fn enrichment_line(reference: &ReferenceEnrichment) -> String {
    format!(
        "{}: {}/{} passes OR={:.2} p={}",
        reference.baseline,
        reference.passes,
        reference.total,
        reference.test.odds_ratio,
        format_sig(reference.test.p_value, 4),
    )
}

/// Format `value` with `digits` significant figures, the way C's `%g`
/// (and the original report pipeline) would.
pub fn format_sig(value: f64, digits: usize) -> String {
    let digits = digits.max(1);
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }

    let sci = format!("{:.*e}", digits - 1, value);
    let (mantissa, exponent) = sci
        .split_once('e')
        .expect("scientific formatting always carries an exponent");
    let exponent: i32 = exponent
        .parse()
        .expect("scientific exponent is an integer");

    if exponent < -4 || exponent >= digits as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_zeros(mantissa), sign, exponent.abs())
    } else {
        let precision = (digits as i32 - 1 - exponent).max(0) as usize;
        let fixed = format!("{:.*}", precision, value);
        trim_zeros(&fixed).to_string()
    }
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Counts of insertions by membership, plus the size of the filtered set.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct InsertionCensus {
    /// Insertions also present in the host genome.
    pub in_host: u64,
    /// Insertions also present in the reference assembly.
    pub in_reference: u64,
    /// Insertions matching no reference organism at all.
    pub unmatched: u64,
    /// All insertions read.
    pub total: u64,
    /// Insertions surviving the filter chain; used as the normalization
    /// scalar for the expected-occurrence sort key.
    pub filtered: u64,
}

/// Census the insertion set and apply the filter chain to it.
pub fn insertion_census(insertions: &[Insertion], filters: &[Filter]) -> InsertionCensus {
    let mut census = InsertionCensus {
        in_host: 0,
        in_reference: 0,
        unmatched: 0,
        total: 0,
        filtered: 0,
    };
    for insertion in insertions {
        if insertion.in_human {
            census.in_host += 1;
        } else if insertion.in_wh1 {
            census.in_reference += 1;
        } else if insertion.num_matches == 0 {
            census.unmatched += 1;
        }
        census.total += 1;
    }
    census.filtered = filter_records(insertions.to_vec(), filters).len() as u64;
    census
}

/// Counts over a match set: totals, high-homology counts and the per-id
/// recurrence table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MatchCensus {
    /// Number of match records.
    pub matches: usize,
    /// Number of distinct insertion ids among them.
    pub insertions: usize,
    /// Matches with total homology at least 3.
    pub high_homology_matches: u64,
    /// Distinct ids with at least one high-homology match.
    pub high_homology_insertions: usize,
    /// `(id, match count)` pairs, descending by count, ties in first-seen
    /// order.
    pub recurrence: Vec<(u32, u64)>,
}

/// Census a match set.
pub fn match_census(records: &[Match]) -> MatchCensus {
    let mut counts: HashMap<u32, u64> = HashMap::new();
    let mut order: Vec<u32> = Vec::new();
    let mut high_homology_matches = 0;
    let mut high_homology_ids: HashSet<u32> = HashSet::new();

    for record in records {
        let count = counts.entry(record.id).or_insert_with(|| {
            order.push(record.id);
            0
        });
        *count += 1;
        if record.total_homology() >= HIGH_HOMOLOGY_MIN {
            high_homology_matches += 1;
            high_homology_ids.insert(record.id);
        }
    }

    let mut recurrence: Vec<(u32, u64)> = order.iter().map(|id| (*id, counts[id])).collect();
    recurrence.sort_by(|x, y| y.1.cmp(&x.1));

    MatchCensus {
        matches: records.len(),
        insertions: order.len(),
        high_homology_matches,
        high_homology_insertions: high_homology_ids.len(),
        recurrence,
    }
}

/// Occurrence counts for a motif over the recurrent, frame-preserving
/// insertions.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MotifDistribution {
    /// Non-overlapping motif occurrences.
    pub occurrences: u64,
    /// Insertions surveyed after filtering.
    pub insertions: usize,
    /// Nucleotides surveyed.
    pub total_nucleotides: u64,
    /// Occurrences per million nucleotides; `None` when nothing was
    /// surveyed.
    pub per_million: Option<f64>,
}

/// Count motif occurrences over insertions that recur strictly, spread
/// across sequences, and preserve the reading frame.
pub fn motif_distribution(insertions: &[Insertion], motif: &str) -> MotifDistribution {
    let filters = [
        Filter::strict_min_recurrence(),
        Filter::min_spread(),
        Filter::MultipleOfThree,
    ];
    let kept = apply_chain(insertions.to_vec(), &filters).kept;

    let mut occurrences = 0;
    let mut total_nucleotides = 0;
    for insertion in &kept {
        occurrences += count_occurrences(&insertion.pattern, motif);
        total_nucleotides += insertion.pattern.len() as u64;
    }

    let per_million = if total_nucleotides == 0 {
        tracing::warn!(motif, "no nucleotides surveyed; cannot normalize motif count");
        None
    } else {
        Some(occurrences as f64 * 1e6 / total_nucleotides as f64)
    };

    MotifDistribution {
        occurrences,
        insertions: kept.len(),
        total_nucleotides,
        per_million,
    }
}

fn count_occurrences(text: &str, motif: &str) -> u64 {
    if motif.is_empty() {
        return 0;
    }
    let mut count = 0;
    let mut start = 0;
    while let Some(found) = text[start..].find(motif) {
        count += 1;
        start += found + motif.len();
    }
    count
}

/// A candidate insertion whose pattern reads as host-preferred codons.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CodonCandidate {
    /// Insertion id.
    pub id: u32,
    /// Pattern of the best-scoring match kept for the id.
    pub pattern: String,
    /// Total homology of the kept match.
    pub homology: u32,
    /// Codon usage score of the pattern.
    pub score: u32,
}

/// Shortlist matches whose codon score reaches `min_score`, keeping one
/// record per insertion id: the one with the most homology, later
/// records winning ties.
pub fn codon_shortlist(
    records: &[Match],
    min_score: u32,
) -> Result<Vec<CodonCandidate>, CodonError> {
    let mut index: HashMap<u32, usize> = HashMap::new();
    let mut shortlist: Vec<CodonCandidate> = Vec::new();

    for record in records {
        let score = codon::score(&record.pattern)?;
        if score < min_score {
            continue;
        }
        let homology = record.total_homology();
        let candidate = CodonCandidate {
            id: record.id,
            pattern: record.pattern.clone(),
            homology,
            score,
        };
        match index.get(&record.id) {
            Some(&slot) => {
                if homology >= shortlist[slot].homology {
                    shortlist[slot] = candidate;
                }
            }
            None => {
                index.insert(record.id, shortlist.len());
                shortlist.push(candidate);
            }
        }
    }
    Ok(shortlist)
}

/// Expected/total pairs of the two survey baselines at one threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SurveyRow {
    /// Minimum matching nucleotides outside the insertion.
    pub minimum: u32,
    /// `(expected, total)` in the cross-species survey.
    pub cross_species: (u64, u64),
    /// `(expected, total)` in the same-host survey.
    pub same_host: (u64, u64),
}

/// The survey-baseline table over the engine's thresholds.
pub fn baseline_survey() -> Result<Vec<SurveyRow>, ExpectationError> {
    (3..=6)
        .map(|minimum| {
            Ok(SurveyRow {
                minimum,
                cross_species: Expectation::cod().get(minimum)?,
                same_host: Expectation::human().get(minimum)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn match_with(id: u32, full_match: &str, homology: u32, e: f64) -> Match {
        Match {
            id,
            name: "ANaesl".to_string(),
            pattern: "CTCCTCGGCGGG".to_string(),
            forwards: true,
            full_match: full_match.to_string(),
            seqs: 2,
            num_here: 2,
            strict_num_here: 2,
            pos: 1000,
            src_pos: 1,
            in_human: false,
            in_wh1: false,
            forwards_h: homology,
            backwards_h: 0,
            score: 0.0,
            e_value: e,
            he_value: 1.0,
        }
    }

    fn insertion(id: u32, pattern: &str) -> Insertion {
        Insertion {
            id,
            pos: 1000,
            pattern: pattern.to_string(),
            nseqs: 2,
            in_wh1: false,
            in_human: false,
            num_here: 2,
            strict_num_here: 2,
            num_matches: 1,
        }
    }

    #[test]
    fn sentinel_keys_are_always_emitted() {
        let records = vec![
            match_with(1, "-", 3, 1.0),
            match_with(2, "-", 3, 1.0),
            match_with(3, "x", 3, 1.0),
            match_with(4, "x", 3, 1.0),
        ];
        let unique: Vec<_> = unique_by(records, |r| r.full_match.as_str()).collect();
        let ids: Vec<u32> = unique.iter().map(|r| r.id).collect();
        assert_eq!(ids, [1, 2, 3]);
    }

    #[test]
    fn homology_sort_is_descending() {
        let mut records = vec![
            match_with(1, "-", 2, 1.0),
            match_with(2, "-", 5, 1.0),
            match_with(3, "-", 3, 1.0),
        ];
        sort_records(&mut records, SortKey::Homology, 1);
        let ids: Vec<u32> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, [2, 3, 1]);
    }

    #[test]
    fn expected_occurrence_sort_is_ascending() {
        let mut records = vec![
            match_with(1, "-", 2, 0.5),
            match_with(2, "-", 5, 0.1),
            match_with(3, "-", 3, 0.3),
        ];
        sort_records(&mut records, SortKey::ExpectedOccurrence, 10);
        let ids: Vec<u32> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, [2, 3, 1]);
    }

    #[test]
    fn cutoff_requires_homology_sort() {
        let records = vec![match_with(1, "-", 5, 1.0)];
        let err = cutoff_ids(&records, SortKey::ExpectedOccurrence, 3).unwrap_err();
        assert_eq!(err, ReportError::CutoffNeedsHomologySort);
    }

    #[test]
    fn cutoff_stops_at_first_failure_and_dedups() {
        let records = vec![
            match_with(7, "-", 6, 1.0),
            match_with(7, "-", 5, 1.0),
            match_with(9, "-", 4, 1.0),
            match_with(3, "-", 2, 1.0),
            // Sorted input is monotonic; anything after the break is
            // never reached.
            match_with(8, "-", 4, 1.0),
        ];
        let ids = cutoff_ids(&records, SortKey::Homology, 4).unwrap();
        assert_eq!(ids, [7, 9]);
    }

    #[test_case(1.393593606e-6, 4 => "1.394e-06")]
    #[test_case(72.52642276, 2 => "73")]
    #[test_case(0.016253869969, 2 => "0.016")]
    #[test_case(0.0, 4 => "0")]
    #[test_case(1_000_000.0, 2 => "1e+06")]
    #[test_case(1.0, 4 => "1")]
    #[test_case(12.25, 4 => "12.25")]
    fn sig_figures_match_g_formatting(value: f64, digits: usize) -> String {
        format_sig(value, digits)
    }

    #[test]
    fn infinite_odds_ratio_formats_like_a_float() {
        assert_eq!(format_sig(f64::INFINITY, 4), "inf");
    }

    #[test]
    fn record_line_has_raw_and_keyed_fields() {
        let line = format_record(&match_with(12, "CTGGC", 3, 0.25));
        assert!(line.starts_with("12 ANaesl CTCCTCGGCGGG forwards=true"));
        assert!(line.contains("full_match=CTGGC"));
        assert!(line.contains("E=0.25"));
        assert!(line.ends_with("len=12"));
    }

    #[test]
    fn insertion_census_counts_membership_once() {
        let mut a = insertion(1, "CTCCTCGGCGGG");
        a.in_human = true;
        a.in_wh1 = true; // host membership wins
        let mut b = insertion(2, "CTCCTCGGCGGG");
        b.in_wh1 = true;
        let mut c = insertion(3, "CTCCTCGGCGGG");
        c.num_matches = 0;
        let d = insertion(4, "CTCCTCGGCGGG");

        let census = insertion_census(&[a, b, c, d], &[Filter::MultipleOfThree]);
        assert_eq!(census.in_host, 1);
        assert_eq!(census.in_reference, 1);
        assert_eq!(census.unmatched, 1);
        assert_eq!(census.total, 4);
        assert_eq!(census.filtered, 4);
    }

    #[test]
    fn match_census_orders_recurrence_by_count() {
        let records = vec![
            match_with(5, "-", 3, 1.0),
            match_with(9, "-", 1, 1.0),
            match_with(9, "-", 4, 1.0),
            match_with(5, "-", 0, 1.0),
            match_with(5, "-", 1, 1.0),
        ];
        let census = match_census(&records);
        assert_eq!(census.matches, 5);
        assert_eq!(census.insertions, 2);
        assert_eq!(census.high_homology_matches, 2);
        assert_eq!(census.high_homology_insertions, 2);
        assert_eq!(census.recurrence, [(5, 3), (9, 2)]);
    }

    #[test]
    fn motif_distribution_counts_non_overlapping() {
        let records = vec![insertion(1, "CGGCGGCGGCGG")];
        let dist = motif_distribution(&records, "CGGCGG");
        assert_eq!(dist.occurrences, 2);
        assert_eq!(dist.total_nucleotides, 12);
        let per_million = dist.per_million.unwrap();
        assert!((per_million - 2.0 * 1e6 / 12.0).abs() < 1e-9);
    }

    #[test]
    fn empty_motif_survey_is_degenerate_not_fatal() {
        let dist = motif_distribution(&[], "CGGCGG");
        assert_eq!(dist.occurrences, 0);
        assert!(dist.per_million.is_none());
    }

    #[test]
    fn codon_shortlist_keeps_best_homology_per_id() {
        // CTCCTCGGCGGG scores 8 in the offset-2 frame.
        let records = vec![
            match_with(1, "-", 3, 1.0),
            match_with(1, "-", 5, 1.0),
            match_with(2, "-", 1, 1.0),
        ];
        let shortlist = codon_shortlist(&records, 8).unwrap();
        assert_eq!(shortlist.len(), 2);
        assert_eq!(shortlist[0].id, 1);
        assert_eq!(shortlist[0].homology, 5);
        assert_eq!(shortlist[0].score, 8);
        assert_eq!(shortlist[1].id, 2);
    }

    #[test]
    fn survey_rows_cover_engine_thresholds() {
        let rows = baseline_survey().unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].minimum, 3);
        assert_eq!(rows[0].cross_species, (1312, 144044));
        assert_eq!(rows[0].same_host, (7174, 235614));
    }
}
