//! Contingency tables, odds ratios and the one-sided exact test.

use statrs::distribution::{DiscreteCDF, Hypergeometric};

/// A 2x2 contingency table comparing observed passes in a subject set
/// against expected passes in a reference baseline.
///
/// Invariants: `a + b` is the subject set's total count and `c + d` the
/// reference's total trial count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContingencyTable {
    /// Observed passes in the subject set.
    pub a: u64,
    /// Observed non-passes in the subject set.
    pub b: u64,
    /// Expected passes in the reference.
    pub c: u64,
    /// Expected non-passes in the reference.
    pub d: u64,
}

impl ContingencyTable {
    /// Build a table from subject pass/total counts and reference
    /// expected/total counts.
    ///
    /// # Panics
    ///
    /// Panics if `passes > total` or `expected > reference_total`; both
    /// violate the marginal invariants.
    pub fn from_counts(passes: u64, total: u64, expected: u64, reference_total: u64) -> Self {
        assert!(passes <= total, "passes exceed subject total");
        assert!(
            expected <= reference_total,
            "expected count exceeds reference total"
        );
        Self {
            a: passes,
            b: total - passes,
            c: expected,
            d: reference_total - expected,
        }
    }

    /// Sample odds ratio `(a*d)/(b*c)`.
    ///
    /// Degenerate marginals follow the exact-test convention: the ratio is
    /// `+inf` whenever `b` or `c` is zero.
    pub fn odds_ratio(&self) -> f64 {
        if self.b == 0 || self.c == 0 {
            return f64::INFINITY;
        }
        (self.a as f64 * self.d as f64) / (self.b as f64 * self.c as f64)
    }

    /// One-sided p-value for enrichment (Fisher's exact test, `greater`
    /// alternative): the probability of observing `a` or more passes under
    /// the hypergeometric null with this table's margins.
    pub fn fisher_greater(&self) -> f64 {
        if self.a == 0 {
            return 1.0;
        }
        let population = self.a + self.b + self.c + self.d;
        let successes = self.a + self.c;
        let draws = self.a + self.b;
        let null = Hypergeometric::new(population, successes, draws)
            .expect("margins cannot exceed the population they sum into");
        null.sf(self.a - 1)
    }

    /// Odds ratio and p-value together.
    pub fn test(&self) -> EnrichmentTest {
        EnrichmentTest {
            odds_ratio: self.odds_ratio(),
            p_value: self.fisher_greater(),
        }
    }
}

/// Result of testing one contingency table.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EnrichmentTest {
    /// Sample odds ratio.
    pub odds_ratio: f64,
    /// One-sided p-value, `greater` alternative.
    pub p_value: f64,
}
