//! Compiled-in expectation baselines.
//!
//! Each baseline maps a minimum homology length to the number of passes
//! expected under that baseline, together with the total number of trials
//! behind the counts. Survey baselines were counted directly in a genome;
//! `MC` baselines come from simulated random insertion positions; `Shuffle`
//! baselines from re-shuffled sequence null models. All tables are static
//! and read-only.

use thiserror::Error;

/// Errors raised when a baseline is asked for a threshold it lacks.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExpectationError {
    /// The baseline has no expected count at the requested minimum.
    #[error("baseline '{baseline}' has no expected count at minimum homology {minimum}")]
    MissingThreshold {
        /// Baseline name.
        baseline: &'static str,
        /// Requested minimum homology length.
        minimum: u32,
    },
}

/// A single reference baseline: expected pass counts per minimum homology
/// length, plus the total trial count.
#[derive(Debug, Clone, Copy)]
pub struct Expectation {
    name: &'static str,
    expected: &'static [(u32, u64)],
    total: u64,
}

impl Expectation {
    /// Baseline name as used in report rows.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Total trial count behind the baseline.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Expected pass count and total trials at this minimum homology.
    pub fn get(&self, minimum: u32) -> Result<(u64, u64), ExpectationError> {
        self.expected
            .iter()
            .find(|(n, _)| *n == minimum)
            .map(|(_, count)| (*count, self.total))
            .ok_or(ExpectationError::MissingThreshold {
                baseline: self.name,
                minimum,
            })
    }

    /// Homology counts surveyed in cod.
    pub const fn cod() -> Self {
        Self {
            name: "Cod",
            expected: &[(3, 1312), (4, 404), (5, 123), (6, 41), (7, 8)],
            total: 144044,
        }
    }

    /// Homology counts surveyed in human.
    pub const fn human() -> Self {
        Self {
            name: "Human",
            expected: &[(3, 7174), (4, 2380), (5, 629), (6, 184), (7, 76)],
            total: 235614,
        }
    }

    /// Homology counts surveyed in pangolin. The 7-threshold was never
    /// computed for this survey.
    pub const fn pangolin() -> Self {
        Self {
            name: "Pangolin",
            expected: &[(3, 3605), (4, 1198), (5, 433), (6, 120), (7, 0)],
            total: 75535,
        }
    }

    /// Simulated random insertion positions over the three Actinomyces
    /// genomes together.
    pub const fn actinomyces_mc() -> Self {
        Self {
            name: "Actinomyces MC",
            expected: &[
                (3, 120014),
                (4, 34692),
                (5, 8649),
                (6, 2042),
                (7, 496),
                (8, 101),
            ],
            total: 3_000_000,
        }
    }

    /// Simulated random insertion positions over A. naeslundii alone.
    pub const fn anaesl_mc() -> Self {
        Self {
            name: "A.Naeslundii MC",
            expected: &[
                (3, 121210),
                (4, 35356),
                (5, 9103),
                (6, 2154),
                (7, 509),
                (8, 116),
            ],
            total: 3_000_000,
        }
    }

    /// Monte-Carlo null for cod.
    pub const fn cod_mc() -> Self {
        Self {
            name: "Cod MC",
            expected: &[
                (3, 158642),
                (4, 49952),
                (5, 16163),
                (6, 4644),
                (7, 1345),
                (8, 409),
            ],
            total: 3_000_000,
        }
    }

    /// Monte-Carlo null for human.
    pub const fn human_mc() -> Self {
        Self {
            name: "Human MC",
            expected: &[
                (3, 163033),
                (4, 50930),
                (5, 15695),
                (6, 4718),
                (7, 1388),
                (8, 387),
            ],
            total: 3_000_000,
        }
    }

    /// Monte-Carlo null for pangolin.
    pub const fn pangolin_mc() -> Self {
        Self {
            name: "Pangolin MC",
            expected: &[
                (3, 164421),
                (4, 51529),
                (5, 15999),
                (6, 4688),
                (7, 1406),
                (8, 443),
            ],
            total: 3_000_000,
        }
    }

    /// Monte-Carlo null for rabbit.
    pub const fn rabbit_mc() -> Self {
        Self {
            name: "Rabbit MC",
            expected: &[
                (3, 161346),
                (4, 49873),
                (5, 15187),
                (6, 4412),
                (7, 1212),
                (8, 366),
            ],
            total: 3_000_000,
        }
    }

    /// Monte-Carlo null for bat.
    pub const fn bat_mc() -> Self {
        Self {
            name: "Bat MC",
            expected: &[
                (3, 164513),
                (4, 51508),
                (5, 15769),
                (6, 4587),
                (7, 1338),
                (8, 444),
            ],
            total: 3_000_000,
        }
    }

    /// Monte-Carlo null for lizard.
    pub const fn lizard_mc() -> Self {
        Self {
            name: "Lizard MC",
            expected: &[
                (3, 161293),
                (4, 50725),
                (5, 15478),
                (6, 4287),
                (7, 1316),
                (8, 429),
            ],
            total: 3_000_000,
        }
    }

    /// Shuffle null for cod.
    pub const fn cod_shuffle() -> Self {
        Self {
            name: "Cod Shuffle",
            expected: &[(3, 873), (4, 236), (5, 59), (6, 17)],
            total: 32282,
        }
    }

    /// Shuffle null for human.
    pub const fn human_shuffle() -> Self {
        Self {
            name: "Human Shuffle",
            expected: &[(3, 4069), (4, 1190), (5, 355), (6, 97)],
            total: 85441,
        }
    }

    /// Shuffle null for A. naeslundii, 500 iterations re-shuffling each.
    pub const fn anaesl_shuffle() -> Self {
        Self {
            name: "ANaesl Shuffle",
            expected: &[(3, 1294), (4, 331), (5, 89), (6, 20)],
            total: 42557,
        }
    }

    /// Shuffle null for A. israelii.
    pub const fn aisrael_shuffle() -> Self {
        Self {
            name: "AIsrael Shuffle",
            expected: &[(3, 1838), (4, 477), (5, 132), (6, 44)],
            total: 57083,
        }
    }

    /// Shuffle null for A. viscosus.
    pub const fn avisc_shuffle() -> Self {
        Self {
            name: "AVisc Shuffle",
            expected: &[(3, 1537), (4, 386), (5, 109), (6, 20)],
            total: 49650,
        }
    }

    /// Shuffle null for T. denticola.
    pub const fn treponema_shuffle() -> Self {
        Self {
            name: "Treponema Shuffle",
            expected: &[(3, 1198), (4, 402), (5, 130), (6, 35)],
            total: 18553,
        }
    }

    /// Shuffle null for A. actinomycetemcomitans.
    pub const fn aactinom_shuffle() -> Self {
        Self {
            name: "AActinom Shuffle",
            expected: &[(3, 767), (4, 236), (5, 82), (6, 27)],
            total: 13800,
        }
    }

    /// Shuffle null for P. gingivalis.
    pub const fn porphyromonas_shuffle() -> Self {
        Self {
            name: "Porphyromonas Shuffle",
            expected: &[(3, 1020), (4, 326), (5, 104), (6, 27)],
            total: 20889,
        }
    }

    /// Shuffle null for T. forsythia.
    pub const fn tforsyth_shuffle() -> Self {
        Self {
            name: "TForsyth Shuffle",
            expected: &[(3, 1408), (4, 388), (5, 121), (6, 35)],
            total: 26452,
        }
    }

    /// The shuffle null matching a short organism name, where one exists.
    ///
    /// Organism-specific comparisons must fall back to skipping when no
    /// shuffle baseline was computed for the organism.
    pub fn shuffle_for(organism: &str) -> Option<Self> {
        match organism {
            "Cod" => Some(Self::cod_shuffle()),
            "Human" => Some(Self::human_shuffle()),
            "ANaesl" => Some(Self::anaesl_shuffle()),
            "AIsrael" => Some(Self::aisrael_shuffle()),
            "AVisc" => Some(Self::avisc_shuffle()),
            "Treponema" => Some(Self::treponema_shuffle()),
            "AActinom" => Some(Self::aactinom_shuffle()),
            "Porphyromonas" => Some(Self::porphyromonas_shuffle()),
            "TForsyth" => Some(Self::tforsyth_shuffle()),
            _ => None,
        }
    }
}
