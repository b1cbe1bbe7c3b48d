//! Host codon-usage scoring for candidate insertion sequences.
//!
//! The 64 codons are grouped by the amino acid they encode (both arginine
//! codon families form a single 6-member synonymous group). Within a group
//! the codons are ranked by their usage frequency in the host, ascending,
//! so a low rank means a codon the host rarely uses. Scoring a sequence
//! sums the ranks of the codons read in a frame that begins one base after
//! the window start.

use std::collections::HashMap;
use std::sync::LazyLock;

use thiserror::Error;

/// The reading frame starts at this offset into the scored window; the
/// insertion's frame is assumed to begin one base after the window start.
const FRAME_OFFSET: usize = 2;

/// Errors raised by the scorer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodonError {
    /// A frame position held something other than one of the 64 codons.
    #[error("undefined codon '{codon}' at offset {offset}")]
    UndefinedCodon {
        /// The offending three bytes as read.
        codon: String,
        /// Byte offset of the codon in the scored sequence.
        offset: usize,
    },
}

/// The standard genetic code.
const GENETIC_CODE: [(&str, char); 64] = [
    ("TTT", 'F'), // Phenylalanine
    ("TTC", 'F'),
    ("TTA", 'L'), // Leucine
    ("TTG", 'L'),
    ("CTT", 'L'),
    ("CTC", 'L'),
    ("CTA", 'L'),
    ("CTG", 'L'),
    ("ATT", 'I'), // Isoleucine
    ("ATC", 'I'),
    ("ATA", 'I'),
    ("ATG", 'M'), // Methionine
    ("GTT", 'V'), // Valine
    ("GTC", 'V'),
    ("GTA", 'V'),
    ("GTG", 'V'),
    ("TCT", 'S'), // Serine
    ("TCC", 'S'),
    ("TCA", 'S'),
    ("TCG", 'S'),
    ("CCT", 'P'), // Proline
    ("CCC", 'P'),
    ("CCA", 'P'),
    ("CCG", 'P'),
    ("ACT", 'T'), // Threonine
    ("ACC", 'T'),
    ("ACA", 'T'),
    ("ACG", 'T'),
    ("GCT", 'A'), // Alanine
    ("GCC", 'A'),
    ("GCA", 'A'),
    ("GCG", 'A'),
    ("TAT", 'Y'), // Tyrosine
    ("TAC", 'Y'),
    ("TAA", '*'), // Stop
    ("TAG", '*'),
    ("CAT", 'H'), // Histidine
    ("CAC", 'H'),
    ("CAA", 'Q'), // Glutamine
    ("CAG", 'Q'),
    ("AAT", 'N'), // Asparagine
    ("AAC", 'N'),
    ("AAA", 'K'), // Lysine
    ("AAG", 'K'),
    ("GAT", 'D'), // Aspartic acid
    ("GAC", 'D'),
    ("GAA", 'E'), // Glutamic acid
    ("GAG", 'E'),
    ("TGT", 'C'), // Cysteine
    ("TGC", 'C'),
    ("TGA", '*'), // Stop
    ("TGG", 'W'), // Tryptophan
    ("CGT", 'R'), // Arginine
    ("CGC", 'R'),
    ("CGA", 'R'),
    ("CGG", 'R'),
    ("AGT", 'S'), // Serine
    ("AGC", 'S'),
    ("AGA", 'R'), // Arginine again
    ("AGG", 'R'),
    ("GGT", 'G'), // Glycine
    ("GGC", 'G'),
    ("GGA", 'G'),
    ("GGG", 'G'),
];

/// Host codon usage, occurrences per thousand codons.
const USAGE_PER_THOUSAND: [(&str, f64); 64] = [
    ("TTT", 17.6),
    ("TCT", 15.2),
    ("TAT", 12.2),
    ("TGT", 10.6),
    ("TTC", 20.3),
    ("TCC", 17.7),
    ("TAC", 15.3),
    ("TGC", 12.6),
    ("TTA", 7.7),
    ("TCA", 12.2),
    ("TAA", 1.0),
    ("TGA", 1.6),
    ("TTG", 12.9),
    ("TCG", 4.4),
    ("TAG", 0.8),
    ("TGG", 13.2),
    ("CTT", 13.2),
    ("CCT", 17.5),
    ("CAT", 10.9),
    ("CGT", 4.5),
    ("CTC", 19.6),
    ("CCC", 19.8),
    ("CAC", 15.1),
    ("CGC", 10.4),
    ("CTA", 7.2),
    ("CCA", 16.9),
    ("CAA", 12.3),
    ("CGA", 6.2),
    ("CTG", 39.6),
    ("CCG", 6.9),
    ("CAG", 34.2),
    ("CGG", 11.4),
    ("ATT", 16.0),
    ("ACT", 13.1),
    ("AAT", 17.0),
    ("AGT", 12.1),
    ("ATC", 20.8),
    ("ACC", 18.9),
    ("AAC", 19.1),
    ("AGC", 19.5),
    ("ATA", 7.5),
    ("ACA", 15.1),
    ("AAA", 24.4),
    ("AGA", 12.2),
    ("ATG", 22.0),
    ("ACG", 6.1),
    ("AAG", 31.9),
    ("AGG", 12.0),
    ("GTT", 11.0),
    ("GCT", 18.4),
    ("GAT", 21.8),
    ("GGT", 10.8),
    ("GTC", 14.5),
    ("GCC", 27.7),
    ("GAC", 25.1),
    ("GGC", 22.2),
    ("GTA", 7.1),
    ("GCA", 15.8),
    ("GAA", 29.0),
    ("GGA", 16.5),
    ("GTG", 28.1),
    ("GCG", 7.4),
    ("GAG", 39.6),
    ("GGG", 16.5),
];

/// Frequency rank of every codon within its synonymous group, built once
/// at first use and immutable afterwards.
static RANK_TABLE: LazyLock<HashMap<&'static str, u32>> = LazyLock::new(build_rank_table);

fn build_rank_table() -> HashMap<&'static str, u32> {
    let usage: HashMap<&str, f64> = USAGE_PER_THOUSAND.iter().copied().collect();

    let mut groups: HashMap<char, Vec<&'static str>> = HashMap::new();
    for (codon, amino_acid) in GENETIC_CODE {
        groups.entry(amino_acid).or_default().push(codon);
    }

    let mut ranks = HashMap::with_capacity(GENETIC_CODE.len());
    for members in groups.values() {
        let mut by_usage: Vec<(f64, &str)> =
            members.iter().map(|c| (usage[c], *c)).collect();
        // Rank ascending by frequency; ties break on the codon string so
        // the ordering is total.
        by_usage.sort_by(|(fa, ca), (fb, cb)| {
            fa.partial_cmp(fb)
                .expect("usage frequencies are finite")
                .then(ca.cmp(cb))
        });
        for (rank, (_, codon)) in by_usage.into_iter().enumerate() {
            ranks.insert(codon, rank as u32);
        }
    }
    ranks
}

/// Frequency rank of a single codon within its synonymous group.
pub fn rank(codon: &str) -> Option<u32> {
    RANK_TABLE.get(codon).copied()
}

/// Sum the usage ranks of the codons in `pattern`, read in the offset-2
/// frame. Sequences too short for a complete codon in that frame score 0.
///
/// The scorer assumes clean input: any three bytes that are not one of
/// the 64 codons are a fatal error.
pub fn score(pattern: &str) -> Result<u32, CodonError> {
    let bytes = pattern.as_bytes();
    let mut total = 0;
    let mut offset = FRAME_OFFSET;
    while offset + 3 <= bytes.len() {
        let chunk = &bytes[offset..offset + 3];
        let rank = std::str::from_utf8(chunk)
            .ok()
            .and_then(|codon| RANK_TABLE.get(codon))
            .ok_or_else(|| CodonError::UndefinedCodon {
                codon: String::from_utf8_lossy(chunk).into_owned(),
                offset,
            })?;
        total += rank;
        offset += 3;
    }
    Ok(total)
}
