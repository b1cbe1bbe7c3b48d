use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use homscan::enrich::display_name;
use homscan::filter::standard_filters;
use homscan::report::{
    baseline_survey, cutoff_ids, enrichment_line, format_record, format_sig,
    motif_distribution, unique_by,
};
use homscan::{
    codon, read_insertions, read_matches, Analysis, AnalysisConfig, Filter,
    HighHomologySet, SortKey,
};

#[derive(Parser, Debug)]
#[command(name = "homscan", about = "Insertion-homology enrichment engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Filter match records and report homology enrichment against the
    /// reference baselines.
    Analyse {
        /// Match table.
        #[arg(short, long, default_value = "matches.txt")]
        matches: PathBuf,
        /// Insertion table.
        #[arg(short, long, default_value = "insertion-data.txt")]
        insertions: PathBuf,
        /// Optional filter letters: u recurrence, s strict recurrence,
        /// h high-homology id list, 3 multiple-of-three, a spread,
        /// o recurrence-or-spread.
        #[arg(short = 'f', long, default_value = "u")]
        optional_filters: String,
        /// Primary sort key for the record listing.
        #[arg(short, long, value_enum, default_value = "homology")]
        sort_by: SortArg,
        /// Organism restriction for the sweep: all, all_act, or one name.
        #[arg(short, long, default_value = "all")]
        which: String,
        /// Print the ids of leading records with at least this much
        /// homology instead of the record listing.
        #[arg(short, long, default_value_t = 0)]
        gte: u32,
        /// Id list for the high-homology filter.
        #[arg(long, default_value = "high-human.txt")]
        high_homology_ids: PathBuf,
        /// Motif counted over the filtered insertions.
        #[arg(long, default_value = "CGGCGG")]
        motif: String,
    },
    /// Recompute enrichment over a grid of recurrence and spread minimums.
    Sensitivity {
        /// Match table.
        #[arg(short, long, default_value = "matches.txt")]
        matches: PathBuf,
    },
    /// Score patterns by host codon usage.
    Score {
        /// Patterns to score.
        #[arg(required = true)]
        patterns: Vec<String>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum SortArg {
    /// Total homology, descending.
    Homology,
    /// Expected occurrences, ascending.
    E,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Homology => SortKey::Homology,
            SortArg::E => SortKey::ExpectedOccurrence,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Analyse {
            matches,
            insertions,
            optional_filters,
            sort_by,
            which,
            gte,
            high_homology_ids,
            motif,
        } => run_analyse(
            matches,
            insertions,
            &optional_filters,
            sort_by.into(),
            &which,
            gte,
            &high_homology_ids,
            &motif,
        )?,
        Commands::Sensitivity { matches } => run_sensitivity(&matches)?,
        Commands::Score { patterns } => run_score(&patterns)?,
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_analyse(
    matches_path: PathBuf,
    insertions_path: PathBuf,
    optional_filters: &str,
    sort_key: SortKey,
    which: &str,
    gte: u32,
    high_homology_ids: &Path,
    motif: &str,
) -> Result<()> {
    let insertions = read_insertions(&insertions_path).with_context(|| {
        format!("failed to read insertions from {}", insertions_path.display())
    })?;

    let distribution = motif_distribution(&insertions, motif);
    match distribution.per_million {
        Some(per_million) => println!(
            "{} out of {} contain {} ({:.2} per million nts)",
            distribution.occurrences, distribution.insertions, motif, per_million
        ),
        None => println!("no nucleotides surveyed for {}", motif),
    }
    println!();

    let matches = read_matches(&matches_path)
        .with_context(|| format!("failed to read matches from {}", matches_path.display()))?;

    let mut filters = standard_filters();
    for letter in optional_filters.chars() {
        match letter {
            'u' => filters.push(Filter::min_recurrence()),
            's' => filters.push(Filter::strict_min_recurrence()),
            'h' => {
                let set = HighHomologySet::from_path(high_homology_ids).with_context(|| {
                    format!(
                        "failed to load high-homology ids from {}",
                        high_homology_ids.display()
                    )
                })?;
                filters.push(Filter::HighHomology(set));
            }
            '3' => filters.push(Filter::MultipleOfThree),
            'a' => filters.push(Filter::min_spread()),
            'o' => filters.push(Filter::recurrence_or_spread(5)),
            other => bail!("unknown optional filter '{}'", other),
        }
    }

    let names: Vec<String> = match which {
        "all" => Vec::new(),
        "all_act" => ["AVisc", "ANaesl", "AIsrael"]
            .into_iter()
            .map(String::from)
            .collect(),
        name => vec![name.to_string()],
    };

    let organism = organism_heading(&matches_path);
    let heading = organism.clone();

    let config = AnalysisConfig {
        filters,
        sort_key,
        names,
        organism,
    };
    let result = Analysis::new(config).run(insertions, matches)?;

    let census = &result.insertion_census;
    println!(
        "{} in host, {} in reference, {} unmatched out of total {}",
        census.in_host, census.in_reference, census.unmatched, census.total
    );
    println!(
        "Before filters: {}. After filters: {}",
        census.total, census.filtered
    );
    println!();

    let match_census = &result.match_census;
    println!(
        "{} matches from {} individual insertions. {} matches and {} insertions have high homology",
        match_census.matches,
        match_census.insertions,
        match_census.high_homology_matches,
        match_census.high_homology_insertions
    );
    for (id, count) in &match_census.recurrence {
        println!("{}: {}", id, count);
    }
    println!();

    if gte > 0 {
        let ids = cutoff_ids(&result.records, sort_key, gte)?;
        for id in ids {
            println!("{}", id);
        }
        return Ok(());
    }

    for record in unique_by(result.records.iter(), |r| r.full_match.as_str()) {
        println!(
            "{} {}",
            format_record(record),
            record.e_value * result.normalization as f64
        );
    }
    println!();

    match heading.as_deref() {
        Some(organism) => println!("Homology enrichment ({})", display_name(organism)),
        None => println!("Homology enrichment (all organisms)"),
    }
    for row in &result.enrichment {
        println!("n={}", row.minimum);
        for reference in &row.references {
            println!("{}", enrichment_line(reference));
        }
        println!();
    }

    println!("total matches / E");
    for score in &result.organisms {
        println!("{} {}", score.organism, score.score);
    }

    Ok(())
}

/// Organism heading inferred from a `<organism>-matches.txt` file name.
fn organism_heading(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_suffix("-matches.txt"))
        .map(String::from)
}

fn run_sensitivity(matches_path: &Path) -> Result<()> {
    let matches = read_matches(matches_path)
        .with_context(|| format!("failed to read matches from {}", matches_path.display()))?;

    let tables = homscan::enrich::sensitivity_tables(&matches)
        .context("sensitivity grid computation failed")?;

    for table in &tables {
        println!("Minimum homology length={}:", table.minimum);
        println!("min at this pos \\ min seqs: 0..4");
        for recurrence in 0..=4u32 {
            let cells: Vec<String> = table
                .cells
                .iter()
                .filter(|cell| cell.min_recurrence == recurrence)
                .map(|cell| {
                    format!(
                        "OR={:.2} p={}",
                        cell.test.odds_ratio,
                        format_sig(cell.test.p_value, 2)
                    )
                })
                .collect();
            println!("{}\t{}", recurrence, cells.join("\t"));
        }
        println!();
    }

    println!("Occurrences by minimum matching nucleotides (cross-species / same-host):");
    for row in baseline_survey().context("baseline survey lookup failed")? {
        println!(
            "{}: {}/{} {}/{}",
            row.minimum,
            row.cross_species.0,
            row.cross_species.1,
            row.same_host.0,
            row.same_host.1
        );
    }

    Ok(())
}

fn run_score(patterns: &[String]) -> Result<()> {
    for pattern in patterns {
        let score = codon::score(pattern)
            .with_context(|| format!("failed to score pattern '{}'", pattern))?;
        println!("{} {}", pattern, score);
    }
    Ok(())
}
