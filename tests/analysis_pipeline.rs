//! End-to-end pipeline tests: parse, filter, enrich, report.

use std::io::Cursor;

use homscan::enrich::{count_homology, homology_sweep};
use homscan::record::RecordReader;
use homscan::report::{format_record, unique_by};
use homscan::{Analysis, AnalysisConfig, Filter, Insertion, Match, SortKey};

use test_helpers::*;

fn close(x: f64, y: f64, rel: f64) -> bool {
    (x - y).abs() <= rel * y.abs()
}

/// Ten records, four of which carry at least 3 nucleotides of homology.
fn ten_record_set() -> Vec<Match> {
    let mut records = Vec::new();
    for i in 0..10u32 {
        let record = make_match(i, "ANaesl", "CTCCTCGGCGGG");
        let record = if i < 4 {
            with_homology(record, 2, 1)
        } else {
            with_homology(record, 1, 0)
        };
        records.push(record);
    }
    records
}

#[test]
fn enrichment_matches_reference_fisher_implementation() {
    // Against the cross-species survey at n=3: a=4, b=6, c=1312,
    // d=144044-1312. Reference values computed with scipy's
    // fisher_exact(alternative="greater").
    let records = ten_record_set();
    assert_eq!(count_homology(&records, &[], 3), (4, 10));

    let rows = homology_sweep(&records, &[], None).unwrap();
    let row = &rows[0];
    assert_eq!(row.minimum, 3);
    assert_eq!(row.passes, 4);
    assert_eq!(row.total, 10);

    let cod = &row.references[0];
    assert_eq!(cod.baseline, "Cod");
    assert!(close(cod.test.odds_ratio, 72.52642276, 1e-4));
    assert!(close(cod.test.p_value, 1.393593606e-6, 1e-4));
}

#[test]
fn full_run_over_parsed_records() {
    let insertion_table = "\
id pos pattern nseqs in_wh1 in_human num_here strict_num_here num_matches
int int str int bool bool int int int
1 1001 CTCCTCGGCGGG 3 false false 4 2 1
2 220 ACGTACGTACGT 2 true false 2 2 0
3 5000 ACGTGCACGTGC 2 false true 2 2 2
4 0 CTCCTCGGCGGG 2 false false 2 2 0
";
    let match_table = "\
id name pattern forwards full_match seqs num_here strict_num_here pos src_pos in_human in_wh1 forwards_h backwards_h score E hE
int str str bool str int int int int int bool bool int int float float float
1 ANaesl CTCCTCGGCGGG true GGTCTCCTCGGCGGGAT 3 4 2 1001 500 false false 2 2 1.0 0.5 1.0
1 AVisc CTCCTCGGCGGG true - 3 4 2 1001 700 false false 1 0 1.0 0.25 1.0
2 ANaesl ACGTACGTACGT true - 2 2 2 220 100 false true 3 2 1.0 0.5 1.0
5 Delftia CTGGCACGTGCA true - 2 3 2 900 100 false false 4 4 1.0 0.125 1.0
";

    let insertions: Vec<Insertion> = RecordReader::new(Cursor::new(insertion_table))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    let matches: Vec<Match> = RecordReader::new(Cursor::new(match_table))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(insertions.len(), 4);
    assert_eq!(matches.len(), 4);

    let result = Analysis::new(AnalysisConfig::default())
        .run(insertions, matches)
        .unwrap();

    // Record 2 is in the reference assembly, record 5 matches the
    // contaminant; both fall to the standard chain. Insertion 4 sits at
    // position zero.
    assert_eq!(result.insertion_census.total, 4);
    assert_eq!(result.insertion_census.in_reference, 1);
    assert_eq!(result.insertion_census.in_host, 1);
    assert_eq!(result.insertion_census.filtered, 2);
    assert_eq!(result.records.len(), 2);
    assert_eq!(result.match_census.insertions, 1);

    // Homology sort puts the two-sided match first.
    assert_eq!(result.records[0].total_homology(), 4);

    // Both kept matches are ANaesl/AVisc records of insertion 1.
    let organisms: Vec<&str> = result
        .organisms
        .iter()
        .map(|s| s.organism.as_str())
        .collect();
    assert_eq!(organisms, ["AVisc", "ANaesl"]);
    assert!(close(result.organisms[0].score, 4.0, 1e-12));
    assert!(close(result.organisms[1].score, 2.0, 1e-12));

    // Four sweep rows, survey baselines only (no organism selected).
    assert_eq!(result.enrichment.len(), 4);
    assert_eq!(result.enrichment[0].references.len(), 2);
}

#[test]
fn listing_dedups_by_full_match_but_keeps_sentinels() {
    let records = vec![
        {
            let mut m = make_match(1, "ANaesl", "CTCCTCGGCGGG");
            m.full_match = "GGTCTCC".to_string();
            m
        },
        {
            let mut m = make_match(2, "ANaesl", "CTCCTCGGCGGG");
            m.full_match = "GGTCTCC".to_string();
            m
        },
        make_match(3, "ANaesl", "CTCCTCGGCGGG"),
        make_match(4, "ANaesl", "CTCCTCGGCGGG"),
    ];
    let listed: Vec<u32> = unique_by(records.iter(), |r| r.full_match.as_str())
        .map(|r| r.id)
        .collect();
    assert_eq!(listed, [1, 3, 4]);
}

#[test]
fn formatted_lines_round_trip_field_order() {
    let record = with_homology(make_match(12, "ANaesl", "CTCCTCGGCGGG"), 2, 3);
    let line = format_record(&record);
    let mut tokens = line.split_whitespace();
    assert_eq!(tokens.next(), Some("12"));
    assert_eq!(tokens.next(), Some("ANaesl"));
    assert_eq!(tokens.next(), Some("CTCCTCGGCGGG"));
    assert!(line.contains("forwards_h=2"));
    assert!(line.contains("backwards_h=3"));
    assert!(line.ends_with("len=12"));
}

#[test]
fn optional_strict_filter_tightens_the_chain() {
    let mut loose = make_match(1, "ANaesl", "CTCCTCGGCGGG");
    loose.strict_num_here = 1;
    let strict = make_match(2, "ANaesl", "CTCCTCGGCGGG");

    let mut config = AnalysisConfig::default();
    config.filters.push(Filter::strict_min_recurrence());
    let result = Analysis::new(config)
        .run(Vec::new(), vec![loose, strict])
        .unwrap();
    assert_eq!(result.records.len(), 1);
    assert_eq!(result.records[0].id, 2);
}

#[test]
fn expected_occurrence_sort_uses_the_insertion_count() {
    let mut cheap = make_match(1, "ANaesl", "CTCCTCGGCGGG");
    cheap.e_value = 0.75;
    let mut rare = make_match(2, "ANaesl", "CTCCTCGGCGGG");
    rare.e_value = 0.05;

    let insertions = vec![
        make_insertion(1, "CTCCTCGGCGGG"),
        make_insertion(2, "ACGTGCACGTGC"),
    ];

    let config = AnalysisConfig {
        sort_key: SortKey::ExpectedOccurrence,
        ..AnalysisConfig::default()
    };
    let result = Analysis::new(config)
        .run(insertions, vec![cheap, rare])
        .unwrap();
    assert_eq!(result.normalization, 2);
    assert_eq!(result.records[0].id, 2);
}
