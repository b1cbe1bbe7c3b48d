use std::fs::File;
use std::io::{BufRead, BufReader};
use std::marker::PhantomData;
use std::path::Path;

use super::{FieldKind, Insertion, Match, ParseError, Schema};

/// One whitespace-split data row, checked against the schema width.
#[derive(Debug)]
pub struct Row<'a> {
    tokens: Vec<&'a str>,
    line: usize,
}

impl<'a> Row<'a> {
    fn split(text: &'a str, line: usize, schema: &Schema) -> Result<Self, ParseError> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.len() < schema.len() {
            return Err(ParseError::ShortRow {
                line,
                expected: schema.len(),
                found: tokens.len(),
            });
        }
        Ok(Self { tokens, line })
    }

    fn bad(&self, column: &'static str, kind: FieldKind, idx: usize) -> ParseError {
        ParseError::BadField {
            line: self.line,
            column,
            kind,
            value: self.tokens[idx].to_string(),
        }
    }

    /// Decode an integer column.
    pub fn int(&self, idx: usize, column: &'static str) -> Result<u32, ParseError> {
        self.tokens[idx]
            .parse()
            .map_err(|_| self.bad(column, FieldKind::Int, idx))
    }

    /// Decode a float column.
    pub fn float(&self, idx: usize, column: &'static str) -> Result<f64, ParseError> {
        self.tokens[idx]
            .parse()
            .map_err(|_| self.bad(column, FieldKind::Float, idx))
    }

    /// Decode a bool column: case-insensitive `true` or `false`, nothing else.
    pub fn boolean(&self, idx: usize, column: &'static str) -> Result<bool, ParseError> {
        let token = self.tokens[idx];
        if token.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if token.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(self.bad(column, FieldKind::Bool, idx))
        }
    }

    /// Take a string column as-is.
    pub fn string(&self, idx: usize) -> String {
        self.tokens[idx].to_string()
    }
}

/// A record kind that can be decoded from schema-described rows.
///
/// The plan is built once per file from the header schema and reused for
/// every row, replacing per-row dynamic field interpretation.
pub trait Decode: Sized {
    /// Column indices resolved for this record kind.
    type Plan;

    /// Resolve the columns this kind needs, checking declared types.
    fn plan(schema: &Schema) -> Result<Self::Plan, ParseError>;

    /// Decode one row using a previously built plan.
    fn decode(plan: &Self::Plan, row: &Row<'_>) -> Result<Self, ParseError>;
}

/// Resolved column indices for the insertion table.
#[derive(Debug, Clone)]
pub struct InsertionPlan {
    id: usize,
    pos: usize,
    pattern: usize,
    nseqs: usize,
    in_wh1: usize,
    in_human: usize,
    num_here: usize,
    strict_num_here: usize,
    num_matches: usize,
}

impl Decode for Insertion {
    type Plan = InsertionPlan;

    fn plan(schema: &Schema) -> Result<Self::Plan, ParseError> {
        Ok(InsertionPlan {
            id: schema.column("id", FieldKind::Int)?,
            pos: schema.column("pos", FieldKind::Int)?,
            pattern: schema.column("pattern", FieldKind::Str)?,
            nseqs: schema.column("nseqs", FieldKind::Int)?,
            in_wh1: schema.column("in_wh1", FieldKind::Bool)?,
            in_human: schema.column("in_human", FieldKind::Bool)?,
            num_here: schema.column("num_here", FieldKind::Int)?,
            strict_num_here: schema.column("strict_num_here", FieldKind::Int)?,
            num_matches: schema.column("num_matches", FieldKind::Int)?,
        })
    }

    fn decode(plan: &Self::Plan, row: &Row<'_>) -> Result<Self, ParseError> {
        Ok(Insertion {
            id: row.int(plan.id, "id")?,
            pos: row.int(plan.pos, "pos")?,
            pattern: row.string(plan.pattern),
            nseqs: row.int(plan.nseqs, "nseqs")?,
            in_wh1: row.boolean(plan.in_wh1, "in_wh1")?,
            in_human: row.boolean(plan.in_human, "in_human")?,
            num_here: row.int(plan.num_here, "num_here")?,
            strict_num_here: row.int(plan.strict_num_here, "strict_num_here")?,
            num_matches: row.int(plan.num_matches, "num_matches")?,
        })
    }
}

/// Resolved column indices for the match table.
#[derive(Debug, Clone)]
pub struct MatchPlan {
    id: usize,
    name: usize,
    pattern: usize,
    forwards: usize,
    full_match: usize,
    seqs: usize,
    num_here: usize,
    strict_num_here: usize,
    pos: usize,
    src_pos: usize,
    in_human: usize,
    in_wh1: usize,
    forwards_h: usize,
    backwards_h: usize,
    score: usize,
    e_value: usize,
    he_value: usize,
}

impl Decode for Match {
    type Plan = MatchPlan;

    fn plan(schema: &Schema) -> Result<Self::Plan, ParseError> {
        Ok(MatchPlan {
            id: schema.column("id", FieldKind::Int)?,
            name: schema.column("name", FieldKind::Str)?,
            pattern: schema.column("pattern", FieldKind::Str)?,
            forwards: schema.column("forwards", FieldKind::Bool)?,
            full_match: schema.column("full_match", FieldKind::Str)?,
            seqs: schema.column("seqs", FieldKind::Int)?,
            num_here: schema.column("num_here", FieldKind::Int)?,
            strict_num_here: schema.column("strict_num_here", FieldKind::Int)?,
            pos: schema.column("pos", FieldKind::Int)?,
            src_pos: schema.column("src_pos", FieldKind::Int)?,
            in_human: schema.column("in_human", FieldKind::Bool)?,
            in_wh1: schema.column("in_wh1", FieldKind::Bool)?,
            forwards_h: schema.column("forwards_h", FieldKind::Int)?,
            backwards_h: schema.column("backwards_h", FieldKind::Int)?,
            score: schema.column("score", FieldKind::Float)?,
            e_value: schema.column("E", FieldKind::Float)?,
            he_value: schema.column("hE", FieldKind::Float)?,
        })
    }

    fn decode(plan: &Self::Plan, row: &Row<'_>) -> Result<Self, ParseError> {
        Ok(Match {
            id: row.int(plan.id, "id")?,
            name: row.string(plan.name),
            pattern: row.string(plan.pattern),
            forwards: row.boolean(plan.forwards, "forwards")?,
            full_match: row.string(plan.full_match),
            seqs: row.int(plan.seqs, "seqs")?,
            num_here: row.int(plan.num_here, "num_here")?,
            strict_num_here: row.int(plan.strict_num_here, "strict_num_here")?,
            pos: row.int(plan.pos, "pos")?,
            src_pos: row.int(plan.src_pos, "src_pos")?,
            in_human: row.boolean(plan.in_human, "in_human")?,
            in_wh1: row.boolean(plan.in_wh1, "in_wh1")?,
            forwards_h: row.int(plan.forwards_h, "forwards_h")?,
            backwards_h: row.int(plan.backwards_h, "backwards_h")?,
            score: row.float(plan.score, "score")?,
            e_value: row.float(plan.e_value, "E")?,
            he_value: row.float(plan.he_value, "hE")?,
        })
    }
}

/// Lazy reader yielding typed records from a two-header table.
///
/// Restartable only by reopening the source.
pub struct RecordReader<K: Decode, R: BufRead> {
    reader: R,
    schema: Schema,
    plan: K::Plan,
    line: usize,
    buf: String,
    _kind: PhantomData<K>,
}

impl<K: Decode, R: BufRead> std::fmt::Debug for RecordReader<K, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordReader")
            .field("schema", &self.schema)
            .field("line", &self.line)
            .finish_non_exhaustive()
    }
}

impl<K: Decode> RecordReader<K, BufReader<File>> {
    /// Open a file and interpret its two header lines.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file))
    }
}

impl<K: Decode, R: BufRead> RecordReader<K, R> {
    /// Wrap a buffered reader positioned at the first header line.
    pub fn new(mut reader: R) -> Result<Self, ParseError> {
        let mut names = String::new();
        if reader.read_line(&mut names)? == 0 {
            return Err(ParseError::MissingHeader("field-name"));
        }
        let mut kinds = String::new();
        if reader.read_line(&mut kinds)? == 0 {
            return Err(ParseError::MissingHeader("type-tag"));
        }

        let schema = Schema::from_headers(names.trim_end(), kinds.trim_end())?;
        let plan = K::plan(&schema)?;
        Ok(Self {
            reader,
            schema,
            plan,
            line: 2,
            buf: String::new(),
            _kind: PhantomData,
        })
    }

    /// Schema interpreted from the header lines.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

impl<K: Decode, R: BufRead> Iterator for RecordReader<K, R> {
    type Item = Result<K, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
            self.line += 1;

            let text = self.buf.trim_end();
            if text.is_empty() {
                continue;
            }

            let item = Row::split(text, self.line, &self.schema)
                .and_then(|row| K::decode(&self.plan, &row));
            return Some(item);
        }
    }
}

/// Read a whole insertion table into memory.
pub fn read_insertions(path: impl AsRef<Path>) -> Result<Vec<Insertion>, ParseError> {
    RecordReader::<Insertion, _>::open(path)?.collect()
}

/// Read a whole match table into memory.
pub fn read_matches(path: impl AsRef<Path>) -> Result<Vec<Match>, ParseError> {
    RecordReader::<Match, _>::open(path)?.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const INSERTION_FILE: &str = "\
id pos pattern nseqs in_wh1 in_human num_here strict_num_here num_matches
int int str int bool bool int int int
7 1001 CTCCTCGGCGGG 3 false false 4 2 1
9 220 ACGTACGTACGT 1 true false 1 1 0
";

    #[test]
    fn reads_insertion_table() {
        let reader =
            RecordReader::<Insertion, _>::new(Cursor::new(INSERTION_FILE)).unwrap();
        let records: Vec<Insertion> = reader.collect::<Result<_, _>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 7);
        assert_eq!(records[0].pattern, "CTCCTCGGCGGG");
        assert!(records[1].in_wh1);
        assert_eq!(records[1].num_matches, 0);
    }

    #[test]
    fn short_row_is_fatal() {
        let text = "id pos pattern nseqs in_wh1 in_human num_here strict_num_here num_matches\n\
                    int int str int bool bool int int int\n\
                    7 1001 CTC\n";
        let mut reader = RecordReader::<Insertion, _>::new(Cursor::new(text)).unwrap();
        let err = reader.next().unwrap().unwrap_err();
        assert!(matches!(
            err,
            ParseError::ShortRow {
                line: 3,
                expected: 9,
                found: 3,
            }
        ));
    }

    #[test]
    fn bool_token_must_be_true_or_false() {
        let text = "id pos pattern nseqs in_wh1 in_human num_here strict_num_here num_matches\n\
                    int int str int bool bool int int int\n\
                    7 1001 CTC 1 yes false 1 1 0\n";
        let mut reader = RecordReader::<Insertion, _>::new(Cursor::new(text)).unwrap();
        let err = reader.next().unwrap().unwrap_err();
        assert!(matches!(err, ParseError::BadField { column: "in_wh1", .. }));
    }

    #[test]
    fn bool_coercion_is_case_insensitive() {
        let text = "id pos pattern nseqs in_wh1 in_human num_here strict_num_here num_matches\n\
                    int int str int bool bool int int int\n\
                    7 1001 CTC 1 TRUE False 1 1 0\n";
        let mut reader = RecordReader::<Insertion, _>::new(Cursor::new(text)).unwrap();
        let rec = reader.next().unwrap().unwrap();
        assert!(rec.in_wh1);
        assert!(!rec.in_human);
    }

    #[test]
    fn missing_column_fails_at_plan_time() {
        let text = "id pos nseqs\nint int int\n";
        let err = RecordReader::<Insertion, _>::new(Cursor::new(text)).unwrap_err();
        assert!(matches!(err, ParseError::MissingColumn("pattern")));
    }

    #[test]
    fn match_table_round_trip() {
        let text = "\
id name pattern forwards full_match seqs num_here strict_num_here pos src_pos in_human in_wh1 forwards_h backwards_h score E hE
int str str bool str int int int int int bool bool int int float float float
12 ANaesl CTGGCGGGCACG true - 4 3 2 8782 102 false false 2 3 1.5 0.25 1.0
";
        let reader = RecordReader::<Match, _>::new(Cursor::new(text)).unwrap();
        let records: Vec<Match> = reader.collect::<Result<_, _>>().unwrap();
        assert_eq!(records.len(), 1);
        let m = &records[0];
        assert_eq!(m.name, "ANaesl");
        assert_eq!(m.full_match, "-");
        assert_eq!(m.total_homology(), 5);
        assert_eq!(m.e_value, 0.25);
        assert_eq!(m.he_value, 1.0);
    }
}
