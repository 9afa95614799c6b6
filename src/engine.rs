//! Engine: a single forward pass over a breach-search CSV export that resolves
//! the header columns, collects distinct breach names, and ranks
//! `name <email>` candidates into a bounded, deduplicated excerpt.
//!
//! Typical usage:
//!
//! ```no_run
//! use dehashed_excerpt::engine::{Engine, Options};
//! # fn main() -> anyhow::Result<()> {
//! let mut engine = Engine::new(Options::default());
//! engine.load_from_path("/path/to/results.csv")?;
//! println!("{}", dehashed_excerpt::report::render_report(&engine, false));
//! # Ok(())
//! # }
//! ```
use std::borrow::Cow;
use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;

use csv::{ByteRecord, ReaderBuilder};
use encoding_rs::{Encoding, UTF_8};
use log::{debug, info, warn};

use crate::columns::{ColumnMap, Overrides};
use crate::dialect::{self, Delimiter, DelimiterSpec};
use crate::entry::{Entry, build_name, field};
use crate::export::Summary;
use crate::io::{
    DEFAULT_MMAP_THRESHOLD_BYTES, SNIFF_PREFIX_BYTES, SkipInitialSpace, Source, decode_field,
    open_auto, take_prefix,
};
use crate::stats::ScanStats;

#[derive(Debug, thiserror::Error)]
pub enum ExcerptError {
    #[error("cannot open input {path}: {cause:#}")]
    Open { path: String, cause: anyhow::Error },
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV header parse failed: {0}")]
    Header(#[source] csv::Error),
    #[error("read error after data row {row}: {source}")]
    Scan { row: usize, source: csv::Error },
}

impl ExcerptError {
    /// Process exit status the CLI reports for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            ExcerptError::Header(_) => 3,
            _ => 2,
        }
    }
}

/// Knobs for a single run.
#[derive(Debug, Clone)]
pub struct Options {
    pub limit: usize,
    pub overrides: Overrides,
    pub encoding: &'static Encoding,
    pub delimiter: DelimiterSpec,
    pub prefer_domain: Option<String>,
    pub mmap_threshold: u64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            limit: 10,
            overrides: Overrides::default(),
            encoding: UTF_8,
            delimiter: DelimiterSpec::Auto,
            prefer_domain: None,
            mmap_threshold: DEFAULT_MMAP_THRESHOLD_BYTES,
        }
    }
}

/// Why an excerpt came out the way it did; drives the report placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExcerptStatus {
    EmptyFile,
    NoEmailColumn,
    NoRowsWithEmail,
    Entries,
}

/// Holds the options and the result of the most recent load.
#[derive(Debug, Default)]
pub struct Engine {
    pub options: Options,
    pub excerpt: Vec<String>,
    pub breaches: HashSet<String>,
    /// `None` until a header row has been read.
    pub columns: Option<ColumnMap>,
    pub delimiter: Option<Delimiter>,
    pub parse_stats: ScanStats,
}

impl Engine {
    pub fn new(options: Options) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Load CSV text already in memory. Intended for tests and small
    /// programmatic integrations.
    pub fn load_from_str(&mut self, contents: &str) -> Result<(), ExcerptError> {
        self.load_from_reader(Box::new(Cursor::new(contents.as_bytes().to_vec())))
    }

    /// Open `path` (memory-mapped above the configured threshold) and load it.
    pub fn load_from_path<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ExcerptError> {
        let threshold = if self.options.mmap_threshold == 0 {
            u64::MAX
        } else {
            self.options.mmap_threshold
        };
        let source = open_auto(&path, threshold).map_err(|cause| ExcerptError::Open {
            path: path.as_ref().display().to_string(),
            cause,
        })?;
        self.load_from_reader(source)
    }

    /// Sniff the delimiter from the prefix of `source`, then stream every row.
    pub fn load_from_reader(&mut self, source: Source) -> Result<(), ExcerptError> {
        self.excerpt.clear();
        self.breaches.clear();
        self.columns = None;
        self.parse_stats = ScanStats::default();

        let (sample, source, truncated) = take_prefix(source, SNIFF_PREFIX_BYTES)?;
        let delimiter = dialect::resolve(self.options.delimiter, &sample, truncated);
        info!("delimiter: {}", delimiter);
        self.delimiter = Some(delimiter);

        let mut rdr = ReaderBuilder::new()
            .delimiter(delimiter.byte)
            .has_headers(false)
            .flexible(true)
            .double_quote(true)
            .from_reader(SkipInitialSpace::new(source, delimiter.byte));
        let encoding = self.options.encoding;

        let mut record = ByteRecord::new();
        match rdr.read_byte_record(&mut record) {
            Ok(true) => {}
            Ok(false) => {
                info!("input is empty; nothing to excerpt");
                return Ok(());
            }
            Err(e) => return Err(ExcerptError::Header(e)),
        }
        let header: Vec<Cow<'_, str>> = record
            .iter()
            .map(|raw| decode_field(raw, encoding).0)
            .collect();
        let cols = ColumnMap::resolve(&header, &self.options.overrides);
        drop(header);
        debug!("resolved columns: {:?}", cols);
        if cols.email.is_none() {
            warn!("no email column found; excerpt will be empty");
        }
        self.columns = Some(cols);

        let preferred = self
            .options
            .prefer_domain
            .as_deref()
            .map(|d| d.trim().to_lowercase())
            .filter(|d| !d.is_empty());

        let mut candidates: HashSet<Entry> = HashSet::new();
        let mut stats = ScanStats::default();
        // A flexible byte-record reader only fails on I/O; ragged rows and
        // stray quotes are absorbed by the parser.
        loop {
            match rdr.read_byte_record(&mut record) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    return Err(ExcerptError::Scan {
                        row: stats.rows,
                        source: e,
                    });
                }
            }
            stats.rows += 1;

            let row: Vec<Cow<'_, str>> = record
                .iter()
                .map(|raw| {
                    let (text, had_errors) = decode_field(raw, encoding);
                    if had_errors {
                        stats.decode_errors += 1;
                    }
                    text
                })
                .collect();

            // Breaches count regardless of whether the row has an email.
            let breach = field(&row, cols.breach);
            if !breach.is_empty() && !self.breaches.contains(breach) {
                self.breaches.insert(breach.to_string());
            }

            let email = field(&row, cols.email);
            if email.is_empty() {
                continue;
            }
            let name = build_name(&row, &cols);
            let entry = Entry::new(email, &name, preferred.as_deref(), stats.rows_with_email);
            stats.rows_with_email += 1;
            let outranked = candidates
                .get(&entry)
                .is_some_and(|existing| existing.rank <= entry.rank);
            if !outranked {
                candidates.replace(entry);
            }
        }

        let mut ranked: Vec<Entry> = candidates.into_iter().collect();
        ranked.sort_by_key(|e| e.rank);
        self.excerpt = ranked
            .into_iter()
            .take(self.options.limit)
            .map(|e| e.display)
            .collect();
        self.parse_stats = stats;
        Ok(())
    }

    pub fn breach_count(&self) -> usize {
        self.breaches.len()
    }

    pub fn status(&self) -> ExcerptStatus {
        if !self.excerpt.is_empty() {
            return ExcerptStatus::Entries;
        }
        match self.columns {
            None => ExcerptStatus::EmptyFile,
            Some(cols) if cols.email.is_none() => ExcerptStatus::NoEmailColumn,
            Some(_) => ExcerptStatus::NoRowsWithEmail,
        }
    }

    pub fn summary(&self) -> Summary {
        Summary {
            excerpt: self.excerpt.clone(),
            breached_databases: self.breach_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(contents: &str, options: Options) -> Engine {
        let mut e = Engine::new(options);
        e.load_from_str(contents).unwrap();
        e
    }

    #[test]
    fn dedups_and_counts_breaches() {
        let csv = "email,first_name,last_name,breach\n\
                   a@x.com,Ann,Lee,LinkedIn\n\
                   b@x.com,,,Dropbox\n\
                   a@x.com,Ann,Lee,Adobe\n";
        let e = run(csv, Options::default());
        assert_eq!(e.excerpt, vec!["Ann Lee <a@x.com>", "b@x.com"]);
        assert_eq!(e.breach_count(), 3);
        assert_eq!(e.status(), ExcerptStatus::Entries);
        assert_eq!(e.parse_stats.rows, 3);
        assert_eq!(e.parse_stats.rows_with_email, 3);
    }

    #[test]
    fn header_only_has_no_rows() {
        let e = run("name,mail\n", Options::default());
        assert!(e.excerpt.is_empty());
        assert_eq!(e.breach_count(), 0);
        assert_eq!(e.status(), ExcerptStatus::NoRowsWithEmail);
    }

    #[test]
    fn empty_input_is_not_an_error() {
        let e = run("", Options::default());
        assert!(e.excerpt.is_empty());
        assert_eq!(e.breach_count(), 0);
        assert_eq!(e.status(), ExcerptStatus::EmptyFile);
    }

    #[test]
    fn breaches_counted_without_email_column() {
        let csv = "username,source\nann,Adobe\nbo, Adobe \ncy,Canva\ndee,\n";
        let e = run(csv, Options::default());
        assert!(e.excerpt.is_empty());
        assert_eq!(e.breach_count(), 2);
        assert_eq!(e.status(), ExcerptStatus::NoEmailColumn);
    }

    #[test]
    fn breaches_counted_on_rows_without_email() {
        let csv = "email,breach\n,Adobe\nz@y.org,Canva\n";
        let e = run(csv, Options::default());
        assert_eq!(e.excerpt, vec!["z@y.org"]);
        assert_eq!(e.breach_count(), 2);
    }

    #[test]
    fn preferred_domain_then_named_then_order() {
        let csv = "email,name\n\
                   a@free.com,Ann\n\
                   b@corp.com,\n\
                   c@free.com,\n\
                   d@CORP.com,Dee\n";
        let opts = Options {
            prefer_domain: Some("Corp.com".into()),
            ..Default::default()
        };
        let e = run(csv, opts);
        assert_eq!(
            e.excerpt,
            vec!["Dee <d@CORP.com>", "b@corp.com", "Ann <a@free.com>", "c@free.com"]
        );
    }

    #[test]
    fn limit_bounds_excerpt() {
        let csv = "email\na@x.com\nb@x.com\nc@x.com\n";
        let e = run(csv, Options { limit: 2, ..Default::default() });
        assert_eq!(e.excerpt, vec!["a@x.com", "b@x.com"]);
        let e = run(csv, Options { limit: 0, ..Default::default() });
        assert!(e.excerpt.is_empty());
    }

    #[test]
    fn duplicate_keeps_best_rank() {
        // the unnamed row comes first but the named duplicate outranks it
        let csv = "email,name\nq@x.com,\nz@x.com,Zed\nq@x.com,\n";
        let e = run(csv, Options::default());
        assert_eq!(e.excerpt, vec!["Zed <z@x.com>", "q@x.com"]);
    }

    #[test]
    fn ragged_rows_are_tolerated() {
        let csv = "breach,name,email\nAdobe\nCanva,Bo\nDropbox,Cy,c@x.com,extra\n";
        let e = run(csv, Options::default());
        assert_eq!(e.excerpt, vec!["Cy <c@x.com>"]);
        assert_eq!(e.breach_count(), 3);
        assert_eq!(e.parse_stats.rows, 3);
        assert_eq!(e.parse_stats.rows_with_email, 1);
    }

    #[test]
    fn quoted_multiline_fields() {
        let csv = "email;name;breach\n\"a@x.com\";\"Lee;\nAnn\";\"Adobe\"\nb@x.com;Bo;Canva\n";
        let e = run(csv, Options::default());
        assert_eq!(e.delimiter.map(|d| d.byte), Some(b';'));
        assert_eq!(e.excerpt, vec!["Lee;\nAnn <a@x.com>", "Bo <b@x.com>"]);
        assert_eq!(e.breach_count(), 2);
    }

    #[test]
    fn timestamp_columns_keep_comma_delimiter() {
        let mut csv = String::from("email,breach,created_at,updated_at\n");
        for i in 0..12 {
            csv.push_str(&format!(
                "u{i}@x.com,Adobe,2024-01-01T12:00:00Z,2024-02-01T08:30:00Z\n"
            ));
        }
        let e = run(&csv, Options { limit: 3, ..Default::default() });
        assert_eq!(e.delimiter.map(|d| d.byte), Some(b','));
        assert_eq!(e.status(), ExcerptStatus::Entries);
        assert_eq!(e.excerpt, vec!["u0@x.com", "u1@x.com", "u2@x.com"]);
        assert_eq!(e.breach_count(), 1);
    }

    #[test]
    fn space_before_quoted_field_is_skipped() {
        let csv = "email, name, breach\na@x.com, \"Lee, Ann\", Adobe\nb@x.com, Bo, Canva\n";
        let e = run(csv, Options::default());
        assert_eq!(e.delimiter.map(|d| d.byte), Some(b','));
        assert_eq!(e.excerpt, vec!["Lee, Ann <a@x.com>", "Bo <b@x.com>"]);
        assert_eq!(e.breach_count(), 2);
    }

    #[test]
    fn explicit_overrides_are_used() {
        let csv = "contact,who,db\na@x.com,Ann,Adobe\n";
        let opts = Options {
            overrides: Overrides {
                email: Some("CONTACT".into()),
                name: Some("who".into()),
                breach: Some("db".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let e = run(csv, opts);
        assert_eq!(e.excerpt, vec!["Ann <a@x.com>"]);
        assert_eq!(e.breach_count(), 1);
    }

    #[test]
    fn manual_delimiter_and_latin1() {
        let bytes = b"email|name\nj@x.com|Jos\xE9\n".to_vec();
        let opts = Options {
            delimiter: DelimiterSpec::Manual(b'|'),
            encoding: crate::io::encoding_for_label("latin-1").unwrap(),
            ..Default::default()
        };
        let mut e = Engine::new(opts);
        e.load_from_reader(Box::new(Cursor::new(bytes))).unwrap();
        assert_eq!(e.excerpt, vec!["José <j@x.com>"]);
        assert_eq!(e.parse_stats.decode_errors, 0);
    }

    #[test]
    fn invalid_utf8_is_replaced_and_counted() {
        let bytes = b"email,name\nj@x.com,Jos\xE9\n".to_vec();
        let mut e = Engine::new(Options::default());
        e.load_from_reader(Box::new(Cursor::new(bytes))).unwrap();
        assert_eq!(e.excerpt, vec!["Jos\u{FFFD} <j@x.com>"]);
        assert_eq!(e.parse_stats.decode_errors, 1);
    }

    #[test]
    fn missing_file_reports_open_error() {
        let mut e = Engine::new(Options::default());
        let err = e
            .load_from_path("/definitely/not/here.csv")
            .unwrap_err();
        assert!(matches!(err, ExcerptError::Open { .. }));
        assert_eq!(err.exit_code(), 2);
    }

    /// Yields `good` bytes of header text, then fails.
    struct FailAfter {
        good: usize,
    }

    impl std::io::Read for FailAfter {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.good == 0 {
                return Err(std::io::Error::other("disk went away"));
            }
            let n = buf.len().min(self.good);
            buf[..n].fill(b'h');
            self.good -= n;
            Ok(n)
        }
    }

    #[test]
    fn header_read_failure_is_fatal_with_status_3() {
        let mut e = Engine::new(Options::default());
        let src = FailAfter {
            good: SNIFF_PREFIX_BYTES + 10,
        };
        let err = e.load_from_reader(Box::new(src)).unwrap_err();
        assert!(matches!(err, ExcerptError::Header(_)));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn read_failure_mid_scan_is_fatal_with_status_2() {
        use std::io::Read;
        let mut head = b"email\na@x.com\n".to_vec();
        head.resize(SNIFF_PREFIX_BYTES + 64, b'x');
        let src = Cursor::new(head).chain(FailAfter { good: 0 });
        let mut e = Engine::new(Options::default());
        let err = e.load_from_reader(Box::new(src)).unwrap_err();
        assert!(matches!(err, ExcerptError::Scan { row: 1, .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn reload_resets_previous_results() {
        let mut e = Engine::new(Options::default());
        e.load_from_str("email,breach\na@x.com,Adobe\n").unwrap();
        e.load_from_str("").unwrap();
        assert!(e.excerpt.is_empty());
        assert_eq!(e.breach_count(), 0);
        assert_eq!(e.status(), ExcerptStatus::EmptyFile);
    }
}
