//! Delimiter selection: parse a user-supplied delimiter, or sniff one from a
//! sample of the input.
//!
//! Sniffing parses the sample once per candidate and keeps the candidates whose
//! header and most records share a field count of two or more. The most
//! consistent candidate wins, then the widest. When none qualify, the
//! candidate that simply occurs most often in the sample wins.
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use csv::ReaderBuilder;

/// Candidate delimiters, in tie-break order.
pub const CANDIDATES: [u8; 5] = [b',', b';', b'\t', b'|', b':'];

/// Share of sampled records that must agree on the modal field count.
const MIN_CONSISTENCY: f64 = 0.9;

#[derive(Debug, thiserror::Error)]
pub enum DelimiterError {
    #[error("delimiter must be 'auto' or a single ASCII character, got {0:?}")]
    Invalid(String),
}

/// What the caller asked for on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelimiterSpec {
    Auto,
    Manual(u8),
}

impl FromStr for DelimiterSpec {
    type Err = DelimiterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(DelimiterSpec::Auto),
            "\\t" | "tab" | "\t" => Ok(DelimiterSpec::Manual(b'\t')),
            other if other.len() == 1 && other.is_ascii() => {
                Ok(DelimiterSpec::Manual(other.as_bytes()[0]))
            }
            other => Err(DelimiterError::Invalid(other.to_string())),
        }
    }
}

/// How the delimiter in use was arrived at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    Sniffed,
    Fallback,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiter {
    pub byte: u8,
    pub detection: Detection,
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let how = match self.detection {
            Detection::Sniffed => "sniffed",
            Detection::Fallback => "fallback",
            Detection::Manual => "manual",
        };
        write!(f, "{:?} ({})", self.byte as char, how)
    }
}

/// Resolve the delimiter for `sample`. `truncated` marks a sample cut short,
/// whose last line is then ignored by the sniffer.
pub fn resolve(spec: DelimiterSpec, sample: &[u8], truncated: bool) -> Delimiter {
    match spec {
        DelimiterSpec::Manual(byte) => Delimiter {
            byte,
            detection: Detection::Manual,
        },
        DelimiterSpec::Auto => match sniff(sample, truncated) {
            Some(byte) => Delimiter {
                byte,
                detection: Detection::Sniffed,
            },
            None => Delimiter {
                byte: most_frequent(sample),
                detection: Detection::Fallback,
            },
        },
    }
}

/// Structural sniff over [`CANDIDATES`]. Returns `None` when no candidate
/// splits the sample into a consistent table of two or more columns.
pub fn sniff(sample: &[u8], truncated: bool) -> Option<u8> {
    let sample = if truncated {
        match memchr::memrchr(b'\n', sample) {
            Some(pos) => &sample[..=pos],
            None => sample,
        }
    } else {
        sample
    };
    if sample.is_empty() {
        return None;
    }

    let mut best: Option<(Fit, u8)> = None;
    for &delim in &CANDIDATES {
        let Some(fit) = uniform_width(sample, delim) else {
            continue;
        };
        // strict `>` keeps the earlier candidate on ties
        if best.is_none_or(|(b, _)| fit.beats(&b)) {
            best = Some((fit, delim));
        }
    }
    best.map(|(_, d)| d)
}

/// How well one candidate splits the sample into a table.
#[derive(Debug, Clone, Copy)]
struct Fit {
    width: usize,
    hits: usize,
    total: usize,
}

impl Fit {
    fn beats(&self, other: &Fit) -> bool {
        // hits/total compared without floating point
        let mine = self.hits * other.total;
        let theirs = other.hits * self.total;
        mine > theirs || (mine == theirs && self.width > other.width)
    }
}

fn uniform_width(sample: &[u8], delim: u8) -> Option<Fit> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(delim)
        .has_headers(false)
        .flexible(true)
        .from_reader(sample);
    let mut widths: HashMap<usize, usize> = HashMap::new();
    let mut header_width = None;
    let mut total = 0usize;
    for rec in rdr.byte_records() {
        let Ok(rec) = rec else { return None };
        header_width.get_or_insert(rec.len());
        *widths.entry(rec.len()).or_default() += 1;
        total += 1;
    }
    let (&width, &hits) = widths
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))?;
    if width < 2
        || header_width != Some(width)
        || (hits as f64) < MIN_CONSISTENCY * total as f64
    {
        return None;
    }
    Some(Fit { width, hits, total })
}

/// Raw-count fallback. Defaults to `,` for an empty sample or when no
/// candidate occurs at all.
pub fn most_frequent(sample: &[u8]) -> u8 {
    let mut best = (0usize, b',');
    for &delim in &CANDIDATES {
        let n = memchr::memchr_iter(delim, sample).count();
        if n > best.0 {
            best = (n, delim);
        }
    }
    best.1
}
