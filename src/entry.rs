//! Excerpt entry model: builds the display string for a row and the rank key
//! used to order candidates before deduplication.
//!
//! Entries compare and hash by their `display` string only; two rows that
//! render identically are the same entry regardless of other fields.
use std::sync::LazyLock;

use regex::Regex;

use crate::columns::ColumnMap;

static DOMAIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([^@>]+)$").expect("domain pattern compiles"));

/// Sort key for candidates; ascending order means higher priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RankKey {
    /// `false` when the email's domain equals the preferred domain.
    pub domain_miss: bool,
    /// `false` when a name was resolved.
    pub no_name: bool,
    /// First-seen position among qualifying rows.
    pub seq: usize,
}

#[derive(Debug, Clone, Eq)]
pub struct Entry {
    pub display: String,
    pub rank: RankKey,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.display == other.display
    }
}

impl std::hash::Hash for Entry {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.display.hash(state);
    }
}

impl Entry {
    /// Build an entry from an email and a (possibly empty) name.
    /// `preferred_domain` must already be lowercased.
    pub fn new(email: &str, name: &str, preferred_domain: Option<&str>, seq: usize) -> Self {
        let display = if name.is_empty() {
            email.to_string()
        } else {
            format!("{} <{}>", name, email)
        };
        let domain_hit = preferred_domain.is_some_and(|d| email_domain(email) == d);
        Self {
            display,
            rank: RankKey {
                domain_miss: !domain_hit,
                no_name: name.is_empty(),
                seq,
            },
        }
    }
}

/// Lowercased text after the last `@`, or empty when there is none.
pub fn email_domain(email: &str) -> String {
    DOMAIN_RE
        .captures(email)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_lowercase())
        .unwrap_or_default()
}

/// Trimmed value at `idx`, or `""` when the role is unresolved or the row is
/// too short.
pub fn field<'a, S: AsRef<str>>(row: &'a [S], idx: Option<usize>) -> &'a str {
    idx.and_then(|i| row.get(i))
        .map(|s| s.as_ref().trim())
        .unwrap_or("")
}

/// Full name from the name column, else `first last` from the split columns.
pub fn build_name<S: AsRef<str>>(row: &[S], cols: &ColumnMap) -> String {
    let name = field(row, cols.name);
    if !name.is_empty() {
        return name.to_string();
    }
    let first = field(row, cols.first);
    let last = field(row, cols.last);
    let sep = if !first.is_empty() && !last.is_empty() {
        " "
    } else {
        ""
    };
    format!("{first}{sep}{last}").trim().to_string()
}
