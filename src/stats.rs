//! Counters collected during a scan, surfaced by `--log-parse-stats`.

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    /// Data rows read after the header.
    pub rows: usize,
    /// Rows that produced an excerpt candidate.
    pub rows_with_email: usize,
    /// Fields whose bytes were not valid in the chosen encoding.
    pub decode_errors: usize,
}

impl ScanStats {
    /// Rows that were read but carried no usable email.
    pub fn rows_without_email(&self) -> usize {
        self.rows - self.rows_with_email
    }
}
