//! Synthetic breach-search records for exercising the excerpt tool.
//!
//! Output is deterministic for a given seed and reference time: page `p` draws
//! from its own RNG seeded with `seed + p`, so pages can be built in parallel.
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;

pub const FREEMAIL_DEFAULT: [&str; 3] = ["gmail.com", "outlook.com", "yahoo.com"];
pub const BREACHES_DEFAULT: [&str; 6] =
    ["LinkedIn", "Dropbox", "Adobe", "Canva", "Twitter", "Collection#1"];

const FIRST_NAMES: [&str; 20] = [
    "Alice", "Bob", "Carol", "Dave", "Eve", "Frank", "Grace", "Heidi", "Ivan", "Judy", "Mallory",
    "Niaj", "Olivia", "Peggy", "Rupert", "Sybil", "Trent", "Uma", "Victor", "Wendy",
];
const LAST_NAMES: [&str; 15] = [
    "Smith", "Johnson", "Brown", "Taylor", "Anderson", "Thomas", "Jackson", "White", "Harris",
    "Martin", "Thompson", "Garcia", "Martinez", "Robinson", "Clark",
];
const STREETS: [&str; 6] = ["Main", "Oak", "Pine", "Cedar", "Maple", "Elm"];
const PASSWORD_CHARS: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*";
const HEX: &[u8] = b"0123456789abcdef";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureFormat {
    Json,
    Csv,
}

impl FixtureFormat {
    fn extension(self) -> &'static str {
        match self {
            FixtureFormat::Json => "json",
            FixtureFormat::Csv => "csv",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FixtureConfig {
    pub domain: String,
    pub pages: usize,
    pub per_page: usize,
    pub seed: u64,
    pub prefer_corporate: f64,
    pub freemail_domains: Vec<String>,
    pub breaches: Vec<String>,
    pub include_passwords: bool,
    pub format: FixtureFormat,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            domain: "example.com".to_string(),
            pages: 2,
            per_page: 200,
            seed: 1234,
            prefer_corporate: 0.7,
            freemail_domains: FREEMAIL_DEFAULT.iter().map(|s| s.to_string()).collect(),
            breaches: BREACHES_DEFAULT.iter().map(|s| s.to_string()).collect(),
            include_passwords: false,
            format: FixtureFormat::Json,
        }
    }
}

impl FixtureConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.prefer_corporate) {
            bail!(
                "prefer-corporate must be within 0..=1, got {}",
                self.prefer_corporate
            );
        }
        if self.breaches.is_empty() {
            bail!("at least one breach name is required");
        }
        if self.domain.trim().is_empty() {
            bail!("domain must not be empty");
        }
        Ok(())
    }

    /// Path of page `page` (1-based) under `out_dir`.
    pub fn page_path(&self, out_dir: &Path, page: usize) -> PathBuf {
        out_dir.join(format!(
            "{}_page{}.{}",
            self.domain,
            page,
            self.format.extension()
        ))
    }
}

/// Split a comma-separated CLI list, dropping blanks.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixtureRecord {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub name: String,
    pub username: String,
    pub breach: String,
    pub source: String,
    pub ip: String,
    pub address: String,
    pub created_at: String,
    pub updated_at: String,
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hashed_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
}

#[derive(Serialize)]
struct JsonPage<'a> {
    entries: &'a [FixtureRecord],
}

fn pick<'a, R: Rng>(rng: &mut R, items: &'a [&'a str]) -> &'a str {
    items[rng.random_range(0..items.len())]
}

fn username<R: Rng>(rng: &mut R, first: &str, last: &str) -> String {
    let first = first.to_lowercase();
    let last = last.to_lowercase();
    let base = match rng.random_range(0..4) {
        0 => first,
        1 => last,
        2 => format!("{}{}", &first[..1], last),
        _ => format!("{}.{}", first, last),
    };
    if rng.random_range(0..4) == 0 {
        format!("{}{}", base, rng.random_range(1..=9999))
    } else {
        base
    }
}

fn random_string<R: Rng>(rng: &mut R, alphabet: &[u8], len: usize) -> String {
    (0..len)
        .map(|_| alphabet[rng.random_range(0..alphabet.len())] as char)
        .collect()
}

fn ip<R: Rng>(rng: &mut R) -> String {
    let octets: Vec<String> = (0..4)
        .map(|_| rng.random_range(1..=254u8).to_string())
        .collect();
    octets.join(".")
}

fn timestamp_past_year<R: Rng>(rng: &mut R, now: DateTime<Utc>) -> String {
    let back = Duration::days(rng.random_range(0..=365))
        + Duration::hours(rng.random_range(0..=23))
        + Duration::minutes(rng.random_range(0..=59));
    (now - back).format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Build the records of page `page` (1-based).
pub fn generate_page(cfg: &FixtureConfig, page: usize, now: DateTime<Utc>) -> Vec<FixtureRecord> {
    let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed.wrapping_add(page as u64));
    let freemails: Vec<&str> = cfg.freemail_domains.iter().map(String::as_str).collect();
    let breaches: Vec<&str> = cfg.breaches.iter().map(String::as_str).collect();

    (0..cfg.per_page)
        .map(|_| {
            let first = pick(&mut rng, &FIRST_NAMES);
            let last = pick(&mut rng, &LAST_NAMES);
            let corporate = rng.random::<f64>() < cfg.prefer_corporate;
            let domain = if corporate || freemails.is_empty() {
                cfg.domain.clone()
            } else {
                pick(&mut rng, &freemails).to_string()
            };
            let user = username(&mut rng, first, last);
            let house = rng.random_range(10..=9999);
            let street = pick(&mut rng, &STREETS);
            let mut rec = FixtureRecord {
                email: format!("{}@{}", user, domain),
                first_name: first.to_string(),
                last_name: last.to_string(),
                name: format!("{} {}", first, last),
                username: user,
                breach: pick(&mut rng, &breaches).to_string(),
                source: "fixture".to_string(),
                ip: ip(&mut rng),
                address: format!("{} {} St", house, street),
                created_at: timestamp_past_year(&mut rng, now),
                updated_at: timestamp_past_year(&mut rng, now),
                domain,
                password: None,
                hashed_password: None,
                hash: None,
                password_hash: None,
            };
            if cfg.include_passwords {
                let len = rng.random_range(8..=14);
                rec.password = Some(random_string(&mut rng, PASSWORD_CHARS, len));
                rec.hashed_password = Some(random_string(&mut rng, HEX, 64));
                rec.hash = Some(random_string(&mut rng, HEX, 64));
                rec.password_hash = Some(random_string(&mut rng, HEX, 64));
            }
            rec
        })
        .collect()
}

/// Serialize one page to `path` in the configured format.
pub fn write_page(cfg: &FixtureConfig, path: &Path, records: &[FixtureRecord]) -> Result<()> {
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    match cfg.format {
        FixtureFormat::Json => {
            let mut w = BufWriter::new(f);
            serde_json::to_writer_pretty(&mut w, &JsonPage { entries: records })
                .with_context(|| format!("write {}", path.display()))?;
            w.write_all(b"\n")?;
            w.flush()?;
        }
        FixtureFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(f);
            for rec in records {
                wtr.serialize(rec)
                    .with_context(|| format!("write {}", path.display()))?;
            }
            wtr.flush()?;
        }
    }
    Ok(())
}

/// Generate and write every page under `out_dir`, creating it if needed.
/// Returns `(path, entry count)` per page in page order.
pub fn generate_all(
    cfg: &FixtureConfig,
    out_dir: &Path,
    now: DateTime<Utc>,
) -> Result<Vec<(PathBuf, usize)>> {
    cfg.validate()?;
    fs::create_dir_all(out_dir).with_context(|| format!("create {}", out_dir.display()))?;
    (1..=cfg.pages)
        .into_par_iter()
        .map(|page| -> Result<(PathBuf, usize)> {
            let records = generate_page(cfg, page, now);
            let path = cfg.page_path(out_dir, page);
            write_page(cfg, &path, &records)?;
            Ok((path, records.len()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Engine, Options};
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn same_seed_same_records() {
        let cfg = FixtureConfig {
            per_page: 25,
            ..Default::default()
        };
        assert_eq!(generate_page(&cfg, 1, now()), generate_page(&cfg, 1, now()));
        assert_ne!(generate_page(&cfg, 1, now()), generate_page(&cfg, 2, now()));
    }

    #[test]
    fn records_are_well_formed() {
        let cfg = FixtureConfig {
            per_page: 200,
            include_passwords: true,
            ..Default::default()
        };
        let earliest = now() - Duration::days(366);
        for rec in generate_page(&cfg, 1, now()) {
            let (user, domain) = rec.email.split_once('@').unwrap();
            assert_eq!(user, rec.username);
            assert_eq!(domain, rec.domain);
            assert!(domain == "example.com" || FREEMAIL_DEFAULT.contains(&domain));
            assert!(BREACHES_DEFAULT.contains(&rec.breach.as_str()));
            assert_eq!(rec.name, format!("{} {}", rec.first_name, rec.last_name));
            assert_eq!(rec.ip.split('.').count(), 4);
            let created = DateTime::parse_from_rfc3339(&rec.created_at).unwrap();
            assert!(created <= now() && created >= earliest);
            let pw = rec.password.unwrap();
            assert!((8..=14).contains(&pw.len()));
            assert_eq!(rec.hash.unwrap().len(), 64);
        }
    }

    #[test]
    fn corporate_only_when_forced() {
        let cfg = FixtureConfig {
            per_page: 50,
            prefer_corporate: 1.0,
            ..Default::default()
        };
        assert!(generate_page(&cfg, 1, now())
            .iter()
            .all(|r| r.domain == "example.com"));
    }

    #[test]
    fn rejects_bad_config() {
        let cfg = FixtureConfig {
            prefer_corporate: 1.5,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
        let cfg = FixtureConfig {
            breaches: vec![],
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn parse_list_drops_blanks() {
        assert_eq!(parse_list(" a.com, ,b.com,"), vec!["a.com", "b.com"]);
    }

    #[test]
    fn json_pages_have_entries_without_passwords() {
        let dir = tempdir().unwrap();
        let cfg = FixtureConfig {
            pages: 3,
            per_page: 10,
            ..Default::default()
        };
        let written = generate_all(&cfg, dir.path(), now()).unwrap();
        assert_eq!(written.len(), 3);
        assert!(written[2].0.ends_with("example.com_page3.json"));
        let v: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&written[0].0).unwrap()).unwrap();
        let entries = v["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 10);
        assert!(entries[0].get("password").is_none());
        assert_eq!(entries[0]["source"], "fixture");
    }

    #[test]
    fn csv_page_feeds_the_engine() {
        let dir = tempdir().unwrap();
        let cfg = FixtureConfig {
            pages: 1,
            per_page: 40,
            format: FixtureFormat::Csv,
            ..Default::default()
        };
        let written = generate_all(&cfg, dir.path(), now()).unwrap();
        let mut e = Engine::new(Options {
            prefer_domain: Some("example.com".into()),
            ..Default::default()
        });
        e.load_from_path(&written[0].0).unwrap();
        assert!(!e.excerpt.is_empty() && e.excerpt.len() <= 10);
        assert!(e.breach_count() >= 1 && e.breach_count() <= BREACHES_DEFAULT.len());
        assert!(e.excerpt.iter().all(|line| line.ends_with('>')));
    }
}
