//! Human-readable report rendering for terminal output.
//!
//! The text layout is fixed so it can be scraped by other tools; styling only
//! wraps existing text in ANSI sequences and is opt-in via `styled`.
use colored::*;

use crate::engine::{Engine, ExcerptStatus};

pub const TITLE: &str = "Excerpt (name <email>)";

fn placeholder(status: ExcerptStatus) -> Option<&'static str> {
    match status {
        ExcerptStatus::EmptyFile => Some("(empty file)"),
        ExcerptStatus::NoEmailColumn => Some("(no email column found)"),
        ExcerptStatus::NoRowsWithEmail => Some("(no rows with emails found)"),
        ExcerptStatus::Entries => None,
    }
}

pub fn render_report(engine: &Engine, styled: bool) -> String {
    let mut out = String::new();
    if styled {
        out.push_str(&TITLE.bold().cyan().to_string());
    } else {
        out.push_str(TITLE);
    }
    out.push('\n');

    match placeholder(engine.status()) {
        Some(p) if styled => out.push_str(&p.dimmed().to_string()),
        Some(p) => out.push_str(p),
        None => out.push_str(&engine.excerpt.join("\n")),
    }
    out.push_str("\n\n");

    let label = "Breached Databases:";
    if styled {
        out.push_str(&format!("{} {}\n", label.bold().yellow(), engine.breach_count()));
    } else {
        out.push_str(&format!("{} {}\n", label, engine.breach_count()));
    }
    out
}
