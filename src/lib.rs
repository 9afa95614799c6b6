pub mod columns;
pub mod dialect;
pub mod engine;
pub mod entry;
pub mod export;
pub mod fixtures;
pub mod io;
pub mod report;
pub mod stats;

pub mod prelude {
    pub use crate::engine::{Engine, ExcerptStatus, Options};
    pub use crate::export::Summary;
}
