//! Input/output helpers.
//!
//! - catalog JSON ingest (`catalog`)
//! - result exports (JSON/CSV) (`export`)

pub mod catalog;
pub mod export;

pub use catalog::*;
pub use export::*;
