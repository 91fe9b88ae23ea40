//! NMT reports: capture, naming, parsing and time-windowed queries
//!
//! A report is stored as one file per capture. Its name encodes the
//! `(pid, timestamp)` identity, so the directory listing doubles as the index.

pub mod generator;
pub mod naming;
pub mod parser;
pub mod store;
pub mod types;

pub use generator::{generate_report, ReportGenerator};
pub use parser::{parse_lines, parse_report};
pub use store::{list_reports, EvictOutcome, ReportStore};
pub use types::{MemoryRegion, Report, ReportId, ReportsResponse};
