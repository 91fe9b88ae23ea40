//! Report data model
//!
//! Wire names follow the JSON shape served by `/api/nmt`: a report is
//! `{ pid, created, nmt_entries }` and each entry `{ name, reserved, committed }`.

use serde::{Deserialize, Serialize};

/// Name of the aggregate region emitted for the `Total:` line
pub const TOTAL_REGION: &str = "Total";

/// One named category of an NMT summary, in KB
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRegion {
    pub name: String,
    #[serde(rename = "reserved")]
    pub reserved_kb: u64,
    #[serde(rename = "committed")]
    pub committed_kb: u64,
}

impl MemoryRegion {
    pub fn new(name: impl Into<String>, reserved_kb: u64, committed_kb: u64) -> Self {
        Self {
            name: name.into(),
            reserved_kb,
            committed_kb,
        }
    }
}

/// Identity of a stored report, decoded from its artifact name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReportId {
    /// Monitored process id (> 0)
    pub pid: i32,
    /// Capture time in unix seconds (> 0)
    pub created: i64,
}

/// A parsed NMT snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub pid: i32,
    pub created: i64,
    /// Regions in source order. Match by name, not position.
    #[serde(rename = "nmt_entries")]
    pub regions: Vec<MemoryRegion>,
}

impl Report {
    pub fn new(id: ReportId, regions: Vec<MemoryRegion>) -> Self {
        Self {
            pid: id.pid,
            created: id.created,
            regions,
        }
    }

    pub fn id(&self) -> ReportId {
        ReportId {
            pid: self.pid,
            created: self.created,
        }
    }

    /// First region with the given name
    pub fn region(&self, name: &str) -> Option<&MemoryRegion> {
        self.regions.iter().find(|r| r.name == name)
    }

    /// The `Total` aggregate, if the report carried one
    pub fn total(&self) -> Option<&MemoryRegion> {
        self.region(TOTAL_REGION)
    }
}

/// Response envelope handed to the HTTP layer
#[derive(Debug, Serialize)]
pub struct ReportsResponse<T: Serialize> {
    pub data: T,
}
