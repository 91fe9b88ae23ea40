//! NMT summary text parser
//!
//! Turns the output of `jcmd <pid> VM.native_memory summary` into an ordered
//! list of [`MemoryRegion`]s. Only two line shapes carry aggregate data:
//!
//! ```text
//! Total: reserved=5813841KB, committed=382817KB
//! -                 Java Heap (reserved=4194304KB, committed=157696KB)
//! ```
//!
//! Everything else (detail sub-lines, banners, blank lines) is skipped.

use super::types::{MemoryRegion, TOTAL_REGION};
use regex::Regex;
use std::sync::OnceLock;

const TOTAL_HEADER_PATTERN: &str = r"^Total:\s+reserved=(\d+)KB,\s+committed=(\d+)KB";
const CATEGORY_HEADER_PATTERN: &str =
    r"^-\s+(.*?)\s+\(reserved=(\d+)KB,\s+committed=(\d+)KB.*\)";

static TOTAL_HEADER_REGEX: OnceLock<Regex> = OnceLock::new();
static CATEGORY_HEADER_REGEX: OnceLock<Regex> = OnceLock::new();

fn total_header_regex() -> &'static Regex {
    TOTAL_HEADER_REGEX.get_or_init(|| Regex::new(TOTAL_HEADER_PATTERN).unwrap())
}

fn category_header_regex() -> &'static Regex {
    CATEGORY_HEADER_REGEX.get_or_init(|| Regex::new(CATEGORY_HEADER_PATTERN).unwrap())
}

/// Parse a full report body
pub fn parse_report(text: &str) -> Vec<MemoryRegion> {
    parse_lines(text.lines())
}

/// Parse report lines in order, one region per header line.
///
/// Repeated names are kept as separate regions.
pub fn parse_lines<I, S>(lines: I) -> Vec<MemoryRegion>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .filter_map(|line| parse_line(line.as_ref()))
        .collect()
}

/// Parse a single line, `None` when it is not a header
pub fn parse_line(line: &str) -> Option<MemoryRegion> {
    let line = line.trim();

    if let Some(caps) = total_header_regex().captures(line) {
        return Some(MemoryRegion::new(
            TOTAL_REGION,
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
        ));
    }

    let caps = category_header_regex().captures(line)?;
    Some(MemoryRegion::new(
        caps[1].trim(),
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = include_str!("../../fixtures/nmt_53732_1764484822.txt");

    #[test]
    fn test_total_header() {
        let regions =
            parse_lines(["Total:                  reserved=5813841KB, committed=382817KB"]);
        assert_eq!(regions, vec![MemoryRegion::new("Total", 5813841, 382817)]);
    }

    #[test]
    fn test_category_header() {
        let regions = parse_lines([
            "-                 Java Heap (reserved=4194304KB, committed=157696KB, peak=160000KB)",
        ]);
        assert_eq!(
            regions,
            vec![MemoryRegion::new("Java Heap", 4194304, 157696)]
        );
    }

    #[test]
    fn test_fixture_regions_in_order() {
        let regions = parse_report(FIXTURE);
        let names: Vec<&str> = regions.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Total",
                "Java Heap",
                "Class",
                "Thread",
                "Code",
                "GC",
                "GCCardSet",
                "Compiler",
                "Internal",
                "Other",
                "Symbol",
                "Native Memory Tracking",
                "Shared class space",
                "Arena Chunk",
                "Module",
                "Safepoint",
                "Synchronization",
                "Serviceability",
                "Metaspace",
                "String Deduplication",
                "Object Monitors",
                "Unknown",
            ]
        );
        assert_eq!(regions[0], MemoryRegion::new("Total", 5813841, 382817));
        assert_eq!(regions[11], MemoryRegion::new("Native Memory Tracking", 2879, 2879));
        assert_eq!(regions[18], MemoryRegion::new("Metaspace", 65699, 30371));
    }

    #[test]
    fn test_detail_lines_are_ignored() {
        let lines = [
            "                            (mmap: reserved=4194304KB, committed=157696KB) ",
            "                            (malloc=875KB #13210) ",
            "       mmap:   reserved=5768638KB, committed=337614KB",
            "Native Memory Tracking:",
            "",
        ];
        assert!(parse_lines(lines).is_empty());
    }

    #[test]
    fn test_noise_placement_does_not_change_output() {
        let total = "Total: reserved=10KB, committed=5KB";
        let heap = "-  Java Heap (reserved=8KB, committed=4KB)";
        let a = parse_lines(["noise", total, "", heap, "(malloc=1KB)"]);
        let b = parse_lines([total, "(malloc=1KB)", "noise", heap, ""]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_case_sensitive() {
        assert!(parse_line("total: reserved=1KB, committed=1KB").is_none());
        assert!(parse_line("- Heap (Reserved=1KB, committed=1KB)").is_none());
    }

    #[test]
    fn test_duplicate_names_are_kept() {
        let regions = parse_lines([
            "- GC (reserved=2KB, committed=1KB)",
            "- GC (reserved=3KB, committed=2KB)",
        ]);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[1].reserved_kb, 3);
    }

    #[test]
    fn test_committed_above_reserved_is_taken_as_given() {
        let region = parse_line("- Odd (reserved=1KB, committed=9KB)").unwrap();
        assert_eq!((region.reserved_kb, region.committed_kb), (1, 9));
    }

    #[test]
    fn test_overflowing_counts_skip_the_line() {
        assert!(parse_line("Total: reserved=99999999999999999999999KB, committed=1KB").is_none());
    }
}
