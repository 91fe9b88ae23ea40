//! Artifact naming codec
//!
//! A report's identity lives only in its file name:
//! `nmt_<pid>_<created>.txt`. The directory listing is the index, so
//! encoding and decoding must stay exact inverses.

use super::types::ReportId;
use crate::error::DecodeError;

/// Leading token of every artifact name
pub const ARTIFACT_PREFIX: &str = "nmt";

/// Extension of every artifact name
pub const ARTIFACT_SUFFIX: &str = ".txt";

/// Prefix of the hidden file a collection writes before it is renamed
pub const STAGING_PREFIX: &str = ".nmt_";

/// Extension of in-progress staging files
pub const STAGING_SUFFIX: &str = ".tmp";

const SEPARATOR: char = '_';

/// Build the artifact file name for a report identity
pub fn encode(pid: i32, created: i64) -> String {
    format!(
        "{ARTIFACT_PREFIX}{SEPARATOR}{pid}{SEPARATOR}{created}{ARTIFACT_SUFFIX}"
    )
}

/// Whether a file name carries the artifact suffix and is worth decoding
pub fn is_artifact_name(name: &str) -> bool {
    name.ends_with(ARTIFACT_SUFFIX)
}

/// Whether a file name is a staging file left by a collection
pub fn is_staging_name(name: &str) -> bool {
    name.starts_with(STAGING_PREFIX) && name.ends_with(STAGING_SUFFIX)
}

/// Decode `nmt_<pid>_<created>.txt` back into its identity.
///
/// Pure string work; never touches the filesystem.
pub fn decode(name: &str) -> Result<ReportId, DecodeError> {
    let trimmed = name.trim();
    let stem = trimmed.strip_suffix(ARTIFACT_SUFFIX).unwrap_or(trimmed);

    let parts: Vec<&str> = stem.split(SEPARATOR).collect();
    if parts.len() != 3 || parts[0] != ARTIFACT_PREFIX {
        return Err(DecodeError::InvalidFormat {
            name: stem.to_string(),
        });
    }

    let pid = parse_positive::<i32>(parts[1]).ok_or_else(|| DecodeError::InvalidField {
        field: "pid",
        value: parts[1].to_string(),
    })?;
    let created = parse_positive::<i64>(parts[2]).ok_or_else(|| DecodeError::InvalidField {
        field: "ts",
        value: parts[2].to_string(),
    })?;

    Ok(ReportId { pid, created })
}

fn parse_positive<T>(token: &str) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    token.parse::<T>().ok().filter(|v| *v > T::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_shape() {
        assert_eq!(encode(53732, 1764484822), "nmt_53732_1764484822.txt");
    }

    #[test]
    fn test_staging_names() {
        assert!(is_staging_name(".nmt_Xa81k2.tmp"));
        assert!(!is_staging_name("nmt_7_100.txt"));
        assert!(!is_staging_name(".nmt_Xa81k2.txt"));
        assert!(!is_artifact_name(".nmt_Xa81k2.tmp"));
    }

    #[test]
    fn test_decode_valid_name() {
        let id = decode("nmt_53732_1764484822.txt").unwrap();
        assert_eq!(id.pid, 53732);
        assert_eq!(id.created, 1764484822);
    }

    #[test]
    fn test_round_trip() {
        for (pid, created) in [(1, 1), (53732, 1764484822), (i32::MAX, i64::MAX)] {
            let id = decode(&encode(pid, created)).unwrap();
            assert_eq!((id.pid, id.created), (pid, created));
        }
    }

    #[test]
    fn test_decode_tolerates_surrounding_whitespace() {
        let id = decode("  nmt_7_100.txt\n").unwrap();
        assert_eq!(id, ReportId { pid: 7, created: 100 });
    }

    #[test]
    fn test_decode_wrong_token_count() {
        for name in ["nmt_53732.txt", "nmt_1_2_3.txt", "nmt.txt", "report.txt"] {
            assert!(
                matches!(decode(name), Err(DecodeError::InvalidFormat { .. })),
                "{name} should be rejected as a format error"
            );
        }
    }

    #[test]
    fn test_decode_wrong_prefix() {
        let err = decode("gc_53732_1764484822.txt").unwrap_err();
        assert_eq!(
            err,
            DecodeError::InvalidFormat {
                name: "gc_53732_1764484822".to_string()
            }
        );
        // Prefix match is case-sensitive
        assert!(matches!(
            decode("NMT_1_2.txt"),
            Err(DecodeError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_decode_non_positive_fields() {
        assert_eq!(
            decode("nmt_0_1764484822.txt").unwrap_err(),
            DecodeError::InvalidField {
                field: "pid",
                value: "0".to_string()
            }
        );
        assert!(matches!(
            decode("nmt_-5_1764484822.txt"),
            Err(DecodeError::InvalidField { field: "pid", .. })
        ));
        assert!(matches!(
            decode("nmt_53732_0.txt"),
            Err(DecodeError::InvalidField { field: "ts", .. })
        ));
        assert!(matches!(
            decode("nmt_53732_-1.txt"),
            Err(DecodeError::InvalidField { field: "ts", .. })
        ));
    }

    #[test]
    fn test_decode_non_numeric_fields() {
        assert!(matches!(
            decode("nmt_abc_1764484822.txt"),
            Err(DecodeError::InvalidField { field: "pid", .. })
        ));
        assert!(matches!(
            decode("nmt_53732_yesterday.txt"),
            Err(DecodeError::InvalidField { field: "ts", .. })
        ));
    }

    #[test]
    fn test_is_artifact_name() {
        assert!(is_artifact_name("nmt_1_2.txt"));
        assert!(!is_artifact_name(".nmt_abc.tmp"));
        assert!(!is_artifact_name("nmt_1_2.txt.bak"));
    }
}
