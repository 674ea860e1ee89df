//! # Tag Normalizer
//!
//! Player and club tags arrive from clients in every shape: lowercase,
//! missing the `#` marker, or already percent-encoded by a previous hop.
//! The upstream API is case-sensitive and expects an uppercase, `#`-prefixed
//! tag, percent-encoded for use in a URL path segment.
//!
//! Normalization is idempotent: feeding an already-normalized tag back in
//! yields the same output. Validation is a separate, composable step that
//! some routes run before normalization and others skip entirely.

use crate::core::error::{ProxyError, ProxyResult};

/// Characters the upstream accepts in a tag, after the `#` marker.
const TAG_ALPHABET: &str = "0289PYLQGRJCUV";

/// Canonicalize a raw tag into the upstream's encoded form.
///
/// Steps: decode any existing percent-encoding once, trim whitespace,
/// uppercase, prefix `#` if absent, then percent-encode the result.
/// An empty input produces an empty output; rejecting it is the caller's
/// job (see [`validate_tag`]).
pub fn normalize_tag(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let decoded = urlencoding::decode(raw)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| raw.to_string());

    let trimmed = decoded.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let upper = trimmed.to_uppercase();
    let marked = if upper.starts_with('#') {
        upper
    } else {
        format!("#{}", upper)
    };

    urlencoding::encode(&marked).into_owned()
}

/// Validate a raw tag against the upstream's tag alphabet.
///
/// Runs on the raw (or previously normalized) form before [`normalize_tag`].
/// Rejects empty tags, marker-only tags, and characters outside the
/// alphabet. Composable with normalization in either order since it decodes
/// and strips the marker itself.
pub fn validate_tag(raw: &str) -> ProxyResult<()> {
    let decoded = urlencoding::decode(raw)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| raw.to_string());

    let stripped = decoded.trim().trim_start_matches('#');
    if stripped.is_empty() {
        return Err(ProxyError::invalid_tag("tag is empty"));
    }

    for ch in stripped.chars() {
        let upper = ch.to_ascii_uppercase();
        if !TAG_ALPHABET.contains(upper) {
            return Err(ProxyError::invalid_tag(format!(
                "tag contains invalid character '{}'",
                ch
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_tag_normalized() {
        assert_eq!(normalize_tag("abc123"), "%23ABC123");
    }

    #[test]
    fn test_case_and_prefix_invariance() {
        let canonical = normalize_tag("abc123");
        assert_eq!(normalize_tag("#ABC123"), canonical);
        assert_eq!(normalize_tag("%23ABC123"), canonical);
        assert_eq!(normalize_tag("Abc123"), canonical);
        assert_eq!(normalize_tag("#abc123"), canonical);
    }

    #[test]
    fn test_idempotence() {
        let once = normalize_tag("2pp00");
        let twice = normalize_tag(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_whitespace_trimmed() {
        assert_eq!(normalize_tag("  #2PP00  "), "%232PP00");
    }

    #[test]
    fn test_empty_passes_through() {
        assert_eq!(normalize_tag(""), "");
        assert_eq!(normalize_tag("   "), "");
    }

    #[test]
    fn test_validate_accepts_alphabet() {
        assert!(validate_tag("2PP00").is_ok());
        assert!(validate_tag("#2pp00").is_ok());
        assert!(validate_tag("%232PP00").is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_and_marker_only() {
        assert!(validate_tag("").is_err());
        assert!(validate_tag("#").is_err());
        assert!(validate_tag("  #  ").is_err());
    }

    #[test]
    fn test_validate_rejects_bad_characters() {
        let err = validate_tag("AB!123").unwrap_err();
        assert!(matches!(err, ProxyError::InvalidTag { .. }));
        assert!(validate_tag("HELLO").is_err()); // H, E not in alphabet
    }

    #[test]
    fn test_validate_then_normalize_composes() {
        let raw = "#2pp00";
        validate_tag(raw).unwrap();
        assert_eq!(normalize_tag(raw), "%232PP00");
    }
}
