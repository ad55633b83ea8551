//! Helpers for turning user-supplied text into safe identifiers.
//!
//! Job names end up in file names and fingerprints end up in the database,
//! so both must be deterministic and free of path separators.

/// Converts a job name into something usable as a file name.
///
/// Characters outside `[A-Za-z0-9._-]` become `-`, runs of `-` collapse and
/// leading/trailing separators are trimmed. An empty result becomes `job`.
///
/// - `Dictionary fr-FR 2026-10-19` → `Dictionary-fr-FR-2026-10-19`
/// - `../../etc` → `etc`
pub fn safe_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        let mapped = if ch.is_ascii_alphanumeric() || ch == '_' {
            ch
        } else if ch == '.' && !out.is_empty() && !out.ends_with('.') {
            ch
        } else {
            '-'
        };
        if mapped == '-' && (out.is_empty() || out.ends_with('-')) {
            continue;
        }
        out.push(mapped);
    }

    let trimmed = out.trim_matches(|c| c == '-' || c == '.');
    if trimmed.is_empty() {
        "job".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Returns a deterministic hex digest over the given parts.
///
/// Parts are length-prefixed so `["ab", "c"]` and `["a", "bc"]` differ.
pub fn fingerprint<'a, I>(parts: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    hasher.finalize().to_hex().as_str()[..32].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_file_name_replaces_spaces() {
        assert_eq!(
            safe_file_name("Dictionary fr-FR 2026-10-19"),
            "Dictionary-fr-FR-2026-10-19"
        );
    }

    #[test]
    fn test_safe_file_name_strips_traversal() {
        assert_eq!(safe_file_name("../../etc/passwd"), "etc-passwd");
    }

    #[test]
    fn test_safe_file_name_keeps_inner_dots() {
        assert_eq!(safe_file_name("release 1.2"), "release-1.2");
    }

    #[test]
    fn test_safe_file_name_empty() {
        assert_eq!(safe_file_name(""), "job");
        assert_eq!(safe_file_name("///"), "job");
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = fingerprint(["name", "en-GB", "fr-FR"]);
        let b = fingerprint(["name", "en-GB", "fr-FR"]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_fingerprint_is_boundary_sensitive() {
        assert_ne!(fingerprint(["ab", "c"]), fingerprint(["a", "bc"]));
    }
}
