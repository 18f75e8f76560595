//! CP-010: BLAKE3 provenance for generated files.
//!
//! Each generated file records a digest of the document it came from, so a
//! reviewer can tell whether the Go source is stale relative to its template.

/// Header line prefix carrying the digest.
pub const SOURCE_LINE_PREFIX: &str = "// Source: ";

/// Hash raw template bytes. Returns `"blake3:{hex}"`.
pub fn hash_bytes(content: &[u8]) -> String {
    format!("blake3:{}", blake3::hash(content).to_hex())
}

/// Hash a string. Returns `"blake3:{hex}"`.
pub fn hash_string(s: &str) -> String {
    hash_bytes(s.as_bytes())
}

/// Insert a `// Source: blake3:...` line directly above the `package` clause.
/// Code without a package clause is returned unchanged.
pub fn stamp(code: &str, digest: &str) -> String {
    let mut out = String::with_capacity(code.len() + digest.len() + 16);
    let mut stamped = false;
    for line in code.split_inclusive('\n') {
        if !stamped && line.starts_with("package ") {
            out.push_str(SOURCE_LINE_PREFIX);
            out.push_str(digest);
            out.push('\n');
            stamped = true;
        }
        out.push_str(line);
    }
    out
}

/// Digest recorded in a stamped file, if any.
pub fn recorded_digest(code: &str) -> Option<&str> {
    code.lines()
        .take_while(|line| !line.starts_with("package "))
        .find_map(|line| line.strip_prefix(SOURCE_LINE_PREFIX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cp010_hash_deterministic() {
        let h1 = hash_string("Resources: {}");
        let h2 = hash_string("Resources: {}");
        assert_eq!(h1, h2);
        assert!(h1.starts_with("blake3:"));
        assert_eq!(h1.len(), 7 + 64);
    }

    #[test]
    fn test_cp010_hash_different_inputs() {
        assert_ne!(hash_bytes(b"a"), hash_bytes(b"b"));
        assert_eq!(hash_bytes(b"x"), hash_string("x"));
    }

    #[test]
    fn test_cp010_stamp() {
        let code = "// Package p\n//\npackage p\n\nvar X = 1\n";
        let stamped = stamp(code, "blake3:abc");
        assert_eq!(stamped, "// Package p\n//\n// Source: blake3:abc\npackage p\n\nvar X = 1\n");
        assert_eq!(recorded_digest(&stamped), Some("blake3:abc"));
        assert_eq!(recorded_digest(code), None);
    }

    #[test]
    fn test_cp010_stamp_without_package() {
        assert_eq!(stamp("var X = 1\n", "blake3:abc"), "var X = 1\n");
    }

    #[test]
    fn test_cp010_stamp_only_first_package_line() {
        let code = "package p\nvar s = `\npackage q\n`\n";
        let stamped = stamp(code, "d");
        assert_eq!(stamped.matches(SOURCE_LINE_PREFIX).count(), 1);
    }
}
