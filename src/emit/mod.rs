//! CP-008: Go source emission helpers.
//!
//! Everything here renders IR into Go text on behalf of
//! [`crate::core::codegen::GenContext`], which owns the per-run state
//! (imports, reserved names, pending blocks).

pub mod blocks;
pub mod intrinsic;
pub mod value;

/// Indentation for nesting depth `level`.
pub fn indent(level: usize) -> String {
    "\t".repeat(level)
}

/// Quote `s` as a Go interpreted string literal.
pub fn go_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{07}' => out.push_str("\\a"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            '\u{0b}' => out.push_str("\\v"),
            c if (c as u32) < 0x80 && c.is_control() => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c if c.is_control() || c == '\u{feff}' || c == '\u{2028}' || c == '\u{2029}' => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Render a multi-line composite literal: `head{` + one `item,` per line +
/// closing brace at `level`. Empty item lists collapse to `head{}`.
pub fn composite(head: &str, items: &[String], level: usize) -> String {
    if items.is_empty() {
        return format!("{}{{}}", head);
    }
    let inner = indent(level + 1);
    let body: Vec<String> = items.iter().map(|item| format!("{}{},", inner, item)).collect();
    format!("{}{{\n{}\n{}}}", head, body.join("\n"), indent(level))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cp008_go_quote_plain() {
        assert_eq!(go_quote("hello"), "\"hello\"");
        assert_eq!(go_quote(""), "\"\"");
        assert_eq!(go_quote("arn:aws:s3:::b/*"), "\"arn:aws:s3:::b/*\"");
    }

    #[test]
    fn test_cp008_go_quote_escapes() {
        assert_eq!(go_quote("say \"hi\""), r#""say \"hi\"""#);
        assert_eq!(go_quote("a\\b"), r#""a\\b""#);
        assert_eq!(go_quote("#!/bin/bash\nyum update\t-y"), r##""#!/bin/bash\nyum update\t-y""##);
        assert_eq!(go_quote("\u{0}"), r#""\x00""#);
        assert_eq!(go_quote("\u{7f}"), r#""\x7f""#);
        assert_eq!(go_quote("\u{85}"), r#""\u0085""#);
    }

    #[test]
    fn test_cp008_go_quote_unicode_kept() {
        assert_eq!(go_quote("café ✓"), "\"café ✓\"");
    }

    #[test]
    fn test_cp008_composite() {
        assert_eq!(composite("[]any", &[], 0), "[]any{}");
        assert_eq!(
            composite("[]any", &["1".to_string(), "2".to_string()], 1),
            "[]any{\n\t\t1,\n\t\t2,\n\t}"
        );
    }
}
