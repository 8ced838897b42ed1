//! Escaping for values placed into HTML, XML and inline scripts

/// Escape text for HTML element content or a quoted attribute value
///
/// Replaces `&`, `<`, `>`, `"` and `'` with entities. The output is also
/// valid XML character data.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + input.len() / 8);
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Serialize a JSON value for embedding inside a `<script>` element
///
/// JSON escapes quotes but leaves `<`, `>`, `&` and `'` alone, so a value
/// containing `</script>` could close the element early. Those characters
/// are rewritten as `\uXXXX` escapes, which JSON parsers read back verbatim.
pub fn json_for_script(value: &serde_json::Value) -> String {
    let json = value.to_string();
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\'' => out.push_str("\\u0027"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_escape_all_specials() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
        );
    }

    #[test]
    fn test_escape_passthrough() {
        assert_eq!(escape_html("Beyoncé – Halo"), "Beyoncé – Halo");
        assert_eq!(escape_html(""), "");
    }

    #[test]
    fn test_escape_is_not_idempotent_on_entities() {
        // Already-escaped input is escaped again; stored text is raw text
        assert_eq!(escape_html("&amp;"), "&amp;amp;");
    }

    #[test]
    fn test_json_for_script_neutralizes_closing_tag() {
        let value = json!({"name": "</script><script>alert('x')</script>"});
        let out = json_for_script(&value);
        assert!(!out.contains("</script>"));
        assert!(!out.contains('<'));
        assert!(!out.contains('\''));

        let back: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_json_for_script_line_separators() {
        let value = json!({"d": "a\u{2028}b"});
        let out = json_for_script(&value);
        assert!(out.contains("\\u2028"));
        let back: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(back, value);
    }
}
