//! # HTML Encoding
//!
//! Entity encoding for values interpolated into the `form_post` response
//! body. Every attribute value and hidden-field name/value in the
//! auto-submitting form passes through [`escape`].

/// Replace the five HTML-significant characters with their entity
/// references.
#[must_use]
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape(r#"<script>alert("1&2")</script>"#),
            "&lt;script&gt;alert(&quot;1&amp;2&quot;)&lt;/script&gt;"
        );
    }

    #[test]
    fn escapes_attribute_breakout() {
        assert_eq!(escape(r#""><input name='x'"#), "&quot;&gt;&lt;input name=&#39;x&#39;");
    }

    #[test]
    fn passes_plain_text() {
        assert_eq!(escape("af0ifjsldkj"), "af0ifjsldkj");
    }
}
