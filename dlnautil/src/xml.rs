//! XML escaping helpers shared by DIDL-Lite rendering and SOAP fault bodies.
//!
//! `quick-xml`'s serde serializer already escapes text nodes it writes
//! itself, but a handful of call sites build XML fragments by hand (SOAP
//! fault `errorDescription`, the SRT subtitle fallback is plain text and
//! needs none of this). Those call sites use these two functions instead of
//! concatenating raw strings into markup.

/// Escapes text destined for an XML text node (`&`, `<`, `>`).
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escapes text destined for a double-quoted XML attribute value.
pub fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_the_five_predefined_entities() {
        assert_eq!(escape_text("A & B <tag>"), "A &amp; B &lt;tag&gt;");
        assert_eq!(escape_attr("\"quoted\" & 'apos'"), "&quot;quoted&quot; &amp; &apos;apos&apos;");
    }

    #[test]
    fn leaves_plain_text_untouched() {
        assert_eq!(escape_text("Plain Title 2024"), "Plain Title 2024");
    }
}
