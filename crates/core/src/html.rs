//! Minimal HTML output helpers.

/// Escapes text for use in element content or a double-quoted attribute value.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// `<input type="hidden" name="..." value="...">`
pub fn hidden_input(name: &str, value: &str) -> String {
    format!(
        r#"<input type="hidden" name="{}" value="{}">"#,
        escape(name),
        escape(value)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escape(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#x27;Jerry&#x27;&lt;/b&gt;"
        );
    }

    #[test]
    fn leaves_plain_text_alone() {
        assert_eq!(escape("photo.jpg"), "photo.jpg");
    }

    #[test]
    fn hidden_input_escapes_value() {
        assert_eq!(
            hidden_input("f_sticky_file", "a\"b.txt"),
            r#"<input type="hidden" name="f_sticky_file" value="a&quot;b.txt">"#
        );
    }
}
