/// Sanitises free-form quiz descriptions with ammonia.
///
/// Safe formatting tags survive; scripts, iframes and event-handler
/// attributes are stripped. Surrounding whitespace is trimmed.
pub fn clean_description(input: &str) -> String {
    ammonia::clean(input.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_formatting() {
        assert_eq!(clean_description("<b>Chapter 1</b>"), "<b>Chapter 1</b>");
    }

    #[test]
    fn test_strips_scripts_and_handlers() {
        let cleaned = clean_description(r#"<p onclick="steal()">Hi</p><script>alert(1)</script>"#);
        assert_eq!(cleaned, "<p>Hi</p>");
    }

    #[test]
    fn test_trims() {
        assert_eq!(clean_description("  plain text \n"), "plain text");
    }
}
