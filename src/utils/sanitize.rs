// Sanitization utilities

/// Strip control characters from scraped text before it reaches a terminal or
/// the saved-recipe file. Newlines and tabs are kept.
pub fn sanitize_text(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Truncate text to a maximum number of characters
pub fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept.trim_end())
    }
}
