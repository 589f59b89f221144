// Utility: Sanitize a file name, replacing path and reserved characters
pub fn sanitize_filename(name: &str, fallback: &str) -> String {
    let sanitized: String = name
        .chars()
        .filter(|c| *c != '\u{00A0}' && *c != '\u{FEFF}')
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            _ => c,
        })
        .collect();

    let trimmed = sanitized.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("report.pdf", "untitled"), "report.pdf");
        assert_eq!(sanitize_filename("a/b\\c.txt", "untitled"), "a-b-c.txt");
        assert_eq!(sanitize_filename("a/b:c", "storage"), "a-b-c");
        assert_eq!(sanitize_filename("../secret", "untitled"), "-secret");
        assert_eq!(sanitize_filename("..", "storage"), "storage");
        assert_eq!(sanitize_filename("  \u{00A0}", "untitled"), "untitled");
    }
}
