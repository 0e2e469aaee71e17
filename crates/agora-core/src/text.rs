//! Bidirectional transform between a multi-line text field and a list of
//! entries, used for the pros/cons inputs.

/// Split on newlines, trim each line, drop empty lines.
pub fn lines_to_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Join entries one per line.
pub fn list_to_lines(entries: &[String]) -> String {
    entries.join("\n")
}

/// Trim entries and drop the ones left empty.
pub fn normalize_entries<I, S>(entries: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    entries
        .into_iter()
        .filter_map(|entry| {
            let trimmed = entry.as_ref().trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_to_list_drops_blank_lines() {
        let text = "Fast\n\n   \n  Cheap  \r\nReliable";
        assert_eq!(lines_to_list(text), vec!["Fast", "Cheap", "Reliable"]);
        assert!(lines_to_list("").is_empty());
    }

    #[test]
    fn test_list_to_lines_then_back() {
        let entries = vec!["Fast".to_string(), "Cheap".to_string()];
        let text = list_to_lines(&entries);
        assert_eq!(text, "Fast\nCheap");
        assert_eq!(lines_to_list(&text), entries);
    }

    #[test]
    fn test_normalize_entries() {
        assert_eq!(normalize_entries(["", "  ", "Fast"]), vec!["Fast"]);
        assert_eq!(normalize_entries(vec![" a ".to_string()]), vec!["a"]);
    }
}
