/// Header cells are matched without invisible marks, whitespace, underscores or case.
pub(crate) fn normalize_header(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '\u{feff}' | '\u{200b}' | '_') && !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// Cell text with invisible marks removed and inner whitespace collapsed.
pub(crate) fn clean_cell(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}
