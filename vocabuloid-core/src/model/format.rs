use std::fmt::Display;

/// Render collection elements one per line, or `placeholder` when there are none.
///
/// `None` and an empty slice are treated the same way.
pub fn format_list<T, F, D>(items: Option<&[T]>, mut extract: F, placeholder: &str) -> String
where
    F: FnMut(&T) -> D,
    D: Display,
{
    match items {
        Some(items) if !items.is_empty() => items
            .iter()
            .map(|item| extract(item).to_string())
            .collect::<Vec<_>>()
            .join("\n"),
        _ => placeholder.to_string(),
    }
}
