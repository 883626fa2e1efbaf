pub mod classifier;
pub mod driver;
pub mod filter;
pub mod summarizer;

/// Owned copies of built-in default lists.
fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Lowercased keywords with empty entries dropped, ready for substring matching.
fn lowercase_all(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles.iter().any(|n| haystack.contains(n.as_str()))
}
