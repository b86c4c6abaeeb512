use itertools::Itertools;

/// A `{{name}}` placeholder found in a text template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Placeholder {
    pub name: String,
    pub source: String,
}

/// Extracts the placeholders of `text`, in order of first appearance, without duplicates.
///
/// Whitespace inside the braces is trimmed and empty placeholders (`{{ }}`) are ignored.
/// An unterminated `{{` ends the scan.
pub fn extract_placeholders(text: &str, source: &str) -> Vec<Placeholder> {
    let mut names = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find("{{") {
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("}}") else {
            break;
        };
        let name = after_open[..close].trim();
        if !name.is_empty() {
            names.push(name.to_string());
        }
        rest = &after_open[close + 2..];
    }

    names
        .into_iter()
        .unique()
        .map(|name| Placeholder {
            name,
            source: source.to_string(),
        })
        .collect()
}
