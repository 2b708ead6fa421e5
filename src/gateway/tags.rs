/// Turn the free-text tag field into tag tokens.
///
/// Whitespace is removed everywhere, the rest is split on commas and empty
/// tokens are dropped.
pub fn normalize_tags(input: Option<&str>) -> Vec<String> {
    let Some(input) = input else {
        return Vec::new();
    };

    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    compact
        .split(',')
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}
