//! Filesystem-safe name slugging.

/// Convert a display name into a filesystem-safe slug.
///
/// Lowercases, replaces runs of non-alphanumeric characters with a single
/// hyphen, and trims leading/trailing hyphens.
///
/// # Examples
///
/// ```
/// use dreamright_storage::slugify;
///
/// assert_eq!(slugify("Mina Park"), "mina-park");
/// assert_eq!(slugify("The Rooftop Café!"), "the-rooftop-caf");
/// assert_eq!(slugify("  spaced  out  "), "spaced-out");
/// ```
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_hyphen = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_punctuation_runs() {
        assert_eq!(slugify("Mina's... Apartment"), "mina-s-apartment");
        assert_eq!(slugify("---"), "");
        assert_eq!(slugify("Chapter 12: The End"), "chapter-12-the-end");
    }
}
