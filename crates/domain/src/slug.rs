/// Turns a display name into a URL slug: lowercase ASCII letters and
/// digits separated by single hyphens.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_hyphen = true;
        }
    }

    slug
}

/// The `n`th candidate for a base slug: `base`, `base-1`, `base-2`, …
pub fn candidate(base: &str, n: u32) -> String {
    if n == 0 {
        base.to_string()
    } else {
        format!("{base}-{n}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Fresh Corn"), "fresh-corn");
        assert_eq!(slugify("  Red -- Onions_2kg "), "red-onions-2kg");
        assert_eq!(slugify("Café au lait!"), "caf-au-lait");
        assert_eq!(slugify("¡¡¡"), "");
    }

    #[test]
    fn candidates_are_suffixed() {
        assert_eq!(candidate("fresh-corn", 0), "fresh-corn");
        assert_eq!(candidate("fresh-corn", 2), "fresh-corn-2");
    }
}
