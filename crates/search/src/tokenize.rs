//! Text normalisation shared by indexing and querying.

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it", "of", "on",
    "or", "that", "the", "to", "with",
];

/// Splits text into lowercase terms, dropping stop words and folding plurals.
pub fn terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .filter(|word| !STOP_WORDS.contains(&word.as_str()))
        .map(stem)
        .collect()
}

fn stem(word: String) -> String {
    if word.len() > 4 && word.ends_with("ies") {
        return format!("{}y", &word[..word.len() - 3]);
    }
    if word.len() > 4 && word.ends_with("oes") {
        return word[..word.len() - 2].to_string();
    }
    if word.len() > 3 && word.ends_with('s') && !word.ends_with("ss") {
        return word[..word.len() - 1].to_string();
    }
    word
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_splits_on_punctuation() {
        assert_eq!(terms("Fresh-Corn, SWEET"), vec!["fresh", "corn", "sweet"]);
    }

    #[test]
    fn drops_stop_words() {
        assert_eq!(terms("the best of the harvest"), vec!["best", "harvest"]);
    }

    #[test]
    fn folds_simple_plurals() {
        assert_eq!(terms("tomatoes berries grass"), vec!["tomato", "berry", "grass"]);
        assert_eq!(terms("tomato berry"), vec!["tomato", "berry"]);
    }
}
