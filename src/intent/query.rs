//! Search query extraction

use std::sync::LazyLock;

use regex::Regex;

use super::{FALLBACK_QUERY, Platform};

static YOUTUBE_STOPWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:search|youtube|on|for)\b").expect("valid regex")
});

static GOOGLE_STOPWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:search|google|on|for)\b").expect("valid regex")
});

/// Strip the search stopwords for `platform` and return what is left
///
/// Stopwords are `search`, the platform name, `on` and `for`, matched
/// case-insensitively as whole words. Whitespace is collapsed. Never returns
/// an empty string: an empty residue becomes `"search"`.
#[must_use]
pub fn extract_query(text: &str, platform: Platform) -> String {
    let stopwords = match platform {
        Platform::YouTube => &*YOUTUBE_STOPWORDS,
        Platform::Google => &*GOOGLE_STOPWORDS,
    };

    let stripped = stopwords.replace_all(text, " ");
    let query = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    if query.is_empty() {
        FALLBACK_QUERY.to_string()
    } else {
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_youtube_stopwords_removed() {
        assert_eq!(extract_query("search for cats on youtube", Platform::YouTube), "cats");
    }

    #[test]
    fn test_google_stopwords_removed() {
        assert_eq!(extract_query("search for cats", Platform::Google), "cats");
        assert_eq!(
            extract_query("search google for rust tutorials", Platform::Google),
            "rust tutorials"
        );
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(extract_query("SEARCH For Cats ON YouTube", Platform::YouTube), "Cats");
    }

    #[test]
    fn test_words_containing_stopwords_survive() {
        assert_eq!(extract_query("search for lemon forks", Platform::Google), "lemon forks");
    }

    #[test]
    fn test_empty_residue_falls_back() {
        assert_eq!(extract_query("search on youtube", Platform::YouTube), "search");
        assert_eq!(extract_query("", Platform::Google), "search");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "search for cats on youtube",
            "search youtube for   funny  dog videos",
            "search for",
            "search google for the weather on monday",
        ];
        for input in inputs {
            for platform in [Platform::YouTube, Platform::Google] {
                let once = extract_query(input, platform);
                assert_eq!(extract_query(&once, platform), once, "input: {input}");
            }
        }
    }
}
