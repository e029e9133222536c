//! Filter word sources

use std::sync::Arc;

/// Source of the content filter word list
///
/// Implementations are expected to be cheap to call; the list is small and
/// read once per request.
pub trait FilterWordSource: Send + Sync {
    /// Current filter words
    fn words(&self) -> Arc<[String]>;
}

/// Fixed word list, normalised at construction
#[derive(Debug, Clone)]
pub struct StaticWordSource {
    words: Arc<[String]>,
}

impl StaticWordSource {
    /// Build from raw configured words
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            words: normalize_words(words).into(),
        }
    }
}

impl FilterWordSource for StaticWordSource {
    fn words(&self) -> Arc<[String]> {
        Arc::clone(&self.words)
    }
}

/// Trim words and drop blanks and duplicates, keeping first-seen order
///
/// A blank word would match every record, so it never reaches a policy.
pub fn normalize_words<I, S>(words: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for word in words {
        let word = word.as_ref().trim();
        if word.is_empty() || normalized.iter().any(|w| w == word) {
            continue;
        }
        normalized.push(word.to_string());
    }
    normalized
}
