/// Punctuation that counts as a token of its own.
pub const DEFAULT_DELIMITERS: &str = " .,:;!?'\"-(){}[]<>+=/*_";

/// Cheap stand-in for a tokenizer, used only to tell when a request is
/// getting large. It does not match any real model's token counts.
///
/// Each whitespace-separated word costs one token per delimiter it contains,
/// plus one token for what is left if that is at most four characters long,
/// or two tokens otherwise.
#[derive(Debug, Clone)]
pub struct TokenEstimator {
    delimiters: Vec<char>,
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::with_delimiters(DEFAULT_DELIMITERS)
    }
}

impl TokenEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiters(delimiters: &str) -> Self {
        Self {
            delimiters: delimiters.chars().collect(),
        }
    }

    pub fn estimate(&self, text: &str) -> usize {
        text.split_whitespace().map(|word| self.estimate_word(word)).sum()
    }

    fn estimate_word(&self, word: &str) -> usize {
        let (delimiters, remainder) = word.chars().fold((0, 0), |(delims, rest), c| {
            if self.delimiters.contains(&c) {
                (delims + 1, rest)
            } else {
                (delims, rest + 1)
            }
        });

        delimiters + if remainder > 4 { 2 } else { 1 }
    }
}
