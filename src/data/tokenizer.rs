use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Reserved vocabulary ids.
pub const PAD_ID: i64 = 0;
pub const UNK_ID: i64 = 1;

/// Trait for tokenization and vocabulary lookup
pub trait Tokenizer: Send + Sync {
    /// Split raw text into surface tokens
    fn tokenize(&self, text: &str) -> Vec<String>;

    /// Map surface tokens to ids; unknown tokens resolve to `unk_id`
    fn lookup(&self, tokens: &[String]) -> Vec<i64>;

    /// Encode text straight to token ids
    fn encode(&self, text: &str) -> Vec<i64> {
        self.lookup(&self.tokenize(text))
    }

    /// Get vocabulary size
    fn vocab_size(&self) -> usize;

    /// Get the ID for unknown tokens
    fn unk_id(&self) -> i64;

    /// Get the ID for padding tokens
    fn pad_id(&self) -> i64;
}

/// Word-level tokenizer backed by a frequency-ranked vocabulary.
///
/// Ids 0 and 1 are reserved for padding and unknown words.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordTokenizer {
    word_to_id: HashMap<String, i64>,
    vocab_size: usize,
}

fn word_pattern() -> &'static Regex {
    // Lowercased word characters plus standalone punctuation marks.
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[a-z0-9']+|[.,!?;:]").expect("invalid token pattern"))
}

impl WordTokenizer {
    /// Build a vocabulary from a corpus of texts, keeping the most frequent
    /// words up to `max_vocab` (reserved ids included in the count).
    pub fn from_corpus<'a, I>(texts: I, max_vocab: usize) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let pattern = word_pattern();
        let mut counts: HashMap<String, usize> = HashMap::new();

        for text in texts {
            let lowered = text.to_lowercase();
            for m in pattern.find_iter(&lowered) {
                *counts.entry(m.as_str().to_string()).or_insert(0) += 1;
            }
        }

        // Rank by frequency, ties broken alphabetically for determinism.
        let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let capacity = max_vocab.saturating_sub(2);
        let mut word_to_id = HashMap::new();
        let mut next_id = 2;

        for (word, _) in ranked.into_iter().take(capacity) {
            word_to_id.insert(word, next_id);
            next_id += 1;
        }

        let vocab_size = next_id as usize;

        Self {
            word_to_id,
            vocab_size,
        }
    }

    /// Create a tokenizer from an explicit word list (mostly for tests and
    /// pretrained artifacts carrying a fixed vocabulary).
    pub fn from_vocab(words: Vec<String>) -> Self {
        let mut word_to_id = HashMap::new();
        let mut next_id = 2;

        for word in words {
            if !word_to_id.contains_key(&word) {
                word_to_id.insert(word, next_id);
                next_id += 1;
            }
        }

        let vocab_size = next_id as usize;

        Self {
            word_to_id,
            vocab_size,
        }
    }

    /// Save tokenizer to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .with_context(|| "Failed to serialize tokenizer")?;

        fs::write(path, json)
            .with_context(|| format!("Failed to write tokenizer to {:?}", path))?;

        Ok(())
    }

    /// Load tokenizer from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read tokenizer from {:?}", path))?;

        let tokenizer: Self = serde_json::from_str(&json)
            .with_context(|| "Failed to deserialize tokenizer")?;

        Ok(tokenizer)
    }
}

impl Tokenizer for WordTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let pattern = word_pattern();
        let lowered = text.to_lowercase();
        pattern
            .find_iter(&lowered)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    fn lookup(&self, tokens: &[String]) -> Vec<i64> {
        tokens
            .iter()
            .map(|word| *self.word_to_id.get(word).unwrap_or(&UNK_ID))
            .collect()
    }

    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn unk_id(&self) -> i64 {
        UNK_ID
    }

    fn pad_id(&self) -> i64 {
        PAD_ID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_words_get_distinct_ids() {
        let tokenizer = WordTokenizer::from_corpus(["this movie is amazing"], 100);
        let ids = tokenizer.encode("This movie is amazing");

        assert_eq!(ids.len(), 4);
        assert!(ids.iter().all(|&id| id >= 2));
        let mut unique = ids.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), 4);
    }

    #[test]
    fn test_unknown_words_map_to_unk() {
        let tokenizer = WordTokenizer::from_corpus(["good film"], 100);
        let ids = tokenizer.encode("terrible acting");

        assert!(ids.iter().all(|&id| id == tokenizer.unk_id()));
    }

    #[test]
    fn test_vocab_capped_at_max() {
        let tokenizer =
            WordTokenizer::from_corpus(["a b c d e f g h i j k l m n o p"], 10);
        assert!(tokenizer.vocab_size() <= 10);
    }

    #[test]
    fn test_tokenize_splits_punctuation() {
        let tokenizer = WordTokenizer::from_vocab(vec![]);
        let tokens = tokenizer.tokenize("Great, truly great!");
        assert_eq!(tokens, vec!["great", ",", "truly", "great", "!"]);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let tokenizer = WordTokenizer::from_corpus(["some words here"], 100);
        let file = tempfile::NamedTempFile::new().unwrap();
        tokenizer.save(file.path()).unwrap();

        let loaded = WordTokenizer::load(file.path()).unwrap();
        assert_eq!(loaded.vocab_size(), tokenizer.vocab_size());
        assert_eq!(loaded.encode("some words"), tokenizer.encode("some words"));
    }
}
