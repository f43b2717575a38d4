// ============================================================
// Layer 6 - Tokenizer Store
// ============================================================
// Supplies the tokenizer for splits stored as raw text pairs.
// Either a tokenizer.json given on the command line is loaded,
// or a word-level vocabulary is built from the training texts
// and saved next to the checkpoint so `predict` reuses it.
//
// In tokenizers 0.15, train_from_files requires Trainer::Model
// to equal ModelWrapper. The vocabulary is therefore written as
// tokenizer JSON directly and loaded back with from_file.
//
// Ids follow the bert-base-uncased layout for special tokens:
//   [PAD]=0 [UNK]=1 [CLS]=101 [SEP]=102 [MASK]=103, words from 104

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context, Result};
use tokenizers::Tokenizer;

pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// First id handed to a corpus word.
const FIRST_WORD_ID: usize = 104;

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(TOKENIZER_FILE)
    }

    /// Load the stored tokenizer, or build one from `texts` whose ids
    /// all stay below `vocab_size`.
    pub fn load_or_build(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        if self.path().exists() {
            tracing::info!("Loading existing tokenizer from '{}'", self.path().display());
            self.load()
        } else {
            tracing::info!("Building new tokenizer (vocab_size={})", vocab_size);
            self.build_and_save(texts, vocab_size)
        }
    }

    pub fn load(&self) -> Result<Tokenizer> {
        load_from(&self.path())
    }

    fn build_and_save(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        if vocab_size <= FIRST_WORD_ID {
            bail!("vocab_size must exceed {FIRST_WORD_ID} to leave room for words, got {vocab_size}");
        }
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let mut freq: HashMap<String, usize> = HashMap::new();
        for text in texts {
            for word in text.split_whitespace() {
                let w = word.to_lowercase();
                let w = w.trim_matches(|c: char| !c.is_alphanumeric());
                if !w.is_empty() {
                    *freq.entry(w.to_string()).or_insert(0) += 1;
                }
            }
        }

        // Frequency first, then alphabetical so rebuilds are reproducible
        let mut words: Vec<(String, usize)> = freq.into_iter().collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        words.truncate(vocab_size - FIRST_WORD_ID);

        let mut vocab = serde_json::json!({
            "[PAD]":  0,
            "[UNK]":  1,
            "[CLS]":  101,
            "[SEP]":  102,
            "[MASK]": 103,
        });
        let mut next_id = FIRST_WORD_ID;
        for (word, _) in &words {
            if vocab.get(word).is_none() {
                vocab[word] = serde_json::json!(next_id);
                next_id += 1;
            }
        }

        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [
                {"id": 0,   "content": "[PAD]",  "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": 1,   "content": "[UNK]",  "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": 101, "content": "[CLS]",  "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": 102, "content": "[SEP]",  "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": 103, "content": "[MASK]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true}
            ],
            "normalizer": {
                "type": "BertNormalizer",
                "clean_text": true,
                "handle_chinese_chars": true,
                "strip_accents": null,
                "lowercase": true
            },
            "pre_tokenizer": { "type": "Whitespace" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": "[UNK]"
            }
        });

        let path = self.path();
        fs::write(&path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;

        tracing::info!(
            "Tokenizer built with {} words, saved to '{}'",
            next_id - FIRST_WORD_ID,
            path.display()
        );
        load_from(&path)
    }
}

/// Load any HuggingFace tokenizer.json.
pub fn load_from(path: &Path) -> Result<Tokenizer> {
    Tokenizer::from_file(path)
        .map_err(|e| anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<String> {
        vec!["the cat sat".into(), "The dog, the end.".into()]
    }

    #[test]
    fn test_build_then_reload() {
        let dir   = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path());

        let built = store.load_or_build(&corpus(), 200).unwrap();
        // "the" is the most frequent word
        assert_eq!(built.token_to_id("the"), Some(104));
        assert_eq!(built.token_to_id("[CLS]"), Some(101));
        assert!(store.path().exists());

        // Second call loads the file instead of rebuilding
        let loaded = store.load_or_build(&[], 200).unwrap();
        assert_eq!(loaded.token_to_id("cat"), built.token_to_id("cat"));
    }

    #[test]
    fn test_vocab_is_capped() {
        let dir   = tempfile::tempdir().unwrap();
        let tok   = TokenizerStore::new(dir.path()).load_or_build(&corpus(), 106).unwrap();
        let ids   = tok.encode("the cat sat dog end", false).unwrap();
        assert!(ids.get_ids().iter().all(|&id| (id as usize) < 106));
    }

    #[test]
    fn test_too_small_vocab_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(TokenizerStore::new(dir.path()).load_or_build(&corpus(), 100).is_err());
    }
}
