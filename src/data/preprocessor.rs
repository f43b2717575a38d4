// ============================================================
// Layer 4 - Pair Encoder
// ============================================================
// Turns raw (text_a, text_b) pairs into the three Feature
// Bundle columns the classifier expects.
//
// Sequence layout (BERT sentence-pair format):
//
//   tokens:      [CLS] a1 a2 a3 [SEP] b1 b2 [SEP] [PAD] [PAD]
//   segment_id:    0   0  0  0    0   1  1    1     0     0
//   input_mask:    1   1  1  1    1   1  1    1     0     0
//
// When a pair is too long, tokens are dropped from the end of
// whichever sentence is currently longer until the pair plus its
// three special tokens fits in max_seq_len.
//
// Reference: Devlin et al. (2019) BERT §3.2 (input representation)

use anyhow::{anyhow, Result};
use tokenizers::Tokenizer;

use crate::domain::bundle::{FeatureBundle, HostTensor, LabelVector, RawInput};

const SPECIAL_TOKENS_PER_PAIR: usize = 3;

/// One line of a pairs.tsv file.
#[derive(Debug, Clone, PartialEq)]
pub struct TextPair {
    pub text_a: String,
    pub text_b: String,
    pub label:  Option<i64>,
}

/// Collapse runs of whitespace (tabs, newlines, NBSP...) into single spaces.
pub fn normalise(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The three padded rows of one encoded pair.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedPair {
    pub input_id:   Vec<i64>,
    pub segment_id: Vec<i64>,
    pub input_mask: Vec<i64>,
}

pub struct PairEncoder {
    tokenizer:   Tokenizer,
    max_seq_len: usize,
    cls_id:      u32,
    sep_id:      u32,
    pad_id:      u32,
}

impl PairEncoder {
    pub fn new(tokenizer: Tokenizer, max_seq_len: usize) -> Self {
        // Fall back to the bert-base-uncased ids when the vocabulary lacks them
        let cls_id = tokenizer.token_to_id("[CLS]").unwrap_or(101);
        let sep_id = tokenizer.token_to_id("[SEP]").unwrap_or(102);
        let pad_id = tokenizer.token_to_id("[PAD]").unwrap_or(0);
        Self { tokenizer, max_seq_len, cls_id, sep_id, pad_id }
    }

    pub fn encode(&self, text_a: &str, text_b: &str) -> Result<EncodedPair> {
        let mut a = self.token_ids(text_a)?;
        let mut b = self.token_ids(text_b)?;

        let budget = self.max_seq_len.saturating_sub(SPECIAL_TOKENS_PER_PAIR);
        while a.len() + b.len() > budget {
            if a.len() > b.len() {
                a.pop();
            } else {
                b.pop();
            }
        }

        let mut input_id   = Vec::with_capacity(self.max_seq_len);
        let mut segment_id = Vec::with_capacity(self.max_seq_len);

        input_id.push(self.cls_id);
        input_id.extend_from_slice(&a);
        input_id.push(self.sep_id);
        segment_id.resize(input_id.len(), 0);

        input_id.extend_from_slice(&b);
        input_id.push(self.sep_id);
        segment_id.resize(input_id.len(), 1);

        let mut input_mask = vec![1; input_id.len()];

        input_id.resize(self.max_seq_len, self.pad_id);
        segment_id.resize(self.max_seq_len, 0);
        input_mask.resize(self.max_seq_len, 0);

        Ok(EncodedPair {
            input_id: input_id.into_iter().map(i64::from).collect(),
            segment_id,
            input_mask,
        })
    }

    /// Encode every pair into a Feature Bundle. Labels are returned
    /// only when every pair carries one.
    pub fn encode_all(&self, pairs: &[TextPair]) -> Result<(FeatureBundle, Option<LabelVector>)> {
        let mut ids  = Vec::with_capacity(pairs.len());
        let mut segs = Vec::with_capacity(pairs.len());
        let mut mask = Vec::with_capacity(pairs.len());

        for pair in pairs {
            let enc = self.encode(&pair.text_a, &pair.text_b)?;
            ids.push(enc.input_id);
            segs.push(enc.segment_id);
            mask.push(enc.input_mask);
        }

        let features = FeatureBundle::new(
            RawInput::Tensor(HostTensor::from_rows(&ids)?),
            RawInput::Tensor(HostTensor::from_rows(&segs)?),
            RawInput::Tensor(HostTensor::from_rows(&mask)?),
        );

        let labels: Option<Vec<i64>> = pairs.iter().map(|p| p.label).collect();
        Ok((features, labels.map(LabelVector::from_classes)))
    }

    fn token_ids(&self, text: &str) -> Result<Vec<u32>> {
        let enc = self
            .tokenizer
            .encode(normalise(text), false)
            .map_err(|e| anyhow!("Tokenisation error: {e}"))?;
        Ok(enc.get_ids().to_vec())
    }
}
