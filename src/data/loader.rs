// ============================================================
// Layer 4 - Split Loader
// ============================================================
// Reads one split from <data_dir>/<split>/, in either of two
// layouts:
//
//   features.json  pre-tokenised Feature Bundle
//                  {
//                    "input_id":   [[101, 2023, ...], ...],
//                    "segment_id": [[0, 0, ...], ...],
//                    "input_mask": [[1, 1, ...], ...],
//                    "sim":        [0, 1, ...]        (optional)
//                  }
//
//   pairs.tsv      raw text, one pair per line
//                  text_a <TAB> text_b [<TAB> label]
//                  encoded with the PairEncoder at load time
//
// features.json wins when both exist. Columns from JSON are
// handed over untouched (RawInput::Json); coercion decides later
// whether they are usable.
//
// Reference: Rust Book §9 (Error Handling), §12 (I/O)

use std::{
    fs,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use serde_json::Value;

use crate::data::preprocessor::{PairEncoder, TextPair};
use crate::domain::bundle::{FeatureBundle, LabelVector, RawInput, SplitData, INPUT_ID, INPUT_MASK, SEGMENT_ID};
use crate::domain::error::DataError;
use crate::domain::traits::SplitSource;

pub const FEATURES_FILE: &str = "features.json";
pub const PAIRS_FILE: &str = "pairs.tsv";

pub struct SplitLoader {
    data_dir:  PathBuf,
    label_key: String,
    encoder:   Option<PairEncoder>,
}

impl SplitLoader {
    pub fn new(data_dir: impl Into<PathBuf>, label_key: impl Into<String>) -> Self {
        Self { data_dir: data_dir.into(), label_key: label_key.into(), encoder: None }
    }

    /// Needed only for splits stored as pairs.tsv.
    pub fn with_encoder(mut self, encoder: PairEncoder) -> Self {
        self.encoder = Some(encoder);
        self
    }

    pub fn split_dir(&self, split: &str) -> PathBuf {
        self.data_dir.join(split)
    }

    /// Raw text pairs of `split`, if it is stored as pairs.tsv.
    pub fn read_pairs(&self, split: &str) -> Result<Option<Vec<TextPair>>> {
        let path = self.split_dir(split).join(PAIRS_FILE);
        if !path.exists() {
            return Ok(None);
        }
        read_pairs_tsv(&path).map(Some)
    }

    fn load_features_json(&self, split: &str, path: &Path) -> Result<SplitData> {
        let file = fs::File::open(path)
            .with_context(|| format!("Cannot open '{}'", path.display()))?;
        let value: Value = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Invalid JSON in '{}'", path.display()))?;

        let Value::Object(mut map) = value else {
            bail!("'{}' must hold a JSON object of feature columns", path.display());
        };

        let mut column = |name: &str| -> Result<RawInput> {
            map.remove(name)
                .map(RawInput::Json)
                .ok_or_else(|| DataError::MissingColumn(name.to_string()).into())
        };

        let features = FeatureBundle::new(column(INPUT_ID)?, column(SEGMENT_ID)?, column(INPUT_MASK)?);
        let labels   = map.remove(&self.label_key).map(|v| LabelVector(RawInput::Json(v)));

        Ok(SplitData { name: split.to_string(), features, labels })
    }
}

impl SplitSource for SplitLoader {
    fn load_split(&self, split: &str) -> Result<SplitData> {
        let dir      = self.split_dir(split);
        let features = dir.join(FEATURES_FILE);
        let pairs    = dir.join(PAIRS_FILE);

        let data = if features.exists() {
            self.load_features_json(split, &features)?
        } else if pairs.exists() {
            let Some(encoder) = &self.encoder else {
                bail!("Split '{split}' is stored as {PAIRS_FILE} but no tokenizer was configured");
            };
            let rows = read_pairs_tsv(&pairs)?;
            let (features, labels) = encoder.encode_all(&rows)?;
            SplitData { name: split.to_string(), features, labels }
        } else {
            bail!(
                "No {FEATURES_FILE} or {PAIRS_FILE} under '{}'",
                dir.display()
            );
        };

        tracing::info!(
            "Loaded split '{}' ({})",
            split,
            if data.labels.is_some() { "labelled" } else { "unlabelled" }
        );
        Ok(data)
    }
}

/// Parse `text_a<TAB>text_b[<TAB>label]` lines; blank lines are skipped.
pub fn read_pairs_tsv(path: &Path) -> Result<Vec<TextPair>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;

    let mut pairs = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let label = match fields.len() {
            2 => None,
            3 => Some(
                fields[2]
                    .trim()
                    .parse::<i64>()
                    .with_context(|| format!("{}:{}: bad label '{}'", path.display(), lineno + 1, fields[2]))?,
            ),
            n => bail!("{}:{}: expected 2 or 3 tab-separated fields, found {n}", path.display(), lineno + 1),
        };
        pairs.push(TextPair {
            text_a: fields[0].to_string(),
            text_b: fields[1].to_string(),
            label,
        });
    }

    tracing::debug!("Read {} pairs from '{}'", pairs.len(), path.display());
    Ok(pairs)
}
