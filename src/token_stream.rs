//! Token stream produced by pass 1
//!
//! Records are appended in match order. Numeric constants and character labels
//! are stored beside the records, keyed by the index of the record they belong
//! to, so truncating the stream on backtrack drops them in one step.

use crate::symbols::TokenId;
use serde::Serialize;
use std::collections::BTreeMap;

/// One matched terminal
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TokenRecord {
    pub token: TokenId,
    /// Nonterminal whose production matched this terminal
    pub rule: TokenId,
    pub line: usize,
    /// Byte offset of the match in the source
    pub offset: usize,
}

/// Label accumulation state, saved and restored with checkpoints
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelMark {
    active: bool,
    key: usize,
    text_len: Option<usize>,
}

/// Ordered token records with attached constants and labels
#[derive(Debug, Clone, Default, Serialize)]
pub struct TokenStream {
    records: Vec<TokenRecord>,
    constants: BTreeMap<usize, f64>,
    labels: BTreeMap<usize, String>,
    #[serde(skip)]
    label_active: bool,
    #[serde(skip)]
    label_key: usize,
}

impl TokenStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[TokenRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&TokenRecord> {
        self.records.get(index)
    }

    pub fn push(&mut self, record: TokenRecord) {
        self.records.push(record);
    }

    /// Token ids in stream order
    pub fn ids(&self) -> Vec<TokenId> {
        self.records.iter().map(|record| record.token).collect()
    }

    /// Drop every record at or after `len` together with its constant or label
    pub fn truncate(&mut self, len: usize) {
        self.records.truncate(len);
        self.constants.split_off(&len);
        self.labels.split_off(&len);
    }

    pub fn insert_constant(&mut self, index: usize, value: f64) {
        self.constants.insert(index, value);
    }

    pub fn constant(&self, index: usize) -> Option<f64> {
        self.constants.get(&index).copied()
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(&index).map(String::as_str)
    }

    pub fn constants(&self) -> &BTreeMap<usize, f64> {
        &self.constants
    }

    pub fn labels(&self) -> &BTreeMap<usize, String> {
        &self.labels
    }

    pub fn label_active(&self) -> bool {
        self.label_active
    }

    /// Index of the record that owns the active label
    pub fn label_key(&self) -> usize {
        self.label_key
    }

    /// Start a label owned by the next record to be pushed
    pub fn begin_label(&mut self) {
        self.label_active = true;
        self.label_key = self.records.len();
        self.labels.insert(self.label_key, String::new());
    }

    pub fn push_label_char(&mut self, ch: char) {
        if self.label_active {
            self.labels.entry(self.label_key).or_default().push(ch);
        }
    }

    pub fn end_label(&mut self) {
        self.label_active = false;
    }

    pub fn label_mark(&self) -> LabelMark {
        LabelMark {
            active: self.label_active,
            key: self.label_key,
            text_len: self.labels.get(&self.label_key).map(String::len),
        }
    }

    /// Restore label state; must follow `truncate` to the same checkpoint
    pub fn restore_label(&mut self, mark: LabelMark) {
        self.label_active = mark.active;
        self.label_key = mark.key;
        if let Some(len) = mark.text_len {
            if let Some(text) = self.labels.get_mut(&mark.key) {
                text.truncate(len);
            }
        }
    }
}
