//! Crop label encoding.
//!
//! Labels are mapped to integer class indices in alphabetical order of
//! their text, so the same label set always yields the same mapping.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Builds the encoder from every label seen in the corpus.
    pub fn fit<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let classes: BTreeSet<String> = labels
            .into_iter()
            .map(|l| l.as_ref().to_string())
            .collect();
        Self {
            classes: classes.into_iter().collect(),
        }
    }

    /// Rebuilds an encoder from a persisted class list. Returns `None` when
    /// the list is not strictly sorted (duplicates or wrong order), since a
    /// reordered list would silently remap the forest's class indices.
    pub fn from_classes(classes: Vec<String>) -> Option<Self> {
        if classes.windows(2).all(|w| w[0] < w[1]) {
            Some(Self { classes })
        } else {
            None
        }
    }

    pub fn transform(&self, label: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(label))
            .ok()
    }

    pub fn inverse(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
