//! Batches of codes observed in one analysis tick

use std::collections::BTreeSet;

/// Distinct strings read from QR codes visible at the same time.
///
/// Set semantics: duplicates collapse and order is irrelevant. Iteration is
/// sorted, which makes result ordering within a batch deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeBatch {
    codes: BTreeSet<String>,
}

impl CodeBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batch holding a single code
    pub fn single(code: impl Into<String>) -> Self {
        Self { codes: BTreeSet::from([code.into()]) }
    }

    pub fn insert(&mut self, code: impl Into<String>) -> bool {
        self.codes.insert(code.into())
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(code)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.codes.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for CodeBatch {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self { codes: iter.into_iter().map(Into::into).collect() }
    }
}

impl IntoIterator for CodeBatch {
    type Item = String;
    type IntoIter = std::collections::btree_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.codes.into_iter()
    }
}
