// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Canonical label sets.
//!
//! Labels are part of series identity. The set is stored as an ordered map,
//! so two label sets built in different insertion orders compare, hash, and
//! serialize identically.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// An ordered mapping from label name to label value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet(BTreeMap<String, String>);

impl LabelSet {
    /// The empty label set.
    #[must_use]
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Returns `true` when the set holds no labels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of labels in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Looks up a label value by name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Inserts or replaces a label.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let _ = self.0.insert(key.into(), value.into());
    }

    /// Builder-style [`LabelSet::insert`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Iterates labels in canonical (sorted) order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns `true` when every label in `self` appears in `other` with the
    /// same value.
    ///
    /// A missing label never matches: `{env=prod}` is not a subset of a set
    /// without `env`.
    #[must_use]
    pub fn is_subset_of(&self, other: &LabelSet) -> bool {
        self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for LabelSet {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{k}=\"{v}\"")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_insertion_order_insensitive() {
        let a = LabelSet::empty().with("env", "prod").with("zone", "us");
        let b = LabelSet::empty().with("zone", "us").with("env", "prod");
        assert_eq!(a, b);
    }

    #[test]
    fn subset_requires_presence_and_equality() {
        let rule = LabelSet::from([("env", "prod")]);
        let series = LabelSet::from([("env", "prod"), ("zone", "us")]);
        assert!(rule.is_subset_of(&series));

        let unlabeled = LabelSet::empty();
        assert!(!rule.is_subset_of(&unlabeled));
        assert!(unlabeled.is_subset_of(&series));

        let other_value = LabelSet::from([("env", "dev"), ("zone", "us")]);
        assert!(!rule.is_subset_of(&other_value));
    }

    #[test]
    fn display_is_canonical() {
        let labels = LabelSet::empty().with("m", "GET").with("code", "200");
        assert_eq!(labels.to_string(), "{code=\"200\",m=\"GET\"}");
    }
}
