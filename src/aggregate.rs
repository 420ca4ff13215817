//! Result aggregation.
//!
//! Two modes are kept side by side because they deduplicate differently:
//!
//! - [`ReportMode::ByClass`]: every match is kept, grouped and ordered by
//!   caller class name, then in scan order within a class.
//! - [`ReportMode::Unique`]: an unordered set; identical caller/callee pairs
//!   collapse into one.

use clap::ValueEnum;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashSet};

use crate::scanner::MatchResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportMode {
    #[default]
    ByClass,
    Unique,
}

#[derive(Debug, Clone)]
pub enum MatchReport {
    ByClass(BTreeMap<String, Vec<MatchResult>>),
    Unique(HashSet<MatchResult>),
}

impl MatchReport {
    pub fn new(mode: ReportMode) -> Self {
        match mode {
            ReportMode::ByClass => MatchReport::ByClass(BTreeMap::new()),
            ReportMode::Unique => MatchReport::Unique(HashSet::new()),
        }
    }

    pub fn insert(&mut self, result: MatchResult) {
        match self {
            MatchReport::ByClass(by_class) => by_class
                .entry(result.caller_class.clone())
                .or_default()
                .push(result),
            MatchReport::Unique(set) => {
                set.insert(result);
            }
        }
    }

    pub fn extend(&mut self, results: impl IntoIterator<Item = MatchResult>) {
        for result in results {
            self.insert(result);
        }
    }

    /// Folds a partial report produced by another unit of work into this one.
    pub fn merge(&mut self, other: MatchReport) {
        match other {
            MatchReport::ByClass(by_class) => self.extend(by_class.into_values().flatten()),
            MatchReport::Unique(set) => self.extend(set),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            MatchReport::ByClass(by_class) => by_class.values().map(Vec::len).sum(),
            MatchReport::Unique(set) => set.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ordered by caller class in `ByClass` mode, arbitrary in `Unique` mode.
    pub fn iter(&self) -> Box<dyn Iterator<Item = &MatchResult> + '_> {
        match self {
            MatchReport::ByClass(by_class) => Box::new(by_class.values().flatten()),
            MatchReport::Unique(set) => Box::new(set.iter()),
        }
    }

    /// Distinct caller identities, in iteration order.
    pub fn callers(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.iter()
            .map(|m| m.caller.as_str())
            .filter(|caller| seen.insert(*caller))
            .collect()
    }
}

impl Serialize for MatchReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}
