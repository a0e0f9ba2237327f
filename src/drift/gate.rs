use std::collections::BTreeSet;
use std::str::FromStr;

use super::{DriftKind, DriftReport};
use crate::error::{AibomError, Result};

/// Set of drift kinds that block a run when present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Gate {
    kinds: BTreeSet<DriftKind>,
}

impl Gate {
    pub fn new(kinds: impl IntoIterator<Item = DriftKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
        }
    }

    /// Parse a comma-separated list; blank items are ignored.
    pub fn parse(list: &str) -> Result<Self> {
        let kinds = list
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(DriftKind::from_str)
            .collect::<Result<BTreeSet<_>>>()?;
        Ok(Self { kinds })
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn contains(&self, kind: &DriftKind) -> bool {
        self.kinds.contains(kind)
    }

    /// Mark `report` as failed when any record's kind is gated.
    pub fn evaluate(&self, report: &mut DriftReport) {
        let fired: BTreeSet<&DriftKind> = report
            .records
            .iter()
            .map(|record| &record.kind)
            .filter(|kind| self.kinds.contains(kind))
            .collect();

        let mut blocking: Vec<DriftKind> = fired.into_iter().cloned().collect();
        blocking.sort_by_key(|kind| kind.to_string());
        report.gate_failed = !blocking.is_empty();
        report.blocking = blocking;
    }
}

impl FromStr for Gate {
    type Err = AibomError;

    fn from_str(s: &str) -> Result<Self> {
        Gate::parse(s)
    }
}
