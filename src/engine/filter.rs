use std::collections::BTreeSet;

use crate::feed::types::CaseRecord;

/// Which slice of the statewide data to chart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Exact county name as it appears in the data (e.g. "Orange"). `None` is statewide.
    pub county: Option<String>,
    pub deaths_only: bool,
}

impl Selection {
    pub fn matches(&self, record: &CaseRecord) -> bool {
        if let Some(county) = &self.county {
            if record.county.as_deref() != Some(county.as_str()) {
                return false;
            }
        }
        !self.deaths_only || record.died()
    }

    pub fn apply(&self, records: Vec<CaseRecord>) -> Vec<CaseRecord> {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}

/// Distinct county names, sorted.
pub fn counties(records: &[CaseRecord]) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| r.county.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
