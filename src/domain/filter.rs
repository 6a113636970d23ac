//! Search and risk filtering of a record set

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::record::AuditRecord;
use super::stats::RiskBand;

/// Risk selector for the list view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFilter {
    #[default]
    All,
    High,
    Medium,
    Low,
}

impl RiskFilter {
    pub fn admits(&self, band: RiskBand) -> bool {
        match self {
            RiskFilter::All => true,
            RiskFilter::High => band == RiskBand::High,
            RiskFilter::Medium => band == RiskBand::Medium,
            RiskFilter::Low => band == RiskBand::Low,
        }
    }
}

impl FromStr for RiskFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(RiskFilter::All),
            "high" => Ok(RiskFilter::High),
            "medium" => Ok(RiskFilter::Medium),
            "low" => Ok(RiskFilter::Low),
            other => Err(format!("unknown risk filter: {other}")),
        }
    }
}

impl fmt::Display for RiskFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskFilter::All => write!(f, "all"),
            RiskFilter::High => write!(f, "high"),
            RiskFilter::Medium => write!(f, "medium"),
            RiskFilter::Low => write!(f, "low"),
        }
    }
}

/// Case-insensitive substring match on name or description
pub fn matches_search(record: &AuditRecord, search_term: &str) -> bool {
    if search_term.is_empty() {
        return true;
    }
    let needle = search_term.to_lowercase();
    record.name.to_lowercase().contains(&needle)
        || record.description.to_lowercase().contains(&needle)
}

/// Records matching both the search term and the risk filter, in input order
pub fn filter_records(
    records: &[AuditRecord],
    search_term: &str,
    risk_filter: RiskFilter,
) -> Vec<AuditRecord> {
    records
        .iter()
        .filter(|r| matches_search(r, search_term) && risk_filter.admits(r.risk_band()))
        .cloned()
        .collect()
}
