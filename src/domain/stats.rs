//! Risk statistics over a record set
//!
//! Bands are derived from the public vulnerability score only:
//! high `s >= 8`, medium `5 <= s < 8`, low `s < 5`.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::record::AuditRecord;
use super::types::Score;

/// Lower bound (inclusive) of the high band
pub const HIGH_RISK_THRESHOLD: u8 = 8;

/// Lower bound (inclusive) of the medium band
pub const MEDIUM_RISK_THRESHOLD: u8 = 5;

/// Risk band of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    High,
    Medium,
    Low,
}

impl RiskBand {
    pub fn of(score: Score) -> Self {
        let s = score.get();
        if s >= HIGH_RISK_THRESHOLD {
            RiskBand::High
        } else if s >= MEDIUM_RISK_THRESHOLD {
            RiskBand::Medium
        } else {
            RiskBand::Low
        }
    }

    /// Badge text
    pub fn label(&self) -> &'static str {
        match self {
            RiskBand::High => "HIGH",
            RiskBand::Medium => "MEDIUM",
            RiskBand::Low => "LOW",
        }
    }
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskBand::High => write!(f, "high"),
            RiskBand::Medium => write!(f, "medium"),
            RiskBand::Low => write!(f, "low"),
        }
    }
}

/// Aggregate statistics, recomputed from the record set on demand
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskStatistics {
    pub total: usize,
    pub high_risk: usize,
    pub medium_risk: usize,
    pub low_risk: usize,
    /// Mean public vulnerability score, rounded half-up to one decimal
    pub avg_vulnerability: f64,
}

impl RiskStatistics {
    pub fn count(&self, band: RiskBand) -> usize {
        match band {
            RiskBand::High => self.high_risk,
            RiskBand::Medium => self.medium_risk,
            RiskBand::Low => self.low_risk,
        }
    }

    /// Share of `band` in percent, against `max(total, 1)`
    pub fn band_share(&self, band: RiskBand) -> f64 {
        self.count(band) as f64 * 100.0 / self.total.max(1) as f64
    }
}

/// Compute statistics for a record set
pub fn compute_stats(records: &[AuditRecord]) -> RiskStatistics {
    let mut stats = RiskStatistics {
        total: records.len(),
        ..RiskStatistics::default()
    };

    let mut sum: u64 = 0;
    for record in records {
        sum += u64::from(record.public_vulnerability_score.get());
        match record.risk_band() {
            RiskBand::High => stats.high_risk += 1,
            RiskBand::Medium => stats.medium_risk += 1,
            RiskBand::Low => stats.low_risk += 1,
        }
    }

    stats.avg_vulnerability = mean_one_decimal(sum, records.len() as u64);
    stats
}

/// `sum / count` rounded half-up to one decimal, in integer arithmetic so
/// that e.g. 2.25 never lands on the wrong side through float error.
fn mean_one_decimal(sum: u64, count: u64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let tenths = (sum * 20 + count) / (count * 2);
    tenths as f64 / 10.0
}
