//! Property-based tests using proptest.
//!
//! These tests verify invariants of the statistics and filtering engines
//! that should hold for any record set.

use alloy::primitives::Address;
use proptest::prelude::*;

use fhe_audit::domain::{
    compute_stats, filter_records, matches_search, AuditRecord, RecordId, RiskBand, RiskFilter,
    Score,
};

// ============================================================================
// Custom Strategies
// ============================================================================

/// Generate a score in [1, 10]
fn arb_score() -> impl Strategy<Value = Score> {
    (1i64..=10).prop_map(Score::clamped)
}

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("Token Vault".to_string()),
        Just("bridge".to_string()),
        "[a-zA-Z ]{0,16}".prop_map(|s| s),
    ]
}

fn arb_record() -> impl Strategy<Value = AuditRecord> {
    (
        "[a-z0-9-]{1,12}",
        arb_text(),
        arb_text(),
        arb_score(),
        arb_score(),
        any::<bool>(),
    )
        .prop_map(|(id, name, description, vulnerability, complexity, verified)| AuditRecord {
            id: RecordId::from(id),
            name,
            description,
            creator_address: Address::ZERO,
            created_at: 1_700_000_000,
            public_complexity: complexity,
            public_vulnerability_score: vulnerability,
            is_verified: verified,
            decrypted_value: verified.then_some(vulnerability.get() as u32),
        })
}

fn arb_records() -> impl Strategy<Value = Vec<AuditRecord>> {
    prop::collection::vec(arb_record(), 0..40)
}

fn arb_filter() -> impl Strategy<Value = RiskFilter> {
    prop_oneof![
        Just(RiskFilter::All),
        Just(RiskFilter::High),
        Just(RiskFilter::Medium),
        Just(RiskFilter::Low),
    ]
}

// ============================================================================
// Stats Engine Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_bands_partition_total(records in arb_records()) {
        let stats = compute_stats(&records);
        prop_assert_eq!(stats.total, records.len());
        prop_assert_eq!(stats.high_risk + stats.medium_risk + stats.low_risk, stats.total);
    }

    #[test]
    fn prop_bands_are_disjoint(records in arb_records()) {
        for record in &records {
            let band = record.risk_band();
            let admitted = [RiskFilter::High, RiskFilter::Medium, RiskFilter::Low]
                .iter()
                .filter(|f| f.admits(band))
                .count();
            prop_assert_eq!(admitted, 1);
        }
    }

    #[test]
    fn prop_average_within_score_range(records in arb_records()) {
        let stats = compute_stats(&records);
        if records.is_empty() {
            prop_assert_eq!(stats.avg_vulnerability, 0.0);
        } else {
            prop_assert!(stats.avg_vulnerability >= 1.0);
            prop_assert!(stats.avg_vulnerability <= 10.0);
            // One decimal place at most
            let tenths = stats.avg_vulnerability * 10.0;
            prop_assert!((tenths - tenths.round()).abs() < 1e-9);
        }
    }

    #[test]
    fn prop_band_shares_sum_to_hundred(records in arb_records()) {
        let stats = compute_stats(&records);
        let sum: f64 = [RiskBand::High, RiskBand::Medium, RiskBand::Low]
            .iter()
            .map(|b| stats.band_share(*b))
            .sum();
        if records.is_empty() {
            prop_assert_eq!(sum, 0.0);
        } else {
            prop_assert!((sum - 100.0).abs() < 1e-9);
        }
    }
}

// ============================================================================
// Filter Engine Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_empty_search_all_filter_is_identity(records in arb_records()) {
        prop_assert_eq!(filter_records(&records, "", RiskFilter::All), records);
    }

    #[test]
    fn prop_filter_is_order_preserving_subset(
        records in arb_records(),
        term in "[a-zA-Z]{0,3}",
        filter in arb_filter(),
    ) {
        let filtered = filter_records(&records, &term, filter);

        // Every kept record matches, and they appear in input order
        let mut cursor = records.iter();
        for kept in &filtered {
            prop_assert!(matches_search(kept, &term));
            prop_assert!(filter.admits(kept.risk_band()));
            prop_assert!(cursor.any(|r| r == kept));
        }

        // Nothing matching was dropped
        let expected = records
            .iter()
            .filter(|r| matches_search(r, &term) && filter.admits(r.risk_band()))
            .count();
        prop_assert_eq!(filtered.len(), expected);
    }

    #[test]
    fn prop_search_is_case_insensitive(records in arb_records(), term in "[a-zA-Z]{1,4}") {
        let lower = filter_records(&records, &term.to_lowercase(), RiskFilter::All);
        let upper = filter_records(&records, &term.to_uppercase(), RiskFilter::All);
        prop_assert_eq!(lower, upper);
    }

    #[test]
    fn prop_band_filters_partition_records(records in arb_records()) {
        let stats = compute_stats(&records);
        prop_assert_eq!(filter_records(&records, "", RiskFilter::High).len(), stats.high_risk);
        prop_assert_eq!(filter_records(&records, "", RiskFilter::Medium).len(), stats.medium_risk);
        prop_assert_eq!(filter_records(&records, "", RiskFilter::Low).len(), stats.low_risk);
    }
}
