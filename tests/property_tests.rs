/// Property-based tests using proptest
/// Tests invariants that should hold for all inputs
use proptest::prelude::*;
use serde_json::json;
use solar_insights_enrichment::archive::normalize_key;
use solar_insights_enrichment::flagging::{flag, retain_flaggable, Thresholds};
use solar_insights_enrichment::models::{AddressRecord, BuildingInsight, EnrichedRecord, QualityTier};
use solar_insights_enrichment::services::extract_insight;

fn record(lat: f64, lng: f64, insight: Option<BuildingInsight>) -> EnrichedRecord {
    EnrichedRecord::new(
        AddressRecord {
            row: 0,
            store_name: "Store".to_string(),
            address: "1 Main St".to_string(),
            latitude: Some(lat),
            longitude: Some(lng),
        },
        insight,
    )
}

fn insight(center_lat: f64, center_lng: f64, panels: i64) -> BuildingInsight {
    BuildingInsight {
        center_latitude: center_lat,
        center_longitude: center_lng,
        panel_count: panels,
        yearly_energy_kwh: 1.0,
        solar_area_m2: 1.0,
        quality_tier: QualityTier::High,
    }
}

fn thresholds() -> impl Strategy<Value = Thresholds> {
    (0.0f64..0.01, 0i64..100, 100i64..5000).prop_map(|(coord_tolerance, min_panels, max_panels)| Thresholds {
        coord_tolerance,
        min_panels,
        max_panels,
    })
}

// Property: flagging is a pure function
proptest! {
    #[test]
    fn flagging_is_idempotent(
        lat in -90.0f64..90.0,
        lng in -180.0f64..180.0,
        d_lat in -0.01f64..0.01,
        d_lng in -0.01f64..0.01,
        panels in 1i64..10_000,
        t in thresholds()
    ) {
        let once = flag(record(lat, lng, Some(insight(lat + d_lat, lng + d_lng, panels))), &t);
        let twice = flag(once.clone(), &t);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn no_insight_never_flags(lat in -90.0f64..90.0, lng in -180.0f64..180.0, t in thresholds()) {
        let flagged = flag(record(lat, lng, None), &t);
        prop_assert!(!flagged.data_verification);
        prop_assert!(!flagged.output_verification);
    }

    #[test]
    fn output_flag_matches_bounds(panels in 1i64..10_000, t in thresholds()) {
        let flagged = flag(record(0.0, 0.0, Some(insight(0.0, 0.0, panels))), &t);
        prop_assert_eq!(flagged.output_verification, panels < t.min_panels || panels > t.max_panels);
    }

    #[test]
    fn filter_keeps_only_positive_panels(panels in prop::collection::vec(-5i64..50, 0..20)) {
        let records: Vec<EnrichedRecord> = panels
            .iter()
            .map(|p| record(0.0, 0.0, Some(insight(0.0, 0.0, *p))))
            .collect();
        let kept = retain_flaggable(&records);
        prop_assert_eq!(kept.len(), panels.iter().filter(|p| **p > 0).count());
        prop_assert!(kept.iter().all(|r| r.insight.as_ref().unwrap().panel_count > 0));
    }
}

// Property: archive names are filesystem-safe
proptest! {
    #[test]
    fn normalized_keys_are_safe(key in "\\PC*") {
        let name = normalize_key(&key);
        prop_assert!(!name.is_empty());
        prop_assert!(name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
        prop_assert!(!name.starts_with('_') && !name.ends_with('_'));
    }

    #[test]
    fn path_separators_become_dashes(left in "[a-z]{1,8}", right in "[a-z]{1,8}") {
        prop_assert_eq!(normalize_key(&format!("{}/{}", left, right)), format!("{}-{}", left, right));
    }
}

// Property: the last (largest) configuration is selected
proptest! {
    #[test]
    fn extraction_selects_largest_of_sorted_configs(mut counts in prop::collection::vec(1i64..5000, 1..30)) {
        counts.sort_unstable();
        let configs: Vec<_> = counts
            .iter()
            .map(|c| json!({"panelsCount": c, "yearlyEnergyDcKwh": *c as f64 * 380.0}))
            .collect();
        let raw = json!({
            "center": {"latitude": 1.0, "longitude": 2.0},
            "solarPotential": {"maxArrayAreaMeters2": 10.0, "solarPanelConfigs": configs}
        });
        let insight = extract_insight(&raw, QualityTier::Medium).unwrap();
        prop_assert_eq!(insight.panel_count, *counts.iter().max().unwrap());
    }
}
