//! Quality flags for enriched records.
//!
//! Both flags are pure functions of a record and the configured thresholds.
use crate::models::EnrichedRecord;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Maximum allowed difference, in degrees, on either axis between the
    /// input coordinates and the building center.
    pub coord_tolerance: f64,
    pub min_panels: i64,
    pub max_panels: i64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            coord_tolerance: 0.0005,
            min_panels: 10,
            max_panels: 2000,
        }
    }
}

/// Drops records that have no insight or a non-positive panel count.
pub fn retain_flaggable(records: &[EnrichedRecord]) -> Vec<EnrichedRecord> {
    records
        .iter()
        .filter(|r| r.insight.as_ref().is_some_and(|i| i.panel_count > 0))
        .cloned()
        .collect()
}

pub fn flag(mut record: EnrichedRecord, thresholds: &Thresholds) -> EnrichedRecord {
    record.data_verification = data_verification(&record, thresholds);
    record.output_verification = output_verification(&record, thresholds);
    record
}

pub fn flag_all(records: Vec<EnrichedRecord>, thresholds: &Thresholds) -> Vec<EnrichedRecord> {
    records.into_iter().map(|r| flag(r, thresholds)).collect()
}

fn data_verification(record: &EnrichedRecord, thresholds: &Thresholds) -> bool {
    match (&record.insight, record.record.coordinates()) {
        (Some(insight), Some((lat, lng))) => {
            (lat - insight.center_latitude).abs() > thresholds.coord_tolerance
                || (lng - insight.center_longitude).abs() > thresholds.coord_tolerance
        }
        _ => false,
    }
}

fn output_verification(record: &EnrichedRecord, thresholds: &Thresholds) -> bool {
    record
        .insight
        .as_ref()
        .is_some_and(|i| i.panel_count < thresholds.min_panels || i.panel_count > thresholds.max_panels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AddressRecord, BuildingInsight, QualityTier};

    fn enriched(lat: f64, lng: f64, insight: Option<BuildingInsight>) -> EnrichedRecord {
        EnrichedRecord::new(
            AddressRecord {
                row: 0,
                store_name: "Store".into(),
                address: "1 Main St".into(),
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
            yearly_energy_kwh: 1000.0,
            solar_area_m2: 50.0,
            quality_tier: QualityTier::High,
        }
    }

    #[test]
    fn latitude_drift_beyond_tolerance_sets_data_flag() {
        let record = enriched(37.0, -122.0, Some(insight(37.0006, -122.0, 100)));
        assert!(flag(record, &Thresholds::default()).data_verification);
    }

    #[test]
    fn drift_within_tolerance_leaves_data_flag_clear() {
        let record = enriched(37.0, -122.0, Some(insight(37.0004, -121.9996, 100)));
        assert!(!flag(record, &Thresholds::default()).data_verification);
    }

    #[test]
    fn longitude_drift_alone_sets_data_flag() {
        let record = enriched(37.0, -122.0, Some(insight(37.0, -122.001, 100)));
        assert!(flag(record, &Thresholds::default()).data_verification);
    }

    #[test]
    fn no_insight_means_no_flags() {
        let flagged = flag(enriched(0.0, 0.0, None), &Thresholds::default());
        assert!(!flagged.data_verification);
        assert!(!flagged.output_verification);
    }

    #[test]
    fn panel_bounds() {
        let thresholds = Thresholds::default();
        assert!(flag(enriched(1.0, 1.0, Some(insight(1.0, 1.0, 5))), &thresholds).output_verification);
        assert!(!flag(enriched(1.0, 1.0, Some(insight(1.0, 1.0, 500))), &thresholds).output_verification);
        assert!(flag(enriched(1.0, 1.0, Some(insight(1.0, 1.0, 2001))), &thresholds).output_verification);
        assert!(!flag(enriched(1.0, 1.0, Some(insight(1.0, 1.0, 10))), &thresholds).output_verification);
        assert!(!flag(enriched(1.0, 1.0, Some(insight(1.0, 1.0, 2000))), &thresholds).output_verification);
    }

    #[test]
    fn filter_drops_missing_and_non_positive_panels() {
        let records = vec![
            enriched(1.0, 1.0, None),
            enriched(1.0, 1.0, Some(insight(1.0, 1.0, 0))),
            enriched(1.0, 1.0, Some(insight(1.0, 1.0, 3))),
        ];
        let kept = retain_flaggable(&records);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].insight.as_ref().unwrap().panel_count, 3);
    }
}
