/// Unit tests for the flagging rules
/// Covers the documented threshold examples and the filter-before-flag ordering
use solar_insights_enrichment::flagging::{flag, flag_all, retain_flaggable, Thresholds};
use solar_insights_enrichment::models::{AddressRecord, BuildingInsight, EnrichedRecord, QualityTier};

fn store(row: usize, lat: Option<f64>, lng: Option<f64>) -> AddressRecord {
    AddressRecord {
        row,
        store_name: format!("Store {}", row),
        address: format!("{} Market St", row),
        latitude: lat,
        longitude: lng,
    }
}

fn insight(center_lat: f64, center_lng: f64, panels: i64) -> BuildingInsight {
    BuildingInsight {
        center_latitude: center_lat,
        center_longitude: center_lng,
        panel_count: panels,
        yearly_energy_kwh: panels as f64 * 400.0,
        solar_area_m2: panels as f64 * 1.9,
        quality_tier: QualityTier::High,
    }
}

#[cfg(test)]
mod data_verification_tests {
    use super::*;

    #[test]
    fn test_center_drift_beyond_tolerance() {
        let record = EnrichedRecord::new(store(0, Some(37.0), Some(-122.0)), Some(insight(37.0006, -122.0, 100)));
        let thresholds = Thresholds {
            coord_tolerance: 0.0005,
            ..Thresholds::default()
        };
        assert!(flag(record, &thresholds).data_verification);
    }

    #[test]
    fn test_wider_tolerance_clears_flag() {
        let record = EnrichedRecord::new(store(0, Some(37.0), Some(-122.0)), Some(insight(37.0006, -122.0, 100)));
        let thresholds = Thresholds {
            coord_tolerance: 0.001,
            ..Thresholds::default()
        };
        assert!(!flag(record, &thresholds).data_verification);
    }

    #[test]
    fn test_missing_input_coordinates_never_flag() {
        let record = EnrichedRecord::new(store(0, None, None), Some(insight(37.0, -122.0, 100)));
        assert!(!flag(record, &Thresholds::default()).data_verification);
    }
}

#[cfg(test)]
mod output_verification_tests {
    use super::*;

    #[test]
    fn test_too_few_panels() {
        let record = EnrichedRecord::new(store(0, Some(1.0), Some(1.0)), Some(insight(1.0, 1.0, 5)));
        let thresholds = Thresholds {
            min_panels: 10,
            ..Thresholds::default()
        };
        assert!(flag(record, &thresholds).output_verification);
    }

    #[test]
    fn test_plausible_panel_count() {
        let record = EnrichedRecord::new(store(0, Some(1.0), Some(1.0)), Some(insight(1.0, 1.0, 500)));
        let thresholds = Thresholds {
            max_panels: 2000,
            ..Thresholds::default()
        };
        assert!(!flag(record, &thresholds).output_verification);
    }
}

#[cfg(test)]
mod ordering_tests {
    use super::*;

    #[test]
    fn test_filter_runs_before_flagging() {
        let records = vec![
            EnrichedRecord::new(store(0, Some(1.0), Some(1.0)), Some(insight(1.0, 1.0, 0))),
            EnrichedRecord::new(store(1, None, None), None),
            EnrichedRecord::new(store(2, Some(1.0), Some(1.0)), Some(insight(1.0, 1.0, 3))),
            EnrichedRecord::new(store(3, Some(2.0), Some(2.0)), Some(insight(2.0, 2.0, 40))),
        ];

        let flagged = flag_all(retain_flaggable(&records), &Thresholds::default());

        // Zero-panel and insight-less rows never reach the flag stage
        assert_eq!(flagged.iter().map(|r| r.record.row).collect::<Vec<_>>(), vec![2, 3]);
        assert!(flagged[0].output_verification);
        assert!(!flagged[1].output_verification);
    }
}
