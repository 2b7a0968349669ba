//! Content loading, configuration and persistence shared by the daemon and tests.

mod config;
mod export;
mod persistence;

use anyhow::{Context, Result};
use lab_core::{
    BenchConstants, GlasswareItem, LabContent, SolutionItem, Stockroom, TimestampMs, ToolItem,
};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

pub use config::{load_config, resolve_api_key, LabConfig, API_KEY_ENV_VARS};
pub use export::{measurements_csv, write_measurements_csv};
pub use persistence::{SnapshotStore, SNAPSHOT_FILE_NAME};

#[derive(Deserialize)]
struct StockroomFile {
    content_version: String,
    solutions: Vec<SolutionItem>,
    glassware: Vec<GlasswareItem>,
    tools: Vec<ToolItem>,
}

/// Wall clock in milliseconds since the Unix epoch.
pub fn now_ms() -> TimestampMs {
    TimestampMs::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

/// Validates loaded content, panicking on any authoring error.
///
/// Catches mistakes like a bench narrower than its drag margins, duplicate
/// stockroom ids, or glassware offered in a non-positive size.
pub fn validate_content(content: &LabContent) {
    let c = &content.constants;
    for (name, value) in [
        ("bench_width_px", c.bench_width_px),
        ("drag_margin_left_px", c.drag_margin_left_px),
        ("drag_margin_right_px", c.drag_margin_right_px),
        ("shelf_start_x_px", c.shelf_start_x_px),
        ("shelf_step_px", c.shelf_step_px),
        ("baseline_y_px", c.baseline_y_px),
        ("pour_proximity_px", c.pour_proximity_px),
    ] {
        assert!(
            value.is_finite() && value >= 0.0,
            "constant '{name}' must be a finite non-negative number, got {value}",
        );
    }
    assert!(
        c.drag_margin_left_px <= c.bench_width_px - c.drag_margin_right_px,
        "bench_width_px {} leaves no room between the drag margins",
        c.bench_width_px,
    );
    assert!(
        c.pour_volume_ml.is_finite() && c.pour_volume_ml > 0.0,
        "pour_volume_ml must be positive, got {}",
        c.pour_volume_ml,
    );

    let stockroom = &content.stockroom;
    assert_unique_ids("solution", stockroom.solutions.iter().map(|s| s.id.as_str()));
    assert_unique_ids("glassware", stockroom.glassware.iter().map(|g| g.id.as_str()));
    assert_unique_ids("tool", stockroom.tools.iter().map(|t| t.id.as_str()));

    for item in &stockroom.glassware {
        for volume in &item.volumes_ml {
            assert!(
                volume.is_finite() && *volume > 0.0,
                "glassware '{}' offers a non-positive volume {volume}",
                item.id,
            );
        }
        if let Some(capacity) = item.fixed_capacity_ml {
            assert!(
                capacity.is_finite() && capacity > 0.0,
                "glassware '{}' fixed_capacity_ml must be positive, got {capacity}",
                item.id,
            );
        }
        for variant in &item.variants {
            assert!(
                !variant.trim().is_empty(),
                "glassware '{}' has an empty variant name",
                item.id,
            );
        }
    }
}

fn assert_unique_ids<'a>(what: &str, ids: impl Iterator<Item = &'a str>) {
    let mut seen = HashSet::new();
    for id in ids {
        assert!(!id.is_empty(), "{what} item has an empty id");
        assert!(seen.insert(id), "duplicate {what} id '{id}'");
    }
}

pub fn load_content(content_dir: &str) -> Result<LabContent> {
    let dir = Path::new(content_dir);
    let constants: BenchConstants = serde_json::from_str(
        &std::fs::read_to_string(dir.join("constants.json")).context("reading constants.json")?,
    )
    .context("parsing constants.json")?;
    let stockroom_file: StockroomFile = serde_json::from_str(
        &std::fs::read_to_string(dir.join("stockroom.json")).context("reading stockroom.json")?,
    )
    .context("parsing stockroom.json")?;
    let content = LabContent {
        content_version: stockroom_file.content_version,
        constants,
        stockroom: Stockroom {
            solutions: stockroom_file.solutions,
            glassware: stockroom_file.glassware,
            tools: stockroom_file.tools,
        },
    };
    validate_content(&content);
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lab_core::test_fixtures::base_content;
    use lab_core::ApparatusKind;

    #[test]
    fn test_valid_content_passes_validation() {
        validate_content(&base_content()); // should not panic
    }

    #[test]
    #[should_panic(expected = "leaves no room between the drag margins")]
    fn test_narrow_bench_panics() {
        let mut content = base_content();
        content.constants.bench_width_px = 100.0;
        validate_content(&content);
    }

    #[test]
    #[should_panic(expected = "pour_volume_ml must be positive")]
    fn test_zero_pour_volume_panics() {
        let mut content = base_content();
        content.constants.pour_volume_ml = 0.0;
        validate_content(&content);
    }

    #[test]
    #[should_panic(expected = "duplicate glassware id 'beaker'")]
    fn test_duplicate_glassware_id_panics() {
        let mut content = base_content();
        let copy = content.stockroom.glassware[0].clone();
        content.stockroom.glassware.push(copy);
        validate_content(&content);
    }

    #[test]
    #[should_panic(expected = "non-positive volume")]
    fn test_negative_volume_panics() {
        let mut content = base_content();
        content.stockroom.glassware[0].volumes_ml.push(-5.0);
        validate_content(&content);
    }

    #[test]
    fn test_shipped_content_loads() {
        let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../../content");
        let content = load_content(dir).unwrap();
        assert_eq!(content.constants, BenchConstants::default());
        assert!(content
            .stockroom
            .glassware
            .iter()
            .any(|g| g.id == "pipette" && g.kind == ApparatusKind::Pipette && g.variants.len() == 2));
        assert_eq!(content.stockroom.solutions.len(), 4);
    }

    #[test]
    fn test_missing_content_dir_errors() {
        let err = load_content("/definitely/not/a/content/dir").unwrap_err();
        assert!(format!("{err:#}").contains("reading constants.json"));
    }

    #[test]
    fn test_now_ms_is_after_2020() {
        assert!(now_ms() > 1_577_836_800_000);
    }
}
