//! Shared test fixtures for lab_core and downstream crates.
//!
//! `base_content()` mirrors the shipped stockroom closely enough for drop and
//! layout tests; `beaker_with()` gives a one-item bench to pour from.

use crate::{
    ApparatusId, ApparatusKind, ApparatusOverrides, BenchConstants, ChemicalState,
    GlasswareItem, LabContent, LabState, ParsedChemical, SolutionItem, Stockroom, ToolItem,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub fn make_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}

fn glassware(id: &str, name: &str, kind: ApparatusKind, volumes_ml: &[f64]) -> GlasswareItem {
    GlasswareItem {
        id: id.to_string(),
        name: name.to_string(),
        kind,
        volumes_ml: volumes_ml.to_vec(),
        variants: vec![],
        fixed_capacity_ml: None,
    }
}

pub fn base_content() -> LabContent {
    let mut test_tube = glassware("test-tube", "Test Tube (10ml)", ApparatusKind::TestTube, &[]);
    test_tube.fixed_capacity_ml = Some(10.0);
    let mut pipette = glassware(
        "pipette",
        "Pipette with Pump",
        ApparatusKind::Pipette,
        &[1.0, 2.0, 5.0, 10.0, 20.0, 25.0, 50.0, 100.0],
    );
    pipette.variants = vec!["Volumetric".to_string(), "Graduated".to_string()];

    LabContent {
        content_version: "test".to_string(),
        constants: BenchConstants::default(),
        stockroom: Stockroom {
            solutions: vec![
                SolutionItem {
                    id: "water".to_string(),
                    name: "Water".to_string(),
                },
                SolutionItem {
                    id: "hcl".to_string(),
                    name: "HCl Solution".to_string(),
                },
            ],
            glassware: vec![
                glassware(
                    "beaker",
                    "Beaker",
                    ApparatusKind::Beaker,
                    &[50.0, 100.0, 250.0, 500.0],
                ),
                test_tube,
                pipette,
                glassware("watch-glass", "Watch Glass", ApparatusKind::WatchGlass, &[]),
            ],
            tools: vec![ToolItem {
                id: "thermometer".to_string(),
                name: "Thermometer".to_string(),
            }],
        },
    }
}

/// Aqueous record with no color, formula or volume.
pub fn aqueous(name: &str, concentration_m: Option<f64>) -> ParsedChemical {
    ParsedChemical {
        name: name.to_string(),
        formula: None,
        state: ChemicalState::Aqueous,
        form: None,
        concentration_m,
        volume_ml: None,
        temperature_c: None,
        color: None,
    }
}

/// A bench holding one 250 ml beaker. With `Some(volume)` the beaker holds
/// that much 1M HCl.
pub fn beaker_with(volume_ml: Option<f64>) -> (LabState, ApparatusId) {
    let mut state = LabState::default();
    let mut rng = make_rng();
    let id = state.add_apparatus(
        ApparatusKind::Beaker,
        Some(250.0),
        ApparatusOverrides::default(),
        &BenchConstants::default(),
        &mut rng,
    );
    if let Some(volume) = volume_ml {
        let mut chemical = aqueous("Hydrochloric acid", Some(1.0));
        chemical.formula = Some("HCl".to_string());
        chemical.volume_ml = Some(volume);
        state
            .add_chemical_to(&id, &chemical)
            .expect("fixture beaker exists");
    }
    (state, id)
}
