//! Stockroom catalog and drag payloads.
//!
//! The UI drags one of three kinds of item onto the bench. Each payload kind
//! carries only what that kind needs; [`Stockroom::resolve_drop`] turns it
//! into the action the bench should take.

use serde::{Deserialize, Serialize};

use crate::ApparatusKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionItem {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlasswareItem {
    pub id: String,
    pub name: String,
    pub kind: ApparatusKind,
    /// Selectable sizes. When non-empty the user must pick one.
    #[serde(default)]
    pub volumes_ml: Vec<f64>,
    /// Selectable variants such as "Volumetric" or "Graduated".
    #[serde(default)]
    pub variants: Vec<String>,
    /// Size for items sold in one size only.
    #[serde(default)]
    pub fixed_capacity_ml: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolItem {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stockroom {
    pub solutions: Vec<SolutionItem>,
    pub glassware: Vec<GlasswareItem>,
    pub tools: Vec<ToolItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DragPayload {
    Solution {
        id: String,
    },
    Glassware {
        id: String,
        volume_ml: Option<f64>,
        variant: Option<String>,
    },
    Tool {
        id: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum DropAction {
    CreateApparatus {
        kind: ApparatusKind,
        capacity_ml: Option<f64>,
        variant: Option<String>,
    },
    /// Free text describing the solution, fed to the interpreter.
    FillWith { description: String },
    PlaceTool { name: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum DropError {
    UnknownItem(String),
    VolumeRequired(String),
    UnknownVolume { id: String, volume_ml: f64 },
    VariantRequired(String),
    UnknownVariant { id: String, variant: String },
}

impl std::fmt::Display for DropError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DropError::UnknownItem(id) => write!(f, "no stockroom item {id}"),
            DropError::VolumeRequired(id) => write!(f, "select a volume for {id} first"),
            DropError::UnknownVolume { id, volume_ml } => {
                write!(f, "{id} does not come in {volume_ml} ml")
            }
            DropError::VariantRequired(id) => write!(f, "select a type for {id} first"),
            DropError::UnknownVariant { id, variant } => {
                write!(f, "{id} has no {variant} type")
            }
        }
    }
}

impl std::error::Error for DropError {}

impl Stockroom {
    pub fn resolve_drop(&self, payload: &DragPayload) -> Result<DropAction, DropError> {
        match payload {
            DragPayload::Solution { id } => self
                .solutions
                .iter()
                .find(|item| &item.id == id)
                .map(|item| DropAction::FillWith {
                    description: item.name.clone(),
                })
                .ok_or_else(|| DropError::UnknownItem(id.clone())),
            DragPayload::Glassware {
                id,
                volume_ml,
                variant,
            } => {
                let item = self
                    .glassware
                    .iter()
                    .find(|item| &item.id == id)
                    .ok_or_else(|| DropError::UnknownItem(id.clone()))?;
                Ok(DropAction::CreateApparatus {
                    kind: item.kind,
                    capacity_ml: item.capacity_for(*volume_ml)?,
                    variant: item.variant_for(variant.as_deref())?,
                })
            }
            DragPayload::Tool { id } => self
                .tools
                .iter()
                .find(|item| &item.id == id)
                .map(|item| DropAction::PlaceTool {
                    name: item.name.clone(),
                })
                .ok_or_else(|| DropError::UnknownItem(id.clone())),
        }
    }
}

impl GlasswareItem {
    fn capacity_for(&self, selected: Option<f64>) -> Result<Option<f64>, DropError> {
        if self.volumes_ml.is_empty() {
            return Ok(self.fixed_capacity_ml);
        }
        let volume = selected.ok_or_else(|| DropError::VolumeRequired(self.id.clone()))?;
        if self
            .volumes_ml
            .iter()
            .any(|offered| (offered - volume).abs() < 1e-9)
        {
            Ok(Some(volume))
        } else {
            Err(DropError::UnknownVolume {
                id: self.id.clone(),
                volume_ml: volume,
            })
        }
    }

    fn variant_for(&self, selected: Option<&str>) -> Result<Option<String>, DropError> {
        if self.variants.is_empty() {
            return Ok(None);
        }
        let variant = selected.ok_or_else(|| DropError::VariantRequired(self.id.clone()))?;
        self.variants
            .iter()
            .find(|offered| offered.eq_ignore_ascii_case(variant))
            .map(|offered| Some(offered.clone()))
            .ok_or_else(|| DropError::UnknownVariant {
                id: self.id.clone(),
                variant: variant.to_string(),
            })
    }
}
