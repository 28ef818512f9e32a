//! Defect overlay mapping
//!
//! Defects are reported in frame-local pixels (`image_index` selects the
//! camera frame). They are placed in world space with the same transform the
//! layout applies to their surface's mosaic.

use crate::core::{bounds::Rect, geo::Point};
use crate::layout::{Layout, Orientation, Surface, SurfaceLayout};
use crate::traits::GeometryOps;
use serde::{Deserialize, Deserializer, Serialize};

/// Defect severity class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    #[default]
    Medium,
    Low,
    Unknown,
}

impl Severity {
    /// Backend grade: `<=1` low, `2` medium, `>=3` high
    pub fn from_grade(grade: Option<i64>) -> Self {
        match grade {
            None => Severity::Medium,
            Some(g) if g <= 1 => Severity::Low,
            Some(2) => Severity::Medium,
            Some(_) => Severity::High,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "high" => Severity::High,
            "medium" => Severity::Medium,
            "low" => Severity::Low,
            _ => Severity::Unknown,
        }
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Grade(i64),
            Name(String),
            Missing(Option<()>),
        }
        Ok(match Repr::deserialize(deserializer)? {
            Repr::Grade(g) => Severity::from_grade(Some(g)),
            Repr::Name(name) => Severity::from_name(&name),
            Repr::Missing(_) => Severity::from_grade(None),
        })
    }
}

fn deserialize_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Int(i64),
        Text(String),
    }
    Ok(match Id::deserialize(deserializer)? {
        Id::Int(n) => n.to_string(),
        Id::Text(s) => s,
    })
}

/// One detected defect in frame-local pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Defect {
    #[serde(alias = "defect_id", alias = "defectId", deserialize_with = "deserialize_id")]
    pub id: String,
    pub surface: Surface,
    /// 1-based frame index; 0 is treated as the first frame
    #[serde(default, alias = "imageIndex")]
    pub image_index: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default, alias = "type", alias = "defectType")]
    pub defect_type: String,
    #[serde(default)]
    pub confidence: f64,
}

/// Defect rectangle in world space
#[derive(Debug, Clone, PartialEq)]
pub struct MappedDefect {
    pub id: String,
    pub surface: Surface,
    pub severity: Severity,
    pub rect: Rect,
}

/// World rectangle of `defect`, or `None` when it belongs to another surface
pub fn map_defect(
    defect: &Defect,
    surface: &SurfaceLayout,
    orientation: Orientation,
) -> Option<Rect> {
    if defect.surface != surface.surface {
        return None;
    }
    let frame = defect.image_index.saturating_sub(1) as f64;
    let mosaic_x = defect.x;
    let mosaic_y = frame * surface.frame_height + defect.y;
    Some(match orientation {
        Orientation::Vertical => Rect::new(
            surface.offset_x + mosaic_x,
            surface.offset_y + mosaic_y,
            defect.width,
            defect.height,
        ),
        Orientation::Horizontal => Rect::new(
            surface.offset_x + mosaic_y,
            surface.offset_y + mosaic_x,
            defect.height,
            defect.width,
        ),
    })
}

/// World-space defect rectangles for the current layout
#[derive(Debug, Clone, Default)]
pub struct DefectOverlay {
    items: Vec<MappedDefect>,
}

impl DefectOverlay {
    /// Map every defect whose surface is part of `layout`
    pub fn build(defects: &[Defect], layout: &Layout) -> Self {
        let items = defects
            .iter()
            .filter_map(|defect| {
                let surface = layout.surface(defect.surface)?;
                let rect = map_defect(defect, surface, layout.orientation)?;
                Some(MappedDefect {
                    id: defect.id.clone(),
                    surface: defect.surface,
                    severity: defect.severity,
                    rect,
                })
            })
            .collect();
        Self { items }
    }

    pub fn items(&self) -> &[MappedDefect] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&MappedDefect> {
        self.items.iter().find(|d| d.id == id)
    }

    /// Defect under a world point, smallest first; `tolerance` grows each box
    pub fn hit_test(&self, world: Point, tolerance: f64) -> Option<&MappedDefect> {
        self.items
            .iter()
            .filter(|d| d.rect.expand(tolerance.max(0.0)).contains_point(&world))
            .min_by(|a, b| a.rect.area().total_cmp(&b.rect.area()))
    }
}
