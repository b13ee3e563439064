//! Shelf anchor map: where each chord symbol rests on the shelf and how large it is.
//!
//! Built-in anchors cover every symbol with a home position. A JSON document
//! of the form `{"positions": {sym: {x, y, z}}, "scales": {sym: s}}` can
//! override individual entries; bad entries are dropped with a warning.

use std::collections::BTreeMap;

use fnv::FnvHashMap;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::constants::{SHELF_Y, SHELF_Z};
use crate::error::{CubesError, Result};
use crate::music::{self, Palette};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShelfAnchor {
    pub position: Vec3,
    pub scale: f32,
}

// (symbol, dx, dy above SHELF_Y)
const DEFAULT_OFFSETS: &[(&str, f32, f32)] = &[
    ("I", 0.0, 0.8),
    ("IV", 2.2, -0.6),
    ("V", -2.2, -0.6),
    ("ii", 3.4, -2.1),
    ("viiø", -3.4, -2.1),
    ("vi", 0.9, 0.2),
    ("iii", -0.9, 0.2),
    ("i", 0.0, -0.9),
    ("iiø", 3.8, -2.4),
    ("bIII", -0.5, -0.4),
    ("iv", 1.31, -0.03),
    ("v", -2.2, -1.7),
    ("bVI", 0.6, -0.5),
    ("bVII", -0.6, -0.6),
    ("V(7)(b9)", -1.8, -2.0),
    ("viiº7", -3.0, -2.3),
    ("I7", 0.2, 0.6),
    ("iiiø", -0.9, -0.1),
    ("II(7)", 2.5, -0.7),
    ("#ivø", 2.9, -1.5),
    ("III(7)", 0.4, -0.2),
    ("#vº", -2.9, -1.6),
    ("VI(7)", 1.3, -0.3),
    ("#iº", 0.3, -1.1),
    ("VII(7)", -2.5, -0.7),
    ("#iiº", 2.6, -2.4),
    ("II", 3.2, -0.7),
    ("VII", -3.2, -0.7),
];

fn default_scale(symbol: &str, family: Palette) -> f32 {
    match symbol {
        "I" | "IV" | "V" => 1.2,
        "ii" | "iii" | "vi" => 0.7,
        "viiø" => 0.6,
        "i" => 0.65,
        _ if family == Palette::Minor => 0.55,
        _ => 0.5,
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct Point {
    x: f32,
    y: f32,
    z: f32,
}

/// Serialized form of a shelf map.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ShelfDocument {
    #[serde(default)]
    positions: BTreeMap<String, Point>,
    #[serde(default)]
    scales: BTreeMap<String, f32>,
}

#[derive(Clone, Debug)]
pub struct ShelfMap {
    anchors: FnvHashMap<&'static str, ShelfAnchor>,
}

impl Default for ShelfMap {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ShelfMap {
    pub fn builtin() -> Self {
        let mut anchors = FnvHashMap::default();
        for &(symbol, dx, dy) in DEFAULT_OFFSETS {
            let Ok(spec) = music::lookup(symbol) else {
                continue;
            };
            anchors.insert(
                spec.symbol,
                ShelfAnchor {
                    position: Vec3::new(dx, SHELF_Y + dy, SHELF_Z),
                    scale: default_scale(spec.symbol, spec.family),
                },
            );
        }
        Self { anchors }
    }

    /// Built-in anchors overridden by the entries of a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut map = Self::builtin();
        let applied = map.merge_json(json)?;
        log::info!("[shelf] loaded {} override(s)", applied);
        Ok(map)
    }

    pub fn merge_json(&mut self, json: &str) -> Result<usize> {
        let doc: ShelfDocument = serde_json::from_str(json)?;
        Ok(self.merge(&doc))
    }

    /// Apply every valid entry of `doc`; returns how many were applied.
    pub fn merge(&mut self, doc: &ShelfDocument) -> usize {
        let mut applied = 0;
        for (symbol, p) in &doc.positions {
            match self.validated_slot(symbol, [p.x, p.y, p.z].iter().all(|v| v.is_finite())) {
                Ok(anchor) => {
                    anchor.position = Vec3::new(p.x, p.y, p.z);
                    applied += 1;
                }
                Err(e) => log::warn!("[shelf] dropping position: {}", e),
            }
        }
        for (symbol, &s) in &doc.scales {
            match self.validated_slot(symbol, s.is_finite() && s > 0.0) {
                Ok(anchor) => {
                    anchor.scale = s;
                    applied += 1;
                }
                Err(e) => log::warn!("[shelf] dropping scale: {}", e),
            }
        }
        applied
    }

    fn validated_slot(&mut self, symbol: &str, finite: bool) -> Result<&mut ShelfAnchor> {
        let invalid = |reason: &str| CubesError::InvalidShelfEntry {
            symbol: symbol.to_string(),
            reason: reason.to_string(),
        };
        if !finite {
            return Err(invalid("non-finite or non-positive value"));
        }
        let spec = music::lookup(symbol).map_err(|_| invalid("unknown symbol"))?;
        self.anchors
            .get_mut(spec.symbol)
            .ok_or_else(|| invalid("symbol has no shelf slot"))
    }

    pub fn get(&self, symbol: &str) -> Option<ShelfAnchor> {
        let spec = music::lookup(symbol).ok()?;
        self.anchors.get(spec.symbol).copied()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &'static str> + '_ {
        music::CHORDS
            .iter()
            .map(|c| c.symbol)
            .filter(|s| self.anchors.contains_key(s))
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn to_document(&self) -> ShelfDocument {
        let mut doc = ShelfDocument::default();
        for (symbol, a) in &self.anchors {
            doc.positions.insert(
                symbol.to_string(),
                Point {
                    x: a.position.x,
                    y: a.position.y,
                    z: a.position.z,
                },
            );
            doc.scales.insert(symbol.to_string(), a.scale);
        }
        doc
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_document())?)
    }
}
