//! Blade definition document model.
//!
//! A blade definition is parsed once from YAML and treated as immutable
//! input: a planform giving the radius range, an ordered collection of
//! laminate slabs, optional datum curves referenced by cover expressions and
//! an optional material database (inline or linked by path).

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::materials::RawMaterial;

/// Top-level blade definition document.
#[derive(Debug, Clone, Deserialize)]
pub struct BladeDefinition {
    /// General run settings.
    #[serde(default)]
    pub general: General,
    /// Planform geometry; only the z stations are consumed here.
    pub planform: Planform,
    /// Laminate slabs and datum curves.
    pub laminates: Laminates,
    /// Material database, inline or a path to a YAML document.
    #[serde(default)]
    pub materials: Option<MaterialsSource>,
}

/// Working-directory settings for a run.
#[derive(Debug, Clone, Deserialize)]
pub struct General {
    /// Directory receiving exported documents.
    #[serde(default = "default_workdir")]
    pub workdir: String,
    /// Output name prefix.
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for General {
    fn default() -> Self {
        Self {
            workdir: default_workdir(),
            prefix: default_prefix(),
        }
    }
}

fn default_workdir() -> String {
    ".".to_string()
}

fn default_prefix() -> String {
    "blade".to_string()
}

/// Planform geometry of the blade.
#[derive(Debug, Clone, Deserialize)]
pub struct Planform {
    /// Spanwise stations as `[x, z]` pairs; the first and last z values are
    /// the root and tip radius.
    pub z: Vec<[f64; 2]>,
}

/// Laminate section of the blade definition.
#[derive(Debug, Clone, Deserialize)]
pub struct Laminates {
    /// Slabs in definition order. Order is significant: material ids are
    /// assigned on first appearance.
    pub slabs: Vec<Slab>,
    /// Named datum curves available to cover expressions.
    #[serde(default)]
    pub datums: HashMap<String, Datum>,
}

/// Reference curve used inside coverage expressions.
#[derive(Debug, Clone, Deserialize)]
pub struct Datum {
    /// Sample points of the curve.
    pub xy: Vec<[f64; 2]>,
    /// Divisor applied to the x axis before interpolation.
    #[serde(default = "default_scale")]
    pub scalex: f64,
    /// Multiplier applied to the y axis.
    #[serde(default = "default_scale")]
    pub scaley: f64,
}

fn default_scale() -> f64 {
    1.0
}

/// How a slab's thickness distribution is discretised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Draping {
    /// Fill the distribution with discrete plies of fixed thickness.
    #[default]
    Plies,
    /// Split the distribution into thickness blocks between input stations.
    Blocks,
}

/// Planform coverage, either already structured or an expression over datums.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CoverSpec {
    /// Structured mapping passed through verbatim.
    Map(BTreeMap<String, Vec<f64>>),
    /// Textual expression resolved against the datum curves.
    Expr(String),
}

/// One named laminate slab. Immutable once parsed.
#[derive(Debug, Clone, Deserialize)]
pub struct Slab {
    /// Slab name; becomes the plan key and the `ply_<name>` array prefix.
    pub name: String,
    /// Grid label the slab drapes onto.
    pub grid: String,
    /// Material name, resolved through the registry.
    pub material: String,
    /// The r-t curve as `[radius, thickness]` pairs, radius ascending.
    pub slab: Vec<[f64; 2]>,
    /// Draping mode.
    #[serde(default)]
    pub draping: Draping,
    /// Thickness of one ply.
    #[serde(default = "default_ply_thickness")]
    pub ply_thickness: f64,
    /// Fractions of the stack numbered from each key; must sum to 1.
    #[serde(default = "default_splitstack")]
    pub splitstack: [f64; 2],
    /// Start keys of the two numbering sequences.
    #[serde(default = "default_key")]
    pub key: [i64; 2],
    /// Increments of the two numbering sequences; negative values number in
    /// reverse and allow interleaving.
    #[serde(default = "default_increment")]
    pub increment: [i64; 2],
    /// Explicit r-axis scale; defaults to the blade span when absent.
    #[serde(default)]
    pub rscale: Option<f64>,
    /// Keep the stack bottom-up instead of numbering the longest plies first.
    #[serde(default)]
    pub reverse: bool,
    /// Planform coverage of the slab.
    pub cover: CoverSpec,
}

fn default_ply_thickness() -> f64 {
    1.0
}

fn default_splitstack() -> [f64; 2] {
    [1.0, 0.0]
}

fn default_key() -> [i64; 2] {
    [0, 4000]
}

fn default_increment() -> [i64; 2] {
    [1, -1]
}

/// Material database reference in a blade definition.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MaterialsSource {
    /// Path to a YAML material database document.
    Path(String),
    /// Database inlined into the blade definition.
    Inline(HashMap<String, RawMaterial>),
}
