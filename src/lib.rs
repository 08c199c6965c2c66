#![warn(clippy::all)]
#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

pub mod assembler;
pub mod coverage;
pub mod deck;
pub mod errors;
pub mod fmt;
pub mod grid;
pub mod materials;
pub mod mesh;
pub mod numbering;
pub mod planner;
pub mod sections;
pub mod slab;

pub use assembler::{lamplan_to_plies, LaminatePlan, MaterialRegistry, SlabPlan};
pub use deck::{assemble, DeckOptions, DeckSet};
pub use errors::{CoverageError, DeckError, PlanError};
pub use materials::{export_material_map, MaterialDb, MaterialMap};
pub use mesh::ShellMesh;
pub use planner::Ply;
pub use slab::BladeDefinition;
