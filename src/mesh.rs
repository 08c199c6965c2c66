//! Shell mesh document model.
//!
//! The draping step upstream paints ply and loadcase data onto a shell mesh
//! and hands it over as a JSON document: point coordinates, element
//! connectivity and named per-element and per-node arrays. Every array is a
//! row table. Per-element rows are `ply_<name>` pairs of material id and
//! thickness, `x_dir`/`y_dir`/`centers` vectors and `slab_thickness_<name>`
//! scalars; per-node rows are `lc_<name>` force vectors.
//!
//! Ply array names carry a zero-padded stack index, so the lexicographic
//! order the maps iterate in is the laminate stack order.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use nalgebra::Vector3;
use serde::Deserialize;

use crate::errors::DeckError;

/// Name prefix of per-element ply arrays.
pub const PLY_PREFIX: &str = "ply_";
/// Name prefix of per-element slab thickness arrays.
pub const SLAB_PREFIX: &str = "slab_thickness_";
/// Name prefix of per-node loadcase force arrays.
pub const LOADCASE_PREFIX: &str = "lc_";

/// A painted shell mesh as produced by the draping step.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShellMesh {
    /// Node coordinates.
    pub points: Vec<[f64; 3]>,
    /// Element connectivity, 0-based node indices, 4 or 8 per row.
    pub connectivity: Vec<Vec<usize>>,
    /// Named per-element row tables.
    #[serde(default)]
    pub cell_data: BTreeMap<String, Vec<Vec<f64>>>,
    /// Named per-node row tables.
    #[serde(default)]
    pub point_data: BTreeMap<String, Vec<Vec<f64>>>,
}

impl ShellMesh {
    /// Load and validate a mesh document.
    pub fn load(path: &Path) -> Result<Self, DeckError> {
        let text = fs::read_to_string(path).map_err(|source| DeckError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mesh: Self = serde_json::from_str(&text).map_err(|e| DeckError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        mesh.validate()?;
        Ok(mesh)
    }

    /// Number of nodes.
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Number of elements.
    pub fn cell_count(&self) -> usize {
        self.connectivity.len()
    }

    /// Check every array against the schema before any deck text is built.
    pub fn validate(&self) -> Result<(), DeckError> {
        let width = self.nodes_per_cell()?;
        if !self.connectivity.is_empty() && width != 4 && width != 8 {
            return Err(DeckError::DataShape {
                name: "connectivity".to_string(),
                rows: self.connectivity.len(),
                cols: width,
                expected: "4 or 8 node indices per element",
            });
        }
        for (name, rows) in &self.cell_data {
            let cols = uniform_width(rows).ok_or_else(|| ragged(name, rows))?;
            if rows.len() != self.cell_count() {
                return Err(DeckError::DataShape {
                    name: name.clone(),
                    rows: rows.len(),
                    cols,
                    expected: "one row per element",
                });
            }
            if name.starts_with(PLY_PREFIX) && cols != 2 {
                return Err(DeckError::DataShape {
                    name: name.clone(),
                    rows: rows.len(),
                    cols,
                    expected: "material id and thickness columns",
                });
            }
        }
        for (name, rows) in &self.point_data {
            let cols = uniform_width(rows).ok_or_else(|| ragged(name, rows))?;
            if rows.len() != self.point_count() {
                return Err(DeckError::DataShape {
                    name: name.clone(),
                    rows: rows.len(),
                    cols,
                    expected: "one row per node",
                });
            }
            if name.starts_with(LOADCASE_PREFIX) && cols < 2 {
                return Err(DeckError::DataShape {
                    name: name.clone(),
                    rows: rows.len(),
                    cols,
                    expected: "at least two force components",
                });
            }
        }
        Ok(())
    }

    /// Nodes per element; errors when rows disagree.
    pub fn nodes_per_cell(&self) -> Result<usize, DeckError> {
        let width = self.connectivity.first().map_or(0, Vec::len);
        for row in &self.connectivity {
            if row.len() != width {
                return Err(DeckError::DataShape {
                    name: "connectivity".to_string(),
                    rows: self.connectivity.len(),
                    cols: 0,
                    expected: "a uniform node count per element",
                });
            }
        }
        Ok(width)
    }

    /// Ply arrays in stack order.
    pub fn ply_arrays(&self) -> impl Iterator<Item = (&str, &Vec<Vec<f64>>)> {
        self.named_cell_arrays(PLY_PREFIX)
    }

    /// Slab thickness arrays.
    pub fn slab_arrays(&self) -> impl Iterator<Item = (&str, &Vec<Vec<f64>>)> {
        self.named_cell_arrays(SLAB_PREFIX)
    }

    /// Loadcase force arrays in name order.
    pub fn loadcases(&self) -> impl Iterator<Item = (&str, &Vec<Vec<f64>>)> {
        self.point_data
            .iter()
            .filter(|(name, _)| name.starts_with(LOADCASE_PREFIX))
            .map(|(name, rows)| (name.as_str(), rows))
    }

    /// Cell arrays matching a name prefix.
    fn named_cell_arrays(&self, prefix: &'static str) -> impl Iterator<Item = (&str, &Vec<Vec<f64>>)> {
        self.cell_data
            .iter()
            .filter(move |(name, _)| name.starts_with(prefix))
            .map(|(name, rows)| (name.as_str(), rows))
    }

    /// The per-element stack: one (material id, thickness) pair per ply array.
    pub fn element_plies(&self, element: usize) -> Vec<(i64, f64)> {
        self.ply_arrays()
            .map(|(_, rows)| (rows[element][0] as i64, rows[element][1]))
            .collect()
    }

    /// Distinct material ids over all ply arrays, ascending.
    pub fn ply_materials(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .ply_arrays()
            .flat_map(|(_, rows)| rows.iter().map(|row| row[0] as i64))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// A required 3-column cell array, as vectors.
    pub fn frame_vectors(&self, name: &'static str) -> Result<Vec<Vector3<f64>>, DeckError> {
        let rows = self
            .cell_data
            .get(name)
            .ok_or(DeckError::MissingArray(name))?;
        if uniform_width(rows) != Some(3) {
            return Err(DeckError::DataShape {
                name: name.to_string(),
                rows: rows.len(),
                cols: uniform_width(rows).unwrap_or(0),
                expected: "three components per element",
            });
        }
        Ok(rows
            .iter()
            .map(|row| Vector3::new(row[0], row[1], row[2]))
            .collect())
    }

    /// Lowest z coordinate over all nodes; the root plane of the blade.
    pub fn min_z(&self) -> f64 {
        self.points
            .iter()
            .map(|p| p[2])
            .fold(f64::INFINITY, f64::min)
    }
}

/// Common row width of a table, `None` when rows are ragged.
fn uniform_width(rows: &[Vec<f64>]) -> Option<usize> {
    let width = rows.first().map_or(0, Vec::len);
    rows.iter().all(|row| row.len() == width).then_some(width)
}

/// Shape error for a ragged array.
fn ragged(name: &str, rows: &[Vec<f64>]) -> DeckError {
    DeckError::DataShape {
        name: name.to_string(),
        rows: rows.len(),
        cols: 0,
        expected: "a uniform row width",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_mesh() -> ShellMesh {
        ShellMesh {
            points: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 1.0],
                [0.0, 1.0, 1.0],
            ],
            connectivity: vec![vec![0, 1, 2, 3]],
            cell_data: BTreeMap::from([
                ("ply_00_spar".to_string(), vec![vec![1.0, 2.0]]),
                ("ply_01_core".to_string(), vec![vec![2.0, 10.0]]),
                ("x_dir".to_string(), vec![vec![1.0, 0.0, 0.0]]),
            ]),
            point_data: BTreeMap::from([(
                "lc_flap".to_string(),
                vec![
                    vec![0.0, 0.0, 0.0],
                    vec![100.0, 0.0, 0.0],
                    vec![0.0, 50.0, 0.0],
                    vec![0.0, 0.0, 0.0],
                ],
            )]),
        }
    }

    #[test]
    fn validates_a_painted_mesh() {
        quad_mesh().validate().expect("valid mesh");
    }

    #[test]
    fn rejects_wrong_row_counts() {
        let mut mesh = quad_mesh();
        mesh.point_data
            .insert("lc_edge".to_string(), vec![vec![0.0, 0.0, 0.0]]);
        assert!(matches!(
            mesh.validate(),
            Err(DeckError::DataShape { name, .. }) if name == "lc_edge"
        ));
    }

    #[test]
    fn rejects_narrow_ply_arrays() {
        let mut mesh = quad_mesh();
        mesh.cell_data
            .insert("ply_02_cap".to_string(), vec![vec![1.0]]);
        assert!(matches!(
            mesh.validate(),
            Err(DeckError::DataShape { name, .. }) if name == "ply_02_cap"
        ));
    }

    #[test]
    fn rejects_off_sized_elements() {
        let mut mesh = quad_mesh();
        mesh.connectivity = vec![vec![0, 1, 2]];
        assert!(mesh.validate().is_err());
        mesh.connectivity = vec![vec![0, 1, 2, 3], vec![0, 1, 2]];
        assert!(matches!(mesh.nodes_per_cell(), Err(DeckError::DataShape { .. })));
    }

    #[test]
    fn element_plies_follow_stack_order() {
        let mesh = quad_mesh();
        assert_eq!(mesh.element_plies(0), vec![(1, 2.0), (2, 10.0)]);
        assert_eq!(mesh.ply_materials(), vec![1, 2]);
    }

    #[test]
    fn frame_vectors_require_presence_and_width() {
        let mesh = quad_mesh();
        let x = mesh.frame_vectors("x_dir").expect("present");
        assert_eq!(x[0], Vector3::new(1.0, 0.0, 0.0));
        assert!(matches!(
            mesh.frame_vectors("y_dir"),
            Err(DeckError::MissingArray("y_dir"))
        ));
    }

    #[test]
    fn min_z_finds_the_root_plane() {
        assert_eq!(quad_mesh().min_z(), 0.0);
    }
}
