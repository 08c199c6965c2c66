//! Element sets and composite shell sections.
//!
//! One element set is built per ply and per slab so post-processing can
//! address laminate entities by name. Each element then gets a composite
//! shell section card listing its stack bottom-up, with immediately adjacent
//! same-material plies optionally merged into one layer line.

use std::path::Path;

use serde::Serialize;

use crate::errors::DeckError;
use crate::fmt::fixed6;
use crate::mesh::ShellMesh;

/// Thickness below which a painted ply entry is treated as absent.
const THICKNESS_FLOOR: f64 = 1e-6;

/// One row of the ply table export.
#[derive(Debug, Clone, Serialize)]
pub struct PlyRow {
    /// Ply array name from the mesh.
    #[serde(rename = "Ply Name")]
    pub name: String,
    /// Sequential ply id, starting at 1.
    #[serde(rename = "Ply ID")]
    pub id: usize,
    /// Card image, fixed.
    #[serde(rename = "Card Image")]
    pub card: &'static str,
    /// Deck material name, `m<id>`.
    #[serde(rename = "Mat Name")]
    pub material: String,
    /// Largest painted thickness of the ply.
    #[serde(rename = "Thickness")]
    pub thickness: f64,
    /// Ply angle; always zero for now.
    #[serde(rename = "Orientation")]
    pub orientation: i64,
}

/// Format an element set card: ids comma separated, sixteen per line.
pub fn format_eset(name: &str, eids: &[usize]) -> String {
    let mut out = format!("*elset,elset={name}\n");
    for (i, eid) in eids.iter().enumerate() {
        out += &eid.to_string();
        out.push(if i % 16 == 15 { '\n' } else { ',' });
    }
    if out.ends_with(',') {
        out.pop();
        out.push('\n');
    }
    out
}

/// Build one element set per ply array, plus the ply table rows.
///
/// An element belongs to a ply's set when its painted thickness is positive.
/// Element ids are 1-based in the deck.
pub fn compute_ply_groups(mesh: &ShellMesh) -> (String, Vec<PlyRow>) {
    let mut esets = String::new();
    let mut table = Vec::new();
    for (n, (name, rows)) in mesh.ply_arrays().enumerate() {
        let thickness = rows.iter().map(|r| r[1]).fold(0.0, f64::max);
        let material = rows.iter().map(|r| r[0]).fold(0.0, f64::max);
        let eids: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r[1] > 0.0)
            .map(|(i, _)| i + 1)
            .collect();
        esets += &format_eset(name, &eids);
        table.push(PlyRow {
            name: name.to_string(),
            id: n + 1,
            card: "PLY",
            material: format!("m{}", material as i64),
            thickness,
            orientation: 0,
        });
    }
    (esets, table)
}

/// Build one element set per slab thickness array.
pub fn compute_slab_groups(mesh: &ShellMesh) -> String {
    let mut esets = String::new();
    for (name, rows) in mesh.slab_arrays() {
        let eids: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.iter().any(|&v| v > 0.0))
            .map(|(i, _)| i + 1)
            .collect();
        esets += &format_eset(name, &eids);
    }
    esets
}

/// Layer lines of one element's composite shell section.
///
/// Folds the painted stack into physical layers: entries at or below the
/// thickness floor drop out, and when `merge` is set an entry extends the
/// previous layer instead of starting a new one if both share a material.
/// Thicknesses convert from mm to m. The ply angle is always written as
/// zero; anisotropic mats at other angles are not represented yet, which
/// is why merging only holds for multidirectional mats.
///
/// Under `zero_angle` each layer references the global frame; otherwise it
/// references the element's own orientation card.
pub fn make_shell_section(
    element: usize,
    plies: &[(i64, f64)],
    merge: bool,
    zero_angle: bool,
) -> String {
    let layers = plies
        .iter()
        .filter(|(_, thickness)| *thickness > THICKNESS_FLOOR)
        .fold(Vec::<(f64, i64)>::new(), |mut layers, &(material, thickness)| {
            match layers.last_mut() {
                Some(last) if merge && last.1 == material => last.0 += thickness * 1e-3,
                _ => layers.push((thickness * 1e-3, material)),
            }
            layers
        });
    layers
        .into_iter()
        .map(|(thickness, material)| {
            if zero_angle {
                format!("{},,m{},0\n", fixed6(thickness), material)
            } else {
                format!("{},,m{},or{}\n", fixed6(thickness), material, element + 1)
            }
        })
        .collect()
}

/// Write the ply table as CSV for external review.
pub fn write_ply_table(path: &Path, rows: &[PlyRow]) -> Result<(), DeckError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| DeckError::Io {
        path: path.to_path_buf(),
        source: std::io::Error::other(e.to_string()),
    })?;
    for row in rows {
        writer.serialize(row).map_err(|e| DeckError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::other(e.to_string()),
        })?;
    }
    writer.flush().map_err(|e| DeckError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}
