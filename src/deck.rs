//! CalculiX input deck assembly.
//!
//! Composes the deck blocks in fixed order: nodes, elements, element sets,
//! orientations, materials, composite shell sections, the root clamp and
//! finally the loadcases. Everything up to the loadcases is shared between
//! output decks; the loadcase blocks are either appended as sequential steps
//! into one deck or combined with the shared prefix into one self-contained
//! deck per loadcase for parallel solves.

use std::time::Instant;

use log::{debug, info};
use rayon::prelude::*;

use crate::errors::DeckError;
use crate::fmt::{fixed6, g4};
use crate::materials::{material_cards, MaterialDb, MaterialMap};
use crate::mesh::ShellMesh;
use crate::sections::{compute_ply_groups, compute_slab_groups, make_shell_section, PlyRow};

/// Squared force magnitude below which a nodal load is not written.
const FORCE_FLOOR: f64 = 1e-8;

/// Result output requests appended to every loadcase step.
const OUTPUT_CARDS: &str =
    "*node file,output=3d\nU,RF\n*EL FILE\nS,E\n*node print,nset=nall\nrf\n*end step\n";

/// Switches controlling deck assembly.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeckOptions {
    /// Merge immediately adjacent same-material plies into one layer.
    pub merge_adjacent: bool,
    /// Reference the element orientation from the section card instead of
    /// per-layer orientation references.
    pub zero_angle: bool,
    /// Append all loadcases to one deck instead of one deck per loadcase.
    pub single_step: bool,
    /// Offset orientation frames to the element centers.
    pub add_centers: bool,
    /// Write every material as isotropic, using fallback moduli.
    pub force_iso: bool,
}

/// An assembled deck: shared model blocks plus one block per loadcase.
#[derive(Debug, Clone)]
pub struct DeckSet {
    /// Model text shared by every output deck.
    shared: String,
    /// Loadcase name and step block, in name order.
    loadcases: Vec<(String, String)>,
    /// Ply table rows collected while building element sets.
    ply_table: Vec<PlyRow>,
}

impl DeckSet {
    /// Ply table rows for the optional CSV export.
    pub fn ply_table(&self) -> &[PlyRow] {
        &self.ply_table
    }

    /// Names of the loadcases found on the mesh.
    pub fn loadcase_names(&self) -> impl Iterator<Item = &str> {
        self.loadcases.iter().map(|(name, _)| name.as_str())
    }

    /// One deck with all loadcases as sequential steps.
    pub fn single_deck(&self) -> String {
        let mut deck = self.shared.clone();
        for (_, block) in &self.loadcases {
            deck += block;
        }
        deck
    }

    /// One self-contained deck per loadcase.
    ///
    /// The shared blocks are final by the time a `DeckSet` exists, so the
    /// per-loadcase concatenation is embarrassingly parallel.
    pub fn per_loadcase_decks(&self) -> Vec<(String, String)> {
        self.loadcases
            .par_iter()
            .map(|(name, block)| (name.clone(), format!("{}{}", self.shared, block)))
            .collect()
    }
}

/// Assemble the deck blocks for a painted mesh.
pub fn assemble(
    mesh: &ShellMesh,
    map: &MaterialMap,
    db: &MaterialDb,
    options: DeckOptions,
) -> Result<DeckSet, DeckError> {
    mesh.validate()?;

    let mut shared = node_buffer(mesh);
    shared += &element_buffer(mesh)?;
    shared += &format!("*elset,elset=Eall,GENERATE\n1,{}\n", mesh.cell_count());

    let (ply_esets, ply_table) = compute_ply_groups(mesh);
    shared += &ply_esets;
    shared += &compute_slab_groups(mesh);

    shared += &orientation_buffer(mesh, options.add_centers)?;
    shared += &material_cards(&mesh.ply_materials(), map, db, options.force_iso)?;

    let tic = Instant::now();
    for element in 0..mesh.cell_count() {
        shared += &format!(
            "*shell section,composite,elset=e{},offset=-.5{}\n",
            element + 1,
            if options.zero_angle {
                format!(",orientation=or{}", element + 1)
            } else {
                String::new()
            }
        );
        shared += &make_shell_section(
            element,
            &mesh.element_plies(element),
            options.merge_adjacent,
            options.zero_angle,
        );
    }
    debug!(
        "spent {:.3} s creating shell sections",
        tic.elapsed().as_secs_f64()
    );

    shared += &root_clamp(mesh);

    Ok(DeckSet {
        shared,
        loadcases: loadcase_blocks(mesh),
        ply_table,
    })
}

/// The node block.
fn node_buffer(mesh: &ShellMesh) -> String {
    let mut buf = String::from("*node,nset=nall\n");
    for (n, point) in mesh.points.iter().enumerate() {
        buf += &format!(
            "{},{},{},{}\n",
            n + 1,
            fixed6(point[0]),
            fixed6(point[1]),
            fixed6(point[2])
        );
    }
    buf
}

/// The element block; the card type follows the connectivity width.
///
/// Each element sits in its own single-element set so the composite shell
/// sections can address elements individually.
fn element_buffer(mesh: &ShellMesh) -> Result<String, DeckError> {
    let card = match mesh.nodes_per_cell()? {
        4 => "s4",
        8 => "s8r",
        width => {
            return Err(DeckError::DataShape {
                name: "connectivity".to_string(),
                rows: mesh.cell_count(),
                cols: width,
                expected: "4 or 8 node indices per element",
            })
        }
    };
    let mut buf = String::new();
    for (n, nodes) in mesh.connectivity.iter().enumerate() {
        buf += &format!("*element,type={card},elset=e{}\n{}", n + 1, n + 1);
        for node in nodes {
            buf += &format!(",{}", node + 1);
        }
        buf.push('\n');
    }
    Ok(buf)
}

/// Per-element rectangular orientation cards from the painted x/y frames.
fn orientation_buffer(mesh: &ShellMesh, add_centers: bool) -> Result<String, DeckError> {
    let x_dir = mesh.frame_vectors("x_dir")?;
    let y_dir = mesh.frame_vectors("y_dir")?;
    let centers = if add_centers {
        Some(mesh.frame_vectors("centers")?)
    } else {
        None
    };
    let mut buf = String::new();
    for n in 0..mesh.cell_count() {
        buf += &format!("*orientation,name=or{},system=rectangular\n", n + 1);
        let values: Vec<f64> = match &centers {
            Some(centers) => {
                let c = centers[n];
                (x_dir[n] + c)
                    .iter()
                    .chain((y_dir[n] + c).iter())
                    .chain(c.iter())
                    .copied()
                    .collect()
            }
            None => x_dir[n].iter().chain(y_dir[n].iter()).copied().collect(),
        };
        buf += &values.iter().map(|&v| g4(v)).collect::<Vec<_>>().join(",");
        buf.push('\n');
        if centers.is_some() {
            buf += "3,0\n";
        }
    }
    Ok(buf)
}

/// Clamp the root plane: every node at the lowest z, translations only.
fn root_clamp(mesh: &ShellMesh) -> String {
    let z_min = mesh.min_z();
    let mut buf = String::from("*boundary,op=new\n");
    for (n, point) in mesh.points.iter().enumerate() {
        if point[2] == z_min {
            buf += &format!("{},1,3\n", n + 1);
        }
    }
    buf
}

/// One step block per loadcase array on the mesh.
fn loadcase_blocks(mesh: &ShellMesh) -> Vec<(String, String)> {
    let mut blocks = Vec::new();
    for (name, forces) in mesh.loadcases() {
        info!("loadcase {name}");
        // Quadratic meshes interpolate forces onto midside nodes, which
        // throws the force sum off; the correction multiplier for that
        // stays at 1.0.
        let multiplier = 1.0;
        let mut block = format!("** {name}\n*step\n*static\n*cload\n");
        for (n, row) in forces.iter().enumerate() {
            for component in 0..2 {
                let force = row[component] * multiplier;
                if force * force > FORCE_FLOOR {
                    block += &format!("{},{},{}\n", n + 1, component + 1, fixed6(force));
                }
            }
        }
        block += OUTPUT_CARDS;
        blocks.push((name.to_string(), block));
    }
    blocks
}
