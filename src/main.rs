use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use env_logger::Env;
use log::info;

use plydeck::assembler::{lamplan_to_plies, MaterialRegistry};
use plydeck::deck::{assemble, DeckOptions};
use plydeck::materials::{export_material_map, MaterialMap};
use plydeck::mesh::ShellMesh;
use plydeck::sections::write_ply_table;
use plydeck::slab::BladeDefinition;

#[derive(Parser)]
#[command(name = "plydeck")]
#[command(about = "Blade laminate planning and composite shell FE deck assembly")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split the slab-based laminate plan into plies and blocks
    Plan {
        /// Blade definition yaml file
        blade: PathBuf,
        /// Output plan file name
        #[arg(long, default_value = "__lamplan.json")]
        out: PathBuf,
    },
    /// Export a painted mesh to ccx input files
    Deck {
        /// Painted mesh json file
        mesh: PathBuf,
        /// Material map file
        #[arg(long, default_value = "material_map.json")]
        matmap: PathBuf,
        /// Output file; per-loadcase decks derive their names from it
        #[arg(long, default_value = "blade.inp")]
        out: PathBuf,
        /// Merge adjacent plies sharing a material into one layer
        #[arg(long)]
        merge_adjacent: bool,
        /// Reference orientations from the section card instead of per layer
        #[arg(long)]
        zero_angle: bool,
        /// Append all loadcases to a single deck
        #[arg(long)]
        single_step: bool,
        /// Offset orientation frames to the element centers
        #[arg(long)]
        add_centers: bool,
        /// Write all materials as isotropic
        #[arg(long)]
        force_iso: bool,
        /// Write the ply table to this csv file
        #[arg(long)]
        ply_table: Option<PathBuf>,
    },
}

fn run_plan(blade_path: &Path, out: &Path) -> Result<(), Box<dyn Error>> {
    let text = fs::read_to_string(blade_path)?;
    let blade: BladeDefinition = serde_yaml::from_str(&text)?;

    let mut registry = MaterialRegistry::new();
    let plan = lamplan_to_plies(&blade, &mut registry)?;

    fs::write(out, serde_json::to_string_pretty(&plan)?)?;
    info!("written plydrape to {}", out.display());

    let workdir = PathBuf::from(&blade.general.workdir);
    export_material_map(&blade, &registry, &workdir)?;
    Ok(())
}

fn run_deck(
    mesh_path: &Path,
    matmap: &Path,
    out: &Path,
    options: DeckOptions,
    ply_table: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let map = MaterialMap::load(matmap)?;
    let db = map.load_database(matmap)?;
    let mesh = ShellMesh::load(mesh_path)?;

    let deck = assemble(&mesh, &map, &db, options)?;

    if options.single_step {
        fs::write(out, deck.single_deck())?;
        info!("written ccx input file with all loadcases to {}", out.display());
    } else {
        let stem = out.file_stem().and_then(|s| s.to_str()).unwrap_or("blade");
        let parent = out.parent().unwrap_or_else(|| Path::new("."));
        for (name, text) in deck.per_loadcase_decks() {
            let path = parent.join(format!("{stem}_{name}.inp"));
            fs::write(&path, text)?;
            info!("written ccx input file to {}", path.display());
        }
    }

    if let Some(table) = ply_table {
        write_ply_table(table, deck.ply_table())?;
        info!("written plybook table to {}", table.display());
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Commands::Plan { blade, out } => run_plan(&blade, &out),
        Commands::Deck {
            mesh,
            matmap,
            out,
            merge_adjacent,
            zero_angle,
            single_step,
            add_centers,
            force_iso,
            ply_table,
        } => run_deck(
            &mesh,
            &matmap,
            &out,
            DeckOptions {
                merge_adjacent,
                zero_angle,
                single_step,
                add_centers,
                force_iso,
            },
            ply_table.as_deref(),
        ),
    }
}
