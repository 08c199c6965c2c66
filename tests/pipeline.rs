#![warn(clippy::pedantic)]

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use approx::assert_relative_eq;
use plydeck::assembler::{lamplan_to_plies, LaminatePlan, MaterialRegistry};
use plydeck::deck::{assemble, DeckOptions};
use plydeck::materials::{export_material_map, MaterialMap};
use plydeck::mesh::ShellMesh;
use plydeck::slab::BladeDefinition;

const BLADE_YAML: &str = r#"
general:
  workdir: "."
planform:
  z: [[0.0, 0.0], [1.0, 1.0]]
laminates:
  datums:
    web:
      xy: [[0.0, 0.4], [1.0, 0.6]]
  slabs:
    - name: sparcap
      grid: shell
      material: ud_glass
      slab: [[0.0, 5.0], [1.0, 5.0]]
      cover: "[('le', web - 0.1, web + 0.1)]"
    - name: core
      grid: shell
      material: balsa
      draping: blocks
      slab: [[0.0, 0.0], [0.5, 2.0], [1.0, 2.0]]
      cover:
        aft: [0.3, 0.9]
materials:
  ud_glass:
    name: ud_glass
    e11: 40000.0
    e22: 12000.0
    e33: 12000.0
    nu12: 0.28
    nu31: 0.1
    nu23: 0.3
    g12: 4000.0
    g31: 4000.0
    g23: 3500.0
  balsa:
    name: balsa
    E: 50.0
    nu: 0.3
  bondline:
    name: "-1"
    E: 3200.0
    nu: 0.35
"#;

fn blade() -> BladeDefinition {
    serde_yaml::from_str(BLADE_YAML).expect("blade definition parses")
}

fn planned() -> (LaminatePlan, MaterialRegistry) {
    let mut registry = MaterialRegistry::new();
    let plan = lamplan_to_plies(&blade(), &mut registry).expect("plan builds");
    (plan, registry)
}

/// A two-element shell mesh painted the way the draping step would paint it:
/// two sparcap plies over the full span and the core block on the inboard
/// element only.
fn painted_mesh() -> ShellMesh {
    ShellMesh {
        points: vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.5],
            [0.0, 1.0, 0.5],
            [1.0, 2.0, 1.0],
            [0.0, 2.0, 1.0],
        ],
        connectivity: vec![vec![0, 1, 2, 3], vec![3, 2, 4, 5]],
        cell_data: BTreeMap::from([
            (
                "ply_00_sparcap".to_string(),
                vec![vec![1.0, 1.0], vec![1.0, 1.0]],
            ),
            (
                "ply_01_core".to_string(),
                vec![vec![2.0, 2.0], vec![2.0, 0.0]],
            ),
            (
                "ply_02_sparcap".to_string(),
                vec![vec![1.0, 1.0], vec![1.0, 1.0]],
            ),
            (
                "x_dir".to_string(),
                vec![vec![1.0, 0.0, 0.0], vec![1.0, 0.0, 0.0]],
            ),
            (
                "y_dir".to_string(),
                vec![vec![0.0, 1.0, 0.0], vec![0.0, 1.0, 0.0]],
            ),
            (
                "centers".to_string(),
                vec![vec![0.5, 0.5, 0.25], vec![0.5, 1.5, 0.75]],
            ),
            (
                "slab_thickness_core".to_string(),
                vec![vec![2.0], vec![0.0]],
            ),
        ]),
        point_data: BTreeMap::from([(
            "lc_flap".to_string(),
            vec![
                vec![0.0, 0.0, 0.0],
                vec![0.0, 0.0, 0.0],
                vec![0.0, 0.0, 0.0],
                vec![0.0, 0.0, 0.0],
                vec![120.0, -30.0, 0.0],
                vec![120.0, 0.0, 0.0],
            ],
        )]),
    }
}

fn workdir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("plydeck-{label}-{}", std::process::id()));
    fs::create_dir_all(&dir).expect("workdir exists");
    dir
}

#[test]
fn constant_slab_plans_five_full_span_plies() {
    let (plan, _) = planned();

    let sparcap = &plan.slabs[0];
    assert_eq!(sparcap.stack.len(), 5);
    for ply in &sparcap.stack {
        assert_eq!(ply.material, 1);
        assert_relative_eq!(ply.thickness, 1.0);
        assert_relative_eq!(ply.start, 0.0);
        assert_relative_eq!(ply.end, 1.0);
    }
    assert_eq!(sparcap.numbering, vec![0, 1, 2, 3, 4]);
}

#[test]
fn core_slab_plans_two_blocks() {
    let (plan, _) = planned();

    let core = &plan.slabs[1];
    assert_eq!(core.stack.len(), 2);
    assert_eq!(core.stack[0].material, 2);
    assert_relative_eq!(core.stack[0].thickness, 1.0);
    assert_relative_eq!(core.stack[0].start, 0.0);
    assert_relative_eq!(core.stack[0].end, 0.5);
    assert_relative_eq!(core.stack[1].thickness, 2.0);
    assert_relative_eq!(core.stack[1].start, 0.5);
    assert_relative_eq!(core.stack[1].end, 1.0);
    assert_eq!(core.numbering.len(), core.stack.len());
}

#[test]
fn coverage_expression_resolves_against_the_datum() {
    let (plan, _) = planned();

    // web interpolates onto the four-sample relative grid; each arithmetic
    // term contributes one array, flattened into the cover sequence.
    let le = &plan.slabs[0].cover["le"];
    assert_eq!(le.len(), 8);
    assert_relative_eq!(le[0], 0.3, epsilon = 1e-9);
    assert_relative_eq!(le[3], 0.5, epsilon = 1e-9);
    assert_relative_eq!(le[4], 0.5, epsilon = 1e-9);
    assert_relative_eq!(le[7], 0.7, epsilon = 1e-9);
}

#[test]
fn plan_document_is_keyed_by_slab_name() {
    let (plan, _) = planned();
    let text = serde_json::to_string(&plan).expect("plan serializes");
    let json: serde_json::Value = serde_json::from_str(&text).expect("plan is valid json");

    assert_eq!(json["sparcap"]["grid"], "shell");
    assert_eq!(json["core"]["cover"]["aft"][1], 0.9);
    let stack = json["sparcap"]["stack"].as_array().expect("stack array");
    assert_eq!(stack.len(), 5);
    assert_eq!(stack[0].as_array().expect("stack entry").len(), 4);
}

#[test]
fn material_map_round_trips_through_the_workdir() {
    let (_, registry) = planned();
    let dir = workdir("matmap");

    let map_path = export_material_map(&blade(), &registry, &dir).expect("map exports");
    let map = MaterialMap::load(&map_path).expect("map loads");

    assert_eq!(map.ids["ud_glass"], 1);
    assert_eq!(map.ids["balsa"], 2);
    // The bondline entry rides along for the glue elements the mesher adds.
    assert_eq!(map.ids["-1"], -1);

    let db = map.load_database(&map_path).expect("linked db loads");
    assert!(db.get("ud_glass").is_some());
    assert!(db.get("balsa").is_some());
}

#[test]
fn painted_mesh_assembles_into_loadcase_decks() {
    let (_, registry) = planned();
    let dir = workdir("deck");
    let map_path = export_material_map(&blade(), &registry, &dir).expect("map exports");
    let map = MaterialMap::load(&map_path).expect("map loads");
    let db = map.load_database(&map_path).expect("linked db loads");

    let options = DeckOptions {
        merge_adjacent: true,
        zero_angle: true,
        ..DeckOptions::default()
    };
    let deck = assemble(&painted_mesh(), &map, &db, options).expect("deck assembles");

    assert_eq!(deck.loadcase_names().collect::<Vec<_>>(), vec!["lc_flap"]);
    let decks = deck.per_loadcase_decks();
    assert_eq!(decks.len(), 1);
    let text = &decks[0].1;

    // Model blocks in order, then the single loadcase step.
    let marks = [
        "*node,nset=nall",
        "*element,type=s4,elset=e1",
        "*elset,elset=Eall,GENERATE\n1,2",
        "*elset,elset=ply_00_sparcap\n1,2",
        "*elset,elset=ply_01_core\n1",
        "*elset,elset=slab_thickness_core\n1",
        "*orientation,name=or2",
        "*elastic,type=engineering constants",
        "*elastic,type=iso",
        "*shell section,composite,elset=e1,offset=-.5,orientation=or1",
        "*boundary,op=new\n1,1,3\n2,1,3\n",
        "** lc_flap",
        "*cload\n5,1,120.000000\n5,2,-30.000000\n6,1,120.000000\n",
        "*end step",
    ];
    let positions: Vec<usize> = marks
        .iter()
        .map(|mark| text.find(mark).unwrap_or_else(|| panic!("missing {mark}")))
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));

    // The outboard element lost its core, so both sparcap plies merge.
    assert!(text.contains(
        "*shell section,composite,elset=e2,offset=-.5,orientation=or2\n0.002000,,m1,0\n"
    ));

    // One sequential deck carries the same single step.
    let single = deck.single_deck();
    assert_eq!(single.matches("*end step").count(), 1);
}

#[test]
fn ply_table_lists_painted_plies() {
    let (_, registry) = planned();
    let dir = workdir("table");
    let map_path = export_material_map(&blade(), &registry, &dir).expect("map exports");
    let map = MaterialMap::load(&map_path).expect("map loads");
    let db = map.load_database(&map_path).expect("linked db loads");

    let deck = assemble(&painted_mesh(), &map, &db, DeckOptions::default())
        .expect("deck assembles");
    let table = deck.ply_table();
    assert_eq!(table.len(), 3);
    assert_eq!(table[0].name, "ply_00_sparcap");
    assert_eq!(table[1].material, "m2");
    assert_relative_eq!(table[1].thickness, 2.0);
    assert_eq!(table[2].id, 3);
}
