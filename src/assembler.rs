//! Laminate plan assembly.
//!
//! Walks the blade definition slab by slab, registers materials, resolves
//! coverage, drapes each slab's r-t curve and numbers the resulting stack.
//! The material registry lives here for exactly one run and is handed to the
//! export side by reference, so material ids never leak into global state.

use std::collections::HashMap;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::coverage::{resolve_coverage, CoverMap};
use crate::errors::PlanError;
use crate::grid::linspace;
use crate::numbering::number_stack;
use crate::planner::{coreblock, ply_stack, Ply};
use crate::slab::{BladeDefinition, Draping, Slab};

/// Material name to id registry for one planning run.
///
/// Ids are small positive integers assigned in first-seen order, starting at
/// 1, so the ids painted onto the mesh stay stable across reruns of the same
/// blade definition.
#[derive(Debug, Clone, Default)]
pub struct MaterialRegistry {
    /// Assigned ids by material name.
    ids: HashMap<String, i64>,
    /// Names in assignment order.
    order: Vec<String>,
}

impl MaterialRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id for a material, assigning the next one on first sight.
    pub fn id_for(&mut self, name: &str) -> i64 {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.ids.len() as i64 + 1;
        self.ids.insert(name.to_string(), id);
        self.order.push(name.to_string());
        id
    }

    /// Look up an already-assigned id.
    pub fn get(&self, name: &str) -> Option<i64> {
        self.ids.get(name).copied()
    }

    /// Registered names with their ids, in assignment order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.order.iter().map(|name| (name.as_str(), self.ids[name]))
    }

    /// Number of registered materials.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no material has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// The planned laminate of one slab.
#[derive(Debug, Clone, Serialize)]
pub struct SlabPlan {
    /// Slab name, the plan key.
    pub name: String,
    /// Grid label the slab drapes onto.
    pub grid: String,
    /// Resolved planform coverage.
    pub cover: CoverMap,
    /// Physical ply numbers, one per stack entry.
    pub numbering: Vec<i64>,
    /// Draped plies or blocks, bottom-up.
    pub stack: Vec<Ply>,
    /// Shared radius grid in metres from the root.
    pub r: Vec<f64>,
}

/// A full laminate plan, slab entries in definition order.
#[derive(Debug, Clone, Default)]
pub struct LaminatePlan {
    /// Planned slabs.
    pub slabs: Vec<SlabPlan>,
}

/// Plan entry body, keyed by slab name in the serialized document.
#[derive(Serialize)]
struct SlabPlanBody<'a> {
    grid: &'a str,
    cover: &'a CoverMap,
    numbering: &'a [i64],
    stack: &'a [Ply],
    r: &'a [f64],
}

impl Serialize for LaminatePlan {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.slabs.len()))?;
        for slab in &self.slabs {
            map.serialize_entry(
                &slab.name,
                &SlabPlanBody {
                    grid: &slab.grid,
                    cover: &slab.cover,
                    numbering: &slab.numbering,
                    stack: &slab.stack,
                    r: &slab.r,
                },
            )?;
        }
        map.end()
    }
}

/// Scale a slab's r-t curve into metres and millimetres.
fn scaled_curve(slab: &Slab, span: f64) -> Result<(Vec<f64>, Vec<f64>), PlanError> {
    if slab.slab.is_empty() {
        return Err(PlanError::CurveShape {
            slab: slab.name.clone(),
            reason: "curve has no stations".to_string(),
        });
    }
    let rscale = slab.rscale.unwrap_or(span);
    let r: Vec<f64> = slab.slab.iter().map(|p| p[0] * rscale).collect();
    let t: Vec<f64> = slab.slab.iter().map(|p| p[1] * slab.ply_thickness).collect();
    if r.windows(2).any(|w| w[0] > w[1]) {
        return Err(PlanError::CurveShape {
            slab: slab.name.clone(),
            reason: "radius stations must ascend".to_string(),
        });
    }
    Ok((r, t))
}

/// Turn the blade's slab-based laminate definition into a ply-level plan.
///
/// The radius grid is shared across slabs: four samples per metre of tip
/// radius, spanning root to tip, plus its 0-1 relative form used to resolve
/// coverage expressions.
pub fn lamplan_to_plies(
    blade: &BladeDefinition,
    registry: &mut MaterialRegistry,
) -> Result<LaminatePlan, PlanError> {
    let stations = &blade.planform.z;
    if stations.len() < 2 {
        return Err(PlanError::MissingPlanform);
    }
    let root_radius = stations[0][1];
    let tip_radius = stations[stations.len() - 1][1];
    let span = tip_radius - root_radius;

    let n_s = (4.0 * tip_radius).round() as usize;
    let radius = linspace(0.0, span, n_s);
    let radius_relative = linspace(0.0, 1.0, n_s);

    let mut plan = LaminatePlan::default();
    for slab in &blade.laminates.slabs {
        let material = registry.id_for(&slab.material);
        let cover = resolve_coverage(slab, &blade.laminates.datums, &radius_relative)?;
        let (r, t) = scaled_curve(slab, span)?;

        let stack = match slab.draping {
            Draping::Blocks => coreblock(&r, &t, material),
            Draping::Plies => ply_stack(&r, &t, slab.ply_thickness, material, slab.reverse),
        };
        let numbering = number_stack(stack.len(), slab.splitstack, slab.key, slab.increment)?;

        plan.slabs.push(SlabPlan {
            name: slab.name.trim().to_string(),
            grid: slab.grid.trim().to_string(),
            cover,
            numbering,
            stack,
            r: radius.clone(),
        });
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::grid::interp_one;

    const BLADE_YAML: &str = r#"
planform:
  z: [[0.0, 0.0], [1.0, 1.0]]
laminates:
  slabs:
    - name: sparcap
      grid: shell
      material: ud_glass
      slab: [[0.0, 5.0], [1.0, 5.0]]
      cover: "[('full', 0.0, 1.0)]"
    - name: core
      grid: shell
      material: balsa
      draping: blocks
      slab: [[0.0, 0.0], [0.5, 2.0], [1.0, 2.0]]
      cover:
        aft: [0.3, 0.9]
    - name: cap2
      grid: shell
      material: ud_glass
      slab: [[0.0, 2.0], [1.0, 2.0]]
      cover: "[('full', 0.0, 1.0)]"
"#;

    fn blade() -> BladeDefinition {
        serde_yaml::from_str(BLADE_YAML).expect("valid blade yaml")
    }

    #[test]
    fn registry_assigns_first_seen_ids_from_one() {
        let mut registry = MaterialRegistry::new();
        assert_eq!(registry.id_for("glass"), 1);
        assert_eq!(registry.id_for("balsa"), 2);
        assert_eq!(registry.id_for("glass"), 1);
        assert_eq!(registry.len(), 2);
        let pairs: Vec<(&str, i64)> = registry.iter().collect();
        assert_eq!(pairs, vec![("glass", 1), ("balsa", 2)]);
    }

    #[test]
    fn constant_slab_drapes_to_full_span_plies() {
        let mut registry = MaterialRegistry::new();
        let plan = lamplan_to_plies(&blade(), &mut registry).expect("plans");

        let sparcap = &plan.slabs[0];
        assert_eq!(sparcap.stack.len(), 5);
        for ply in &sparcap.stack {
            assert_eq!(ply.material, 1);
            assert_relative_eq!(ply.start, 0.0);
            assert_relative_eq!(ply.end, 1.0);
        }
        assert_eq!(sparcap.numbering, vec![0, 1, 2, 3, 4]);
        assert_eq!(sparcap.cover["full"], vec![0.0, 1.0]);
    }

    #[test]
    fn blocks_slab_uses_coreblock_segments() {
        let mut registry = MaterialRegistry::new();
        let plan = lamplan_to_plies(&blade(), &mut registry).expect("plans");

        let core = &plan.slabs[1];
        assert_eq!(core.stack.len(), 2);
        assert_relative_eq!(core.stack[0].thickness, 1.0);
        assert_relative_eq!(core.stack[1].thickness, 2.0);
        assert_eq!(core.stack[0].material, 2);
        assert_eq!(core.numbering.len(), core.stack.len());
    }

    #[test]
    fn shared_material_reuses_its_id() {
        let mut registry = MaterialRegistry::new();
        let plan = lamplan_to_plies(&blade(), &mut registry).expect("plans");
        assert_eq!(registry.len(), 2);
        assert_eq!(plan.slabs[2].stack[0].material, 1);
    }

    #[test]
    fn radius_grid_spans_root_to_tip() {
        let mut registry = MaterialRegistry::new();
        let plan = lamplan_to_plies(&blade(), &mut registry).expect("plans");
        let r = &plan.slabs[0].r;
        assert_eq!(r.len(), 4);
        assert_relative_eq!(r[0], 0.0);
        assert_relative_eq!(r[r.len() - 1], 1.0);
    }

    #[test]
    fn stack_thickness_matches_the_input_curve() {
        let mut registry = MaterialRegistry::new();
        let plan = lamplan_to_plies(&blade(), &mut registry).expect("plans");

        // Summed ply thickness at a station reproduces the interpolated
        // slab thickness there.
        let sparcap = &plan.slabs[0];
        for station in [0.1, 0.5, 0.9] {
            let total: f64 = sparcap
                .stack
                .iter()
                .filter(|ply| ply.start <= station && station <= ply.end)
                .map(|ply| ply.thickness)
                .sum();
            let expected = interp_one(station, &[0.0, 1.0], &[5.0, 5.0]);
            assert_relative_eq!(total, expected, epsilon = 1e-9);
        }
    }

    #[test]
    fn short_planforms_abort() {
        let mut blade = blade();
        blade.planform.z.truncate(1);
        let mut registry = MaterialRegistry::new();
        assert!(matches!(
            lamplan_to_plies(&blade, &mut registry),
            Err(PlanError::MissingPlanform)
        ));
    }

    #[test]
    fn descending_curves_abort() {
        let mut blade = blade();
        blade.laminates.slabs[0].slab = vec![[1.0, 5.0], [0.0, 5.0]];
        let mut registry = MaterialRegistry::new();
        assert!(matches!(
            lamplan_to_plies(&blade, &mut registry),
            Err(PlanError::CurveShape { slab, .. }) if slab == "sparcap"
        ));
    }

    #[test]
    fn plan_serializes_keyed_by_slab_name() {
        let mut registry = MaterialRegistry::new();
        let plan = lamplan_to_plies(&blade(), &mut registry).expect("plans");
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&plan).expect("serializes"))
                .expect("valid json");
        let sparcap = &json["sparcap"];
        assert_eq!(sparcap["grid"], "shell");
        assert_eq!(sparcap["numbering"].as_array().unwrap().len(), 5);
        assert_eq!(sparcap["stack"][0].as_array().unwrap().len(), 4);
    }
}
