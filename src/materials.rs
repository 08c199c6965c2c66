//! Material resolution and CalculiX material card emission.
//!
//! Two documents are involved: a material map, JSON mapping material names to
//! the integer ids painted onto the mesh, and a material database, YAML
//! mapping names to constitutive properties. The map links to the database
//! through its `matdb` key. Each database entry is resolved to exactly one
//! tagged constitutive model when the database loads, so downstream card
//! emission is a plain match instead of probing for properties.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::assembler::MaterialRegistry;
use crate::errors::DeckError;
use crate::fmt::g4;
use crate::slab::{BladeDefinition, MaterialsSource};

/// Bounds the isotropic Poisson's ratio is clamped into for solver stability.
const NU_BOUNDS: (f64, f64) = (0.1, 0.45);

/// Database entry names that denote bondline glue rather than a laminate
/// material. Mesh elements carrying these get material id -1 and no card.
const GLUE_NAMES: [&str; 2] = ["-1", "adhesive"];

/// File name an inline material database is serialized under.
const INLINE_DB_NAME: &str = "__matdb.yml";

/// One material as it appears in the database document.
///
/// Property groups are all optional in the document; resolution picks one
/// model per entry at load time.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawMaterial {
    /// Display name, also used to recognise glue entries.
    pub name: String,
    /// 6x6 stiffness matrix in MPa.
    #[serde(rename = "C", default, skip_serializing_if = "Option::is_none")]
    pub c: Option<[[f64; 6]; 6]>,
    /// Engineering constants, MPa for moduli.
    #[serde(flatten)]
    pub engineering: RawEngineering,
    /// Isotropic Young's modulus in MPa, tested variant.
    #[serde(rename = "tEx", default, skip_serializing_if = "Option::is_none")]
    pub t_ex: Option<f64>,
    /// Isotropic Young's modulus in MPa.
    #[serde(rename = "E", default, skip_serializing_if = "Option::is_none")]
    pub e: Option<f64>,
    /// Isotropic Poisson's ratio.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nu: Option<f64>,
}

/// The nine engineering constants, each optional in the document.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawEngineering {
    /// Longitudinal modulus.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e11: Option<f64>,
    /// Transverse modulus.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e22: Option<f64>,
    /// Through-thickness modulus.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e33: Option<f64>,
    /// In-plane Poisson's ratio.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nu12: Option<f64>,
    /// Through-thickness Poisson's ratio, 3-1 plane.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nu31: Option<f64>,
    /// Through-thickness Poisson's ratio, 2-3 plane.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nu23: Option<f64>,
    /// In-plane shear modulus.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub g12: Option<f64>,
    /// Shear modulus, 3-1 plane.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub g31: Option<f64>,
    /// Shear modulus, 2-3 plane.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub g23: Option<f64>,
}

impl RawEngineering {
    /// Return the nine constants when all are present.
    fn complete(&self) -> Option<[f64; 9]> {
        Some([
            self.e11?, self.e22?, self.e33?, self.nu12?, self.nu31?, self.nu23?, self.g12?,
            self.g31?, self.g23?,
        ])
    }
}

/// Constitutive model of one material, resolved at database load time.
#[derive(Debug, Clone, PartialEq)]
pub enum Constitutive {
    /// Full 6x6 stiffness matrix in MPa.
    Orthotropic([[f64; 6]; 6]),
    /// Nine engineering constants in card order: e11, e22, e33, nu12, nu31,
    /// nu23, g12, g31, g23.
    EngineeringConstants([f64; 9]),
    /// Young's modulus in MPa and Poisson's ratio, the ratio already clamped.
    Isotropic {
        /// Young's modulus.
        e: f64,
        /// Poisson's ratio, within [0.1, 0.45].
        nu: f64,
    },
}

/// A resolved material database entry.
#[derive(Debug, Clone)]
pub struct MaterialEntry {
    /// Display name from the database.
    pub name: String,
    /// The selected constitutive model.
    pub model: Constitutive,
    /// Isotropic parameters kept alongside richer models so forced-isotropic
    /// export can fall back to them.
    iso_fallback: Option<(f64, f64)>,
}

/// Clamp a Poisson's ratio into the stable range. Lenient on purpose.
fn clamp_nu(nu: f64) -> f64 {
    nu.clamp(NU_BOUNDS.0, NU_BOUNDS.1)
}

impl MaterialEntry {
    /// Resolve a raw database entry to a tagged model.
    ///
    /// Priority: stiffness matrix, then a complete set of engineering
    /// constants, then isotropic moduli. Entries fitting none of the three
    /// are rejected.
    fn resolve(raw: &RawMaterial) -> Result<Self, DeckError> {
        let iso_fallback = iso_parameters(raw);
        let model = if let Some(c) = raw.c {
            Constitutive::Orthotropic(c)
        } else if let Some(constants) = raw.engineering.complete() {
            Constitutive::EngineeringConstants(constants)
        } else if let Some((e, nu)) = iso_fallback {
            Constitutive::Isotropic { e, nu }
        } else {
            return Err(DeckError::UnresolvableMaterial(raw.name.clone()));
        };
        Ok(Self {
            name: raw.name.clone(),
            model,
            iso_fallback,
        })
    }
}

/// Extract isotropic parameters when present: E from `tEx` else `E`, nu from
/// `nu` else `nu12`, the ratio clamped.
fn iso_parameters(raw: &RawMaterial) -> Option<(f64, f64)> {
    let e = raw.t_ex.or(raw.e)?;
    let nu = raw.nu.or(raw.engineering.nu12)?;
    Some((e, clamp_nu(nu)))
}

/// The material map document: name to painted id, plus the database link.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MaterialMap {
    /// File name of the material database, relative to the map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matdb: Option<String>,
    /// Material name to mesh id. Glue entries map to -1.
    #[serde(flatten)]
    pub ids: BTreeMap<String, i64>,
}

impl MaterialMap {
    /// Load a material map from a JSON document.
    pub fn load(path: &Path) -> Result<Self, DeckError> {
        if !path.is_file() {
            return Err(DeckError::MissingMaterialMap(path.to_path_buf()));
        }
        let text = fs::read_to_string(path).map_err(|source| DeckError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|e| DeckError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Load the database the map links to, resolving it next to the map.
    pub fn load_database(&self, map_path: &Path) -> Result<MaterialDb, DeckError> {
        let db_name = self
            .matdb
            .as_deref()
            .ok_or_else(|| DeckError::MissingDatabaseLink(map_path.to_path_buf()))?;
        let db_path = map_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(db_name);
        MaterialDb::load(&db_path)
    }

    /// Map an id back to its material name.
    fn name_of(&self, id: i64) -> Option<&str> {
        self.ids
            .iter()
            .find(|(_, &v)| v == id)
            .map(|(k, _)| k.as_str())
    }
}

/// A material database with every entry resolved to one constitutive model.
#[derive(Debug, Clone, Default)]
pub struct MaterialDb {
    /// Resolved entries by database key.
    entries: HashMap<String, MaterialEntry>,
}

impl MaterialDb {
    /// Load and resolve a YAML material database document.
    pub fn load(path: &Path) -> Result<Self, DeckError> {
        let text = fs::read_to_string(path).map_err(|source| DeckError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: HashMap<String, RawMaterial> =
            serde_yaml::from_str(&text).map_err(|e| DeckError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Self::from_raw(&raw)
    }

    /// Resolve an already-parsed database mapping.
    pub fn from_raw(raw: &HashMap<String, RawMaterial>) -> Result<Self, DeckError> {
        let mut entries = HashMap::with_capacity(raw.len());
        for (key, material) in raw {
            entries.insert(key.clone(), MaterialEntry::resolve(material)?);
        }
        Ok(Self { entries })
    }

    /// Look up a resolved entry by database key.
    pub fn get(&self, key: &str) -> Option<&MaterialEntry> {
        self.entries.get(key)
    }
}

/// Emit one `*material` card per referenced material id.
///
/// Ids at or below zero denote unpainted elements or glue connectors and are
/// skipped. Every other id must resolve through the map and database or the
/// run aborts.
pub fn material_cards(
    ids: &[i64],
    map: &MaterialMap,
    db: &MaterialDb,
    force_iso: bool,
) -> Result<String, DeckError> {
    let mut block = String::new();
    for &id in ids {
        if id <= 0 {
            continue;
        }
        let key = map
            .name_of(id)
            .ok_or(DeckError::UnknownMaterialId(id))?
            .to_string();
        let entry = db
            .get(&key)
            .ok_or_else(|| DeckError::UnknownMaterial(key.clone()))?;
        block += &format!("** material: {}\n", entry.name);
        if force_iso {
            let (e, nu) = entry
                .iso_fallback
                .ok_or_else(|| DeckError::NoIsotropicFallback(entry.name.clone()))?;
            block += &isotropic_card(id, e, nu);
            continue;
        }
        match &entry.model {
            Constitutive::Orthotropic(c) => {
                debug!("{} is assumed to be orthotropic", entry.name);
                block += &orthotropic_card(id, c);
            }
            Constitutive::EngineeringConstants(constants) => {
                debug!("{} has engineering constants", entry.name);
                block += &engineering_card(id, constants);
            }
            Constitutive::Isotropic { e, nu } => {
                debug!("{} is assumed to be isotropic", entry.name);
                block += &isotropic_card(id, *e, *nu);
            }
        }
    }
    Ok(block)
}

/// Card for a stiffness-matrix material.
///
/// The database stores the matrix in lamina ordering; the card format wants
/// the 4 and 6 shear columns swapped, so the coupling terms move between
/// columns 3 and 5 and the two shear diagonals trade places. Values scale
/// from MPa to Pa.
fn orthotropic_card(id: i64, c: &[[f64; 6]; 6]) -> String {
    let mut d = *c;
    d[0][3] = c[0][5];
    d[0][5] = c[0][3];
    d[1][3] = c[1][5];
    d[1][5] = c[1][3];
    d[2][3] = c[2][5];
    d[2][5] = c[2][3];
    d[3][3] = c[5][5];
    d[5][5] = c[3][3];
    for row in &mut d {
        for value in row {
            *value *= 1e6;
        }
    }
    format!(
        "** orthotropic material\n*material,name=m{id}\n*elastic,type=ortho\n\
         {},{},{},{},{},{},{},{},\n{},293\n",
        g4(d[0][0]),
        g4(d[0][1]),
        g4(d[1][1]),
        g4(d[0][2]),
        g4(d[1][2]),
        g4(d[2][2]),
        g4(d[3][3]),
        g4(d[4][4]),
        g4(d[5][5]),
    )
}

/// Card for an engineering-constants material. Values go in unscaled.
fn engineering_card(id: i64, constants: &[f64; 9]) -> String {
    format!(
        "** orthotropic material\n*material,name=m{id}\n*elastic,type=engineering constants\n\
         {},{},{},{},{},{},{},{},\n{},293\n",
        g4(constants[0]),
        g4(constants[1]),
        g4(constants[2]),
        g4(constants[3]),
        g4(constants[4]),
        g4(constants[5]),
        g4(constants[6]),
        g4(constants[7]),
        g4(constants[8]),
    )
}

/// Card for an isotropic material; E scales from MPa to Pa.
fn isotropic_card(id: i64, e: f64, nu: f64) -> String {
    format!(
        "** isotropic material\n*material,name=m{id}\n*elastic,type=iso\n{},{},293\n",
        g4(e * 1e6),
        g4(clamp_nu(nu)),
    )
}

/// Export the registry as a material map document next to the plan.
///
/// The database travels with the map: a linked database file is copied into
/// the working directory so reruns are immune to later edits of the source
/// document, an inline database is serialized to a sibling YAML file. Glue
/// entries in the database are added to the map under their own names with
/// id -1, matching the connector elements the mesher emits between webs and
/// shell.
pub fn export_material_map(
    blade: &BladeDefinition,
    registry: &MaterialRegistry,
    workdir: &Path,
) -> Result<PathBuf, DeckError> {
    let mut map = MaterialMap {
        matdb: None,
        ids: registry.iter().map(|(k, v)| (k.to_string(), v)).collect(),
    };

    let raw_db: Option<HashMap<String, RawMaterial>> = match &blade.materials {
        Some(MaterialsSource::Path(source)) => {
            let source = Path::new(source);
            let db_name = source.file_name().ok_or_else(|| DeckError::Io {
                path: source.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })?;
            let copied = workdir.join(db_name);
            if !source.is_file() {
                return Err(DeckError::Io {
                    path: source.to_path_buf(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                });
            }
            if copied != source {
                fs::copy(source, &copied).map_err(|e| DeckError::Io {
                    path: copied.clone(),
                    source: e,
                })?;
            }
            map.matdb = Some(db_name.to_string_lossy().into_owned());
            let text = fs::read_to_string(source).map_err(|e| DeckError::Io {
                path: source.to_path_buf(),
                source: e,
            })?;
            Some(
                serde_yaml::from_str(&text).map_err(|e| DeckError::Parse {
                    path: source.to_path_buf(),
                    reason: e.to_string(),
                })?,
            )
        }
        Some(MaterialsSource::Inline(db)) => {
            let db_path = workdir.join(INLINE_DB_NAME);
            let text = serde_yaml::to_string(db).map_err(|e| DeckError::Parse {
                path: db_path.clone(),
                reason: e.to_string(),
            })?;
            fs::write(&db_path, text).map_err(|e| DeckError::Io {
                path: db_path.clone(),
                source: e,
            })?;
            map.matdb = Some(INLINE_DB_NAME.to_string());
            Some(db.clone())
        }
        None => {
            info!("no material db defined in blade file");
            None
        }
    };

    if let Some(db) = &raw_db {
        for material in db.values() {
            if GLUE_NAMES.contains(&material.name.as_str()) {
                map.ids.insert(material.name.clone(), -1);
            }
        }
    }

    let map_path = workdir.join("material_map.json");
    let text = serde_json::to_string(&map).map_err(|e| DeckError::Parse {
        path: map_path.clone(),
        reason: e.to_string(),
    })?;
    fs::write(&map_path, text).map_err(|e| DeckError::Io {
        path: map_path.clone(),
        source: e,
    })?;
    info!("written material map to {}", map_path.display());
    Ok(map_path)
}
