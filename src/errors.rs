//! Error types produced while planning laminates or assembling FE decks.

use std::path::PathBuf;

use thiserror::Error;

/// Error returned when a laminate plan cannot be built.
///
/// Each variant labels the pipeline stage that failed so embedding code can
/// report where a blade definition went wrong without parsing message text.
#[derive(Debug, Error, PartialEq)]
pub enum PlanError {
    /// Returned when the stack split fractions do not sum to exactly one.
    #[error("splitstack {0:?} does not sum to 1.0")]
    SplitstackSum([f64; 2]),
    /// Returned when a slab's r-t curve cannot be draped.
    #[error("slab {slab:?} has a malformed curve: {reason}")]
    CurveShape {
        /// Name of the offending slab.
        slab: String,
        /// Description of the defect.
        reason: String,
    },
    /// Returned when the blade planform holds fewer than two z stations.
    #[error("planform needs at least two z stations to span a radius range")]
    MissingPlanform,
    /// Returned when a coverage expression cannot be resolved.
    #[error("coverage for slab {slab:?}: {source}")]
    Coverage {
        /// Name of the slab whose cover expression failed.
        slab: String,
        /// Underlying interpreter error.
        #[source]
        source: CoverageError,
    },
}

/// Error produced by the coverage expression interpreter.
#[derive(Debug, Error, PartialEq)]
pub enum CoverageError {
    /// Returned when an identifier does not name a known datum.
    #[error("unknown datum {0:?}")]
    UnknownDatum(String),
    /// Returned when a character cannot start or continue a token.
    #[error("unexpected character {found:?} at offset {offset}")]
    UnexpectedChar {
        /// The offending character.
        found: char,
        /// Byte offset into the expression.
        offset: usize,
    },
    /// Returned when the expression ends mid-construct.
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    /// Returned when a specific token was required.
    #[error("expected {expected} at offset {offset}")]
    Expected {
        /// Human-readable description of the missing token.
        expected: &'static str,
        /// Byte offset into the expression.
        offset: usize,
    },
    /// Returned when a tuple does not start with a string key.
    #[error("cover tuple must start with a string key")]
    MissingKey,
    /// Returned when elementwise arithmetic sees arrays of different length.
    #[error("array operands have lengths {0} and {1}")]
    LengthMismatch(usize, usize),
    /// Returned when arithmetic is attempted on a string operand.
    #[error("cannot apply arithmetic to a string value")]
    StringArithmetic,
}

/// Error returned while resolving materials or assembling an FE deck.
#[derive(Debug, Error)]
pub enum DeckError {
    /// Returned when the material map document is absent.
    #[error("material map {0} not found")]
    MissingMaterialMap(PathBuf),
    /// Returned when the map does not name a material database.
    #[error("material map {0} has no matdb link, need one to do FEA")]
    MissingDatabaseLink(PathBuf),
    /// Returned when an element references a material id the map lacks.
    #[error("material id {0} is not present in the material map")]
    UnknownMaterialId(i64),
    /// Returned when a mapped name is missing from the database.
    #[error("material {0:?} is not present in the material database")]
    UnknownMaterial(String),
    /// Returned when a database entry fits none of the constitutive models.
    #[error(
        "material {0:?} has neither a stiffness matrix, engineering constants nor isotropic properties"
    )]
    UnresolvableMaterial(String),
    /// Returned when forced-isotropic export finds no fallback moduli.
    #[error("material {0:?} has no isotropic parameters for forced-isotropic export")]
    NoIsotropicFallback(String),
    /// Returned when a required mesh array is absent.
    #[error("mesh carries no {0:?} array")]
    MissingArray(&'static str),
    /// Returned when a mesh array has the wrong dimensionality.
    #[error("array {name:?} has {rows} rows of width {cols}, expected {expected}")]
    DataShape {
        /// Name of the offending array.
        name: String,
        /// Observed row count.
        rows: usize,
        /// Observed row width (0 when rows are ragged).
        cols: usize,
        /// Description of the expected shape.
        expected: &'static str,
    },
    /// Returned when a boundary document cannot be read or written.
    #[error("failed to access {path}")]
    Io {
        /// Path of the document.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Returned when a boundary document cannot be parsed.
    #[error("failed to parse {path}: {reason}")]
    Parse {
        /// Path of the document.
        path: PathBuf,
        /// Parser message.
        reason: String,
    },
}
