//! Laminate decomposition: turning continuous r-t curves into discrete
//! plies or thickness blocks.

use serde::de::{Deserializer, Error as _};
use serde::ser::{SerializeTuple, Serializer};
use serde::{Deserialize, Serialize};

use crate::grid::{interp, linspace, round_to_grid};

/// Number of uniform samples a slab curve is resampled onto before draping.
const SUBDIVISIONS: usize = 5000;

/// A discrete layer of fixed material and thickness spanning a radius range.
///
/// Serialized as the 4-tuple `[material, thickness, start, end]`, the stack
/// entry form of the laminate plan document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ply {
    /// Registered material id.
    pub material: i64,
    /// Layer thickness in the slab's thickness unit.
    pub thickness: f64,
    /// Inner radius of the span, snapped to the 10 mm grid.
    pub start: f64,
    /// Outer radius of the span, snapped to the 10 mm grid.
    pub end: f64,
}

impl Serialize for Ply {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(4)?;
        tuple.serialize_element(&self.material)?;
        tuple.serialize_element(&self.thickness)?;
        tuple.serialize_element(&self.start)?;
        tuple.serialize_element(&self.end)?;
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for Ply {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: [f64; 4] = Deserialize::deserialize(deserializer)?;
        if raw[0].fract() != 0.0 {
            return Err(D::Error::custom("material id must be an integer"));
        }
        Ok(Self {
            material: raw[0] as i64,
            thickness: raw[1],
            start: raw[2],
            end: raw[3],
        })
    }
}

/// Fill a thickness distribution with plies of fixed thickness.
///
/// Walks the sampled curve keeping an ordered list of open plies: a new ply
/// opens whenever the local thickness exceeds what the open plies carry, and
/// the most recently opened ply closes as soon as the thickness drops back to
/// a full multiple of `ply_thickness` below it. Plies still open at the end
/// of the curve close at the final radius. Completed spans are snapped to
/// the 10 mm radius grid.
///
/// Thickness rounds down: a ply that never reaches a full multiple of
/// `ply_thickness` anywhere on the curve is never opened.
///
/// The returned spans are bottom-up when `reverse` is true; otherwise the
/// list is reversed so the longest-running plies receive the lowest numbers
/// downstream.
pub fn plyify(r: &[f64], t: &[f64], ply_thickness: f64, reverse: bool) -> Vec<(f64, f64)> {
    debug_assert_eq!(r.len(), t.len());
    let mut open: Vec<f64> = Vec::new();
    let mut done: Vec<(f64, f64)> = Vec::new();
    for (&radius, &thickness) in r.iter().zip(t) {
        while thickness > open.len() as f64 * ply_thickness {
            open.push(radius);
        }
        while !open.is_empty() && thickness <= (open.len() - 1) as f64 * ply_thickness {
            let start = open.pop().unwrap();
            done.push((start, radius));
        }
    }
    if let Some(&last) = r.last() {
        for start in open {
            done.push((start, last));
        }
    }
    for span in &mut done {
        span.0 = round_to_grid(span.0);
        span.1 = round_to_grid(span.1);
    }
    if reverse {
        done
    } else {
        done.reverse();
        done
    }
}

/// Drape a slab curve with plies.
///
/// The r-t curve is resampled onto a uniform grid spanning the curve before
/// [`plyify`] runs, so coarse input stations still produce smooth ply
/// run-outs.
pub fn ply_stack(
    r: &[f64],
    t: &[f64],
    ply_thickness: f64,
    material: i64,
    reverse: bool,
) -> Vec<Ply> {
    let lo = r.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = r.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let x = linspace(lo, hi, SUBDIVISIONS);
    let y = interp(&x, r, t);
    plyify(&x, &y, ply_thickness, reverse)
        .into_iter()
        .map(|(start, end)| Ply {
            material,
            thickness: ply_thickness,
            start,
            end,
        })
        .collect()
}

/// Drape a slab curve with thickness blocks.
///
/// One segment per consecutive pair of input stations; the segment thickness
/// is the shared endpoint value when both ends agree and the arithmetic mean
/// otherwise. Segments with non-positive thickness are dropped.
pub fn coreblock(r: &[f64], t: &[f64], material: i64) -> Vec<Ply> {
    debug_assert_eq!(r.len(), t.len());
    let mut stack = Vec::new();
    for i in 0..r.len().saturating_sub(1) {
        let (t_lo, t_hi) = (t[i], t[i + 1]);
        let thickness = if t_lo == t_hi {
            t_lo
        } else {
            0.5 * (t_lo + t_hi)
        };
        if thickness > 0.0 {
            stack.push(Ply {
                material,
                thickness,
                start: r[i],
                end: r[i + 1],
            });
        }
    }
    stack
}
