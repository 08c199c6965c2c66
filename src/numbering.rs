//! Physical ply numbering for planned stacks.

use crate::errors::PlanError;

/// Assign integer ply numbers to a stack of the given length.
///
/// `splitstack` divides the stack between two numbering sequences and must
/// sum to exactly 1.0. The sequences start at the two `key` values and step
/// by the two `increment` values; negative increments number in reverse,
/// which together with interleaving lets plies from two ends of a mould
/// alternate. The sequences are interleaved one-for-one until the shorter
/// is exhausted, then the longer continues alone.
///
/// The result always holds exactly `len` numbers.
pub fn number_stack(
    len: usize,
    splitstack: [f64; 2],
    key: [i64; 2],
    increment: [i64; 2],
) -> Result<Vec<i64>, PlanError> {
    if splitstack[0] + splitstack[1] != 1.0 {
        return Err(PlanError::SplitstackSum(splitstack));
    }
    let first = ((len as f64 * splitstack[0]).round() as usize).min(len);
    let second = len - first;

    let mut top = (0..first).map(|i| key[0] + i as i64 * increment[0]);
    let mut bottom = (0..second).map(|i| key[1] + i as i64 * increment[1]);
    let mut numbering = Vec::with_capacity(len);
    loop {
        match (top.next(), bottom.next()) {
            (None, None) => break,
            (a, b) => {
                numbering.extend(a);
                numbering.extend(b);
            }
        }
    }
    Ok(numbering)
}
