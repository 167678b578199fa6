//! `i32` comparisons. Each pushes `1` when the relation holds, else `0`.

use super::numeric::binary;
use super::{RuntimeError, Stack};

/// i32.ge_u: unsigned `c1 >= c2`.
pub fn i32_ge_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary(stack, |c1, c2| Ok(((c1 as u32) >= (c2 as u32)) as i32))
}

/// i32.gt_s: signed `c1 > c2`.
pub fn i32_gt_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary(stack, |c1, c2| Ok((c1 > c2) as i32))
}

/// i32.lt_s: signed `c1 < c2`.
pub fn i32_lt_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary(stack, |c1, c2| Ok((c1 < c2) as i32))
}

/// i32.lt_u: unsigned `c1 < c2`.
pub fn i32_lt_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary(stack, |c1, c2| Ok(((c1 as u32) < (c2 as u32)) as i32))
}
