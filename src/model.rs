//! Reference model of the multiplier.

use crate::transaction::Operation;
use crate::TbResult;

/// Reinterpret a 32-bit bus value as two's complement.
#[inline]
pub fn to_signed(val: u32) -> i32 {
    val as i32
}

/// Expected result for `a op b`, operands taken as signed 32-bit values.
/// The product is exact; an `i32 * i32` always fits in 63 bits.
pub fn predict(a: u32, b: u32, op: Operation) -> i64 {
    let a = to_signed(a) as i64;
    let b = to_signed(b) as i64;
    match op {
        Operation::Mul => a * b,
    }
}

/// [`predict`] for an opcode straight off the wire. Fails with
/// `IllegalOpcode` if the opcode is not part of [`Operation`].
pub fn predict_raw(a: u32, b: u32, opcode: u64) -> TbResult<i64> {
    Ok(predict(a, b, Operation::from_code(opcode)?))
}
