//! Wrap-around sequence arithmetic.
//!
//! Message sequence numbers are 32-bit and wrap; a comparison is only
//! meaningful modulo 2^32, so every ordering test goes through [`seq_gt`]
//! rather than `>`.

/// A channel message sequence number.
pub type Seq = u32;

/// `true` when `a` is strictly newer than `b` under wrap-around ordering.
#[must_use]
pub fn seq_gt(a: Seq, b: Seq) -> bool {
    (a.wrapping_sub(b) as i32) > 0
}
