//! Scalar element trait for block kernels.

use core::fmt::Debug;
use core::ops::{AddAssign, Mul, Sub};

use num_traits::{One, Zero};

/// Trait for scalar types flowing through block kernels.
///
/// Covers exactly the arithmetic the kernels need: zeroing batch memory
/// before accumulation, multiply-accumulate for contraction, and elementwise
/// difference for subtraction.
pub trait Element:
    Copy
    + Default
    + Debug
    + PartialEq
    + Zero
    + One
    + Mul<Output = Self>
    + AddAssign
    + Sub<Output = Self>
    + Send
    + Sync
    + 'static
{
}

impl<T> Element for T where
    T: Copy
        + Default
        + Debug
        + PartialEq
        + Zero
        + One
        + Mul<Output = Self>
        + AddAssign
        + Sub<Output = Self>
        + Send
        + Sync
        + 'static
{
}
