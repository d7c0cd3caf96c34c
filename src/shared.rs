// Tear-free publication of the controller output to other execution contexts
// Copyright © 2025 Hs293Go
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included
// in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES
// OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT.
// IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
// DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT,
// TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE
// OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use core::fmt::Debug;
use core::sync::atomic::Ordering;

use num_traits::float::FloatCore;
use portable_atomic::{AtomicU32, AtomicU64};

/// A float type whose bit pattern fits in a lock-free atomic integer.
///
/// `portable-atomic` supplies the 64-bit atomic on targets (e.g. Cortex-M0/M3) that lack native
/// 64-bit atomics.
pub trait AtomicFloat: FloatCore + Debug + Send + Sync + 'static {
    /// Atomic storage for the bit pattern of `Self`.
    type Bits: Send + Sync;

    /// Wraps `value` in fresh atomic storage.
    fn new_bits(value: Self) -> Self::Bits;

    /// Atomically reads the value.
    fn load(bits: &Self::Bits, order: Ordering) -> Self;

    /// Atomically replaces the value.
    fn store(bits: &Self::Bits, value: Self, order: Ordering);
}

impl AtomicFloat for f32 {
    type Bits = AtomicU32;

    fn new_bits(value: Self) -> Self::Bits {
        AtomicU32::new(value.to_bits())
    }

    fn load(bits: &Self::Bits, order: Ordering) -> Self {
        f32::from_bits(bits.load(order))
    }

    fn store(bits: &Self::Bits, value: Self, order: Ordering) {
        bits.store(value.to_bits(), order);
    }
}

impl AtomicFloat for f64 {
    type Bits = AtomicU64;

    fn new_bits(value: Self) -> Self::Bits {
        AtomicU64::new(value.to_bits())
    }

    fn load(bits: &Self::Bits, order: Ordering) -> Self {
        f64::from_bits(bits.load(order))
    }

    fn store(bits: &Self::Bits, value: Self, order: Ordering) {
        bits.store(value.to_bits(), order);
    }
}

/// Single-writer, multi-reader cell holding the latest real-world controller output.
///
/// The control loop writes through [`crate::pid::Controller::compute_and_publish`]; any other
/// context (an actuator interrupt, a telemetry thread) reads with [`OutputCell::get`] without
/// taking a lock. A read always observes a complete value. Nothing stronger is guaranteed: if a
/// reader needs the output to be consistent with other controller state it must synchronize with
/// the writer itself.
pub struct OutputCell<F: AtomicFloat> {
    bits: F::Bits,
}

impl<F: AtomicFloat> OutputCell<F> {
    /// Creates a cell holding `initial`.
    pub fn new(initial: F) -> Self {
        Self {
            bits: F::new_bits(initial),
        }
    }

    /// Returns the most recently published output.
    pub fn get(&self) -> F {
        F::load(&self.bits, Ordering::Acquire)
    }

    /// Publishes a new output.
    pub fn set(&self, value: F) {
        F::store(&self.bits, value, Ordering::Release);
    }
}

impl<F: AtomicFloat> Default for OutputCell<F> {
    fn default() -> Self {
        Self::new(F::zero())
    }
}

impl<F: AtomicFloat> Debug for OutputCell<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OutputCell").field("value", &self.get()).finish()
    }
}
