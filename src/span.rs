// Scaling ranges mapping real-world values onto the unit interval
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

use num_traits::float::FloatCore;

#[cfg(feature = "serde")]
use serde::{de, Deserialize, Deserializer, Serialize};

/// A real-world range `[min, max]` with `min < max`.
///
/// The controller works in "percent of span" internally, so that gains are independent of the
/// engineering units of the sensor and the actuator. A `Span` converts between the two.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Span<F> {
    min: F,
    max: F,
}

// Deserialized bounds go through the same checks as `Span::new`
#[cfg(feature = "serde")]
impl<'de, F: FloatCore + Deserialize<'de>> Deserialize<'de> for Span<F> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Bounds<F> {
            min: F,
            max: F,
        }

        let bounds = Bounds::<F>::deserialize(deserializer)?;
        Span::new(bounds.min, bounds.max)
            .ok_or_else(|| de::Error::custom("span bounds must be finite with min < max"))
    }
}

impl<F: FloatCore> Span<F> {
    /// Creates a new span, or `None` if `min >= max` or either bound is not finite.
    pub fn new(min: F, max: F) -> Option<Self> {
        if !min.is_finite() || !max.is_finite() || min >= max {
            return None;
        }
        Some(Self { min, max })
    }

    /// The span `[0, 1]`.
    pub fn unit() -> Self {
        Self {
            min: F::zero(),
            max: F::one(),
        }
    }

    /// Returns the lower bound, i.e. the real-world value corresponding to 0%.
    pub fn min(&self) -> F {
        self.min
    }

    /// Returns the upper bound, i.e. the real-world value corresponding to 100%.
    pub fn max(&self) -> F {
        self.max
    }

    /// Returns `max - min`; always strictly positive.
    pub fn width(&self) -> F {
        self.max - self.min
    }

    /// Maps a real-world value into span units. Values outside the range map outside `[0, 1]`;
    /// use [`Span::normalize_clamped`] to saturate.
    pub fn normalize(&self, value: F) -> F {
        (value - self.min) / self.width()
    }

    /// Maps a real-world value into span units, saturating at `[0, 1]`.
    pub fn normalize_clamped(&self, value: F) -> F {
        clamp_unit(self.normalize(value))
    }

    /// Maps span units back to a real-world value.
    pub fn denormalize(&self, fraction: F) -> F {
        fraction * self.width() + self.min
    }

    /// Ratio of this span's width to `previous`'s width, used to carry normalized state across a
    /// range change.
    pub fn rescale_factor(&self, previous: &Self) -> F {
        self.width() / previous.width()
    }
}

/// Saturates a normalized value to `[0, 1]`. NaN passes through unchanged.
pub(crate) fn clamp_unit<F: FloatCore>(value: F) -> F {
    if value < F::zero() {
        F::zero()
    } else if value > F::one() {
        F::one()
    } else {
        value
    }
}
