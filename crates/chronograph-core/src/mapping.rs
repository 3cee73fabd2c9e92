//! Time mappings between clock domains
//!
//! A mapping is an affine transform `t_out = scale * t_in + shift`.
//! Degenerate mappings are rejected when constructed, so every mapping in
//! circulation is invertible.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ChronoError, ChronoResult};

/// Affine time mapping from one clock domain to another
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LinearParams", into = "LinearParams")]
pub struct TimeMapping {
    scale: f64,
    shift: f64,
}

/// Unvalidated `{scale, shift}` pair as stored in documents
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearParams {
    pub scale: f64,
    pub shift: f64,
}

impl TimeMapping {
    pub const IDENTITY: TimeMapping = TimeMapping {
        scale: 1.0,
        shift: 0.0,
    };

    /// Create a mapping, rejecting zero, non-finite or non-invertible scales.
    ///
    /// The inverse must be representable too: a shift that overflows once
    /// divided by the scale is rejected.
    pub fn new(scale: f64, shift: f64) -> ChronoResult<Self> {
        let invertible = scale != 0.0 && scale.is_finite() && scale.recip().is_finite();
        if !invertible || !shift.is_finite() || !(shift / scale).is_finite() {
            return Err(ChronoError::InvalidMapping { scale, shift });
        }
        Ok(TimeMapping { scale, shift })
    }

    #[inline]
    pub fn identity() -> Self {
        Self::IDENTITY
    }

    /// A pure offset: `t_out = t_in + shift`
    pub fn offset(shift: f64) -> ChronoResult<Self> {
        Self::new(1.0, shift)
    }

    #[inline]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    #[inline]
    pub fn shift(&self) -> f64 {
        self.shift
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Map a time from the input domain to the output domain
    #[inline]
    pub fn apply(&self, t: f64) -> f64 {
        self.scale * t + self.shift
    }

    /// Mapping from the output domain back to the input domain
    pub fn invert(&self) -> Self {
        TimeMapping {
            scale: self.scale.recip(),
            shift: -self.shift / self.scale,
        }
    }

    /// `self` (A→B) followed by `next` (B→C), giving A→C
    pub fn compose(&self, next: &TimeMapping) -> Self {
        TimeMapping {
            scale: self.scale * next.scale,
            shift: next.scale * self.shift + next.shift,
        }
    }

    /// Like [`compose`](Self::compose), but rejects a product that
    /// overflowed or underflowed into a degenerate mapping
    pub fn checked_compose(&self, next: &TimeMapping) -> ChronoResult<Self> {
        let composed = self.compose(next);
        Self::new(composed.scale, composed.shift)
    }

    /// Compare with a relative tolerance on both parameters
    pub fn approx_eq(&self, other: &TimeMapping, tolerance: f64) -> bool {
        close(self.scale, other.scale, tolerance) && close(self.shift, other.shift, tolerance)
    }
}

fn close(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance * a.abs().max(b.abs()).max(1.0)
}

impl Default for TimeMapping {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl TryFrom<LinearParams> for TimeMapping {
    type Error = ChronoError;

    fn try_from(params: LinearParams) -> Result<Self, Self::Error> {
        TimeMapping::new(params.scale, params.shift)
    }
}

impl From<TimeMapping> for LinearParams {
    fn from(mapping: TimeMapping) -> Self {
        LinearParams {
            scale: mapping.scale,
            shift: mapping.shift,
        }
    }
}

impl fmt::Debug for TimeMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Map({} * t + {})", self.scale, self.shift)
    }
}

impl fmt::Display for TimeMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t -> {} * t + {}", self.scale, self.shift)
    }
}
