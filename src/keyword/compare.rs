//! Float tolerance
//!
//! Approximate equality used when comparing regenerated arrays with their
//! originals.

/// Absolute and relative epsilon for float comparison.
///
/// An epsilon of zero disables that check. When both are zero values
/// must be bitwise equal in value (`==`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub abs: f64,
    pub rel: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self { abs: 0.0, rel: 1e-6 }
    }
}

impl Tolerance {
    pub fn new(abs: f64, rel: f64) -> Self {
        Self { abs, rel }
    }

    /// Exact comparison
    pub fn exact() -> Self {
        Self { abs: 0.0, rel: 0.0 }
    }

    /// True when `a` and `b` are equal within this tolerance.
    ///
    /// The relative difference is `|a - b| / (|a| + |b|)`.
    pub fn accepts(&self, a: f64, b: f64) -> bool {
        if a == b {
            return true;
        }
        if a.is_nan() || b.is_nan() {
            return a.is_nan() && b.is_nan();
        }
        if self.abs <= 0.0 && self.rel <= 0.0 {
            return false;
        }

        let diff = (a - b).abs();
        if self.abs > 0.0 && diff > self.abs {
            return false;
        }
        let sum = a.abs() + b.abs();
        if self.rel > 0.0 && diff / sum > self.rel {
            return false;
        }
        true
    }
}
