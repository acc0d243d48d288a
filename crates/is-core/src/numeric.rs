use crate::CoreError;

/// Floating point type used throughout the system
pub type Real = f64;

/// Tolerance (seconds) absorbed at step-hold boundaries.
///
/// Elapsed time is accumulated by repeatedly adding the host timestep, so a
/// hold of `n * dt` can land a few ulps short of the configured duration.
pub const TIME_EPSILON_S: Real = 1e-9;

#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

/// Accept only finite, strictly positive values.
pub fn ensure_positive(v: Real, what: &'static str) -> Result<Real, CoreError> {
    let v = ensure_finite(v, what)?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err(CoreError::OutOfRange { what, value: v })
    }
}

/// Return `magnitude` with the sign of `direction`; zero direction counts as positive.
pub fn with_sign_of(magnitude: Real, direction: Real) -> Real {
    if direction < 0.0 {
        -magnitude.abs()
    } else {
        magnitude.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_equal_basic() {
        let tol = Tolerances {
            abs: 1e-12,
            rel: 1e-9,
        };
        assert!(nearly_equal(1.0, 1.0 + 1e-12, tol));
        assert!(nearly_equal(0.0, 1e-13, tol));
        assert!(!nearly_equal(1.0, 1.0 + 1e-6, tol));
    }

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn ensure_positive_rejects_zero_and_negative() {
        assert!(ensure_positive(0.0, "dt").is_err());
        assert!(ensure_positive(-1.0, "dt").is_err());
        assert!(ensure_positive(Real::INFINITY, "dt").is_err());
        assert_eq!(ensure_positive(0.1, "dt").unwrap(), 0.1);
    }

    #[test]
    fn with_sign_of_follows_direction() {
        assert_eq!(with_sign_of(20.0, -480.0), -20.0);
        assert_eq!(with_sign_of(-20.0, 480.0), 20.0);
        assert_eq!(with_sign_of(-20.0, 0.0), 20.0);
    }

    #[test]
    fn epsilon_absorbs_accumulated_timestep() {
        let mut elapsed = 0.0;
        for _ in 0..10 {
            elapsed += 0.001;
        }
        assert!(elapsed >= 0.01 - TIME_EPSILON_S);
    }
}
