// is-core/src/units.rs

use uom::si::f64::Time as UomTime;

// Host periods and hold times arrive in mixed units (ns, ms, s).
pub type Time = UomTime;

#[inline]
pub fn ms(v: f64) -> Time {
    use uom::si::time::millisecond;
    Time::new::<millisecond>(v)
}

#[inline]
pub fn s(v: f64) -> Time {
    use uom::si::time::second;
    Time::new::<second>(v)
}

#[inline]
pub fn ns(v: f64) -> Time {
    use uom::si::time::nanosecond;
    Time::new::<nanosecond>(v)
}

#[inline]
pub fn as_seconds(t: Time) -> f64 {
    use uom::si::time::second;
    t.get::<second>()
}

#[inline]
pub fn as_millis(t: Time) -> f64 {
    use uom::si::time::millisecond;
    t.get::<millisecond>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_smoke() {
        let _t = ms(0.25);
        let _dt = s(0.1);
        let _p = ns(100_000.0);
    }

    #[test]
    fn millis_to_seconds() {
        assert!((as_seconds(ms(10.0)) - 0.01).abs() < 1e-15);
        assert!((as_millis(ns(100_000.0)) - 0.1).abs() < 1e-12);
    }
}
