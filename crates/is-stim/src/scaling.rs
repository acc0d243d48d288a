//! Conversion between picoamps and the amplifier command signal.
//!
//! The downstream amplifier maps 50 mV of command to 100 pA of injected
//! current, so a raw level `I` (pA) is emitted as `I * 0.5 * 1e-3`.

/// Command units per picoamp.
pub const COMMAND_PER_PICOAMP: f64 = 0.5 * 1e-3;

/// Scale a raw current level (pA) to the output command.
#[inline]
pub fn picoamps_to_command(picoamps: f64) -> f64 {
    picoamps * COMMAND_PER_PICOAMP
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hundred_picoamps_is_fifty_millivolts() {
        assert!((picoamps_to_command(100.0) - 0.05).abs() < 1e-15);
    }

    #[test]
    fn zero_maps_to_zero() {
        assert_eq!(picoamps_to_command(0.0), 0.0);
    }

    #[test]
    fn sign_is_preserved() {
        assert!((picoamps_to_command(-100.0) + 0.05).abs() < 1e-15);
    }
}
