//! Range, resolution and units quantization
//!
//! Frequencies and attenuations are snapped to what the hardware can
//! actually do before they are bound into a command. The same rule applies
//! to both wire flavors.

/// Quantization rule for one numeric configuration key
///
/// `min`, `max` and `resolution` are in caller units. `units` is the size
/// of one wire unit in caller units: with frequencies in Hz and a radio that
/// speaks MHz, `units` is `1e6`, the radio receives `quantize(v) / units`
/// and its reports are multiplied by `units` on the way back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantizer {
    pub min: f64,
    pub max: f64,
    pub resolution: f64,
    pub units: f64,
}

impl Quantizer {
    /// Create a rule with a unit wire multiplier
    pub fn new(min: f64, max: f64, resolution: f64) -> Self {
        Self {
            min,
            max,
            resolution,
            units: 1.0,
        }
    }

    /// Set the wire unit size
    pub fn with_units(mut self, units: f64) -> Self {
        self.units = units;
        self
    }

    /// Clamp to range and snap to the nearest resolution step
    pub fn quantize(&self, value: f64) -> f64 {
        quantize(value, (self.min, self.max), self.resolution)
    }

    /// Quantize and scale to wire units
    pub fn to_wire(&self, value: f64) -> f64 {
        if self.units == 0.0 {
            self.quantize(value)
        } else {
            self.quantize(value) / self.units
        }
    }

    /// Scale a wire value back to caller units
    pub fn from_wire(&self, value: f64) -> f64 {
        if self.units == 0.0 {
            value
        } else {
            value * self.units
        }
    }
}

/// Clamp `value` to `range` and snap it to a multiple of `resolution`
///
/// A non-positive resolution disables snapping. Snapping never leaves the
/// range: a step rounded past either bound falls back to the nearest
/// in-range step. The result is a fixed point, so applying it twice yields
/// the same value.
pub fn quantize(value: f64, range: (f64, f64), resolution: f64) -> f64 {
    let (lo, hi) = if range.0 <= range.1 {
        range
    } else {
        (range.1, range.0)
    };
    if value.is_nan() {
        return lo;
    }
    let clamped = value.clamp(lo, hi);
    if resolution <= 0.0 || !resolution.is_finite() {
        return clamped;
    }

    let steps = (clamped / resolution).round();
    let mut snapped = steps * resolution;
    if snapped > hi {
        snapped = (hi / resolution).floor() * resolution;
    }
    if snapped < lo {
        snapped = (lo / resolution).ceil() * resolution;
    }
    // A range narrower than one step has no grid point inside it
    if snapped < lo || snapped > hi {
        return clamped;
    }
    snapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_clamps_to_range() {
        assert_eq!(quantize(7000.0, (20.0, 6000.0), 1.0), 6000.0);
        assert_eq!(quantize(1.0, (20.0, 6000.0), 1.0), 20.0);
    }

    #[test]
    fn test_snaps_to_resolution() {
        assert_eq!(quantize(2450.4, (20.0, 6000.0), 1.0), 2450.0);
        assert_eq!(quantize(2450.6, (20.0, 6000.0), 1.0), 2451.0);
        assert_eq!(quantize(13.0, (0.0, 30.0), 5.0), 15.0);
    }

    #[test]
    fn test_zero_resolution_only_clamps() {
        assert_eq!(quantize(2450.123, (20.0, 6000.0), 0.0), 2450.123);
    }

    #[test]
    fn test_snap_stays_inside_range() {
        // 29 rounds to 30 which is past the top; fall back to 25
        assert_eq!(quantize(29.0, (0.0, 28.0), 5.0), 25.0);
    }

    #[test]
    fn test_wire_units() {
        let q = Quantizer::new(20e6, 6e9, 1e6).with_units(1e6);
        assert_eq!(q.to_wire(2_450_300_000.0), 2450.0);
        assert_eq!(q.from_wire(2450.0), 2_450_000_000.0);
    }

    proptest! {
        #[test]
        fn quantize_is_idempotent(
            value in -1.0e4f64..1.0e4,
            lo in -100.0f64..100.0,
            span in 0.0f64..5000.0,
            resolution in prop_oneof![Just(0.0f64), Just(0.5), Just(1.0), Just(10.0), 0.01f64..50.0],
        ) {
            let range = (lo, lo + span);
            let once = quantize(value, range, resolution);
            let twice = quantize(once, range, resolution);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn quantize_stays_in_range(
            value in -1.0e6f64..1.0e6,
            lo in -100.0f64..100.0,
            span in 0.0f64..5000.0,
            resolution in 0.0f64..50.0,
        ) {
            let q = quantize(value, (lo, lo + span), resolution);
            prop_assert!(q >= lo && q <= lo + span);
        }
    }
}
