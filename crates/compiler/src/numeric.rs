// Numeric field policies
//
// Every narrowing conversion into a file field goes through one of two wrappers:
// - `Checked<T>`: the value must fit, overflow aborts the compile
// - `Clamped<T>`: the value saturates to the field range
// Choosing the wrapper is choosing the policy, so a field cannot silently switch.

use crate::error::{CompileError, Result};

/// A value that was verified to fit its destination field exactly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checked<T>(T);

/// A value saturated into its destination field range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clamped<T>(T);

macro_rules! impl_policies {
    ($($ty:ty),*) => {$(
        impl Checked<$ty> {
            /// Fail with `NumericOverflow` naming `field` when `value` is out of range
            pub fn new(field: &'static str, value: i64) -> Result<Self> {
                <$ty>::try_from(value)
                    .map(Checked)
                    .map_err(|_| CompileError::NumericOverflow {
                        field,
                        ty: stringify!($ty),
                        value,
                    })
            }

            pub fn get(self) -> $ty {
                self.0
            }
        }

        impl Clamped<$ty> {
            pub fn from_i64(value: i64) -> Self {
                Clamped(value.clamp(<$ty>::MIN as i64, <$ty>::MAX as i64) as $ty)
            }

            /// Round to nearest (ties away from zero) and saturate; NaN maps to zero
            pub fn from_f64(value: f64) -> Self {
                if value.is_nan() {
                    return Clamped(0);
                }
                let rounded = value.round();
                Clamped(rounded.clamp(<$ty>::MIN as f64, <$ty>::MAX as f64) as $ty)
            }

            pub fn get(self) -> $ty {
                self.0
            }
        }
    )*};
}

impl_policies!(u8, i8, u16, i16, u32, i32);

/// Shorthand for a checked conversion returning the raw value
pub fn checked_u16(field: &'static str, value: impl Into<i64>) -> Result<u16> {
    Checked::<u16>::new(field, value.into()).map(|c| c.get())
}

pub fn checked_i16(field: &'static str, value: impl Into<i64>) -> Result<i16> {
    Checked::<i16>::new(field, value.into()).map(|c| c.get())
}

pub fn checked_u8(field: &'static str, value: impl Into<i64>) -> Result<u8> {
    Checked::<u8>::new(field, value.into()).map(|c| c.get())
}

/// Degrees to the engine's 16-bit angle units, saturating
pub fn angle_to_u16(degrees: f32) -> u16 {
    Clamped::<u16>::from_f64(degrees as f64 * 65536.0 / 360.0).get()
}

/// Flyby field of view, degrees to 16-bit angle units, saturating
pub fn fov_to_u16(degrees: f32) -> u16 {
    Clamped::<u16>::from_f64(degrees as f64 * 65536.0 / 360.0).get()
}

/// Flyby roll. The engine stores the negated angle in a wrapping 16-bit field.
pub fn roll_to_i16(degrees: f32) -> i16 {
    let roll = Clamped::<u16>::from_f64(degrees as f64 * 65536.0 / 360.0).get() as i64;
    ((65536 - roll) & 0xFFFF) as u16 as i16
}

/// Flyby speed in engine units, saturating
pub fn speed_to_u16(speed: f32) -> u16 {
    Clamped::<u16>::from_f64(speed as f64 * 655.0).get()
}

/// Round a world coordinate to integer units (ties away from zero)
pub fn round_coord(value: f32) -> i32 {
    Clamped::<i32>::from_f64(value as f64).get()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_overflow_is_fatal() {
        let err = checked_u16("item object id", 70000).unwrap_err();
        match err {
            CompileError::NumericOverflow { field, ty, value } => {
                assert_eq!(field, "item object id");
                assert_eq!(ty, "u16");
                assert_eq!(value, 70000);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(checked_u16("item object id", 65535).unwrap(), 65535);
        assert!(checked_u8("room below", 256).is_err());
        assert!(checked_i16("vertex", -32769).is_err());
    }

    #[test]
    fn test_clamped_saturates() {
        assert_eq!(fov_to_u16(1.0e9), 65535);
        assert_eq!(fov_to_u16(-10.0), 0);
        assert_eq!(fov_to_u16(90.0), 16384);
        assert_eq!(Clamped::<i16>::from_i64(100_000).get(), i16::MAX);
        assert_eq!(Clamped::<u8>::from_f64(f64::NAN).get(), 0);
    }

    #[test]
    fn test_roll_wraps() {
        assert_eq!(roll_to_i16(0.0), 0);
        // 90 degrees is 16384 units, stored as 65536 - 16384
        assert_eq!(roll_to_i16(90.0), (65536u32 - 16384) as u16 as i16);
    }

    #[test]
    fn test_speed_and_angle() {
        assert_eq!(speed_to_u16(1.0), 655);
        assert_eq!(speed_to_u16(1000.0), 65535);
        assert_eq!(angle_to_u16(180.0), 32768);
        assert_eq!(angle_to_u16(400.0), 65535);
        assert_eq!(round_coord(2.5), 3);
        assert_eq!(round_coord(-2.5), -3);
    }
}
