//! Rule constants shared across the core

/// Initiative advanced per completed turn is `INITIATIVE_SCALE / rating`
pub const INITIATIVE_SCALE: f32 = 100.0;

/// Damage multiplier on a critical strike
pub const CRITICAL_MULTIPLIER: i32 = 2;

/// Update id reserved for the quit sentinel (bypasses sequencing)
pub const QUIT_SENTINEL_ID: i64 = -1;

/// Default pixel size of a hex (centre to corner) for layout conversions
pub const HEX_PIXEL_SIZE: f32 = 32.0;
