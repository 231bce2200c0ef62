//! Small timing and display-text helpers shared across cart_core.

use std::time::Duration;

/// Number of microseconds in one second.
pub const MICROS_PER_SEC: u64 = 1_000_000;

/// Character columns on each display row.
pub const LCD_COLS: usize = 16;

/// Period for a given sampling rate in Hz.
/// - Clamps `hz` to at least 1 to avoid division by zero.
/// - Never returns less than 1 microsecond.
#[inline]
pub fn period(hz: u32) -> Duration {
    Duration::from_micros((MICROS_PER_SEC / u64::from(hz.max(1))).max(1))
}

/// Pad or truncate `text` to exactly one display row.
pub fn fit_line(text: &str) -> String {
    let mut out: String = text.chars().take(LCD_COLS).collect();
    let len = out.chars().count();
    out.extend(std::iter::repeat_n(' ', LCD_COLS - len));
    out
}

/// Right-aligned, two-decimal amount eight columns wide (`"  123.45"`).
#[inline]
pub fn amount(v: f64) -> String {
    format!("{v:>8.2}")
}

/// Right-aligned integer `width` columns wide.
#[inline]
pub fn int_field(v: i32, width: usize) -> String {
    format!("{v:>width$}")
}
