//! Fixed board configuration.
//!
//! Pin assignments live in the board module; everything tunable per hardware
//! revision is collected here.

// ── Scheduler ───────────────────────────────────────────────────────────────

/// Time between battery polls.
pub const UPDATE_INTERVAL_MS: u64 = 10_000;

/// Idle sleep between loop iterations.
pub const IDLE_SLEEP_MS: u64 = 100;

// ── Backlight ───────────────────────────────────────────────────────────────

/// Lowest backlight duty that still keeps the shared rail powering the
/// status LED. Measured on the current board revision.
pub const BACKLIGHT_MIN_DUTY_PCT: u8 = 30;

/// LEDC frequency for the backlight channel.
pub const BACKLIGHT_PWM_KHZ: u32 = 20;

// ── Battery ─────────────────────────────────────────────────────────────────

/// ADC samples averaged per reading.
pub const BATTERY_SAMPLES: usize = 16;

/// Pause between consecutive ADC samples.
pub const BATTERY_SAMPLE_DELAY_MS: u32 = 2;

/// The battery sense pin sits behind a 100K/100K divider.
pub const BATTERY_DIVIDER: u32 = 2;

/// Li-ion cell voltage reported as 0%.
pub const BATTERY_EMPTY_MV: u32 = 3000;

/// Li-ion cell voltage reported as 100%.
pub const BATTERY_FULL_MV: u32 = 4200;

/// Overshoot/undershoot required before leaving the current zone.
pub const HYSTERESIS_PCT: u8 = 3;

// ── Display ─────────────────────────────────────────────────────────────────

pub const DISPLAY_SPI_MHZ: u32 = 10;

// ── Status LED ──────────────────────────────────────────────────────────────

/// RMT source clock. Together with [`RMT_CLK_DIVIDER`] this gives the 100 ns
/// tick the pulse encoder is written against.
pub const RMT_SOURCE_MHZ: u32 = 40;

pub const RMT_CLK_DIVIDER: u8 = 4;
