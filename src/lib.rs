//! # battery-led
//!
//! Battery status indicator firmware for the Disobey 2026 badge.
//!
//! The badge's ST7789 display is put to sleep at boot and stays dark. One
//! WS2812 pixel shows the battery level in four colour zones:
//! - **Red** below 25%
//! - **Orange** 25–50%
//! - **Yellow** 50–75%
//! - **Green** 75% and up
//!
//! Zone changes use a ±3% hysteresis band so the colour does not flicker when
//! the level sits on a boundary.
//!
//! The display backlight PWM shares a power rail with the pixel, so the
//! backlight is held at a fixed minimum duty for as long as the firmware runs.
//!
//! Everything outside [`board`] is hardware independent and tested on the
//! host.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! let peripherals = battery_led::board::init();
//! let resources = battery_led::split_resources!(peripherals);
//!
//! let mut scheduler = Scheduler::boot(resources.into_parts(), battery_led::board::now());
//! loop {
//!     scheduler.poll(battery_led::board::now());
//!     Timer::after(Duration::from_millis(IDLE_SLEEP_MS)).await;
//! }
//! ```

#![no_std]

#[macro_use]
mod fmt;

pub mod backlight;
pub mod battery;
pub mod color;
pub mod config;
pub mod display;
pub mod encoder;
pub mod led;
pub mod scheduler;

#[cfg(target_os = "none")]
pub mod board;

pub use backlight::Backlight;
pub use battery::{
    BatteryClassifier,
    BatterySense,
};
pub use color::{
    ColorSample,
    Zone,
};
pub use display::{
    DisplayBus,
    DisplaySequencer,
    DisplayState,
};
pub use encoder::{
    Fill,
    PixelEncoder,
    Symbol,
};
pub use led::{
    StatusLed,
    SymbolChannel,
};
pub use scheduler::{
    Parts,
    Scheduler,
};
