//! Single WS2812 status pixel.
//!
//! [`StatusLed`] owns the timed-pulse output and pushes one colour at a time
//! through the [`PixelEncoder`]. A missing channel turns every transmit into a
//! no-op so the rest of the firmware keeps running without the LED.

extern crate alloc;

use alloc::vec::Vec;

use crate::{
    color::{
        ColorSample,
        wire_bytes,
    },
    encoder::{
        Fill,
        PIXEL_FRAME_SYMBOLS,
        PixelEncoder,
        Symbol,
    },
};

/// A single-pin output that plays symbols back to back.
pub trait SymbolChannel {
    type Error;

    /// Symbols the channel memory takes in one pass.
    const WINDOW: usize;

    /// Emit a complete frame. Implementations must not leave gaps between
    /// symbols and must return only after the frame is on the wire.
    fn emit(&mut self, frame: &[Symbol]) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum LedError {
    /// No channel was set up; nothing was sent.
    Unavailable,
    /// The frame buffer could not be allocated; nothing was sent.
    Alloc,
    /// The channel rejected the frame.
    Channel,
}

/// The status pixel and the channel that drives it.
pub struct StatusLed<C> {
    channel: Option<C>,
}

impl<C: SymbolChannel> StatusLed<C> {
    pub const fn new(channel: C) -> Self {
        Self {
            channel: Some(channel),
        }
    }

    /// A status LED whose channel failed to come up.
    pub const fn unavailable() -> Self {
        Self { channel: None }
    }

    pub const fn is_available(&self) -> bool {
        self.channel.is_some()
    }

    /// Encode `color` and send it to the pixel.
    ///
    /// Without a channel this does nothing and returns
    /// [`LedError::Unavailable`]. Either the whole frame is emitted or none of
    /// it is.
    pub fn transmit(&mut self, color: ColorSample) -> Result<(), LedError> {
        let Some(channel) = self.channel.as_mut() else {
            return Err(LedError::Unavailable);
        };

        let mut frame = frame_buffer(PIXEL_FRAME_SYMBOLS)?;

        let window = C::WINDOW.max(1);
        let mut session = PixelEncoder::new(wire_bytes(color));
        let mut filled = 0;
        while !session.is_finished() {
            let end = (filled + window).min(frame.len());
            match session.fill(&mut frame[filled..end]) {
                Fill::Full => {
                    // The buffer holds exactly one pixel frame.
                    debug_assert!(end < frame.len());
                    filled = end;
                }
                Fill::Complete(n) => filled += n,
            }
        }

        trace!(
            "LED frame: {} symbols, rgb {} {} {}",
            filled,
            color.red,
            color.green,
            color.blue
        );

        channel.emit(&frame[..filled]).map_err(|_| {
            error!("LED channel rejected frame");
            LedError::Channel
        })
    }
}

/// A frame of `len` idle symbols, or [`LedError::Alloc`] if the heap is short.
fn frame_buffer(len: usize) -> Result<Vec<Symbol>, LedError> {
    let mut frame = Vec::new();
    if frame.try_reserve_exact(len).is_err() {
        error!("LED frame allocation failed");
        return Err(LedError::Alloc);
    }
    frame.resize(len, Symbol::IDLE);
    Ok(frame)
}

impl<C: SymbolChannel> From<Option<C>> for StatusLed<C> {
    fn from(channel: Option<C>) -> Self {
        Self { channel }
    }
}
