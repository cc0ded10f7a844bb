//! WS2812 bitstream encoder.
//!
//! Every payload bit becomes one two-level [`Symbol`], most significant bit
//! first, and the frame is closed by a long low reset symbol. Durations are
//! counted in 100 ns ticks of the RMT clock.
//!
//! The encoder writes into whatever symbol memory the channel has free. When
//! that memory is full mid-frame it reports [`Fill::Full`] and the caller
//! drains the memory and calls [`FrameEncoder::fill`] again; encoding resumes
//! at the same bit.

use embedded_hal::digital::PinState;

/// Length of one encoder tick.
pub const TICK_NS: u32 = 100;

/// '0' bit: 0.3 µs high, 0.9 µs low.
pub const T0H_TICKS: u16 = 3;
pub const T0L_TICKS: u16 = 9;

/// '1' bit: 0.9 µs high, 0.3 µs low.
pub const T1H_TICKS: u16 = 9;
pub const T1L_TICKS: u16 = 3;

/// Each half of the reset symbol; 2 × 30 µs of low exceeds the 50 µs latch time.
pub const RESET_HALF_TICKS: u16 = 300;

/// Allowed deviation of a pulse edge before the LED may misread a bit.
pub const TOLERANCE_NS: u32 = 150;

/// Bytes in one pixel payload.
pub const PIXEL_BYTES: usize = 3;

/// Symbols needed for one pixel frame: 24 bits plus the reset.
pub const PIXEL_FRAME_SYMBOLS: usize = PIXEL_BYTES * 8 + 1;

/// One timed pulse: `level0` for `ticks0`, then `level1` for `ticks1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    pub level0: PinState,
    pub ticks0: u16,
    pub level1: PinState,
    pub ticks1: u16,
}

impl Symbol {
    /// Zero-length low symbol, used to pre-fill symbol memory.
    pub const IDLE: Self = Self::new(PinState::Low, 0, PinState::Low, 0);

    pub const ZERO: Self = Self::new(PinState::High, T0H_TICKS, PinState::Low, T0L_TICKS);

    pub const ONE: Self = Self::new(PinState::High, T1H_TICKS, PinState::Low, T1L_TICKS);

    pub const RESET: Self = Self::new(
        PinState::Low,
        RESET_HALF_TICKS,
        PinState::Low,
        RESET_HALF_TICKS,
    );

    pub const fn new(level0: PinState, ticks0: u16, level1: PinState, ticks1: u16) -> Self {
        Self {
            level0,
            ticks0,
            level1,
            ticks1,
        }
    }

    pub const fn bit(bit: bool) -> Self {
        if bit { Self::ONE } else { Self::ZERO }
    }

    /// Total length of the symbol in nanoseconds.
    pub const fn duration_ns(&self) -> u32 {
        (self.ticks0 as u32 + self.ticks1 as u32) * TICK_NS
    }

    /// Time spent high, in nanoseconds.
    pub fn high_ns(&self) -> u32 {
        let mut ticks = 0u32;
        if self.level0 == PinState::High {
            ticks += u32::from(self.ticks0);
        }
        if self.level1 == PinState::High {
            ticks += u32::from(self.ticks1);
        }
        ticks * TICK_NS
    }

    /// Bit value a receiving LED would latch for this symbol, or `None` if it
    /// is not a data bit within tolerance.
    pub fn as_bit(&self) -> Option<bool> {
        if self.level0 != PinState::High || self.level1 != PinState::Low {
            return None;
        }
        let within = |ticks: u16, nominal: u16| {
            (u32::from(ticks) * TICK_NS).abs_diff(u32::from(nominal) * TICK_NS) <= TOLERANCE_NS
        };
        if within(self.ticks0, T1H_TICKS) && within(self.ticks1, T1L_TICKS) {
            Some(true)
        } else if within(self.ticks0, T0H_TICKS) && within(self.ticks1, T0L_TICKS) {
            Some(false)
        } else {
            None
        }
    }

    /// Whether this symbol is a low period long enough to latch the frame.
    pub fn is_reset(&self) -> bool {
        self.high_ns() == 0 && self.duration_ns() >= 50_000
    }
}

/// Outcome of one [`FrameEncoder::fill`] pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// The output buffer is full and the frame is not done yet. Drain the
    /// buffer and call `fill` again.
    Full,
    /// The frame is complete; this many symbols were written in this pass.
    Complete(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Next payload bit to emit, counted from the MSB of the first byte.
    Payload { bit: usize },
    ResetGap,
    Finished,
}

/// Encoding session for a single frame of `N` payload bytes.
///
/// A session is created per transmission and is spent once it reports
/// [`Fill::Complete`]; further calls write nothing.
#[derive(Debug, Clone)]
pub struct FrameEncoder<const N: usize> {
    payload: [u8; N],
    phase: Phase,
}

/// Session for one RGB pixel.
pub type PixelEncoder = FrameEncoder<PIXEL_BYTES>;

impl<const N: usize> FrameEncoder<N> {
    pub const fn new(payload: [u8; N]) -> Self {
        Self {
            payload,
            phase: Phase::Payload { bit: 0 },
        }
    }

    /// Number of symbols the whole frame occupies.
    pub const fn frame_len() -> usize {
        N * 8 + 1
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Write as many symbols as fit into `out`, continuing where the previous
    /// pass stopped.
    pub fn fill(&mut self, out: &mut [Symbol]) -> Fill {
        let mut written = 0;
        loop {
            match self.phase {
                Phase::Payload { bit } if bit == N * 8 => {
                    self.phase = Phase::ResetGap;
                }
                Phase::Payload { bit } => {
                    let Some(slot) = out.get_mut(written) else {
                        return Fill::Full;
                    };
                    let byte = self.payload[bit / 8];
                    *slot = Symbol::bit(byte & (0x80 >> (bit % 8)) != 0);
                    written += 1;
                    self.phase = Phase::Payload { bit: bit + 1 };
                }
                Phase::ResetGap => {
                    let Some(slot) = out.get_mut(written) else {
                        return Fill::Full;
                    };
                    *slot = Symbol::RESET;
                    written += 1;
                    self.phase = Phase::Finished;
                }
                Phase::Finished => return Fill::Complete(written),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    extern crate std;
    use std::vec::Vec;

    fn decode(symbols: &[Symbol]) -> Vec<u8> {
        symbols
            .chunks_exact(8)
            .map(|byte| {
                byte.iter().fold(0u8, |acc, s| {
                    (acc << 1) | u8::from(s.as_bit().expect("data symbol"))
                })
            })
            .collect()
    }

    fn encode_all(payload: [u8; 3], window: usize) -> (Vec<Symbol>, usize) {
        let mut session = PixelEncoder::new(payload);
        let mut frame = Vec::new();
        let mut passes = 0;
        let mut block = std::vec![Symbol::IDLE; window];
        loop {
            passes += 1;
            match session.fill(&mut block) {
                Fill::Full => frame.extend_from_slice(&block),
                Fill::Complete(n) => {
                    frame.extend_from_slice(&block[..n]);
                    break;
                }
            }
        }
        (frame, passes)
    }

    #[test]
    fn pixel_frame_is_24_bits_then_reset() {
        let (frame, passes) = encode_all([0x12, 0xAB, 0xFF], 64);
        assert_eq!(passes, 1);
        assert_eq!(frame.len(), PIXEL_FRAME_SYMBOLS);
        assert!(frame[..24].iter().all(|s| s.as_bit().is_some()));
        assert!(frame[24].is_reset());
        assert_eq!(decode(&frame[..24]), [0x12, 0xAB, 0xFF]);
    }

    #[test]
    fn bits_are_sent_msb_first() {
        let (frame, _) = encode_all([0x80, 0x01, 0x00], 32);
        assert_eq!(frame[0], Symbol::ONE);
        assert!(frame[1..8].iter().all(|s| *s == Symbol::ZERO));
        assert_eq!(frame[15], Symbol::ONE);
    }

    #[test]
    fn bit_timing_is_within_protocol_tolerance() {
        assert_eq!(Symbol::ZERO.high_ns(), 300);
        assert_eq!(Symbol::ZERO.duration_ns() - Symbol::ZERO.high_ns(), 900);
        assert_eq!(Symbol::ONE.high_ns(), 900);
        assert_eq!(Symbol::ONE.duration_ns() - Symbol::ONE.high_ns(), 300);
        assert!(Symbol::RESET.duration_ns() >= 50_000);
        assert_eq!(Symbol::RESET.high_ns(), 0);
    }

    #[test]
    fn out_of_tolerance_pulse_does_not_decode() {
        let skewed = Symbol::new(PinState::High, 5, PinState::Low, 7);
        assert_eq!(skewed.as_bit(), None);
        assert_eq!(Symbol::RESET.as_bit(), None);
    }

    #[test]
    fn full_buffer_resumes_mid_frame() {
        let (frame, passes) = encode_all([0xC3, 0x5A, 0x0F], 5);
        // 25 symbols through a 5-symbol window; the reset lands in the last
        // slot of the fifth pass.
        assert_eq!(passes, 5);
        assert_eq!(frame.len(), PIXEL_FRAME_SYMBOLS);
        assert_eq!(decode(&frame[..24]), [0xC3, 0x5A, 0x0F]);
        assert!(frame[24].is_reset());
    }

    #[test]
    fn reset_gap_can_be_deferred_to_the_next_pass() {
        let mut session = PixelEncoder::new([0; 3]);
        let mut block = [Symbol::IDLE; 24];
        assert_eq!(session.fill(&mut block), Fill::Full);
        assert!(!session.is_finished());

        let mut tail = [Symbol::IDLE; 4];
        assert_eq!(session.fill(&mut tail), Fill::Complete(1));
        assert_eq!(tail[0], Symbol::RESET);
        assert!(session.is_finished());
    }

    #[test]
    fn finished_session_writes_nothing() {
        let mut session = PixelEncoder::new([1, 2, 3]);
        let mut block = [Symbol::IDLE; PIXEL_FRAME_SYMBOLS];
        assert_eq!(session.fill(&mut block), Fill::Complete(PIXEL_FRAME_SYMBOLS));

        let mut again = [Symbol::IDLE; 4];
        assert_eq!(session.fill(&mut again), Fill::Complete(0));
        assert!(again.iter().all(|s| *s == Symbol::IDLE));
    }

    #[test]
    fn empty_window_reports_full() {
        let mut session = PixelEncoder::new([0; 3]);
        assert_eq!(session.fill(&mut []), Fill::Full);
        assert_eq!(PixelEncoder::frame_len(), PIXEL_FRAME_SYMBOLS);
    }
}
