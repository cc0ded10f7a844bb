//! ST7789 power-down sequence.
//!
//! The panel is never drawn on. At boot it is reset, woken, given a minimal
//! configuration (the controller ignores power commands until it has one) and
//! then switched off and put to sleep. The bus is write-only.
//!
//! The backlight is not touched here; see [`crate::backlight`].

use embedded_hal::{
    delay::DelayNs,
    digital::OutputPin,
};

/// ST7789 command opcodes used by the sequence.
pub mod cmd {
    pub const SLPIN: u8 = 0x10;
    pub const SLPOUT: u8 = 0x11;
    pub const DISPOFF: u8 = 0x28;
    pub const MADCTL: u8 = 0x36;
    pub const COLMOD: u8 = 0x3A;
}

/// Hold time for the reset line while low.
pub const RESET_LOW_MS: u32 = 10;

/// Wait after releasing reset before the first command.
pub const RESET_SETTLE_MS: u32 = 120;

/// A write-only command/data bus to the panel controller.
///
/// Implemented for every [`mipidsi::interface::Interface`], which drives the
/// D/C line and chip select.
pub trait DisplayBus {
    type Error;

    fn send_command(&mut self, command: u8, args: &[u8]) -> Result<(), Self::Error>;
}

impl<T: mipidsi::interface::Interface> DisplayBus for T {
    type Error = T::Error;

    fn send_command(&mut self, command: u8, args: &[u8]) -> Result<(), Self::Error> {
        mipidsi::interface::Interface::send_command(self, command, args)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Step {
    command: u8,
    args: &'static [u8],
    settle_ms: u32,
}

const WAKE: [Step; 1] = [Step {
    command: cmd::SLPOUT,
    args: &[],
    settle_ms: 120,
}];

const CONFIGURE: [Step; 2] = [
    // 16 bpp
    Step {
        command: cmd::COLMOD,
        args: &[0x55],
        settle_ms: 10,
    },
    // default orientation, RGB order
    Step {
        command: cmd::MADCTL,
        args: &[0x00],
        settle_ms: 10,
    },
];

const POWER_DOWN: [Step; 2] = [
    Step {
        command: cmd::DISPOFF,
        args: &[],
        settle_ms: 20,
    },
    Step {
        command: cmd::SLPIN,
        args: &[],
        settle_ms: 120,
    },
];

/// Where the sequence currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum DisplayState {
    PowerReset,
    AwakeConfiguring,
    Sleeping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum DisplayError {
    /// The reset line could not be driven.
    Reset,
    /// The bus rejected `command`.
    Bus { command: u8 },
}

/// Owns the panel's bus and reset line for the one-shot power-down.
pub struct DisplaySequencer<B, RST> {
    bus: B,
    rst: RST,
    state: DisplayState,
}

impl<B: DisplayBus, RST: OutputPin> DisplaySequencer<B, RST> {
    pub const fn new(bus: B, rst: RST) -> Self {
        Self {
            bus,
            rst,
            state: DisplayState::PowerReset,
        }
    }

    pub const fn state(&self) -> DisplayState {
        self.state
    }

    /// Run the full reset → wake → configure → sleep sequence.
    ///
    /// On error the sequence stops where it failed and the panel is left as
    /// it is. A sequencer that already reached [`DisplayState::Sleeping`]
    /// does nothing.
    pub fn power_down(&mut self, delay: &mut impl DelayNs) -> Result<(), DisplayError> {
        if self.state == DisplayState::Sleeping {
            return Ok(());
        }

        self.state = DisplayState::PowerReset;
        self.hardware_reset(delay)?;

        self.state = DisplayState::AwakeConfiguring;
        for step in WAKE.iter().chain(&CONFIGURE).chain(&POWER_DOWN) {
            self.run(step, delay)?;
        }

        self.state = DisplayState::Sleeping;
        info!("display asleep");
        Ok(())
    }

    fn hardware_reset(&mut self, delay: &mut impl DelayNs) -> Result<(), DisplayError> {
        self.rst.set_low().map_err(|_| DisplayError::Reset)?;
        delay.delay_ms(RESET_LOW_MS);
        self.rst.set_high().map_err(|_| DisplayError::Reset)?;
        delay.delay_ms(RESET_SETTLE_MS);
        Ok(())
    }

    fn run(&mut self, step: &Step, delay: &mut impl DelayNs) -> Result<(), DisplayError> {
        trace!("display cmd {=u8:#x}", step.command);
        self.bus
            .send_command(step.command, step.args)
            .map_err(|_| DisplayError::Bus {
                command: step.command,
            })?;
        delay.delay_ms(step.settle_ms);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    extern crate std;
    use std::{
        cell::RefCell,
        rc::Rc,
        vec,
        vec::Vec,
    };

    /// Everything the panel saw, in order.
    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Rst(bool),
        Cmd(u8, Vec<u8>),
        Delay(u32),
    }

    type Log = Rc<RefCell<Vec<Event>>>;

    struct MockBus {
        log: Log,
        fail_on: Option<u8>,
    }

    impl DisplayBus for MockBus {
        type Error = ();

        fn send_command(&mut self, command: u8, args: &[u8]) -> Result<(), ()> {
            if self.fail_on == Some(command) {
                return Err(());
            }
            self.log.borrow_mut().push(Event::Cmd(command, args.to_vec()));
            Ok(())
        }
    }

    struct MockPin {
        log: Log,
    }

    impl embedded_hal::digital::ErrorType for MockPin {
        type Error = Infallible;
    }

    impl OutputPin for MockPin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.log.borrow_mut().push(Event::Rst(false));
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.log.borrow_mut().push(Event::Rst(true));
            Ok(())
        }
    }

    struct MockDelay {
        log: Log,
    }

    impl DelayNs for MockDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.log.borrow_mut().push(Event::Delay(ns / 1_000_000));
        }

        fn delay_ms(&mut self, ms: u32) {
            self.log.borrow_mut().push(Event::Delay(ms));
        }
    }

    fn sequencer(fail_on: Option<u8>) -> (DisplaySequencer<MockBus, MockPin>, MockDelay, Log) {
        let log = Log::default();
        let seq = DisplaySequencer::new(
            MockBus {
                log: log.clone(),
                fail_on,
            },
            MockPin { log: log.clone() },
        );
        (seq, MockDelay { log: log.clone() }, log)
    }

    #[test]
    fn power_down_issues_full_sequence_in_order() {
        let (mut seq, mut delay, log) = sequencer(None);
        assert_eq!(seq.state(), DisplayState::PowerReset);

        seq.power_down(&mut delay).unwrap();
        assert_eq!(seq.state(), DisplayState::Sleeping);

        assert_eq!(
            *log.borrow(),
            vec![
                Event::Rst(false),
                Event::Delay(RESET_LOW_MS),
                Event::Rst(true),
                Event::Delay(RESET_SETTLE_MS),
                Event::Cmd(cmd::SLPOUT, vec![]),
                Event::Delay(120),
                Event::Cmd(cmd::COLMOD, vec![0x55]),
                Event::Delay(10),
                Event::Cmd(cmd::MADCTL, vec![0x00]),
                Event::Delay(10),
                Event::Cmd(cmd::DISPOFF, vec![]),
                Event::Delay(20),
                Event::Cmd(cmd::SLPIN, vec![]),
                Event::Delay(120),
            ]
        );
    }

    #[test]
    fn every_command_is_followed_by_a_settle_delay() {
        let (mut seq, mut delay, log) = sequencer(None);
        seq.power_down(&mut delay).unwrap();

        let log = log.borrow();
        for (i, event) in log.iter().enumerate() {
            if matches!(event, Event::Cmd(..)) {
                assert!(matches!(log.get(i + 1), Some(Event::Delay(ms)) if *ms > 0));
            }
        }
    }

    #[test]
    fn bus_failure_stops_the_sequence() {
        let (mut seq, mut delay, log) = sequencer(Some(cmd::COLMOD));
        assert_eq!(
            seq.power_down(&mut delay),
            Err(DisplayError::Bus {
                command: cmd::COLMOD
            })
        );
        assert_eq!(seq.state(), DisplayState::AwakeConfiguring);

        let log = log.borrow();
        assert!(log.contains(&Event::Cmd(cmd::SLPOUT, vec![])));
        assert!(!log.iter().any(|e| matches!(e, Event::Cmd(cmd::SLPIN, _))));
    }

    #[test]
    fn sleeping_panel_is_left_alone() {
        let (mut seq, mut delay, log) = sequencer(None);
        seq.power_down(&mut delay).unwrap();
        let events = log.borrow().len();

        seq.power_down(&mut delay).unwrap();
        assert_eq!(log.borrow().len(), events);
    }
}
