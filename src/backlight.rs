//! Display backlight duty floor.
//!
//! The backlight PWM shares a power rail with the status LED: below a minimum
//! duty the LED supply collapses. The duty is therefore written once at boot
//! and [`Backlight`] offers no way to change it afterwards.

use embedded_hal::pwm::SetDutyCycle;

/// A backlight held at a fixed duty for the lifetime of the firmware.
pub struct Backlight<P> {
    _pwm: P,
    duty_pct: u8,
}

impl<P: SetDutyCycle> Backlight<P> {
    /// Write `duty_pct` to the PWM channel and keep the channel.
    ///
    /// This is the only duty write the backlight sees. The raw duty is rounded
    /// up so a coarse PWM never lands below `duty_pct`.
    pub fn hold(mut pwm: P, duty_pct: u8) -> Result<Self, P::Error> {
        let max = pwm.max_duty_cycle();
        pwm.set_duty_cycle(floor_duty(max, duty_pct))?;
        Ok(Self {
            _pwm: pwm,
            duty_pct,
        })
    }

    pub const fn duty_pct(&self) -> u8 {
        self.duty_pct
    }
}

/// Smallest raw duty out of `max` that is at least `pct` percent.
fn floor_duty(max: u16, pct: u8) -> u16 {
    let pct = u32::from(pct.min(100));
    let duty = (u32::from(max) * pct).div_ceil(100);
    u16::try_from(duty).unwrap_or(max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BACKLIGHT_MIN_DUTY_PCT;
    use core::convert::Infallible;
    extern crate std;
    use std::{
        cell::RefCell,
        rc::Rc,
        vec::Vec,
    };

    #[derive(Clone)]
    struct MockPwm {
        max: u16,
        writes: Rc<RefCell<Vec<u16>>>,
    }

    impl MockPwm {
        fn with_max(max: u16) -> Self {
            Self {
                max,
                writes: Rc::default(),
            }
        }
    }

    impl embedded_hal::pwm::ErrorType for MockPwm {
        type Error = Infallible;
    }

    impl SetDutyCycle for MockPwm {
        fn max_duty_cycle(&self) -> u16 {
            self.max
        }

        fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Infallible> {
            self.writes.borrow_mut().push(duty);
            Ok(())
        }
    }

    #[test]
    fn hold_writes_the_floor_exactly_once() {
        let pwm = MockPwm::with_max(1000);
        let writes = pwm.writes.clone();

        let backlight = Backlight::hold(pwm, 30).unwrap();
        assert_eq!(backlight.duty_pct(), 30);
        assert_eq!(*writes.borrow(), [300]);
    }

    #[test]
    fn eight_bit_pwm_never_lands_below_the_floor() {
        let pwm = MockPwm::with_max(255);
        let writes = pwm.writes.clone();

        Backlight::hold(pwm, BACKLIGHT_MIN_DUTY_PCT).unwrap();
        let duty = writes.borrow()[0];
        assert_eq!(duty, 77);
        assert!(u32::from(duty) * 100 >= u32::from(BACKLIGHT_MIN_DUTY_PCT) * 255);
    }

    #[test]
    fn rounding_up_holds_for_every_resolution_and_percent() {
        for max in [1, 3, 7, 100, 255, 256, 1023, u16::MAX] {
            for pct in 0..=100u8 {
                let duty = floor_duty(max, pct);
                assert!(duty <= max);
                assert!(u32::from(duty) * 100 >= u32::from(pct) * u32::from(max), "{duty}/{max} < {pct}%");
            }
        }
        assert_eq!(floor_duty(255, 150), 255);
    }
}
