//! Boot ordering and the cooperative poll loop.
//!
//! There is a single thread of control. Hardware settle delays during boot
//! block; between polls the caller idles for [`IDLE_SLEEP_MS`].
//!
//! [`IDLE_SLEEP_MS`]: crate::config::IDLE_SLEEP_MS

use embedded_hal::{
    delay::DelayNs,
    digital::OutputPin,
    pwm::SetDutyCycle,
};

use crate::{
    backlight::Backlight,
    battery::{
        BatteryClassifier,
        BatterySense,
    },
    color::Zone,
    config::{
        BACKLIGHT_MIN_DUTY_PCT,
        UPDATE_INTERVAL_MS,
    },
    display::{
        DisplayBus,
        DisplaySequencer,
    },
    led::{
        LedError,
        StatusLed,
        SymbolChannel,
    },
};

/// Millisecond timestamps.
pub type Instant = fugit::TimerInstantU64<1000>;

/// Millisecond durations.
pub type Duration = fugit::MillisDurationU64;

pub const UPDATE_INTERVAL: Duration = Duration::millis(UPDATE_INTERVAL_MS);

/// Everything the firmware needs, as acquired by the board.
///
/// A component that could not be acquired is `None`.
pub struct Parts<P, B, RST, S, C, D> {
    pub backlight: Option<P>,
    pub display: Option<DisplaySequencer<B, RST>>,
    pub led: Option<C>,
    pub battery: S,
    pub delay: D,
}

/// Owns the battery classifier, the status LED and the backlight for the
/// lifetime of the firmware.
pub struct Scheduler<P, S, C, D> {
    _backlight: Option<Backlight<P>>,
    battery: BatteryClassifier<S>,
    led: StatusLed<C>,
    delay: D,
    last_update: Instant,
}

impl<P, S, C, D> Scheduler<P, S, C, D>
where
    P: SetDutyCycle,
    S: BatterySense,
    C: SymbolChannel,
    D: DelayNs,
{
    /// Bring the board up and show the first battery reading.
    ///
    /// 1. Hold the backlight at its duty floor.
    /// 2. Put the display to sleep, best effort.
    /// 3. Take over the status LED channel (a missing channel makes every
    ///    transmit a no-op).
    /// 4. Classify and transmit once.
    pub fn boot<B, RST>(parts: Parts<P, B, RST, S, C, D>, now: Instant) -> Self
    where
        B: DisplayBus,
        RST: OutputPin,
    {
        let Parts {
            backlight,
            display,
            led,
            battery,
            mut delay,
        } = parts;

        let backlight = backlight.and_then(|pwm| match Backlight::hold(pwm, BACKLIGHT_MIN_DUTY_PCT) {
            Ok(b) => {
                info!("backlight held at {}%", b.duty_pct());
                Some(b)
            }
            Err(_) => {
                error!("backlight duty could not be set");
                None
            }
        });
        if backlight.is_none() {
            warn!("no backlight PWM; status LED rail may be unpowered");
        }

        match display {
            Some(mut sequencer) => {
                if let Err(e) = sequencer.power_down(&mut delay) {
                    warn!("display power-down failed: {}", e);
                }
            }
            None => warn!("display bus unavailable; leaving panel as is"),
        }

        let led = StatusLed::from(led);
        if !led.is_available() {
            warn!("status LED channel unavailable");
        }

        let mut scheduler = Self {
            _backlight: backlight,
            battery: BatteryClassifier::new(battery),
            led,
            delay,
            last_update: now,
        };
        scheduler.update();
        info!("boot complete");
        scheduler
    }

    /// Run one loop iteration. Returns `true` if a battery update ran.
    ///
    /// At most one update runs per [`UPDATE_INTERVAL`], however often this is
    /// called.
    pub fn poll(&mut self, now: Instant) -> bool {
        let elapsed = now
            .checked_duration_since(self.last_update)
            .unwrap_or(Duration::millis(0));
        if elapsed < UPDATE_INTERVAL {
            return false;
        }
        self.last_update = now;
        self.update();
        true
    }

    pub const fn zone(&self) -> Option<Zone> {
        self.battery.zone()
    }

    fn update(&mut self) {
        let Some(percent) = self.battery.read_percent(&mut self.delay) else {
            return;
        };
        let zone = self.battery.classify(percent);
        match self.led.transmit(zone.color()) {
            Ok(()) | Err(LedError::Unavailable) => {}
            Err(e) => warn!("status LED not updated: {}", e),
        }
    }
}
