//! Li-ion battery level estimation and zone classification.
//!
//! The sense pin reads the cell through a 2:1 divider. Readings are averaged
//! over several samples, converted to cell millivolts and mapped linearly from
//! 3000 mV (0%) to 4200 mV (100%).

use embedded_hal::delay::DelayNs;

use crate::{
    color::Zone,
    config::{
        BATTERY_DIVIDER,
        BATTERY_EMPTY_MV,
        BATTERY_FULL_MV,
        BATTERY_SAMPLE_DELAY_MS,
        BATTERY_SAMPLES,
        HYSTERESIS_PCT,
    },
};

/// Plain zone boundaries; a reading at or above `ZONE_THRESHOLDS[k]` is in
/// zone `k + 1`.
pub const ZONE_THRESHOLDS: [u8; 3] = [25, 50, 75];

/// An analog input that reports calibrated millivolts at the pin.
pub trait BatterySense {
    type Error;

    fn read_millivolts(&mut self) -> Result<u16, Self::Error>;
}

/// Cell voltage for a pin voltage read behind the divider.
pub const fn pin_to_cell_mv(pin_mv: u32) -> u32 {
    pin_mv * BATTERY_DIVIDER
}

/// Linear charge estimate, clamped to 0..=100.
pub const fn percent_from_millivolts(cell_mv: u32) -> u8 {
    if cell_mv >= BATTERY_FULL_MV {
        100
    } else if cell_mv <= BATTERY_EMPTY_MV {
        0
    } else {
        ((cell_mv - BATTERY_EMPTY_MV) * 100 / (BATTERY_FULL_MV - BATTERY_EMPTY_MV)) as u8
    }
}

/// Zone for a reading with no history.
pub fn plain_zone(percent: u8) -> Zone {
    let index = ZONE_THRESHOLDS.iter().filter(|&&t| percent >= t).count();
    Zone::from_index(index as u8)
}

/// Samples the battery and tracks the current zone.
///
/// The zone is the only state kept between polls; it starts unset and is
/// never cleared again once the first reading has been classified.
pub struct BatteryClassifier<S> {
    sense: S,
    zone: Option<Zone>,
}

impl<S: BatterySense> BatteryClassifier<S> {
    pub const fn new(sense: S) -> Self {
        Self { sense, zone: None }
    }

    pub const fn zone(&self) -> Option<Zone> {
        self.zone
    }

    /// Average [`BATTERY_SAMPLES`] readings and convert to a charge percentage.
    ///
    /// Failed samples are left out of the average. Returns `None` only if
    /// every sample failed.
    pub fn read_percent(&mut self, delay: &mut impl DelayNs) -> Option<u8> {
        let mut sum = 0u32;
        let mut count = 0u32;
        for i in 0..BATTERY_SAMPLES {
            if i > 0 {
                delay.delay_ms(BATTERY_SAMPLE_DELAY_MS);
            }
            if let Ok(mv) = self.sense.read_millivolts() {
                sum += u32::from(mv);
                count += 1;
            }
        }
        if count == 0 {
            warn!("battery: all {} ADC samples failed", BATTERY_SAMPLES);
            return None;
        }

        let cell_mv = pin_to_cell_mv(sum / count);
        let percent = percent_from_millivolts(cell_mv);
        debug!(
            "battery: {} mV cell, {}% ({} samples)",
            cell_mv,
            percent,
            count
        );
        Some(percent)
    }

    /// Map `percent` to a zone, applying hysteresis against the current zone.
    ///
    /// Leaving zone `k` upwards needs a reading of at least its upper
    /// threshold plus [`HYSTERESIS_PCT`]; leaving downwards needs a reading
    /// below its lower threshold minus [`HYSTERESIS_PCT`]. Once a band is
    /// left the new zone is the plain zone of the reading, which may skip
    /// zones.
    pub fn classify(&mut self, percent: u8) -> Zone {
        let next = match self.zone {
            None => plain_zone(percent),
            Some(current) => {
                let k = usize::from(current.index());
                let rises = ZONE_THRESHOLDS
                    .get(k)
                    .is_some_and(|&upper| percent >= upper.saturating_add(HYSTERESIS_PCT));
                let falls = k
                    .checked_sub(1)
                    .and_then(|i| ZONE_THRESHOLDS.get(i))
                    .is_some_and(|&lower| percent < lower.saturating_sub(HYSTERESIS_PCT));
                if rises || falls {
                    plain_zone(percent)
                } else {
                    current
                }
            }
        };

        if self.zone != Some(next) {
            info!("battery zone -> {} at {}%", next, percent);
        }
        self.zone = Some(next);
        next
    }
}
