//! Disobey 2026 badge wiring (ESP32-S3).
//!
//! Turns the raw peripherals into the components the scheduler expects. Any
//! peripheral that fails to come up is handed over as `None`; the firmware
//! keeps running without it.

use embedded_hal::digital::PinState;
use embedded_hal_bus::spi::ExclusiveDevice;
use esp_hal::{
    Blocking,
    analog::adc::{
        Adc,
        AdcCalCurve,
        AdcConfig,
        AdcPin,
        Attenuation,
    },
    assign_resources,
    clock::{
        Clock,
        CpuClock,
    },
    delay::Delay,
    gpio::{
        DriveMode,
        Level,
        Output,
        OutputConfig,
    },
    ledc::{
        LSGlobalClkSource,
        Ledc,
        LowSpeed,
        channel::{
            self as ledc_channel,
            ChannelIFace as _,
        },
        timer::{
            self as ledc_timer,
            TimerIFace as _,
        },
    },
    peripherals::{
        ADC1,
        GPIO10,
    },
    rmt::{
        PulseCode,
        Rmt,
        Tx,
        TxChannelConfig,
        TxChannelCreator as _,
    },
    rom,
    spi::master::Spi,
    time::Rate,
};

use crate::{
    battery::BatterySense,
    config::{
        BACKLIGHT_PWM_KHZ,
        DISPLAY_SPI_MHZ,
        RMT_CLK_DIVIDER,
        RMT_SOURCE_MHZ,
    },
    display::DisplaySequencer,
    encoder::{
        PIXEL_FRAME_SYMBOLS,
        Symbol,
    },
    led::SymbolChannel,
    scheduler::{
        Instant,
        Parts,
    },
};

/// StaticCell helper: moves a value into a `static` exactly once.
#[macro_export]
macro_rules! mk_static {
    ($t:ty, $val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        #[deny(unused_attributes)]
        let x = STATIC_CELL.uninit().write($val);
        x
    }};
}

// ── Pin / peripheral assignments ────────────────────────────────────────────

assign_resources! {
    pub Resources<'d> {
        display: DisplayResources<'d> {
            dc: GPIO15,
            rst: GPIO7,
            sck: GPIO4,
            cs: GPIO6,
            mosi: GPIO5,
            spi: SPI2,
        },
        backlight: BacklightResources<'d> {
            led: GPIO19,
            ledc: LEDC,
        },
        leds: LedResources<'d> {
            power: GPIO17,
            io: GPIO18,
            rmt: RMT,
        },
        battery: BatteryResources<'d> {
            sense: GPIO10,
            adc: ADC1,
        },
    }
}

// ── Board initialisation ────────────────────────────────────────────────────

/// Minimal CPU clock switcher for ESP32-S3.
///
/// Steps through an intermediate frequency before reaching the target,
/// which is required by the hardware.
fn set_cpu_clock(cpu_clock_speed: CpuClock) {
    let _ = esp_hal::peripherals::SYSTEM::regs()
        .sysclk_conf()
        .modify(|_, w| unsafe { w.soc_clk_sel().bits(1) });
    let _ = esp_hal::peripherals::SYSTEM::regs()
        .cpu_per_conf()
        .modify(|_, w| unsafe {
            let _ = w.pll_freq_sel().set_bit();
            w.cpuperiod_sel().bits(match cpu_clock_speed {
                CpuClock::_80MHz => 0,
                CpuClock::_160MHz => 1,
                CpuClock::_240MHz => 2,
                _ => panic!("Unsupported CPU clock speed"),
            })
        });

    rom::ets_update_cpu_frequency_rom(cpu_clock_speed.frequency().as_mhz());
}

/// Initialise the badge hardware and return the raw peripheral set.
///
/// Call this once at the top of `main`, then use [`split_resources!`] to
/// break the peripherals into typed resource groups.
#[must_use]
pub fn init() -> esp_hal::peripherals::Peripherals {
    set_cpu_clock(CpuClock::_160MHz);
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    esp_hal::init(config)
}

/// Milliseconds since boot.
pub fn now() -> Instant {
    Instant::from_ticks(esp_hal::time::Instant::now().duration_since_epoch().as_millis())
}

pub type BacklightPwm = ledc_channel::Channel<'static, LowSpeed>;

pub type DisplayInterface = mipidsi::interface::SpiInterface<
    'static,
    ExclusiveDevice<Spi<'static, Blocking>, Output<'static>, Delay>,
    Output<'static>,
>;

pub type PanelSequencer = DisplaySequencer<DisplayInterface, Output<'static>>;

pub type BoardParts =
    Parts<BacklightPwm, DisplayInterface, Output<'static>, AdcSense, RmtChannel<'static>, Delay>;

impl Resources<'static> {
    /// Bring up every peripheral the scheduler needs.
    pub fn into_parts(self) -> BoardParts {
        Parts {
            backlight: self.backlight.into_pwm(),
            display: self.display.into_sequencer(),
            led: RmtChannel::new(self.leds),
            battery: self.battery.into(),
            delay: Delay::new(),
        }
    }
}

// ── Backlight ───────────────────────────────────────────────────────────────

impl BacklightResources<'static> {
    /// LEDC low-speed channel driving the backlight.
    pub fn into_pwm(self) -> Option<BacklightPwm> {
        let ledc = mk_static!(Ledc<'static>, Ledc::new(self.ledc));
        ledc.set_global_slow_clock(LSGlobalClkSource::APBClk);

        let mut timer = ledc.timer::<LowSpeed>(ledc_timer::Number::Timer0);
        if timer
            .configure(ledc_timer::config::Config {
                duty: ledc_timer::config::Duty::Duty8Bit,
                clock_source: ledc_timer::LSClockSource::APBClk,
                frequency: Rate::from_khz(BACKLIGHT_PWM_KHZ),
            })
            .is_err()
        {
            error!("backlight LEDC timer configuration failed");
            return None;
        }
        let timer = mk_static!(ledc_timer::Timer<'static, LowSpeed>, timer);

        // Configured dark; `Backlight::hold` makes the one floor write at boot.
        let mut channel = ledc.channel::<LowSpeed>(ledc_channel::Number::Channel0, self.led);
        if channel
            .configure(ledc_channel::config::Config {
                timer: &*timer,
                duty_pct: 0,
                drive_mode: DriveMode::PushPull,
            })
            .is_err()
        {
            error!("backlight LEDC channel configuration failed");
            return None;
        }
        Some(channel)
    }
}

// ── Display ─────────────────────────────────────────────────────────────────

impl DisplayResources<'static> {
    /// Claim the SPI bus for the panel. `None` if the bus cannot be set up.
    pub fn into_sequencer(self) -> Option<PanelSequencer> {
        let dc = Output::new(self.dc, Level::Low, OutputConfig::default());
        let rst = Output::new(self.rst, Level::High, OutputConfig::default());
        let cs = Output::new(self.cs, Level::High, OutputConfig::default());

        let Ok(spi) = Spi::new(
            self.spi,
            esp_hal::spi::master::Config::default().with_frequency(Rate::from_mhz(DISPLAY_SPI_MHZ)),
        ) else {
            warn!("display SPI bus unavailable");
            return None;
        };
        let spi = spi.with_sck(self.sck).with_mosi(self.mosi);

        let Ok(spi_device) = ExclusiveDevice::new(spi, cs, Delay::new()) else {
            warn!("display chip select unavailable");
            return None;
        };

        // Commands carry at most one parameter byte; no pixels are ever sent.
        let buffer = mk_static!([u8; 16], [0_u8; 16]);
        let di = mipidsi::interface::SpiInterface::new(spi_device, dc, buffer);
        Some(DisplaySequencer::new(di, rst))
    }
}

// ── Status LED ──────────────────────────────────────────────────────────────

/// Why the RMT channel did not emit a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum RmtFault {
    /// A previous transaction failed and did not hand the channel back.
    ChannelLost,
    /// The frame does not fit the pulse buffer.
    FrameTooLong,
    Transmit,
}

/// WS2812 output on the RMT peripheral at a 100 ns tick.
pub struct RmtChannel<'d> {
    channel: Option<esp_hal::rmt::Channel<'d, Blocking, Tx>>,
    _power: Output<'d>,
}

impl<'d> RmtChannel<'d> {
    /// Power the LED rail and configure RMT channel 0.
    pub fn new(res: LedResources<'d>) -> Option<Self> {
        let power = Output::new(res.power, Level::High, OutputConfig::default());

        let Ok(rmt) = Rmt::new(res.rmt, Rate::from_mhz(RMT_SOURCE_MHZ)) else {
            error!("RMT peripheral init failed");
            return None;
        };
        let tx_config = TxChannelConfig::default().with_clk_divider(RMT_CLK_DIVIDER);
        let Ok(channel) = rmt.channel0.configure_tx(res.io, tx_config) else {
            error!("RMT TX channel configuration failed");
            return None;
        };

        Some(Self {
            channel: Some(channel),
            _power: power,
        })
    }

    const fn level(state: PinState) -> Level {
        match state {
            PinState::High => Level::High,
            PinState::Low => Level::Low,
        }
    }
}

impl SymbolChannel for RmtChannel<'_> {
    type Error = RmtFault;

    /// ESP32-S3 RMT memory per channel, in pulse codes.
    const WINDOW: usize = 48;

    fn emit(&mut self, frame: &[Symbol]) -> Result<(), RmtFault> {
        if frame.len() > PIXEL_FRAME_SYMBOLS {
            return Err(RmtFault::FrameTooLong);
        }

        let Some(channel) = self.channel.take() else {
            error!("RMT channel lost during previous transmission");
            return Err(RmtFault::ChannelLost);
        };

        let mut pulses = [PulseCode::end_marker(); PIXEL_FRAME_SYMBOLS + 1];
        for (pulse, symbol) in pulses.iter_mut().zip(frame) {
            *pulse = PulseCode::new(
                Self::level(symbol.level0),
                symbol.ticks0,
                Self::level(symbol.level1),
                symbol.ticks1,
            );
        }

        let transaction = match channel.transmit(&pulses[..=frame.len()]) {
            Ok(t) => t,
            Err(e) => {
                error!("RMT transmit failed: {}", e);
                return Err(RmtFault::Transmit);
            }
        };

        match transaction.wait() {
            Ok(ch) => {
                self.channel = Some(ch);
                Ok(())
            }
            Err((err, ch)) => {
                error!("RMT transaction failed: {}", err);
                self.channel = Some(ch);
                Err(RmtFault::Transmit)
            }
        }
    }
}

// ── Battery ─────────────────────────────────────────────────────────────────

/// Calibrated ADC1 reading of the battery divider.
pub struct AdcSense {
    adc: Adc<'static, ADC1<'static>, Blocking>,
    pin: AdcPin<GPIO10<'static>, ADC1<'static>, AdcCalCurve<ADC1<'static>>>,
}

impl From<BatteryResources<'static>> for AdcSense {
    fn from(res: BatteryResources<'static>) -> Self {
        let mut config = AdcConfig::new();
        // 11 dB covers 0..~3.1 V at the pin; a full cell gives 2.1 V.
        let pin = config.enable_pin_with_cal::<_, AdcCalCurve<ADC1>>(res.sense, Attenuation::_11dB);
        Self {
            adc: Adc::new(res.adc, config),
            pin,
        }
    }
}

impl BatterySense for AdcSense {
    type Error = ();

    fn read_millivolts(&mut self) -> Result<u16, ()> {
        nb::block!(self.adc.read_oneshot(&mut self.pin))
    }
}
