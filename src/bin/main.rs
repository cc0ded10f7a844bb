//! Battery indicator firmware: display asleep, one pixel showing charge.

#![no_std]
#![no_main]

#[allow(clippy::wildcard_imports)]
use battery_led::board::*;
use battery_led::{
    Scheduler,
    config::IDLE_SLEEP_MS,
};
use defmt::info;
use embassy_executor::Spawner;
use embassy_time::{
    Duration,
    Timer,
};
use esp_backtrace as _;
use esp_hal::timer::timg::TimerGroup;
use esp_println as _;

extern crate alloc;

esp_bootloader_esp_idf::esp_app_desc!();

#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    let peripherals = init();
    let resources = battery_led::split_resources!(peripherals);

    // One pixel frame at a time; the heap only ever holds that buffer.
    esp_alloc::heap_allocator!(size: 4 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("battery-led starting");
    let mut scheduler = Scheduler::boot(resources.into_parts(), now());

    loop {
        scheduler.poll(now());
        Timer::after(Duration::from_millis(IDLE_SLEEP_MS)).await;
    }
}
