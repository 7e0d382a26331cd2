use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use lamp_core::LampConfig;

use crate::console::RequestQueue;
use crate::hw::{ButtonPin, LampPwm, LightSensor};

mod console_task;
mod lamp_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

pub(super) static REQUEST_QUEUE: RequestQueue = RequestQueue::new();

/// Board defaults: active-low button, active-high LED driver.
const CONFIG: LampConfig = LampConfig::DEFAULT;

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let hal::Peripherals {
        PA0,
        PA1,
        PA6,
        ADC1,
        TIM3,
        PB0,
        PB1,
        USART5,
        ..
    } = hal::init(hal::Config::default());

    let button = ButtonPin::new(PA0);
    let lamp = LampPwm::new(TIM3, PA6);
    let sensor = LightSensor::new(ADC1, PA1);
    let app = lamp_core::build_with_sensor(&CONFIG, button, lamp, sensor)
        .expect("lamp task registration");

    defmt::info!(
        "lamp: debounce={}ms blink={}ms sensor={}ms status={}ms",
        CONFIG.debounce_ms,
        CONFIG.blink_interval_ms,
        CONFIG.sensor_interval_ms,
        CONFIG.status_interval_ms
    );

    spawner
        .spawn(lamp_task::run(app, &REQUEST_QUEUE))
        .expect("failed to spawn lamp task");

    spawner
        .spawn(console_task::run(&REQUEST_QUEUE, USART5, PB0, PB1))
        .expect("failed to spawn console task");

    core::future::pending::<()>().await;
}
