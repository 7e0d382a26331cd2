//! Board bindings for the lamp controller.
//!
//! * `PA0`: push button to ground, internal pull-up (active low).
//! * `PA1`: light sensor divider on `ADC1_IN1`.
//! * `PA6`: LED driver on `TIM3_CH1`.

use embassy_stm32::adc::{Adc, SampleTime};
use embassy_stm32::gpio::{Input, OutputType, Pull};
use embassy_stm32::peripherals::{ADC1, PA0, PA1, PA6, TIM3};
use embassy_stm32::time::khz;
use embassy_stm32::timer::low_level::CountingMode;
use embassy_stm32::timer::simple_pwm::{PwmPin, SimplePwm, SimplePwmChannel};
use embassy_stm32::Peri;
use lamp_core::debounce::ButtonInput;
use lamp_core::filter::SensorInput;
use lamp_core::output::{LampOutput, MAX_DUTY};

/// PWM carrier; well above flicker fusion.
const LAMP_PWM_FREQUENCY_KHZ: u32 = 5;

/// Raw button line.
pub struct ButtonPin {
    input: Input<'static>,
}

impl ButtonPin {
    pub fn new(pin: Peri<'static, PA0>) -> Self {
        Self {
            input: Input::new(pin, Pull::Up),
        }
    }
}

impl ButtonInput for ButtonPin {
    fn is_high(&mut self) -> bool {
        self.input.is_high()
    }
}

/// Lamp output on a single PWM channel.
pub struct LampPwm {
    channel: SimplePwmChannel<'static, TIM3>,
}

impl LampPwm {
    pub fn new(timer: Peri<'static, TIM3>, pin: Peri<'static, PA6>) -> Self {
        let pwm = SimplePwm::new(
            timer,
            Some(PwmPin::new(pin, OutputType::PushPull)),
            None,
            None,
            None,
            khz(LAMP_PWM_FREQUENCY_KHZ),
            CountingMode::EdgeAlignedUp,
        );
        let mut channel = pwm.split().ch1;
        channel.set_duty_cycle_fully_off();
        channel.enable();
        Self { channel }
    }
}

impl LampOutput for LampPwm {
    fn set_duty(&mut self, duty: u8) {
        self.channel
            .set_duty_cycle_fraction(u16::from(duty), u16::from(MAX_DUTY));
    }
}

/// Analog light sensor read with blocking conversions.
pub struct LightSensor {
    adc: Adc<'static, ADC1>,
    pin: Peri<'static, PA1>,
    discard_next: bool,
}

impl LightSensor {
    pub fn new(adc: Peri<'static, ADC1>, pin: Peri<'static, PA1>) -> Self {
        let mut adc = Adc::new(adc);
        adc.set_sample_time(SampleTime::CYCLES160_5);
        Self {
            adc,
            pin,
            discard_next: true,
        }
    }
}

impl SensorInput for LightSensor {
    fn read(&mut self) -> Option<u16> {
        // The first conversion after power-up settles the sample capacitor.
        if core::mem::take(&mut self.discard_next) {
            let _ = self.adc.blocking_read(&mut self.pin);
        }
        Some(self.adc.blocking_read(&mut self.pin))
    }
}
