//! Lamp controller assembled from the scheduler, button, machine, and drive.
//!
//! [`build`] registers four periodic tasks on a [`Scheduler`] that owns a
//! [`LampContext`]:
//!
//! 1. `button` samples the input and records debounced edges,
//! 2. `lamp` feeds pending presses into the machine and writes the output,
//! 3. `sensor` folds an analog sample into the smoothing filter,
//! 4. `status` records a periodic status snapshot.
//!
//! Registration order matters: a press confirmed by `button` is consumed by
//! `lamp` on the same tick.

use crate::clock::Millis;
use crate::console::LampStatus;
use crate::debounce::{
    Button, ButtonEdge, ButtonInput, ButtonPolarity, DEFAULT_DEBOUNCE_WINDOW_MS, DebouncePolicy,
};
use crate::filter::{DEFAULT_EMA_ALPHA, Ema, NoSensor, SensorInput};
use crate::fsm::{DEFAULT_BLINK_INTERVAL_MS, LampEvent, LampMachine};
use crate::output::{Brightness, LampDrive, LampOutput, OutputPolarity};
use crate::scheduler::{Scheduler, SchedulerError};
use crate::telemetry::{StatusTelemetry, TelemetryRecorder};

pub const BUTTON_TASK: &str = "button";
pub const LAMP_TASK: &str = "lamp";
pub const SENSOR_TASK: &str = "sensor";
pub const STATUS_TASK: &str = "status";

/// Task slots reserved for the application.
pub const APP_TASKS: usize = 4;

pub const DEFAULT_SAMPLE_INTERVAL_MS: u32 = 1;
pub const DEFAULT_CONTROL_INTERVAL_MS: u32 = 1;
pub const DEFAULT_SENSOR_INTERVAL_MS: u32 = 2_000;
pub const DEFAULT_STATUS_INTERVAL_MS: u32 = 3_000;

/// Tunables for one lamp controller.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LampConfig {
    pub debounce_ms: u32,
    pub debounce_policy: DebouncePolicy,
    pub blink_interval_ms: u32,
    pub sample_interval_ms: u32,
    pub control_interval_ms: u32,
    pub sensor_interval_ms: u32,
    /// Smoothing factor in 1/256 steps.
    pub sensor_alpha: u16,
    pub status_interval_ms: u32,
    pub button_polarity: ButtonPolarity,
    pub output_polarity: OutputPolarity,
    pub brightness: Brightness,
}

impl LampConfig {
    pub const DEFAULT: Self = Self {
        debounce_ms: DEFAULT_DEBOUNCE_WINDOW_MS,
        debounce_policy: DebouncePolicy::Rearming,
        blink_interval_ms: DEFAULT_BLINK_INTERVAL_MS,
        sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
        control_interval_ms: DEFAULT_CONTROL_INTERVAL_MS,
        sensor_interval_ms: DEFAULT_SENSOR_INTERVAL_MS,
        sensor_alpha: DEFAULT_EMA_ALPHA,
        status_interval_ms: DEFAULT_STATUS_INTERVAL_MS,
        button_polarity: ButtonPolarity::ActiveLow,
        output_polarity: OutputPolarity::ActiveHigh,
        brightness: Brightness::MAX,
    };

    #[must_use]
    pub const fn with_debounce(mut self, window_ms: u32, policy: DebouncePolicy) -> Self {
        self.debounce_ms = window_ms;
        self.debounce_policy = policy;
        self
    }

    #[must_use]
    pub const fn with_blink_interval(mut self, interval_ms: u32) -> Self {
        self.blink_interval_ms = interval_ms;
        self
    }

    #[must_use]
    pub const fn with_sensor(mut self, interval_ms: u32, alpha: u16) -> Self {
        self.sensor_interval_ms = interval_ms;
        self.sensor_alpha = alpha;
        self
    }

    #[must_use]
    pub const fn with_status_interval(mut self, interval_ms: u32) -> Self {
        self.status_interval_ms = interval_ms;
        self
    }

    #[must_use]
    pub const fn with_polarity(mut self, button: ButtonPolarity, output: OutputPolarity) -> Self {
        self.button_polarity = button;
        self.output_polarity = output;
        self
    }

    #[must_use]
    pub const fn with_brightness(mut self, brightness: Brightness) -> Self {
        self.brightness = brightness;
        self
    }
}

impl Default for LampConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// State shared by the application tasks.
pub struct LampContext<I, O, S = NoSensor> {
    input: I,
    output: O,
    sensor: S,
    filter: Ema,
    button: Button,
    machine: LampMachine,
    drive: LampDrive,
    telemetry: TelemetryRecorder,
    last_duty: Option<u8>,
    reported_dropped: u32,
    now: Millis,
}

impl<I, O, S> LampContext<I, O, S>
where
    I: ButtonInput,
    O: LampOutput,
    S: SensorInput,
{
    pub fn with_sensor(config: &LampConfig, input: I, output: O, sensor: S) -> Self {
        Self {
            input,
            output,
            sensor,
            filter: Ema::new(config.sensor_alpha),
            button: Button::with_policy(
                config.button_polarity,
                config.debounce_policy,
                config.debounce_ms,
            ),
            machine: LampMachine::new(config.blink_interval_ms),
            drive: LampDrive::new(config.brightness, config.output_polarity),
            telemetry: TelemetryRecorder::new(),
            last_duty: None,
            reported_dropped: 0,
            now: Millis::ZERO,
        }
    }

    /// Remote press request. Travels through the same latch as a physical
    /// press; returns `false` when it merged into a pending one.
    pub fn request_press(&mut self) -> bool {
        self.button.raise_press()
    }

    /// Changes the brightness. The output picks it up on the next `lamp` run;
    /// the change is recorded at `now`.
    pub fn set_brightness(&mut self, brightness: Brightness, now: Millis) -> Brightness {
        self.now = now;
        let previous = self.drive.brightness;
        if previous != brightness {
            self.drive.brightness = brightness;
            self.telemetry
                .record_brightness(previous.percent(), brightness.percent(), now);
        }
        previous
    }

    #[must_use]
    pub fn status(&self, now: Millis) -> LampStatus {
        LampStatus {
            now,
            state: self.machine.state(),
            level: self.machine.output(),
            duty: self.last_duty.unwrap_or(0),
            brightness: self.drive.brightness,
            button_pressed: self.button.is_pressed(),
            presses: self.button.presses(),
            dropped: self.button.latch().dropped(),
            transitions: self.machine.transitions(),
            sensor: self.filter.value(),
            sensor_samples: self.filter.samples(),
        }
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut I {
        &mut self.input
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    #[must_use]
    pub fn filter(&self) -> &Ema {
        &self.filter
    }

    #[must_use]
    pub fn button(&self) -> &Button {
        &self.button
    }

    #[must_use]
    pub fn machine(&self) -> &LampMachine {
        &self.machine
    }

    pub fn telemetry(&self) -> &TelemetryRecorder {
        &self.telemetry
    }

    /// Duty last written to the output, if any.
    #[must_use]
    pub fn duty(&self) -> Option<u8> {
        self.last_duty
    }
}

/// `button` task body.
pub fn sample_button<I, O, S>(ctx: &mut LampContext<I, O, S>, now: Millis)
where
    I: ButtonInput,
    O: LampOutput,
    S: SensorInput,
{
    ctx.now = now;
    if let Some(edge) = ctx.button.poll(&mut ctx.input, now) {
        let presses = ctx.button.presses();
        ctx.telemetry
            .record_button(edge == ButtonEdge::Pressed, presses, now);
    }

    let dropped = ctx.button.latch().dropped();
    if dropped != ctx.reported_dropped {
        ctx.reported_dropped = dropped;
        ctx.telemetry.record_dropped(dropped, now);
    }
}

/// `lamp` task body.
pub fn run_lamp<I, O, S>(ctx: &mut LampContext<I, O, S>, now: Millis)
where
    I: ButtonInput,
    O: LampOutput,
    S: SensorInput,
{
    ctx.now = now;
    if ctx.button.take_press() {
        if let Some(change) = ctx.machine.handle(LampEvent::Press) {
            ctx.telemetry.record_transition(change.from, change.to, now);
        }
    }

    let level = ctx.machine.step(now);
    let duty = ctx.drive.duty(level);
    if ctx.last_duty != Some(duty) {
        ctx.output.set_duty(duty);
        ctx.last_duty = Some(duty);
    }
}

/// `sensor` task body. A missing reading leaves the filter untouched.
pub fn refresh_sensor<I, O, S>(ctx: &mut LampContext<I, O, S>, now: Millis)
where
    I: ButtonInput,
    O: LampOutput,
    S: SensorInput,
{
    ctx.now = now;
    if let Some(raw) = ctx.sensor.read() {
        ctx.filter.update(raw);
    }
}

/// `status` task body.
pub fn report_status<I, O, S>(ctx: &mut LampContext<I, O, S>, now: Millis)
where
    I: ButtonInput,
    O: LampOutput,
    S: SensorInput,
{
    ctx.now = now;
    let snapshot = StatusTelemetry {
        state: ctx.machine.state(),
        level: ctx.machine.output(),
        duty: ctx.last_duty.unwrap_or(0),
        sensor: ctx.filter.value(),
    };
    ctx.telemetry.record_status(snapshot, now);
}

/// Scheduler running the lamp application.
pub type LampApp<I, O, S = NoSensor> = Scheduler<LampContext<I, O, S>, APP_TASKS>;

/// Builds the application for a board without an analog sensor.
pub fn build<I, O>(config: &LampConfig, input: I, output: O) -> Result<LampApp<I, O>, SchedulerError>
where
    I: ButtonInput,
    O: LampOutput,
{
    build_with_sensor(config, input, output, NoSensor)
}

/// Builds the application with its tasks registered in execution order.
pub fn build_with_sensor<I, O, S>(
    config: &LampConfig,
    input: I,
    output: O,
    sensor: S,
) -> Result<LampApp<I, O, S>, SchedulerError>
where
    I: ButtonInput,
    O: LampOutput,
    S: SensorInput,
{
    let mut app: LampApp<I, O, S> =
        Scheduler::new(LampContext::with_sensor(config, input, output, sensor));
    app.register(BUTTON_TASK, config.sample_interval_ms, sample_button::<I, O, S>)?;
    app.register(LAMP_TASK, config.control_interval_ms, run_lamp::<I, O, S>)?;
    app.register(SENSOR_TASK, config.sensor_interval_ms, refresh_sensor::<I, O, S>)?;
    app.register(STATUS_TASK, config.status_interval_ms, report_status::<I, O, S>)?;
    Ok(app)
}
