use embassy_time::{Duration, Instant, Ticker};
use lamp_core::{LampApp, Millis};

use crate::console::{ConsoleRequest, RequestQueue};
use crate::hw::{ButtonPin, LampPwm, LightSensor};
use crate::status;
use crate::telemetry::TelemetryForwarder;

/// Scheduler resolution.
const TICK: Duration = Duration::from_millis(1);

#[embassy_executor::task]
pub async fn run(
    mut app: LampApp<ButtonPin, LampPwm, LightSensor>,
    requests: &'static RequestQueue,
) -> ! {
    let receiver = requests.receiver();
    let mut forwarder = TelemetryForwarder::new();
    let mut ticker = Ticker::every(TICK);

    loop {
        let now = Millis::from_uptime(Instant::now().as_millis());
        while let Ok(request) = receiver.try_receive() {
            let ctx = app.context_mut();
            match request {
                ConsoleRequest::Press => {
                    if !ctx.request_press() {
                        defmt::debug!("lamp: console press merged into pending press");
                    }
                }
                ConsoleRequest::Brightness(brightness) => {
                    ctx.set_brightness(brightness, now);
                }
            }
        }

        let report = app.tick(now);
        if !report.is_idle() {
            let ctx = app.context();
            forwarder.forward(ctx.telemetry());
            status::publish(&ctx.status(now), ctx.button().latch().is_pending());
        }

        ticker.next().await;
    }
}
