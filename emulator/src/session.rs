use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use lamp_core::console::{ConsoleError, ConsoleExecutor, LampControl, LampStatus};
use lamp_core::debounce::{ButtonInput, ButtonPolarity, DebouncePolicy};
use lamp_core::filter::SensorInput;
use lamp_core::output::{Brightness, LampOutput};
use lamp_core::telemetry::{EventId, TelemetryEventKind};
use lamp_core::{Clock, LampApp, LampConfig, ManualClock, Millis};

/// Longest single `advance`; the board is stepped one millisecond at a time.
pub const MAX_ADVANCE_MS: u32 = 3_600_000;

pub const USAGE: &str = "options: [--blink <ms>] [--debounce <ms>] [--brightness <0-100>] \
                         [--hold-confirm] [--sensor <raw>] [--transcript <path>]";

/// Settings gathered from the command line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionOptions {
    pub config: LampConfig,
    /// Constant raw reading of the simulated sensor; `None` leaves it absent.
    pub sensor: Option<u16>,
    pub transcript: Option<PathBuf>,
}

impl SessionOptions {
    /// Parses flags, returning the options and any positional arguments.
    pub fn from_args<I>(args: I) -> Result<(Self, Vec<String>), String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut options = Self::default();
        let mut positional = Vec::new();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) if flag.starts_with("--") => {
                    (flag.to_string(), Some(value.to_string()))
                }
                _ => (arg.clone(), None),
            };
            let mut value = |name: &str| {
                inline
                    .clone()
                    .or_else(|| args.next())
                    .ok_or_else(|| format!("Expected value after {name}"))
            };

            match flag.as_str() {
                "--blink" => {
                    let ms = parse_millis("--blink", &value("--blink")?)?;
                    options.config = options.config.with_blink_interval(ms);
                }
                "--debounce" => {
                    let ms = parse_millis("--debounce", &value("--debounce")?)?;
                    let policy = options.config.debounce_policy;
                    options.config = options.config.with_debounce(ms, policy);
                }
                "--brightness" => {
                    let raw = value("--brightness")?;
                    let brightness = raw
                        .parse::<u32>()
                        .ok()
                        .and_then(Brightness::checked)
                        .ok_or_else(|| format!("Invalid brightness `{raw}` (0-100)"))?;
                    options.config = options.config.with_brightness(brightness);
                }
                "--hold-confirm" => {
                    let window = options.config.debounce_ms;
                    options.config = options
                        .config
                        .with_debounce(window, DebouncePolicy::HoldConfirm);
                }
                "--sensor" => {
                    let raw = value("--sensor")?;
                    let reading = raw
                        .parse::<u16>()
                        .map_err(|_| format!("Invalid sensor reading `{raw}` (0-65535)"))?;
                    options.sensor = Some(reading);
                }
                "--transcript" => {
                    options.transcript = Some(PathBuf::from(value("--transcript")?));
                }
                other if other.starts_with("--") => {
                    return Err(format!("Unknown option `{other}`"));
                }
                _ => positional.push(arg),
            }
        }

        Ok((options, positional))
    }
}

fn parse_millis(flag: &str, raw: &str) -> Result<u32, String> {
    let digits = raw.strip_suffix("ms").unwrap_or(raw);
    match digits.parse::<u32>() {
        Ok(ms) if ms > 0 => Ok(ms),
        _ => Err(format!("Invalid value `{raw}` for {flag} (milliseconds > 0)")),
    }
}

/// Raw button line of the simulated board.
#[derive(Debug)]
pub struct SimButton {
    high: bool,
}

impl ButtonInput for SimButton {
    fn is_high(&mut self) -> bool {
        self.high
    }
}

/// Lamp driver of the simulated board.
#[derive(Debug, Default)]
pub struct SimLamp {
    duty: u8,
}

impl SimLamp {
    pub fn duty(&self) -> u8 {
        self.duty
    }
}

impl LampOutput for SimLamp {
    fn set_duty(&mut self, duty: u8) {
        self.duty = duty;
    }
}

/// Analog sensor of the simulated board, holding a fixed reading.
#[derive(Debug, Default)]
pub struct SimSensor {
    raw: Option<u16>,
}

impl SensorInput for SimSensor {
    fn read(&mut self) -> Option<u16> {
        self.raw
    }
}

/// Simulated board: the lamp application stepped by a manual clock.
pub struct Board {
    app: LampApp<SimButton, SimLamp, SimSensor>,
    clock: ManualClock,
    polarity: ButtonPolarity,
    telemetry_cursor: EventId,
    telemetry: Vec<String>,
}

impl Board {
    pub fn new(config: &LampConfig, sensor: Option<u16>) -> Self {
        let button = SimButton {
            high: config.button_polarity.released_level(),
        };
        let sensor = SimSensor { raw: sensor };
        let app = lamp_core::build_with_sensor(config, button, SimLamp::default(), sensor)
            .expect("lamp task registration");
        Self {
            app,
            clock: ManualClock::default(),
            polarity: config.button_polarity,
            telemetry_cursor: 0,
            telemetry: Vec::new(),
        }
    }

    pub fn now(&self) -> Millis {
        self.clock.now()
    }

    pub fn app(&self) -> &LampApp<SimButton, SimLamp, SimSensor> {
        &self.app
    }

    /// Telemetry lines gathered since the previous call, minus periodic
    /// reports.
    pub fn take_telemetry(&mut self) -> Vec<String> {
        self.collect_telemetry();
        std::mem::take(&mut self.telemetry)
    }

    fn step(&mut self, ms: u32) {
        for _ in 0..ms {
            let now = self.clock.advance(1);
            self.app.tick(now);
            self.collect_telemetry();
        }
    }

    /// Copies new records out of the ring before later ticks overwrite them.
    fn collect_telemetry(&mut self) {
        let recorder = self.app.context().telemetry();
        if recorder.next_id() == self.telemetry_cursor {
            return;
        }

        let missed = recorder.missed_since(self.telemetry_cursor);
        if missed > 0 {
            self.telemetry
                .push(format!("telemetry: {missed} records lost"));
        }
        self.telemetry.extend(
            recorder
                .since(self.telemetry_cursor)
                .filter(|record| record.event != TelemetryEventKind::StatusReport)
                .map(|record| format!("telemetry: {record}")),
        );
        self.telemetry_cursor = recorder.next_id();
    }
}

impl LampControl for Board {
    fn press(&mut self) -> Result<bool, ConsoleError<'static>> {
        Ok(self.app.context_mut().request_press())
    }

    fn set_brightness(
        &mut self,
        brightness: Brightness,
    ) -> Result<Brightness, ConsoleError<'static>> {
        let now = self.clock.now();
        Ok(self.app.context_mut().set_brightness(brightness, now))
    }

    fn status(&mut self) -> LampStatus {
        self.app.context().status(self.clock.now())
    }

    fn drive_button(&mut self, pressed: bool) -> Result<(), ConsoleError<'static>> {
        let released = self.polarity.released_level();
        self.app.context_mut().input_mut().high = if pressed { !released } else { released };
        Ok(())
    }

    fn advance(&mut self, by: Duration) -> Result<Millis, ConsoleError<'static>> {
        let ms = u32::try_from(by.as_millis())
            .ok()
            .filter(|ms| *ms <= MAX_ADVANCE_MS)
            .ok_or(ConsoleError::OutOfRange {
                what: "advance",
                value: u32::try_from(by.as_millis()).unwrap_or(u32::MAX),
                max: MAX_ADVANCE_MS,
            })?;
        self.step(ms);
        Ok(self.clock.now())
    }
}

/// Response to one console line.
#[derive(Debug, Default)]
pub struct Reply {
    pub ok: bool,
    pub lines: Vec<String>,
}

pub struct Session {
    executor: ConsoleExecutor<Board>,
    transcript: Option<TranscriptLogger>,
}

impl Session {
    pub fn new(options: &SessionOptions) -> io::Result<Self> {
        let transcript = match &options.transcript {
            Some(path) => Some(TranscriptLogger::new(path, &options.config)?),
            None => None,
        };

        Ok(Self {
            executor: ConsoleExecutor::new(Board::new(&options.config, options.sensor)),
            transcript,
        })
    }

    pub fn board(&self) -> &Board {
        self.executor.control()
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Reply> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Reply {
                ok: true,
                lines: Vec::new(),
            });
        }

        let at = self.board().now();
        self.log(at, TranscriptRole::Host, trimmed)?;

        let (ok, text) = match self.executor.execute(trimmed) {
            Ok(outcome) => (true, outcome.to_string()),
            Err(err) => (false, err.to_string()),
        };

        let mut lines = self.executor.control_mut().take_telemetry();
        lines.extend(text.lines().map(str::to_string));

        let at = self.board().now();
        for line in &lines {
            self.log(at, TranscriptRole::Emulator, line)?;
        }
        Ok(Reply { ok, lines })
    }

    fn log(&mut self, at: Millis, role: TranscriptRole, line: &str) -> io::Result<()> {
        match self.transcript.as_mut() {
            Some(transcript) => transcript.append_line(at, role, line),
            None => Ok(()),
        }
    }
}

struct TranscriptLogger {
    writer: BufWriter<fs::File>,
}

impl TranscriptLogger {
    fn new(path: &Path, config: &LampConfig) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };
        logger.write_header(config)?;
        Ok(logger)
    }

    fn write_header(&mut self, config: &LampConfig) -> io::Result<()> {
        writeln!(self.writer, "# Lamp emulator transcript")?;
        writeln!(
            self.writer,
            "# blink={}ms debounce={}ms policy={:?} brightness={}%",
            config.blink_interval_ms,
            config.debounce_ms,
            config.debounce_policy,
            config.brightness.percent()
        )?;
        writeln!(self.writer, "# Timestamps are simulated milliseconds")?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(&mut self, at: Millis, role: TranscriptRole, line: &str) -> io::Result<()> {
        writeln!(
            self.writer,
            "[{:>8} ms] {} {}",
            at.as_millis(),
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }
}

#[derive(Clone, Copy)]
enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}
