#[allow(dead_code)]
mod session;

use std::env;
use std::io::{self, BufRead, Write};
use std::process;

use session::{Session, SessionOptions, USAGE};

fn main() -> io::Result<()> {
    let options = parse_options().unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("Usage: lamp-emulator {USAGE}");
        process::exit(2);
    });

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut session = Session::new(&options)?;
    let mut line = String::new();

    writeln!(
        writer,
        "Lamp emulator ready at t=0ms. Type `help` for commands or `exit` to quit."
    )?;
    writeln!(
        writer,
        "Time only moves with `advance`; queued presses apply on the next tick."
    )?;

    loop {
        line.clear();
        write!(writer, "> ")?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if should_terminate(trimmed) {
            writeln!(writer, "Session closed.")?;
            break;
        }

        let reply = session.handle_command(trimmed)?;
        for response in reply.lines {
            writeln!(writer, "{response}")?;
        }
    }

    Ok(())
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn parse_options() -> Result<SessionOptions, String> {
    let (options, positional) = SessionOptions::from_args(env::args().skip(1))?;
    match positional.first() {
        Some(extra) => Err(format!("Unexpected argument `{extra}`")),
        None => Ok(options),
    }
}
