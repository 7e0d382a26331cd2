//! Runs a script of console commands against the simulated board.
//!
//! Blank lines and lines starting with `#` are skipped. The exit status is 1
//! when any command was rejected.

use std::env;
use std::fs;
use std::io::{self, Read, Write};
use std::process;

#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

use session::{Session, SessionOptions, USAGE};

fn main() -> io::Result<()> {
    let (options, script) = parse_args().unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("Usage: lamp-replay {USAGE} <script|->");
        process::exit(2);
    });

    let text = if script == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        text
    } else {
        fs::read_to_string(&script)?
    };

    let mut session = Session::new(&options)?;
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut failures = 0usize;

    for command in script_commands(&text) {
        writeln!(writer, "> {command}")?;
        let reply = session.handle_command(command)?;
        if !reply.ok {
            failures += 1;
        }
        for response in reply.lines {
            writeln!(writer, "{response}")?;
        }
    }
    writer.flush()?;

    if failures > 0 {
        eprintln!("{failures} command(s) failed");
        process::exit(1);
    }
    Ok(())
}

fn parse_args() -> Result<(SessionOptions, String), String> {
    let (options, positional) = SessionOptions::from_args(env::args().skip(1))?;
    match positional.as_slice() {
        [script] => Ok((options, script.clone())),
        [] => Err("Expected a script path".to_string()),
        [_, extra, ..] => Err(format!("Unexpected argument `{extra}`")),
    }
}

fn script_commands(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}
