#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Serial console plumbing.
//!
//! The UART task assembles lines in a [`ConsoleSession`] and runs them through
//! the shared [`ConsoleExecutor`]. Commands that change the lamp travel to the
//! lamp task as [`ConsoleRequest`]s; `status` reads the published atomics.

use core::fmt::Write as _;
use core::str;

#[cfg(not(target_os = "none"))]
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
#[cfg(target_os = "none")]
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use heapless::{String, Vec};
use lamp_core::console::{ConsoleError, ConsoleExecutor, LampControl, LampStatus};
use lamp_core::output::Brightness;

use crate::status;

/// Maximum number of bytes accepted on a single console line.
pub const MAX_LINE_LEN: usize = 96;

/// Room for the longest reply (`help` lists every command).
pub const MAX_REPLY_LEN: usize = 512;

/// Depth of the request queue between the console and the lamp task.
pub const REQUEST_QUEUE_DEPTH: usize = 4;

#[cfg(target_os = "none")]
type ConsoleMutex = ThreadModeRawMutex;
#[cfg(not(target_os = "none"))]
type ConsoleMutex = NoopRawMutex;

/// Lamp changes requested from the console.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsoleRequest {
    Press,
    Brightness(Brightness),
}

pub type RequestQueue = Channel<ConsoleMutex, ConsoleRequest, REQUEST_QUEUE_DEPTH>;
pub type RequestSender<'a> = Sender<'a, ConsoleMutex, ConsoleRequest, REQUEST_QUEUE_DEPTH>;
pub type RequestReceiver<'a> = Receiver<'a, ConsoleMutex, ConsoleRequest, REQUEST_QUEUE_DEPTH>;

/// [`LampControl`] backed by the request queue and the status atomics.
pub struct QueuedControl<'a> {
    sender: RequestSender<'a>,
}

impl<'a> QueuedControl<'a> {
    pub fn new(sender: RequestSender<'a>) -> Self {
        Self { sender }
    }
}

impl LampControl for QueuedControl<'_> {
    fn press(&mut self) -> Result<bool, ConsoleError<'static>> {
        if self.sender.try_send(ConsoleRequest::Press).is_err() {
            #[cfg(target_os = "none")]
            defmt::warn!("console: request queue full, press rejected");
            return Err(ConsoleError::QueueFull("press"));
        }
        Ok(status::mark_press_pending())
    }

    fn set_brightness(
        &mut self,
        brightness: Brightness,
    ) -> Result<Brightness, ConsoleError<'static>> {
        let previous = status::snapshot().brightness;
        if self
            .sender
            .try_send(ConsoleRequest::Brightness(brightness))
            .is_err()
        {
            #[cfg(target_os = "none")]
            defmt::warn!("console: request queue full, brightness rejected");
            return Err(ConsoleError::QueueFull("brightness"));
        }
        Ok(previous)
    }

    fn status(&mut self) -> LampStatus {
        status::snapshot()
    }
}

/// Errors surfaced while assembling a line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionError {
    LineOverflow,
    InvalidUtf8,
}

/// Line-oriented console session.
pub struct ConsoleSession<C> {
    executor: ConsoleExecutor<C>,
    buffer: Vec<u8, MAX_LINE_LEN>,
    overflowed: bool,
}

impl<C> ConsoleSession<C>
where
    C: LampControl,
{
    pub fn new(control: C) -> Self {
        Self {
            executor: ConsoleExecutor::new(control),
            buffer: Vec::new(),
            overflowed: false,
        }
    }

    /// Feeds a single byte. Returns `true` once `reply` holds a response.
    pub fn ingest(
        &mut self,
        byte: u8,
        reply: &mut String<MAX_REPLY_LEN>,
    ) -> Result<bool, SessionError> {
        match byte {
            b'\r' | b'\n' => self.finish_line(reply),
            0x08 | 0x7f => {
                self.buffer.pop();
                Ok(false)
            }
            value => {
                if self.overflowed {
                    return Ok(false);
                }
                if self.buffer.push(value).is_err() {
                    self.overflowed = true;
                    return Err(SessionError::LineOverflow);
                }
                Ok(false)
            }
        }
    }

    fn finish_line(&mut self, reply: &mut String<MAX_REPLY_LEN>) -> Result<bool, SessionError> {
        if core::mem::take(&mut self.overflowed) {
            self.buffer.clear();
            reply.clear();
            let _ = reply.push_str("error: line too long");
            return Ok(true);
        }

        let bytes = core::mem::take(&mut self.buffer);
        let line = str::from_utf8(&bytes).map_err(|_| SessionError::InvalidUtf8)?;
        if line.trim().is_empty() {
            return Ok(false);
        }

        reply.clear();

        // Truncation only loses the tail of an oversized reply.
        let _ = match self.executor.execute(line) {
            Ok(outcome) => write!(reply, "{outcome}"),
            Err(err) => write!(reply, "{err}"),
        };
        Ok(true)
    }

    pub fn control(&self) -> &C {
        self.executor.control()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(
        session: &mut ConsoleSession<QueuedControl<'_>>,
        text: &[u8],
    ) -> Option<String<MAX_REPLY_LEN>> {
        let mut reply = String::new();
        let mut ready = false;
        for byte in text {
            ready |= session.ingest(*byte, &mut reply).unwrap();
        }
        ready.then_some(reply)
    }

    #[test]
    fn brightness_line_becomes_request() {
        let queue = RequestQueue::new();
        let mut session = ConsoleSession::new(QueuedControl::new(queue.sender()));

        let reply = feed(&mut session, b"brightness 40\r\n").unwrap();
        assert_eq!(reply.as_str(), "ok brightness 100% -> 40%");
        assert_eq!(
            queue.try_receive(),
            Ok(ConsoleRequest::Brightness(Brightness::new(40)))
        );
    }

    #[test]
    fn out_of_range_brightness_is_not_queued() {
        let queue = RequestQueue::new();
        let mut session = ConsoleSession::new(QueuedControl::new(queue.sender()));

        let reply = feed(&mut session, b"brightness 140\n").unwrap();
        assert_eq!(reply.as_str(), "error: brightness 140 out of range (0-100)");
        assert!(queue.try_receive().is_err());
    }

    #[test]
    fn full_queue_rejects_press() {
        let queue = RequestQueue::new();
        let mut session = ConsoleSession::new(QueuedControl::new(queue.sender()));

        for line in [
            b"brightness 10\n".as_slice(),
            b"brightness 20\n",
            b"brightness 30\n",
            b"brightness 40\n",
        ] {
            assert!(feed(&mut session, line).unwrap().starts_with("ok"));
        }

        let reply = feed(&mut session, b"press\r\n").unwrap();
        assert_eq!(reply.as_str(), "error: request queue full, press not applied");
        assert!(!status::press_pending());

        let reply = feed(&mut session, b"brightness 50\n").unwrap();
        assert_eq!(
            reply.as_str(),
            "error: request queue full, brightness not applied"
        );

        let mut drained = 0;
        while let Ok(request) = queue.try_receive() {
            assert!(matches!(request, ConsoleRequest::Brightness(_)));
            drained += 1;
        }
        assert_eq!(drained, REQUEST_QUEUE_DEPTH);
    }

    #[test]
    fn blank_lines_stay_quiet() {
        let queue = RequestQueue::new();
        let mut session = ConsoleSession::new(QueuedControl::new(queue.sender()));
        assert!(feed(&mut session, b"   \n").is_none());
    }

    #[test]
    fn backspace_edits_the_line() {
        let queue = RequestQueue::new();
        let mut session = ConsoleSession::new(QueuedControl::new(queue.sender()));

        let reply = feed(&mut session, b"advancx\x08e 5ms\n").unwrap();
        assert_eq!(reply.as_str(), "error: advance is not supported here");
    }

    #[test]
    fn overflow_is_reported_once_per_line() {
        let queue = RequestQueue::new();
        let mut session = ConsoleSession::new(QueuedControl::new(queue.sender()));
        let mut reply = String::new();

        for _ in 0..MAX_LINE_LEN {
            assert_eq!(session.ingest(b'a', &mut reply), Ok(false));
        }
        assert_eq!(
            session.ingest(b'b', &mut reply),
            Err(SessionError::LineOverflow)
        );
        assert_eq!(session.ingest(b'c', &mut reply), Ok(false));
        assert_eq!(session.ingest(b'\n', &mut reply), Ok(true));
        assert_eq!(reply.as_str(), "error: line too long");

        let reply = feed(&mut session, b"help status\n").unwrap();
        assert!(reply.starts_with("usage: status"));
    }
}
