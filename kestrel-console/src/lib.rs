//! Host peripherals for the Kestrel VM
//!
//! [`Console`] connects the machine's `in` and `out` instructions to a byte
//! stream (normally stdin and stdout).  Input is read on a worker thread,
//! which feeds a channel; the [`Trigger`] posts checkpoint requests into the
//! same channel, so that a program blocked in `in` wakes up and stops.
#![warn(missing_docs)]
use kestrel_vm::{Device, Input};
use log::error;
use std::{io::Write, sync::mpsc};

mod checkpoint;
mod worker;

pub use checkpoint::Trigger;
pub use worker::spawn as spawn_worker;

/// Event sent to the console
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Incoming byte
    Byte(u8),
    /// The input stream has closed
    Eof,
    /// A checkpoint was requested
    Checkpoint,
}

/// Console device, reading from a channel and writing to a byte stream
pub struct Console<W = std::io::Stdout> {
    rx: mpsc::Receiver<Event>,
    trigger: Trigger,
    out: W,

    /// Set once the input stream is closed
    closed: bool,
    /// Set after the first write error, to avoid spamming the log
    broken: bool,
}

impl Console {
    /// Builds a console on stdin and stdout
    ///
    /// This spawns the stdin worker thread and installs the `SIGINT` handler,
    /// so it should only be called once.
    pub fn new() -> Result<Self, ctrlc::Error> {
        let (tx, rx) = mpsc::channel();
        let trigger = Trigger::new(tx.clone());
        trigger.install()?;
        worker::spawn(std::io::stdin(), tx);
        Ok(Self::with_output(rx, trigger, std::io::stdout()))
    }
}

impl<W: Write> Console<W> {
    /// Builds a console from its parts
    pub fn with_output(
        rx: mpsc::Receiver<Event>,
        trigger: Trigger,
        out: W,
    ) -> Self {
        Self {
            rx,
            trigger,
            out,
            closed: false,
            broken: false,
        }
    }

    /// Returns the checkpoint trigger
    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    /// Shared borrow of the output stream
    pub fn output(&self) -> &W {
        &self.out
    }

    /// Flushes pending output
    pub fn flush(&mut self) {
        if let Err(e) = self.out.flush() {
            self.report(e);
        }
    }

    fn report(&mut self, e: std::io::Error) {
        if !self.broken {
            error!("console output failed: {e}");
            self.broken = true;
        }
    }
}

impl<W: Write> Device for Console<W> {
    fn read(&mut self) -> Input {
        // The prompt must be visible before we block
        self.flush();
        if self.closed {
            return Input::Eof;
        }
        match self.rx.recv() {
            Ok(Event::Byte(c)) => Input::Byte(c),
            Ok(Event::Checkpoint) => Input::Checkpoint,
            Ok(Event::Eof) | Err(_) => {
                self.closed = true;
                Input::Eof
            }
        }
    }

    fn write(&mut self, byte: u8) {
        let r = self.out.write_all(&[byte]);
        let r = r.and_then(|()| match byte {
            b'\n' => self.out.flush(),
            _ => Ok(()),
        });
        if let Err(e) = r {
            self.report(e);
        }
    }

    fn checkpoint_requested(&self) -> bool {
        self.trigger.is_requested()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use kestrel_vm::{Exit, Vm};

    fn console(events: &[Event]) -> (Console<Vec<u8>>, mpsc::Sender<Event>) {
        let (tx, rx) = mpsc::channel();
        for e in events {
            tx.send(*e).unwrap();
        }
        let trigger = Trigger::new(tx.clone());
        (Console::with_output(rx, trigger, vec![]), tx)
    }

    #[test]
    fn read_bytes() {
        let (mut c, _tx) =
            console(&[Event::Byte(1), Event::Byte(2), Event::Eof]);
        assert_eq!(c.read(), Input::Byte(1));
        assert_eq!(c.read(), Input::Byte(2));
        assert_eq!(c.read(), Input::Eof);
        assert_eq!(c.read(), Input::Eof);
    }

    #[test]
    fn stays_closed_after_eof() {
        let (mut c, tx) = console(&[Event::Eof]);
        assert_eq!(c.read(), Input::Eof);
        tx.send(Event::Byte(b'a')).unwrap();
        assert_eq!(c.read(), Input::Eof);
    }

    #[test]
    fn write_bytes() {
        let (mut c, _tx) = console(&[]);
        for b in b"ok\n" {
            c.write(*b);
        }
        assert_eq!(c.output().as_slice(), b"ok\n");
    }

    #[test]
    fn checkpoint_wakes_reader() {
        let (mut c, _tx) = console(&[]);
        assert!(!c.checkpoint_requested());
        c.trigger().request();
        assert!(c.checkpoint_requested());
        assert_eq!(c.read(), Input::Checkpoint);
    }

    #[test]
    fn checkpoint_stops_running_program() {
        let mut vm = Vm::from_words(&[6, 0]).unwrap();
        let (mut c, _tx) = console(&[]);
        let trigger = c.trigger().clone();
        let r = vm.run_until(&mut c, |_, i| {
            if i == 100 {
                trigger.request();
            }
            false
        });
        assert_eq!(r, Ok(Exit::Checkpoint));
        assert_eq!(vm.pc(), 0);
    }

    #[test]
    fn program_echo() {
        // in r0; out r0; jmp 0
        let mut vm = Vm::from_words(&[20, 32768, 19, 32768, 6, 0]).unwrap();
        let (mut c, _tx) =
            console(&[Event::Byte(b'h'), Event::Byte(b'i'), Event::Eof]);
        assert_eq!(vm.run(&mut c), Ok(Exit::Halted));
        assert_eq!(c.output().as_slice(), b"hi");
    }
}
