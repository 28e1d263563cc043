use crate::Event;
use log::warn;
use std::{io::Read, sync::mpsc};

/// Spawns a worker thread that reads from `input` and emits characters
///
/// The thread sends [`Event::Eof`] and exits when the stream ends, fails, or
/// the receiver is dropped.
pub fn spawn<R: Read + Send + 'static>(mut input: R, tx: mpsc::Sender<Event>) {
    std::thread::spawn(move || {
        let mut buf = [0u8; 32];
        loop {
            let n = match input.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {
                    continue;
                }
                Err(e) => {
                    warn!("failed to read input: {e}");
                    break;
                }
            };
            for &c in &buf[..n] {
                if tx.send(Event::Byte(c)).is_err() {
                    return;
                }
            }
        }
        let _ = tx.send(Event::Eof);
    });
}
