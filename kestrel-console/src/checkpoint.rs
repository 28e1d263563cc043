use crate::Event;
use log::info;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
    mpsc,
};

/// Handle used to request a checkpoint from outside the VM
///
/// Requests set a flag (which the engine polls between instructions) and post
/// an [`Event::Checkpoint`] to the console channel (which wakes up a pending
/// `in` instruction).
#[derive(Clone)]
pub struct Trigger {
    flag: Arc<AtomicBool>,
    tx: mpsc::Sender<Event>,
}

impl Trigger {
    /// Builds a new trigger which posts to the given channel
    pub fn new(tx: mpsc::Sender<Event>) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            tx,
        }
    }

    /// Requests a checkpoint
    pub fn request(&self) {
        self.flag.store(true, Ordering::Release);
        // The console may already be gone, in which case nobody is waiting
        let _ = self.tx.send(Event::Checkpoint);
    }

    /// Checks whether a checkpoint has been requested
    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Installs this trigger as the process's `SIGINT` handler
    pub fn install(&self) -> Result<(), ctrlc::Error> {
        let t = self.clone();
        ctrlc::set_handler(move || {
            info!("interrupted, saving checkpoint");
            t.request();
        })
    }
}
