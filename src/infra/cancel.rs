use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::{Context, Result};

/// What an interrupt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// First signal: finish the current phase, then stop.
    Stop,
    /// The flag was already set: leave now.
    Exit,
}

/// Exit status for a second interrupt (128 + SIGINT).
const EXIT_ON_SECOND_INTERRUPT: i32 = 130;

/// Shared stop flag. Set from the Ctrl-C handler (or a test), read by
/// the orchestrator at epoch and phase boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Raise the flag for an incoming signal.
    pub fn interrupt(&self) -> Interrupt {
        if self.flag.swap(true, Ordering::SeqCst) {
            Interrupt::Exit
        } else {
            Interrupt::Stop
        }
    }

    /// Route SIGINT / SIGTERM to this token. A second signal exits the
    /// process. ctrlc allows one handler per process, so call this once
    /// from the binary.
    pub fn install_ctrlc_handler(&self) -> Result<()> {
        let token = self.clone();
        ctrlc::set_handler(move || match token.interrupt() {
            Interrupt::Stop => {
                eprintln!("\n  Interrupt received, stopping after the current phase (Ctrl-C again to quit)...");
            }
            Interrupt::Exit => {
                eprintln!("\n  Second interrupt, exiting.");
                std::process::exit(EXIT_ON_SECOND_INTERRUPT);
            }
        })
        .context("Cannot install the Ctrl-C handler")
    }
}
