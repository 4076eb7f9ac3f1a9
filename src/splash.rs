//! Liveness probe and control channel for the psplash process
//!
//! psplash listens on a fifo under the runtime directory and accepts
//! single-line text commands (`MSG ...`, `QUIT`) written to it via
//! psplash-write. This module hides the subprocess mechanics: the
//! dispatcher only ever asks "is it reachable?" and fires one of three
//! control directives at it, tolerating the process being absent.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use nix::sys::stat::Mode;
use nix::unistd::{access, mkdir, AccessFlags};

/// Hard cap on a formatted control line. Oversized lines are rejected,
/// never truncated.
pub const MAX_CONTROL_LINE: usize = 300;

/// Fifo name psplash creates under its TMPDIR.
pub const FIFO_NAME: &str = "psplash_fifo";

/// Errors from control operations
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("Couldn't create runtime directory {0}")]
    Directory(PathBuf),

    #[error("Command {0} failed: {1}")]
    Command(String, String),

    #[error("Control line too long ({0} bytes, max {MAX_CONTROL_LINE})")]
    Format(usize),
}

/// Handle on the (external, unowned) splash process.
///
/// Holds only configuration. Liveness is re-probed on every call rather
/// than cached: psplash can exit at any time without telling us.
pub struct SplashControl {
    runtime_dir: PathBuf,
    psplash: PathBuf,
    psplash_write: PathBuf,
}

impl SplashControl {
    pub fn new(runtime_dir: impl Into<PathBuf>) -> Self {
        SplashControl {
            runtime_dir: runtime_dir.into(),
            psplash: PathBuf::from("/bin/psplash"),
            psplash_write: PathBuf::from("/bin/psplash-write"),
        }
    }

    /// Override the psplash binary path (nonstandard installs, tests)
    pub fn with_psplash(mut self, path: impl Into<PathBuf>) -> Self {
        self.psplash = path.into();
        self
    }

    /// Override the psplash-write binary path
    pub fn with_psplash_write(mut self, path: impl Into<PathBuf>) -> Self {
        self.psplash_write = path.into();
        self
    }

    /// Path of the control fifo
    pub fn fifo_path(&self) -> PathBuf {
        self.runtime_dir.join(FIFO_NAME)
    }

    /// Check whether psplash is reachable.
    ///
    /// True iff the control fifo exists and is readable and writable by
    /// us. A stale fifo reads as "running"; that conservative answer is
    /// acceptable because every control write is fire-and-forget anyway.
    /// Absence is a normal result, not an error.
    pub fn probe(&self) -> bool {
        access(&self.fifo_path(), AccessFlags::R_OK | AccessFlags::W_OK).is_ok()
    }

    /// Start psplash in the background.
    ///
    /// Idempotent: if the fifo is already reachable this is a no-op
    /// success, so at most one psplash is launched per boot or shutdown
    /// sequence. Creates the runtime directory (mode 0755) if missing.
    /// Returns once the spawn itself succeeds; does not wait for psplash
    /// to create its fifo, so an immediate `probe()` may still be false.
    pub fn start(&self) -> Result<(), ControlError> {
        if self.probe() {
            return Ok(());
        }

        log::info!("Starting psplash");
        self.ensure_runtime_dir()?;

        let mut cmd = Command::new(&self.psplash);
        cmd.arg("--no-progress")
            .env("TMPDIR", &self.runtime_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        // Detached: hold no handle on the child, let init reap it.
        match cmd.spawn() {
            Ok(_) => Ok(()),
            Err(e) => Err(ControlError::Command(
                self.psplash.display().to_string(),
                e.to_string(),
            )),
        }
    }

    /// Send a `MSG <label> <name>` status line to psplash.
    ///
    /// Fire-and-forget: a nonzero exit from psplash-write (typically
    /// because nothing is listening) comes back as `Command`, which the
    /// caller treats as advisory.
    pub fn send_message(&self, label: &str, name: &str) -> Result<(), ControlError> {
        let line = format!("MSG {} {}", label, name);
        self.write_control_line(&line)
    }

    /// Tell psplash to quit.
    pub fn quit(&self) -> Result<(), ControlError> {
        self.write_control_line("QUIT")
    }

    /// Make sure the runtime directory exists and is usable (r/w/x).
    fn ensure_runtime_dir(&self) -> Result<(), ControlError> {
        let flags = AccessFlags::R_OK | AccessFlags::W_OK | AccessFlags::X_OK;
        if access(&self.runtime_dir, flags).is_ok() {
            return Ok(());
        }
        mkdir(&self.runtime_dir, Mode::from_bits_truncate(0o755))
            .map_err(|_| ControlError::Directory(self.runtime_dir.clone()))
    }

    /// Deliver one control line through psplash-write, enforcing the
    /// length cap before anything is written.
    fn write_control_line(&self, line: &str) -> Result<(), ControlError> {
        if line.len() >= MAX_CONTROL_LINE {
            log::error!("Control line overflow: {} bytes", line.len());
            return Err(ControlError::Format(line.len()));
        }

        let status = Command::new(&self.psplash_write)
            .arg(line)
            .env("TMPDIR", &self.runtime_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| {
                ControlError::Command(self.psplash_write.display().to_string(), e.to_string())
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(ControlError::Command(
                format!("{} \"{}\"", self.psplash_write.display(), line),
                format!("exit status {}", status.code().unwrap_or(-1)),
            ))
        }
    }
}
