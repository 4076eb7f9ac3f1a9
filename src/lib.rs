//! psplash-hook - splash-screen hook for OpenRC-style init systems
//!
//! Invoked by the init system at runlevel and service state changes.
//! Decides, per event, whether to start the psplash daemon, send it a
//! status line, or tell it to quit:
//!
//! ```text
//! init system ──▶ hook dispatcher ──▶ splash control ──▶ psplash
//!                 (classify phase,     (probe / start /    (fifo under
//!                  decision table)      message / quit)     /run)
//! ```
//!
//! Failures are advisory: the hook reports status 1 but the boot or
//! shutdown sequence always proceeds.

pub mod hook;
pub mod rc;
pub mod splash;

pub use hook::{decide, run_hook, ControlAction, HookEvent, HookKind};
pub use splash::{ControlError, SplashControl};
