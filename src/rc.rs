//! Read-only oracle over the init system's runlevel state
//!
//! OpenRC records its state on the filesystem: the current runlevel in
//! `<svcdir>/softlevel` and an in-progress transition as the existence
//! of `<svcdir>/rc.starting` or `<svcdir>/rc.stopping`. The boot and
//! default runlevel names come in through the environment of the hook
//! invocation. Nothing here is cached; each query hits the live state,
//! since a hook can fire at any point of a transition.

use std::path::PathBuf;

/// Runlevel that librc hardwires for the shutdown sequence.
pub const SHUTDOWN_LEVEL: &str = "shutdown";

/// Default OpenRC state directory.
pub const DEFAULT_SVCDIR: &str = "/run/openrc";

/// Queries the dispatcher needs from the init system
pub trait RcContext {
    /// Current runlevel name, if one has been recorded yet
    fn runlevel(&self) -> Option<String>;
    /// True while the init system is starting some runlevel
    fn runlevel_starting(&self) -> bool;
    /// True while the init system is stopping some runlevel
    fn runlevel_stopping(&self) -> bool;
    /// Configured boot runlevel name (RC_BOOTLEVEL)
    fn bootlevel(&self) -> Option<String>;
    /// Configured default runlevel name (RC_DEFAULTLEVEL)
    fn defaultlevel(&self) -> Option<String>;
}

/// Live implementation backed by the environment and the OpenRC state
/// directory
pub struct SystemContext {
    svcdir: PathBuf,
}

impl SystemContext {
    pub fn new() -> Self {
        SystemContext {
            svcdir: PathBuf::from(DEFAULT_SVCDIR),
        }
    }

    /// Use a different state directory (tests, chroots)
    pub fn with_svcdir(svcdir: impl Into<PathBuf>) -> Self {
        SystemContext {
            svcdir: svcdir.into(),
        }
    }
}

impl Default for SystemContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RcContext for SystemContext {
    fn runlevel(&self) -> Option<String> {
        if let Ok(level) = std::env::var("RC_RUNLEVEL") {
            return Some(level);
        }
        std::fs::read_to_string(self.svcdir.join("softlevel"))
            .ok()
            .map(|s| s.trim().to_string())
    }

    fn runlevel_starting(&self) -> bool {
        self.svcdir.join("rc.starting").exists()
    }

    fn runlevel_stopping(&self) -> bool {
        self.svcdir.join("rc.stopping").exists()
    }

    fn bootlevel(&self) -> Option<String> {
        std::env::var("RC_BOOTLEVEL").ok()
    }

    fn defaultlevel(&self) -> Option<String> {
        std::env::var("RC_DEFAULTLEVEL").ok()
    }
}
