//! Hook dispatch - maps init hook events to splash control actions
//!
//! The init system invokes the hook once per event, synchronously, from
//! its own sequential hook loop. Each invocation re-derives the system
//! phase from scratch and either starts psplash, sends it a status
//! message, tells it to quit, or does nothing:
//!
//! - entering the shutdown runlevel, or the boot runlevel: start psplash
//! - default runlevel finished starting: quit (boot is done)
//! - localmount stopping during shutdown: quit (about to lose /run)
//! - individual services starting/stopping: status message
//!
//! Everything outside a boot or shutdown window is a no-op.

use crate::rc::{RcContext, SHUTDOWN_LEVEL};
use crate::splash::SplashControl;

/// Hook kinds the init system fires. Anything we don't recognize maps
/// to `Other` and degrades to a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    /// Entering a runlevel's stop phase
    RunlevelStopIn,
    /// Finished a runlevel's stop phase
    RunlevelStopOut,
    /// Entering a runlevel's start phase
    RunlevelStartIn,
    /// Finished a runlevel's start phase
    RunlevelStartOut,
    /// A service is about to be stopped
    ServiceStopIn,
    /// A service is stopping right now
    ServiceStopNow,
    /// A service is starting right now
    ServiceStartNow,
    /// Any other hook
    Other,
}

impl HookKind {
    /// Parse an OpenRC hook name (e.g. "runlevel_start_in"). Lenient:
    /// unknown names are `Other`, never an error.
    pub fn from_name(name: &str) -> HookKind {
        match name {
            "runlevel_stop_in" => HookKind::RunlevelStopIn,
            "runlevel_stop_out" => HookKind::RunlevelStopOut,
            "runlevel_start_in" => HookKind::RunlevelStartIn,
            "runlevel_start_out" => HookKind::RunlevelStartOut,
            "service_stop_in" => HookKind::ServiceStopIn,
            "service_stop_now" => HookKind::ServiceStopNow,
            "service_start_now" => HookKind::ServiceStartNow,
            _ => HookKind::Other,
        }
    }

    /// The four runlevel-transition kinds only ever fire while a
    /// runlevel switch is in progress, so they imply boot-or-shutdown
    /// activity even before the starting/stopping flags would show it.
    fn is_runlevel_transition(self) -> bool {
        matches!(
            self,
            HookKind::RunlevelStopIn
                | HookKind::RunlevelStopOut
                | HookKind::RunlevelStartIn
                | HookKind::RunlevelStartOut
        )
    }
}

/// One hook invocation: the kind and the runlevel or service name it
/// refers to
#[derive(Debug, Clone)]
pub struct HookEvent {
    pub kind: HookKind,
    pub name: String,
}

impl HookEvent {
    pub fn new(kind: HookKind, name: impl Into<String>) -> Self {
        HookEvent {
            kind,
            name: name.into(),
        }
    }
}

/// What to do to the splash process for a given event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlAction {
    Start,
    Message { label: &'static str, name: String },
    Quit,
    NoOp,
}

/// Pure dispatch decision for one hook event.
///
/// Phase gate first: with no runlevel transition reported and a
/// non-transition hook kind, we are neither booting nor shutting down
/// and nothing happens. Then the decision table keyed on kind and name.
pub fn decide(event: &HookEvent, ctx: &dyn RcContext) -> ControlAction {
    if !(ctx.runlevel_starting() || ctx.runlevel_stopping())
        && !event.kind.is_runlevel_transition()
    {
        log::debug!("Not booting or shutting down");
        return ControlAction::NoOp;
    }

    match event.kind {
        // Shutdown sequence begins: bring up the splash screen
        HookKind::RunlevelStopIn if event.name == SHUTDOWN_LEVEL => ControlAction::Start,

        // Entering the boot runlevel: /proc and /sys are mounted by
        // sysinit at this point, safe to bring up the splash screen
        HookKind::RunlevelStartIn if matches_level(&event.name, ctx.bootlevel()) => {
            ControlAction::Start
        }

        // Default runlevel fully started: boot is done
        HookKind::RunlevelStartOut if matches_level(&event.name, ctx.defaultlevel()) => {
            ControlAction::Quit
        }

        // localmount going down during shutdown: the runtime dir is
        // about to become unwritable, quit while we still can
        HookKind::ServiceStopIn
            if event.name == "localmount"
                && ctx.runlevel().as_deref() == Some(SHUTDOWN_LEVEL) =>
        {
            ControlAction::Quit
        }

        HookKind::ServiceStopNow => ControlAction::Message {
            label: "Stopping service",
            name: event.name.clone(),
        },

        HookKind::ServiceStartNow => ControlAction::Message {
            label: "Starting service",
            name: event.name.clone(),
        },

        _ => ControlAction::NoOp,
    }
}

/// Compare an event name against a configured runlevel that may be
/// unset; absent never matches.
fn matches_level(name: &str, level: Option<String>) -> bool {
    level.as_deref() == Some(name)
}

/// Execute one hook event end to end.
///
/// Returns the integer status handed back to the init system: 0 on
/// success, 1 if the chosen control action failed. The failure is
/// advisory; the init system keeps going either way, so errors are
/// logged here and folded into the status instead of propagating.
pub fn run_hook(event: &HookEvent, ctx: &dyn RcContext, splash: &SplashControl) -> i32 {
    let action = decide(event, ctx);
    log::debug!(
        "hook={:?} name={} runlevel={:?} action={:?}",
        event.kind,
        event.name,
        ctx.runlevel(),
        action
    );

    let result = match &action {
        ControlAction::Start => splash.start(),
        ControlAction::Message { label, name } => splash.send_message(label, name),
        ControlAction::Quit => splash.quit(),
        ControlAction::NoOp => Ok(()),
    };

    match result {
        Ok(()) => 0,
        Err(e) => {
            log::warn!("{:?} for {} failed: {}", action, event.name, e);
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scripted oracle for decision tests
    struct StubContext {
        runlevel: Option<&'static str>,
        starting: bool,
        stopping: bool,
        bootlevel: Option<&'static str>,
        defaultlevel: Option<&'static str>,
    }

    impl StubContext {
        fn idle() -> Self {
            StubContext {
                runlevel: Some("default"),
                starting: false,
                stopping: false,
                bootlevel: Some("boot"),
                defaultlevel: Some("default"),
            }
        }

        fn booting() -> Self {
            StubContext {
                starting: true,
                ..Self::idle()
            }
        }

        fn shutting_down() -> Self {
            StubContext {
                runlevel: Some(SHUTDOWN_LEVEL),
                stopping: true,
                ..Self::idle()
            }
        }
    }

    impl RcContext for StubContext {
        fn runlevel(&self) -> Option<String> {
            self.runlevel.map(String::from)
        }
        fn runlevel_starting(&self) -> bool {
            self.starting
        }
        fn runlevel_stopping(&self) -> bool {
            self.stopping
        }
        fn bootlevel(&self) -> Option<String> {
            self.bootlevel.map(String::from)
        }
        fn defaultlevel(&self) -> Option<String> {
            self.defaultlevel.map(String::from)
        }
    }

    #[test]
    fn test_gate_blocks_service_hooks_when_idle() {
        let ctx = StubContext::idle();
        for kind in [
            HookKind::ServiceStopIn,
            HookKind::ServiceStopNow,
            HookKind::ServiceStartNow,
            HookKind::Other,
        ] {
            let event = HookEvent::new(kind, "sshd");
            assert_eq!(decide(&event, &ctx), ControlAction::NoOp, "kind={:?}", kind);
        }
    }

    #[test]
    fn test_runlevel_transitions_bypass_gate() {
        // Runlevel hooks imply a transition even with both flags clear
        let ctx = StubContext::idle();
        let event = HookEvent::new(HookKind::RunlevelStartIn, "boot");
        assert_eq!(decide(&event, &ctx), ControlAction::Start);
    }

    #[test]
    fn test_stop_in_shutdown_level_starts_splash() {
        let ctx = StubContext::shutting_down();
        let event = HookEvent::new(HookKind::RunlevelStopIn, "shutdown");
        assert_eq!(decide(&event, &ctx), ControlAction::Start);
    }

    #[test]
    fn test_stop_in_other_level_is_noop() {
        let ctx = StubContext::shutting_down();
        let event = HookEvent::new(HookKind::RunlevelStopIn, "default");
        assert_eq!(decide(&event, &ctx), ControlAction::NoOp);
    }

    #[test]
    fn test_start_in_bootlevel_starts_regardless_of_runlevel() {
        let mut ctx = StubContext::booting();
        ctx.runlevel = Some("sysinit");
        let event = HookEvent::new(HookKind::RunlevelStartIn, "boot");
        assert_eq!(decide(&event, &ctx), ControlAction::Start);
    }

    #[test]
    fn test_start_out_defaultlevel_quits() {
        let ctx = StubContext::booting();
        let event = HookEvent::new(HookKind::RunlevelStartOut, "default");
        assert_eq!(decide(&event, &ctx), ControlAction::Quit);
    }

    #[test]
    fn test_start_out_bootlevel_is_noop() {
        let ctx = StubContext::booting();
        let event = HookEvent::new(HookKind::RunlevelStartOut, "boot");
        assert_eq!(decide(&event, &ctx), ControlAction::NoOp);
    }

    #[test]
    fn test_unset_bootlevel_never_matches() {
        let mut ctx = StubContext::booting();
        ctx.bootlevel = None;
        let event = HookEvent::new(HookKind::RunlevelStartIn, "boot");
        assert_eq!(decide(&event, &ctx), ControlAction::NoOp);
    }

    #[test]
    fn test_localmount_stop_quits_only_during_shutdown() {
        let ctx = StubContext::shutting_down();
        let event = HookEvent::new(HookKind::ServiceStopIn, "localmount");
        assert_eq!(decide(&event, &ctx), ControlAction::Quit);

        // Same hook outside the shutdown runlevel: leave splash alone
        let mut ctx = StubContext::shutting_down();
        ctx.runlevel = Some("default");
        assert_eq!(decide(&event, &ctx), ControlAction::NoOp);

        // Other services stopping never trigger quit
        let ctx = StubContext::shutting_down();
        let event = HookEvent::new(HookKind::ServiceStopIn, "sshd");
        assert_eq!(decide(&event, &ctx), ControlAction::NoOp);
    }

    #[test]
    fn test_service_now_hooks_send_messages() {
        let ctx = StubContext::booting();
        let event = HookEvent::new(HookKind::ServiceStartNow, "sshd");
        assert_eq!(
            decide(&event, &ctx),
            ControlAction::Message {
                label: "Starting service",
                name: "sshd".to_string()
            }
        );

        let ctx = StubContext::shutting_down();
        let event = HookEvent::new(HookKind::ServiceStopNow, "sshd");
        assert_eq!(
            decide(&event, &ctx),
            ControlAction::Message {
                label: "Stopping service",
                name: "sshd".to_string()
            }
        );
    }

    #[test]
    fn test_hook_name_parsing() {
        assert_eq!(
            HookKind::from_name("runlevel_stop_in"),
            HookKind::RunlevelStopIn
        );
        assert_eq!(
            HookKind::from_name("service_start_now"),
            HookKind::ServiceStartNow
        );
        assert_eq!(HookKind::from_name("abort"), HookKind::Other);
        assert_eq!(HookKind::from_name(""), HookKind::Other);
    }
}
