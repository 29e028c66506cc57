//! Lowered scheduling priority for siever processes.
//!
//! Sievers run for hours on every core; they must not make the machine
//! unusable. Each host OS family gets one implementation.

use tokio::process::Command;

/// Capability to start a child process at reduced priority.
pub trait LowerPriority: Send + Sync {
    /// Configure `cmd` so the spawned process runs at reduced priority.
    fn apply(&self, cmd: &mut Command);

    /// Short description for log lines.
    fn describe(&self) -> String;
}

/// Unix: set the child's nice value between fork and exec.
#[cfg(unix)]
#[derive(Debug, Clone, Copy)]
pub struct Niceness(pub i32);

#[cfg(unix)]
impl LowerPriority for Niceness {
    fn apply(&self, cmd: &mut Command) {
        let value = self.0;
        // SAFETY: setpriority is async-signal-safe and touches no parent state.
        unsafe {
            cmd.pre_exec(move || {
                // A siever at normal priority is still useful, so failure is ignored.
                libc::setpriority(libc::PRIO_PROCESS, 0, value);
                Ok(())
            });
        }
    }

    fn describe(&self) -> String {
        format!("nice {}", self.0)
    }
}

/// Windows: IDLE_PRIORITY_CLASS creation flag.
#[cfg(windows)]
#[derive(Debug, Clone, Copy, Default)]
pub struct IdlePriorityClass;

#[cfg(windows)]
impl IdlePriorityClass {
    const IDLE_PRIORITY_CLASS: u32 = 0x0000_0040;
}

#[cfg(windows)]
impl LowerPriority for IdlePriorityClass {
    fn apply(&self, cmd: &mut Command) {
        cmd.creation_flags(Self::IDLE_PRIORITY_CLASS);
    }

    fn describe(&self) -> String {
        "idle priority class".to_string()
    }
}

/// Priority lowering for the host OS. `niceness` is only used on Unix.
#[cfg(unix)]
pub fn platform_priority(niceness: i32) -> std::sync::Arc<dyn LowerPriority> {
    std::sync::Arc::new(Niceness(niceness))
}

#[cfg(windows)]
pub fn platform_priority(_niceness: i32) -> std::sync::Arc<dyn LowerPriority> {
    std::sync::Arc::new(IdlePriorityClass)
}
