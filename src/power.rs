//! Keep the host awake during a run
//!
//! A suspended host stops feeding keepalives while the beam is on, so the run
//! holds an OS-level idle/sleep inhibitor until it is done. Where no inhibitor
//! tool exists the run goes ahead with a warning.

use std::process::{Child, Command, Stdio};

/// Holds a sleep inhibitor process for as long as it lives
#[derive(Debug)]
pub struct SleepInhibitor {
    child: Option<Child>,
}

impl SleepInhibitor {
    /// Start inhibiting sleep for the current process
    pub fn acquire() -> Self {
        let child = inhibit_command(std::process::id()).and_then(|mut command| {
            let program = command.get_program().to_string_lossy().into_owned();
            match command
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
            {
                Ok(child) => {
                    tracing::debug!("Sleep inhibited via {} (pid {})", program, child.id());
                    Some(child)
                }
                Err(e) => {
                    tracing::warn!("Could not start {}: {}; the host may sleep mid-run", program, e);
                    None
                }
            }
        });
        Self { child }
    }

    /// Whether an inhibitor process is running
    pub fn is_active(&self) -> bool {
        self.child.is_some()
    }
}

impl Drop for SleepInhibitor {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Platform command that inhibits sleep while `pid` is alive
fn inhibit_command(pid: u32) -> Option<Command> {
    if cfg!(target_os = "macos") {
        let mut command = Command::new("caffeinate");
        command.arg("-i").arg("-w").arg(pid.to_string());
        Some(command)
    } else if cfg!(target_os = "linux") {
        let mut command = Command::new("systemd-inhibit");
        command
            .arg("--what=idle:sleep")
            .arg("--who=inciser")
            .arg("--why=Laser run in progress")
            .arg("tail")
            .arg(format!("--pid={}", pid))
            .arg("-f")
            .arg("/dev/null");
        Some(command)
    } else {
        None
    }
}
