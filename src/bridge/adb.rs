use std::path::Path;
use std::time::Duration;

use crate::command::{command_exists, run_command};
use crate::config::BridgeConfig;
use crate::error::BridgeError;

use super::{Shell, Transport};

/// `adb` invoked as a subprocess, optionally pinned to one device serial.
#[derive(Debug, Clone)]
pub struct AdbBridge {
    program: String,
    device_id: Option<String>,
    timeout: Duration,
}

impl AdbBridge {
    pub fn new(program: impl Into<String>, device_id: Option<String>, timeout: Duration) -> Self {
        AdbBridge {
            program: program.into(),
            device_id,
            timeout,
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(
            config.program.clone(),
            config.device_id.clone(),
            Duration::from_millis(config.timeout_ms),
        )
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn is_available(&self) -> bool {
        command_exists(&self.program, "version")
    }

    /// Full argument list for one invocation, device selector first.
    pub fn args<'a>(&'a self, rest: &[&'a str]) -> Vec<&'a str> {
        let mut args = Vec::with_capacity(rest.len() + 2);
        if let Some(device) = self.device_id.as_deref() {
            args.push("-s");
            args.push(device);
        }
        args.extend_from_slice(rest);
        args
    }

    fn run(&self, rest: &[&str]) -> Result<String, BridgeError> {
        Ok(run_command(&self.program, &self.args(rest), self.timeout)?)
    }
}

impl Transport for AdbBridge {
    fn push(&self, local: &Path, remote: &str) -> Result<(), BridgeError> {
        let local = local.to_string_lossy();
        self.run(&["push", &*local, remote]).map(|_| ())
    }
}

impl Shell for AdbBridge {
    fn shell(&self, command: &str) -> Result<String, BridgeError> {
        self.run(&["shell", command]).map(|out| out.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CommandError;

    #[test]
    fn device_selector_comes_first() {
        let bridge = AdbBridge::new("adb", Some("emulator-5554".into()), Duration::from_secs(1));
        assert_eq!(
            bridge.args(&["push", "/tmp/a.json", "/data/local/tmp/system_stats.json"]),
            vec![
                "-s",
                "emulator-5554",
                "push",
                "/tmp/a.json",
                "/data/local/tmp/system_stats.json"
            ]
        );
    }

    #[test]
    fn no_device_selector_by_default() {
        let bridge = AdbBridge::from_config(&BridgeConfig::default());
        assert_eq!(bridge.args(&["shell", "true"]), vec!["shell", "true"]);
        assert_eq!(bridge.program(), "adb");
    }

    #[test]
    fn missing_program_is_transport_failure() {
        let bridge = AdbBridge::new("sysmon-relay-missing-adb", None, Duration::from_secs(1));
        let err = bridge.push(Path::new("/tmp/x.json"), "/data/local/tmp/x.json").unwrap_err();
        assert!(matches!(err, BridgeError::Command(CommandError::Spawn { .. })));
        assert!(!bridge.is_available());
    }

    #[cfg(unix)]
    #[test]
    fn stand_in_program_receives_push_arguments() {
        // `echo` accepts any arguments and exits 0, like a successful push.
        let bridge = AdbBridge::new("echo", Some("serial".into()), Duration::from_secs(5));
        assert!(bridge.push(Path::new("/tmp/a.json"), "/remote/b.json").is_ok());
        assert_eq!(bridge.shell("input keyevent 26").unwrap(), "-s serial shell input keyevent 26");
    }
}
