use crate::error::BridgeError;

use super::Shell;

/// Unlock gesture: a vertical swipe on a 1080-wide portrait screen.
const UNLOCK_SWIPE: &str = "input swipe 540 1500 540 500";

/// Input-event commands the control surface issues through the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    ScreenOn,
    ScreenOff,
    Wake,
    Power,
    Unlock,
    VolumeUp,
    VolumeDown,
    SetBrightness(u8),
    GetBrightness,
}

impl DeviceCommand {
    /// Brightness levels outside 0-255 are clamped.
    pub fn brightness(level: u32) -> Self {
        DeviceCommand::SetBrightness(level.min(255) as u8)
    }

    pub fn shell_commands(self) -> Vec<String> {
        match self {
            DeviceCommand::ScreenOn => vec![
                "input keyevent KEYCODE_WAKEUP".to_string(),
                UNLOCK_SWIPE.to_string(),
            ],
            DeviceCommand::ScreenOff => vec!["input keyevent KEYCODE_SLEEP".to_string()],
            DeviceCommand::Wake => vec!["input keyevent KEYCODE_WAKEUP".to_string()],
            DeviceCommand::Power => vec!["input keyevent KEYCODE_POWER".to_string()],
            DeviceCommand::Unlock => vec![UNLOCK_SWIPE.to_string()],
            DeviceCommand::VolumeUp => vec!["input keyevent KEYCODE_VOLUME_UP".to_string()],
            DeviceCommand::VolumeDown => vec!["input keyevent KEYCODE_VOLUME_DOWN".to_string()],
            DeviceCommand::SetBrightness(level) => {
                vec![format!("settings put system screen_brightness {level}")]
            }
            DeviceCommand::GetBrightness => {
                vec!["settings get system screen_brightness".to_string()]
            }
        }
    }

    /// Runs the command sequence, stopping at the first failure. Returns the
    /// output of the last command.
    pub fn execute<S: Shell>(self, shell: &S) -> Result<String, BridgeError> {
        let mut output = String::new();
        for command in self.shell_commands() {
            tracing::debug!(command = %command, "device command");
            output = shell.shell(&command)?;
        }
        Ok(output)
    }
}

pub fn parse_brightness(output: &str) -> Option<u8> {
    output.trim().parse::<u32>().ok().map(|level| level.min(255) as u8)
}
