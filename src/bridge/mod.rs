//! Device-bridge transport. The relay treats the bridge as a black box that
//! either succeeds or fails per invocation.

mod adb;
pub mod control;

pub use adb::AdbBridge;

use std::path::Path;

use crate::error::BridgeError;

/// Copies a local file to a fixed path on the target device.
pub trait Transport {
    fn push(&self, local: &Path, remote: &str) -> Result<(), BridgeError>;
}

/// Runs a shell command on the target device and returns its stdout.
pub trait Shell {
    fn shell(&self, command: &str) -> Result<String, BridgeError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn push(&self, local: &Path, remote: &str) -> Result<(), BridgeError> {
        (**self).push(local, remote)
    }
}

impl<T: Shell + ?Sized> Shell for &T {
    fn shell(&self, command: &str) -> Result<String, BridgeError> {
        (**self).shell(command)
    }
}
