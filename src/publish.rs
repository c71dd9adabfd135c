use std::io::Write;
use std::path::Path;

use crate::bridge::Transport;
use crate::error::BridgeError;

/// Stages the rendered document in a local temporary file and hands it to the
/// transport. The staged file is fully written and flushed before the bridge
/// runs; whether the device-side copy is atomic depends on the bridge tool.
pub struct Publisher<T> {
    transport: T,
}

impl<T: Transport> Publisher<T> {
    pub fn new(transport: T) -> Self {
        Publisher { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn publish(&self, body: &str, remote: &str) -> Result<(), BridgeError> {
        let mut staged = tempfile::Builder::new()
            .prefix("system_stats")
            .suffix(".json")
            .tempfile()?;
        staged.write_all(body.as_bytes())?;
        staged.flush()?;

        self.transport.push(staged.path(), remote)
        // `staged` is removed on drop.
    }
}

/// Prints the staged document instead of pushing it; used by `--dry-run`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutTransport;

impl Transport for StdoutTransport {
    fn push(&self, local: &Path, _remote: &str) -> Result<(), BridgeError> {
        let body = std::fs::read_to_string(local)?;
        println!("{body}");
        Ok(())
    }
}
