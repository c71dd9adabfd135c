//! Samples host CPU, memory and GPU telemetry and relays it as a JSON
//! document to an Android viewer over `adb`.

pub mod appearance;
pub mod bridge;
pub mod command;
pub mod config;
pub mod document;
pub mod error;
pub mod format;
pub mod logging;
pub mod publish;
pub mod relay;
pub mod system;
