use std::time::Duration;

use crate::command::run_command;
use crate::error::MetricError;
use crate::system::snapshot::round2;

use super::{GpuReader, GpuReading, GpuVendor};

const QUERY: &str = "--query-gpu=utilization.gpu,temperature.gpu,power.draw";
const FORMAT: &str = "--format=csv,noheader,nounits";

/// Queries the first GPU through `nvidia-smi`.
pub struct NvidiaSmiReader {
    program: String,
    timeout: Duration,
}

impl Default for NvidiaSmiReader {
    fn default() -> Self {
        NvidiaSmiReader {
            program: "nvidia-smi".to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

impl GpuReader for NvidiaSmiReader {
    fn vendor(&self) -> GpuVendor {
        GpuVendor::Nvidia
    }

    fn read(&mut self) -> Result<GpuReading, MetricError> {
        let output = run_command(&self.program, &[QUERY, FORMAT], self.timeout)
            .map_err(|err| MetricError::unavailable("GPU usage", err.to_string()))?;
        parse_query_output(&output)
    }
}

/// One CSV line per GPU, e.g. `15, 65, 37.50`. Power reads `[N/A]` on
/// boards without a sensor.
pub fn parse_query_output(output: &str) -> Result<GpuReading, MetricError> {
    let line = output
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| MetricError::unavailable("GPU usage", "nvidia-smi printed nothing"))?;
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();

    let usage: f64 = fields
        .first()
        .and_then(|f| f.parse().ok())
        .ok_or_else(|| MetricError::unavailable("GPU usage", format!("unexpected line `{line}`")))?;
    let temp_celsius: f64 = fields.get(1).and_then(|f| f.parse().ok()).ok_or_else(|| {
        MetricError::unavailable("GPU temperature", format!("unexpected line `{line}`"))
    })?;
    let power_watts = fields
        .get(2)
        .and_then(|f| f.parse::<f64>().ok())
        .map(round2);

    Ok(GpuReading {
        usage_percent: usage.clamp(0.0, 100.0).round() as u8,
        temp_celsius,
        power_watts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_line() {
        let reading = parse_query_output("15, 65, 37.50\n").unwrap();
        assert_eq!(
            reading,
            GpuReading {
                usage_percent: 15,
                temp_celsius: 65.0,
                power_watts: Some(37.5),
            }
        );
    }

    #[test]
    fn power_not_available() {
        let reading = parse_query_output("7, 40, [N/A]").unwrap();
        assert_eq!(reading.power_watts, None);
    }

    #[test]
    fn first_gpu_wins() {
        let reading = parse_query_output("\n1, 30, 10.0\n90, 80, 250.0\n").unwrap();
        assert_eq!(reading.usage_percent, 1);
    }

    #[test]
    fn garbage_is_unavailable() {
        assert!(parse_query_output("").is_err());
        assert!(parse_query_output("No devices were found").is_err());
        assert!(parse_query_output("12").is_err());
    }

    #[test]
    fn missing_tool_is_unavailable() {
        let mut reader = NvidiaSmiReader {
            program: "sysmon-relay-missing-nvidia-smi".to_string(),
            timeout: Duration::from_secs(1),
        };
        let err = reader.read().unwrap_err();
        assert!(matches!(err, MetricError::Unavailable { .. }));
    }
}
