use crate::system::snapshot::Snapshot;

fn reading(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{v:.1}{unit}"),
        None => "--".to_string(),
    }
}

/// One-line console summary of a snapshot.
pub fn preview(snapshot: &Snapshot) -> String {
    let cpu = &snapshot.cpu;
    let mem = &snapshot.memory;
    let gpu = &snapshot.gpu;

    let mut line = format!(
        "CPU {:.1}% {}",
        cpu.cpu_percent,
        reading(cpu.cpu_temp_celsius, "°C")
    );
    if let Some(watts) = cpu.cpu_power_watts {
        line.push_str(&format!(" {watts:.1}W"));
    }

    line.push_str(&format!(
        " | MEM {:.1}% ({:.1}/{:.1} GB)",
        mem.percent, mem.used_gb, mem.total_gb
    ));

    match gpu.gpu_usage_percent {
        Some(usage) => {
            line.push_str(&format!(
                " | GPU {usage}% {}",
                reading(gpu.gpu_temp_celsius, "°C")
            ));
            if let Some(watts) = gpu.gpu_power_watts {
                line.push_str(&format!(" {watts:.1}W"));
            }
        }
        None => line.push_str(" | GPU --"),
    }
    line
}
