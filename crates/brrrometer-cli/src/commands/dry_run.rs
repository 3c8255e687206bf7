use std::sync::Arc;
use std::time::Instant;

use log::info;

use brrrometer_core::{CollectorConfig, DeviceConfig, MinuteStats, Sampler, detect_source};

pub fn run(device: DeviceConfig, duration: &str) {
    let duration = super::parse_duration(duration).unwrap_or_else(|e| super::fatal(e));
    let config = CollectorConfig::default();

    let source = match detect_source(&device) {
        Some(source) => source,
        None => super::fatal(format!(
            "No usable GPU utilization source (device: {}, index: {})",
            device.kind, device.index
        )),
    };
    let mut sampler = Sampler::new(Arc::from(source), config.sample_interval);

    info!(
        "Dry run: sampling {} for {:?} (nothing is written)",
        sampler.source_name(),
        duration
    );

    let deadline = Instant::now() + duration;
    let mut samples = Vec::new();
    loop {
        let value = sampler.sample();
        info!("Sample {}: {value:.1}%", samples.len() + 1);
        samples.push(value);
        if Instant::now() + config.sample_interval > deadline {
            break;
        }
        std::thread::sleep(config.sample_interval);
    }

    println!("{}", summarize(&samples, &config));
}

/// One-line outcome of reducing `samples` the way a flush would.
fn summarize(samples: &[f64], config: &CollectorConfig) -> String {
    match MinuteStats::reduce(samples, config.activity_threshold, config.minutes_per_sample()) {
        Some(stats) => format!(
            "{} samples: {:.2} active minutes, peak {}%, avg {:.1}%",
            samples.len(),
            stats.minutes,
            stats.peak,
            stats.avg
        ),
        None => format!("{} samples: No GPU activity detected", samples.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_of_active_samples() {
        let line = summarize(&[0.0, 50.0, 100.0], &CollectorConfig::default());
        assert_eq!(line, "3 samples: 0.17 active minutes, peak 100%, avg 75.0%");
    }

    #[test]
    fn summary_of_idle_samples() {
        let line = summarize(&[0.0, 1.0], &CollectorConfig::default());
        assert_eq!(line, "2 samples: No GPU activity detected");
    }
}
