use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Local;
use log::{info, warn};

use brrrometer_core::{
    ActivityStore, Collector, CollectorConfig, DeviceConfig, Sampler, UtilizationSource,
    detect_source,
};

pub fn run(db_path: &Path, device: DeviceConfig, interval: &str) {
    let sample_interval = super::parse_duration(interval).unwrap_or_else(|e| super::fatal(e));
    let config = CollectorConfig {
        db_path: db_path.to_path_buf(),
        sample_interval,
        ..CollectorConfig::default()
    };

    let store: Arc<dyn ActivityStore> = Arc::new(super::open_store(&config.db_path));
    info!("Using database {}", config.db_path.display());

    let source: Arc<dyn UtilizationSource> = match detect_source(&device) {
        Some(source) => Arc::from(source),
        None => super::fatal(format!(
            "No usable GPU utilization source (device: {}, index: {})",
            device.kind, device.index
        )),
    };
    info!("Reading utilization from {}", source.info().description);

    let sampler = Sampler::new(source, config.sample_interval);
    let mut collector = Collector::new(config, sampler, store, Local::now());

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Could not install shutdown handler: {e}");
    }

    collector.run(&running);
}
