//! CLI for gpu-brrrometer: how hard did your GPU work today?

mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use brrrometer_core::config::DEFAULT_DB_PATH;
use brrrometer_core::{DeviceConfig, DeviceKind};

#[derive(Parser)]
#[command(name = "gpu-brrrometer")]
#[command(about = "gpu-brrrometer: track daily GPU activity and serve it as a heatmap")]
#[command(version = brrrometer_core::VERSION)]
struct Cli {
    /// Path to the activity database
    #[arg(long, global = true, env = "BRRROMETER_DB", default_value = DEFAULT_DB_PATH)]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DeviceArgs {
    /// Device backend: auto, nvidia or sysfs
    #[arg(long, default_value = "auto")]
    device: DeviceKind,

    /// Zero-based GPU / DRM card index
    #[arg(long, default_value_t = 0)]
    index: u32,
}

impl From<DeviceArgs> for DeviceConfig {
    fn from(args: DeviceArgs) -> Self {
        DeviceConfig {
            kind: args.device,
            index: args.index,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the collector: sample the GPU and persist daily activity until stopped
    Collect {
        #[command(flatten)]
        device: DeviceArgs,

        /// Sampling interval (e.g. "5s", "500ms")
        #[arg(long, default_value = "5s")]
        interval: String,
    },

    /// Sample the GPU for a while and report what would be recorded, without writing
    DryRun {
        #[command(flatten)]
        device: DeviceArgs,

        /// How long to sample (e.g. "60s", "2m")
        #[arg(long, default_value = "60s")]
        duration: String,
    },

    /// Print every stored daily record, newest first
    ShowDb,

    /// List utilization sources and whether they work on this machine
    Sources {
        /// Zero-based GPU / DRM card index
        #[arg(long, default_value_t = 0)]
        index: u32,
    },

    /// Serve the activity heatmap over HTTP
    Server {
        /// Bind address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port
        #[arg(long, default_value = "8000")]
        port: u16,

        /// Cache lifetime for successful heatmap responses, in seconds
        #[arg(long, default_value = "1800")]
        cache_max_age: u32,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Collect { device, interval } => {
            commands::collect::run(&cli.db, device.into(), &interval)
        }
        Commands::DryRun { device, duration } => commands::dry_run::run(device.into(), &duration),
        Commands::ShowDb => commands::show_db::run(&cli.db),
        Commands::Sources { index } => commands::sources::run(index),
        Commands::Server {
            host,
            port,
            cache_max_age,
        } => commands::server::run(&cli.db, host, port, cache_max_age),
    }
}
