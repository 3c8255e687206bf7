use std::path::Path;
use std::sync::Arc;

use brrrometer_core::ActivityStore;
use brrrometer_server::{SVG_PATH, ServerConfig};

pub fn run(db_path: &Path, host: String, port: u16, cache_max_age: u32) {
    let store: Arc<dyn ActivityStore> = Arc::new(super::open_store(db_path));
    let config = ServerConfig {
        host,
        port,
        cache_max_age,
        ..ServerConfig::default()
    };

    let base = format!("http://{}:{}", config.host, config.port);
    println!("gpu-brrrometer heatmap server v{}", brrrometer_core::VERSION);
    println!("   {base}");
    println!("   database: {}", db_path.display());
    println!();
    println!("   Endpoints:");
    println!("     GET /                   API index");
    println!("     GET {SVG_PATH}     Activity heatmap (SVG)");
    println!("     GET /health             Database health check");
    println!();
    println!("   Query params for {SVG_PATH}:");
    println!("     theme=light|dark        Color scheme (default: light)");
    println!("     weeks=N                 Weeks of history to load (default: 53)");
    println!();
    println!("   Embed in a README:");
    println!("     ![GPU activity]({base}{SVG_PATH}?theme=dark)");
    println!();

    let rt = tokio::runtime::Runtime::new()
        .unwrap_or_else(|e| super::fatal(format!("Cannot start async runtime: {e}")));
    if let Err(e) = rt.block_on(brrrometer_server::run_server(store, config)) {
        super::fatal(format!("Server error: {e}"));
    }
}
