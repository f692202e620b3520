use glint_logger::log;
use glint_logger::LogSeverity::{Fatal, Info};
use glint_server::config::{ServerConfig, DEFAULT_CONFIG_PATH};
use glint_server::server;
use std::path::PathBuf;

#[tokio::main]
async fn main() {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let config = match ServerConfig::load(&path) {
        Ok(config) => config,
        Err(e) => {
            log(format!("{}", e), Fatal);
            std::process::exit(1);
        }
    };
    if let Ok(severity) = config.log_severity() {
        glint_logger::init(severity);
    }

    log(
        format!("Glint init ({}, online mode: {})", path.display(), config.online_mode),
        Info,
    );
    if let Err(e) = server::run(config).await {
        log(format!("Server stopped: {}", e), Fatal);
        std::process::exit(1);
    }
}
