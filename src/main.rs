use arogya::config::AppConfig;
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

#[tokio::main]
async fn main() {
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    let _ = TermLogger::init(
        LevelFilter::Info,
        log_config,
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );

    let config = match AppConfig::from_defaults() {
        Ok(config) => config,
        Err(e) => {
            log::error!("[MAIN] configuration error: {}", e);
            std::process::exit(1);
        }
    };

    log::info!("[MAIN] starting portal on port {}", config.port);
    if let Err(e) = arogya::run(config).await {
        log::error!("[MAIN] server error: {}", e);
        std::process::exit(1);
    }
}
