use clap::Parser;
use common::config::{Cli, ServiceConfig};
use common::logger::Log;
use common::probe::{LoadGenerator, REQUEST_TIMEOUT};
use std::sync::Arc;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    let log = Arc::new(Log::new(cli.log_format(), cli.log_level()));

    let config = match ServiceConfig::new() {
        Ok(config) => config,
        Err(e) => log.fatal(format_args!("Failed to load configuration: {}", e)),
    };

    let interval_text = config.interval_text().to_string();
    let settings = match config.into_settings() {
        Ok(settings) => settings,
        Err(e) => log.fatal(format_args!("Failed to parse interval: {}", e)),
    };

    log.info(format_args!(
        "Generating load on URL: {} every {}",
        settings.url, interval_text
    ));
    log.debug(format_args!(
        "Request timeout {:?}, TLS verification disabled",
        REQUEST_TIMEOUT
    ));

    let generator = match LoadGenerator::new(settings, log.clone()) {
        Ok(generator) => generator,
        Err(e) => log.fatal(e),
    };

    generator.run().await;
}
