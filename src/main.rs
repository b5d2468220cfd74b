use std::io;
use std::time::Duration;

use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::{error, info};

use yt_gateway::config_loader;
use yt_gateway::config_validator::GatewayConfigValidator;
use yt_gateway::metrics::create_metrics_exporter;
use yt_gateway::{configure_routes, ApiKeyGate, AppContext, GatewayConfig, Metrics, Upstreams};

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    if std::env::args().any(|arg| arg == "--sample-config") {
        print!("{}", GatewayConfigValidator::generate_sample_config());
        return Ok(());
    }

    // Config file values only fill variables the environment leaves unset
    config_loader::load_config();
    if let Err(results) = GatewayConfigValidator::validate() {
        error!(
            "Refusing to start with {} configuration error(s)",
            results.errors.len()
        );
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "invalid configuration",
        ));
    }
    let config = GatewayConfig::default();

    // Initialize metrics
    let exporter = create_metrics_exporter(
        &config.metrics.backend,
        config.metrics.namespace.as_deref(),
    )
    .map_err(io::Error::other)?;
    let metrics = Metrics::new(exporter);

    let upstreams = Upstreams::from_config(&config.youtube).map_err(io::Error::other)?;
    let mut context =
        AppContext::new(config.keep_alive.clone(), metrics.clone()).map_err(io::Error::other)?;

    let (host, port) = config.server.bind_address();
    info!("Starting YouTube gateway on http://{}:{}", host, port);
    info!("API key header: {}", config.auth.header_name);
    info!("YouTube Data API: {}", config.youtube.api_base_url);
    info!("Upstream timeout: {}s", config.youtube.upstream_timeout);
    info!("Metrics exporter: {}", config.metrics.backend);

    let auth = config.auth.clone();
    let mut server = HttpServer::new(move || {
        App::new()
            .wrap(ApiKeyGate::new(auth.clone(), metrics.clone()))
            .wrap(Logger::default())
            .app_data(web::Data::new(upstreams.clone()))
            .app_data(web::Data::new(metrics.clone()))
            .configure(configure_routes)
    })
    .bind((host, port))?
    .client_disconnect_timeout(Duration::from_secs(config.server.timeout))
    .keep_alive(Duration::from_secs(config.server.keepalive));

    if config.server.workers > 0 {
        server = server.workers(config.server.workers);
    }

    // The listener is bound, so self-pings can reach it
    let server = server.run();
    context.start();

    let result = server.await;

    info!("HTTP server stopped, shutting down keep-alive task");
    if let Err(e) = context.shutdown().await {
        error!("Keep-alive task did not stop cleanly: {}", e);
        result?;
        return Err(io::Error::other(e));
    }

    result
}
