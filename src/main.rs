use std::sync::Arc;

use registry_gateway::modules;
use registry_gateway::proxy;

#[tokio::main]
async fn main() -> Result<(), String> {
    modules::logger::init_logger();

    let mut config = match modules::config::load_config() {
        Ok(cfg) => cfg,
        Err(err) => {
            tracing::warn!("failed to load gateway config: {}. using defaults", err);
            let cfg = proxy::GatewayConfig::default();
            let _ = modules::config::save_config(&cfg);
            cfg
        }
    };

    if let Ok(value) = std::env::var("GATEWAY_DEBUG") {
        let enabled = matches!(value.as_str(), "1" | "true" | "yes" | "on");
        if enabled {
            config.debug = true;
        }
    }

    if let Ok(value) = std::env::var("GATEWAY_TARGET_UPSTREAM") {
        if !value.is_empty() {
            config.target_upstream = value;
        }
    }

    if let Ok(value) = std::env::var("GATEWAY_PORT") {
        match value.parse::<u16>() {
            Ok(port) => config.port = port,
            Err(_) => tracing::warn!("ignoring invalid GATEWAY_PORT value: {}", value),
        }
    }

    let bind_address = if let Ok(addr) = std::env::var("GATEWAY_BIND") {
        if addr != "127.0.0.1" && addr != "localhost" {
            config.allow_lan_access = true;
        }
        addr
    } else {
        config.get_bind_address().to_string()
    };

    if config.routes.is_empty() && !config.debug {
        tracing::warn!("route table is empty; every request will answer with the 404 listing");
    }

    let table = Arc::new(proxy::RouteTable::new(&config));
    let upstream = Arc::new(proxy::UpstreamClient::new(&config));

    tracing::info!(
        "serving {} registry route(s){}",
        config.routes.len(),
        if config.debug { " with debug fallback" } else { "" }
    );

    let (server, handle) =
        proxy::AxumServer::start(bind_address.clone(), config.port, table, upstream)
            .await
            .map_err(|e| format!("failed to start gateway server: {}", e))?;

    tracing::info!(
        "registry gateway listening on http://{}:{}",
        bind_address,
        config.port
    );

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("failed to listen for shutdown signal: {}", e))?;

    tracing::info!("shutdown requested, stopping server...");
    server.stop();
    let _ = handle.await;

    Ok(())
}
