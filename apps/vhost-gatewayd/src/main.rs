mod cli;
mod config;
mod settings;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use vhost_gateway::{Gateway, GatewayOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let (options, matches) = cli::parse();
    let file_config = match &options.config {
        Some(path) => config::load(path)?,
        None => config::Config::default(),
    };
    let settings = settings::resolve(options, &matches, file_config)?;

    let gateway = Gateway::listen(
        settings.gateway_address.as_str(),
        GatewayOptions {
            timeout: Some(settings.timeout),
            hosts: settings.hosts,
        },
    )
    .await?;
    tracing::info!(addr = %settings.gateway_address, domain = %settings.domain_name, "gateway listening");

    let api_listener = TcpListener::bind(settings.api_address.as_str()).await?;
    tracing::info!(addr = %settings.api_address, "control-plane api listening");
    let api_router = vhost_api::build_router(gateway.clone(), settings.domain_name.clone());

    let api_gateway = gateway.clone();
    tokio::select! {
        result = axum::serve(api_listener, api_router) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "control-plane api server exited");
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    if let Err(e) = api_gateway.close().await {
        tracing::warn!(error = %e, "gateway close reported an error");
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}
