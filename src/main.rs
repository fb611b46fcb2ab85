use apex_relay::config::{AgentIdentity, RelayConfig};
use apex_relay::server::build_app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = RelayConfig::from_env();

    eprintln!("🛰  Apex relay v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Workers: {}", config.workers_file.display());
    if let Some(email) = AgentIdentity::load(&config.config_file).email {
        eprintln!("   Agent: {}", email);
    }
    match &config.coordinator_endpoint {
        Some(url) => eprintln!("   Coordinator: {}", url),
        None => eprintln!("   Coordinator: none"),
    }
    if config.log_events {
        eprintln!("   Event dump: {}", config.event_dump_file.display());
    }
    if !config.verification_enabled() {
        tracing::warn!("LINEAR_WEBHOOK_SECRET not set, webhook signatures are NOT verified");
    }

    let app = build_app(&config)?;

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, "Apex relay listening");
    eprintln!("   POST http://0.0.0.0:{}/linear", config.port);
    eprintln!("   GET  http://0.0.0.0:{}/health\n", config.port);

    axum::serve(listener, app).await?;
    Ok(())
}
