use anyhow::Context;
use funnel_agent::api::{AppState, routes};
use funnel_agent::config::{AppConfig, load_dotenv};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    load_dotenv();
    let config = AppConfig::from_env()?;
    let state = AppState::from_config(&config)?;

    eprintln!("📈 Funnel Agent v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Data dir: {}", config.data_dir.display());
    eprintln!(
        "   Reply model: {}",
        state.replies.model_name().unwrap_or("(fallback template)")
    );
    eprintln!(
        "   WhatsApp: {}",
        if config.zapi.is_configured() { "Z-API" } else { "disabled" }
    );
    eprintln!(
        "   CRM: {}",
        config
            .crm
            .as_ref()
            .map_or("local log (crm_sync.jsonl)", |c| c.base_url.as_str())
    );

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    eprintln!("   Listening: http://{}\n", addr);

    axum::serve(listener, routes(state)).await?;
    Ok(())
}
