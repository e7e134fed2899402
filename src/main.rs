use anyhow::Result;
use clap::Parser;
use speakroom::{create_router, AppState, Config, QuestionBank};
use tracing::info;

#[derive(Parser)]
#[command(name = "speakroom", about = "IELTS speaking room service")]
struct Cli {
    /// Config file (without extension), resolved by the config loader.
    #[arg(long, default_value = "config/speakroom")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("Recordings directory: {}", cfg.audio.recordings_path);

    let bank = QuestionBank::load(&cfg.questions.bank_path)?;

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let state = AppState::new(cfg, bank);
    let app = create_router(state);

    info!("HTTP server listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
