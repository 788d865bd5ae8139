//! Buttonburgh narrative director - dispatch one chapter event from the command line.
//!
//! Usage: `buttonburgh-director <snapshot.json> [trigger-reason]`

use std::path::PathBuf;

use anyhow::Context;
use buttonburgh_domain::PlayerNarrativeSnapshot;
use buttonburgh_engine::{infrastructure::config::DirectorConfig, App};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "buttonburgh_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut args = std::env::args().skip(1);
    let snapshot_path = args
        .next()
        .map(PathBuf::from)
        .context("usage: buttonburgh-director <snapshot.json> [trigger-reason]")?;
    let trigger_reason = args.next();

    let text = std::fs::read_to_string(&snapshot_path)
        .with_context(|| format!("reading snapshot {}", snapshot_path.display()))?;
    let snapshot: PlayerNarrativeSnapshot = serde_json::from_str(&text)
        .with_context(|| format!("parsing snapshot {}", snapshot_path.display()))?;

    let config = DirectorConfig::from_env()?;
    let app = App::new(config)?;

    tracing::info!(
        player_id = %snapshot.player_id,
        mode = %app.default_mode(),
        "Dispatching from command line"
    );

    let event = app
        .generate_chapter_event(snapshot, trigger_reason, None)
        .await?;
    println!("{}", serde_json::to_string_pretty(&event)?);

    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
