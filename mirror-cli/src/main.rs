use anyhow::Result;
use clap::Parser;
use mirror_avatar::AvatarSession;
use mirror_cli::cli::{Cli, Commands};
use mirror_cli::config::Config;
use mirror_cli::{audio, console, music};
use mirror_music::lyria::LyriaTransport;
use mirror_music::writer::GeminiPromptWriter;
use mirror_music::{MusicPlayer, MusicPlayerConfig};
use mirror_realtime::gemini::GeminiLiveTransport;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    mirror_telemetry::init_with_format("magic-mirror", cli.log_format.into())
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    let config = Config::load(cli.config.as_deref(), cli.language.as_deref(), cli.model.as_deref())?;

    let player = MusicPlayer::with_config(
        Arc::new(LyriaTransport::new(config.api_key.clone())),
        audio::open_output("music")?,
        MusicPlayerConfig {
            prompt_model: config.app.music.prompt_model.clone(),
            ..Default::default()
        },
        Some(Arc::new(GeminiPromptWriter::new(config.api_key.clone())?)),
    );

    match cli.command {
        Commands::Console => {
            let session = AvatarSession::builder(
                config.app,
                Arc::new(GeminiLiveTransport::new(config.api_key)),
                audio::open_output("speech")?,
            )
            .with_music(player)
            .build();
            console::run_console(Arc::new(session)).await
        }
        Commands::Music { prompt, volume } => {
            music::run_music(player, &prompt.join(" "), volume).await
        }
    }
}
