use anyhow::Result;
use mirror_music::MusicPlayer;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Play `prompt` until Enter (or end of input), then stop.
pub async fn run_music(player: MusicPlayer, prompt: &str, volume: f32) -> Result<()> {
    player.set_volume(volume)?;
    player.play_request(prompt).await?;
    println!("Playing \"{}\". Press Enter to stop.", prompt);

    let mut line = String::new();
    let mut stdin = BufReader::new(tokio::io::stdin());
    tokio::select! {
        read = stdin.read_line(&mut line) => {
            read?;
        }
        _ = tokio::signal::ctrl_c() => println!(),
    }

    player.stop().await?;
    player.disconnect().await?;
    Ok(())
}
