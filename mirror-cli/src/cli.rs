use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mirror")]
#[command(about = "Magic Mirror live avatar", long_about = None)]
pub struct Cli {
    /// App config (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Language preset: french or english
    #[arg(short, long, global = true)]
    pub language: Option<String>,

    /// Live model override
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogStyle::Pretty)]
    pub log_format: LogStyle,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Talk to the mirror by typing; it answers by voice
    Console,

    /// Play generated music until Enter is pressed
    Music {
        /// What to play
        #[arg(required = true)]
        prompt: Vec<String>,

        /// Music volume, 0.0 to 1.0
        #[arg(long, default_value_t = 0.5)]
        volume: f32,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStyle {
    Pretty,
    Json,
}

impl From<LogStyle> for mirror_telemetry::LogFormat {
    fn from(style: LogStyle) -> Self {
        match style {
            LogStyle::Pretty => Self::Pretty,
            LogStyle::Json => Self::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_with_global_flags() {
        let cli = Cli::try_parse_from(["mirror", "console", "--language", "french", "-m", "m1"])
            .unwrap();
        assert_eq!(cli.command, Commands::Console);
        assert_eq!(cli.language.as_deref(), Some("french"));
        assert_eq!(cli.model.as_deref(), Some("m1"));
        assert_eq!(cli.log_format, LogStyle::Pretty);
    }

    #[test]
    fn test_music_prompt_words() {
        let cli = Cli::try_parse_from(["mirror", "music", "slow", "piano", "--volume", "0.2"])
            .unwrap();
        assert_eq!(
            cli.command,
            Commands::Music { prompt: vec!["slow".into(), "piano".into()], volume: 0.2 }
        );
    }

    #[test]
    fn test_music_needs_prompt() {
        assert!(Cli::try_parse_from(["mirror", "music"]).is_err());
    }
}
