use anyhow::Result;
use async_trait::async_trait;
use mirror_avatar::AvatarSession;
use mirror_realtime::{LiveEventListener, ToolCall};
use rustyline::DefaultEditor;
use std::sync::Arc;

/// What a console line asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Say(String),
    Music(String),
    StopMusic,
    Volume(f32),
    Clear,
    Image,
    Restart,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Self::Say(line.to_string());
        };
        let (name, rest) = command.split_once(' ').unwrap_or((command, ""));
        let rest = rest.trim();
        match name {
            "music" if rest.is_empty() => Self::Unknown("/music needs a prompt".into()),
            "music" => Self::Music(rest.to_string()),
            "stop" => Self::StopMusic,
            "volume" => match rest.parse() {
                Ok(level) => Self::Volume(level),
                Err(_) => Self::Unknown(format!("not a volume: {}", rest)),
            },
            "clear" => Self::Clear,
            "image" => Self::Image,
            "restart" => Self::Restart,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => Self::Unknown(format!("unknown command /{}", other)),
        }
    }
}

const HELP: &str = "\
  <text>           say something to the mirror
  /music <prompt>  play music
  /stop            stop the music
  /volume <0..1>   music volume
  /clear           clear the images
  /image           show the current image size
  /restart         reconnect
  /quit            leave";

/// Prints what the mirror says and does.
struct ConsolePrinter;

#[async_trait]
impl LiveEventListener for ConsolePrinter {
    async fn on_text(&self, text: &str) -> mirror_realtime::Result<()> {
        println!("Mirror -> {}", text);
        Ok(())
    }

    async fn on_tool_call(&self, call: &ToolCall) -> mirror_realtime::Result<()> {
        for function in &call.function_calls {
            println!("  [{} {}]", function.name, function.args);
        }
        Ok(())
    }

    async fn on_close(&self, reason: Option<&str>) -> mirror_realtime::Result<()> {
        println!("  [session closed: {}]", reason.unwrap_or("no reason"));
        Ok(())
    }

    async fn on_error(&self, message: &str) -> mirror_realtime::Result<()> {
        eprintln!("  [error: {}]", message);
        Ok(())
    }
}

/// Interactive console: typed lines become user turns, speech plays on the
/// speech output.
pub async fn run_console(session: Arc<AvatarSession>) -> Result<()> {
    let printer = session.client().subscribe(Arc::new(ConsolePrinter));
    let connected = session.auto_start().await?;

    let mut rl = DefaultEditor::new()?;

    println!("Magic Mirror");
    println!("Model: {}  Language: {}", session.config().live_model, session.config().language_code);
    if !connected {
        println!("Not connected yet; your first message connects.");
    }
    println!("Type your message and press Enter. /help for commands, Ctrl+C to exit.\n");

    loop {
        let readline = tokio::task::block_in_place(|| rl.readline("You -> "));
        let line = match readline {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("Interrupted");
                break;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("EOF");
                break;
            }
            Err(err) => {
                eprintln!("Error: {}", err);
                break;
            }
        };

        let command = ConsoleCommand::parse(&line);
        if command != ConsoleCommand::Empty {
            rl.add_history_entry(&line)?;
        }

        let result: Result<()> = match command {
            ConsoleCommand::Empty => Ok(()),
            ConsoleCommand::Quit => break,
            ConsoleCommand::Help => {
                println!("{}", HELP);
                Ok(())
            }
            ConsoleCommand::Unknown(message) => {
                eprintln!("{}", message);
                Ok(())
            }
            ConsoleCommand::Say(text) => match session.ensure_connected().await {
                Ok(()) => session.client().send_text(text).await.map_err(Into::into),
                Err(e) => Err(e.into()),
            },
            ConsoleCommand::Music(prompt) => match session.music() {
                Some(music) => music.play_request(&prompt).await.map_err(Into::into),
                None => Ok(()),
            },
            ConsoleCommand::StopMusic => match session.music() {
                Some(music) => music.stop().await.map_err(Into::into),
                None => Ok(()),
            },
            ConsoleCommand::Volume(level) => match session.music() {
                Some(music) => music.set_volume(level).map_err(Into::into),
                None => Ok(()),
            },
            ConsoleCommand::Clear => {
                session.board().clear();
                Ok(())
            }
            ConsoleCommand::Image => {
                match session.board().displayed() {
                    Some(url) => println!("  [image: {} bytes]", url.len()),
                    None => println!("  [no image]"),
                }
                Ok(())
            }
            ConsoleCommand::Restart => session.restart().await.map_err(Into::into),
        };

        if let Err(e) = result {
            eprintln!("Error: {}", e);
        }
    }

    session.client().unsubscribe(printer);
    session.disconnect().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(ConsoleCommand::parse("  hello mirror "), ConsoleCommand::Say("hello mirror".into()));
        assert_eq!(ConsoleCommand::parse(""), ConsoleCommand::Empty);
        assert_eq!(ConsoleCommand::parse("/music sea shanty"), ConsoleCommand::Music("sea shanty".into()));
        assert_eq!(ConsoleCommand::parse("/volume 0.3"), ConsoleCommand::Volume(0.3));
        assert_eq!(ConsoleCommand::parse("/exit"), ConsoleCommand::Quit);
        assert!(matches!(ConsoleCommand::parse("/music"), ConsoleCommand::Unknown(_)));
        assert!(matches!(ConsoleCommand::parse("/volume loud"), ConsoleCommand::Unknown(_)));
        assert!(matches!(ConsoleCommand::parse("/dance"), ConsoleCommand::Unknown(_)));
    }
}
