//! Line-oriented command interpreter.
//!
//! Everything here is a thin surface over the engine's accessors and
//! broadcast methods; no protocol state lives in this module. Anything
//! typed without a `/` prefix is treated as a quick clip.

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::infrastructure::transport::SharedEngine;

/// A parsed user command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Broadcast clipboard text, optionally tagged with a label.
    Clip { payload: String, label: String },
    /// Set and broadcast the local status.
    Status(String),
    /// Set the local display name.
    Alias(String),
    /// List connected peers.
    Peers,
    /// Show the received-clip history, newest first.
    History,
    /// Re-announce the local INFO to all peers.
    Ping,
    Help,
    Exit,
    /// Unrecognized `/command`.
    Unknown(String),
    /// A recognized command used without its required argument.
    Usage(&'static str),
}

/// Parses one input line. Returns `None` for blank input.
pub fn parse_command(line: &str) -> Option<Command> {
    let raw = line.trim();
    if raw.is_empty() {
        return None;
    }

    // Quick clip: anything without a / prefix.
    let Some(rest) = raw.strip_prefix('/') else {
        return Some(Command::Clip {
            payload: raw.to_string(),
            label: String::new(),
        });
    };

    let (cmd, rest) = match rest.split_once(' ') {
        Some((cmd, rest)) => (cmd, rest.trim()),
        None => (rest, ""),
    };

    Some(match cmd.to_ascii_lowercase().as_str() {
        "clip" => {
            if let Some(after) = rest.strip_prefix("-l ") {
                match after.trim_start().split_once(' ') {
                    Some((label, payload)) => Command::Clip {
                        payload: payload.to_string(),
                        label: label.to_string(),
                    },
                    None => Command::Usage("usage: /clip -l <label> <text>"),
                }
            } else if rest.is_empty() {
                Command::Usage("usage: /clip [-l <label>] <text>")
            } else {
                Command::Clip {
                    payload: rest.to_string(),
                    label: String::new(),
                }
            }
        }
        "status" => {
            if rest.is_empty() {
                Command::Usage("usage: /status <text>")
            } else {
                Command::Status(rest.to_string())
            }
        }
        "alias" => {
            if rest.is_empty() {
                Command::Usage("usage: /alias <name>")
            } else {
                Command::Alias(rest.to_string())
            }
        }
        "peers" => Command::Peers,
        "history" => Command::History,
        "ping" => Command::Ping,
        "help" => Command::Help,
        "exit" | "quit" => Command::Exit,
        other => Command::Unknown(other.to_string()),
    })
}

const HELP_TEXT: &str = "\
commands:
  /clip <text>             broadcast clipboard text to all peers
  /clip -l <label> <text>  broadcast with a label tag
  /status <text>           set & broadcast your status
  /alias <name>            set your display name
  /peers                   list connected peers
  /history                 show the last received clips
  /ping                    re-announce your INFO to all peers
  /help                    show this menu
  /exit                    quit

  anything without a / prefix is also treated as a quick clip.";

/// Reads commands from stdin until `/exit` or end of input.
pub async fn run(engine: SharedEngine) {
    use std::io::Write as _;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print!("> ");
    let _ = std::io::stdout().flush();

    while let Ok(Some(line)) = lines.next_line().await {
        if let Some(command) = parse_command(&line) {
            debug!("command: {command:?}");
            if !execute(&engine, command).await {
                break;
            }
        }
        print!("> ");
        let _ = std::io::stdout().flush();
    }
}

/// Executes one command. Returns `false` when the loop should stop.
async fn execute(engine: &SharedEngine, command: Command) -> bool {
    match command {
        Command::Clip { payload, label } => {
            match engine.lock().await.broadcast_clip(&payload, &label) {
                Ok(sent) => println!("clip broadcast to {sent} peer(s)"),
                Err(e) => println!("error: {e}"),
            }
        }
        Command::Status(status) => match engine.lock().await.broadcast_status(&status) {
            Ok(sent) => println!("status set; notified {sent} peer(s)"),
            Err(e) => println!("error: {e}"),
        },
        Command::Alias(name) => {
            let mut engine = engine.lock().await;
            let alias = engine.set_alias(&name);
            println!("alias set to \"{alias}\"");
        }
        Command::Peers => {
            let peers = engine.lock().await.peers();
            if peers.is_empty() {
                println!("no peers connected yet");
            } else {
                println!("connected peers:");
                for peer in peers {
                    println!(
                        "  {}  alias={}  status={}",
                        peer.id.short(),
                        peer.alias,
                        peer.status
                    );
                }
            }
        }
        Command::History => {
            let history = engine.lock().await.history();
            if history.is_empty() {
                println!("no clips received yet");
            } else {
                println!("clip history (newest first):");
                for (i, clip) in history.iter().enumerate() {
                    let label = if clip.label.is_empty() {
                        String::new()
                    } else {
                        format!(" ({})", clip.label)
                    };
                    println!(
                        "  {}. [{}] {}{}: {}",
                        i + 1,
                        clock_utc(clip.received_at_secs),
                        clip.from,
                        label,
                        preview(&clip.payload)
                    );
                }
            }
        }
        Command::Ping => {
            let sent = engine.lock().await.announce();
            println!("re-announced to {sent} peer(s)");
        }
        Command::Help => println!("{HELP_TEXT}"),
        Command::Exit => {
            println!("shutting down…");
            return false;
        }
        Command::Unknown(cmd) => println!("unknown command: /{cmd} (try /help)"),
        Command::Usage(usage) => println!("{usage}"),
    }
    true
}

/// UTC wall-clock `hh:mm:ss` for a Unix timestamp.
fn clock_utc(epoch_secs: u64) -> String {
    let secs = epoch_secs % 86_400;
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// First line of `payload`, clamped for display.
fn preview(payload: &str) -> String {
    let first = payload.lines().next().unwrap_or("");
    let mut out: String = first.chars().take(120).collect();
    if out.len() < payload.len() {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_text_is_a_quick_clip() {
        assert_eq!(
            parse_command("hello world"),
            Some(Command::Clip {
                payload: "hello world".to_string(),
                label: String::new(),
            })
        );
    }

    #[test]
    fn test_blank_input_is_ignored() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("   \t"), None);
    }

    #[test]
    fn test_clip_with_label() {
        assert_eq!(
            parse_command("/clip -l cmd ls -la"),
            Some(Command::Clip {
                payload: "ls -la".to_string(),
                label: "cmd".to_string(),
            })
        );
    }

    #[test]
    fn test_clip_label_without_text_is_usage_error() {
        assert_eq!(
            parse_command("/clip -l onlylabel"),
            Some(Command::Usage("usage: /clip -l <label> <text>"))
        );
    }

    #[test]
    fn test_status_requires_argument() {
        assert_eq!(
            parse_command("/status"),
            Some(Command::Usage("usage: /status <text>"))
        );
        assert_eq!(
            parse_command("/status in a meeting"),
            Some(Command::Status("in a meeting".to_string()))
        );
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse_command("/peers"), Some(Command::Peers));
        assert_eq!(parse_command("/history"), Some(Command::History));
        assert_eq!(parse_command("/ping"), Some(Command::Ping));
        assert_eq!(parse_command("/help"), Some(Command::Help));
        assert_eq!(parse_command("/exit"), Some(Command::Exit));
        assert_eq!(parse_command("/quit"), Some(Command::Exit));
    }

    #[test]
    fn test_commands_are_case_insensitive() {
        assert_eq!(parse_command("/PEERS"), Some(Command::Peers));
        assert_eq!(
            parse_command("/Alias Bob"),
            Some(Command::Alias("Bob".to_string()))
        );
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            parse_command("/teleport home"),
            Some(Command::Unknown("teleport".to_string()))
        );
    }

    #[test]
    fn test_clock_utc_formats_correctly() {
        assert_eq!(clock_utc(0), "00:00:00");
        assert_eq!(clock_utc(86_399), "23:59:59");
        assert_eq!(clock_utc(86_400 + 3_661), "01:01:01");
    }

    #[test]
    fn test_preview_clamps_long_payloads() {
        let long = "a".repeat(300);
        let p = preview(&long);
        assert!(p.chars().count() <= 121);
        assert!(p.ends_with('…'));
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn test_preview_shows_only_first_line() {
        assert_eq!(preview("one\ntwo"), "one…");
    }
}
