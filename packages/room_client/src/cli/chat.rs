use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use room_client::connector::{SessionConnector, SessionPhase, SessionStatus};
use room_client::render::{LogCursor, format_entry, format_roster};
use room_client::state::ConversationState;

const HELP: &str = "\
commands:
  /facilitator on|off   enable or disable the AI facilitator
  /ai add NAME          invite an AI participant
  /ai remove NAME       remove an AI participant
  /who                  list participants and room settings
  /quit                 leave the room
anything else is sent as a chat message";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Say(String),
    Facilitator(bool),
    AddAi(String),
    RemoveAi(String),
    Who,
    Help,
    Quit,
    Unknown(String),
}

/// Parse a line typed at the prompt. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Option<ChatCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Some(ChatCommand::Say(line.to_string()));
    };

    let mut words = rest.split_whitespace();
    let command = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();
    let parsed = match (command, args.as_slice()) {
        ("quit" | "exit", []) => ChatCommand::Quit,
        ("who", []) => ChatCommand::Who,
        ("help", []) => ChatCommand::Help,
        ("facilitator", ["on"]) => ChatCommand::Facilitator(true),
        ("facilitator", ["off"]) => ChatCommand::Facilitator(false),
        ("ai", ["add", name @ ..]) if !name.is_empty() => ChatCommand::AddAi(name.join(" ")),
        ("ai", ["remove", name @ ..]) if !name.is_empty() => ChatCommand::RemoveAi(name.join(" ")),
        _ => ChatCommand::Unknown(line.to_string()),
    };
    Some(parsed)
}

/// Interactive loop: print the conversation as it changes and act on typed lines.
/// Returns when the user quits, stdin closes, or the session ends.
pub async fn run(connector: &SessionConnector, room: &str) -> Result<()> {
    let mut state_rx = connector.store().subscribe();
    let mut status_rx = connector.status();
    let mut cursor = LogCursor::default();

    println!("[roomchat: joined {room}; /help lists commands]");
    print_fresh(&mut cursor, &state_rx.borrow_and_update());
    // The session may already have ended before we subscribed.
    if let Some(reason) = session_over(&mut status_rx) {
        eprintln!("[roomchat: {reason}]");
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_line(&line) {
                    None => {}
                    Some(ChatCommand::Quit) => break,
                    Some(command) => handle(connector, room, command).await,
                }
            }

            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                print_fresh(&mut cursor, &state_rx.borrow_and_update());
            }

            changed = status_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(reason) = session_over(&mut status_rx) {
                    eprintln!("[roomchat: {reason}]");
                    break;
                }
            }

            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

async fn handle(connector: &SessionConnector, room: &str, command: ChatCommand) {
    let controls = connector.controls();
    let outcome: Result<Option<String>> = match command {
        ChatCommand::Say(text) => connector.send(&text).map(|()| None).map_err(Into::into),
        ChatCommand::Facilitator(enable) => controls
            .toggle_facilitator(room, enable)
            .await
            .map(|on| Some(format!("facilitator {}", if on { "on" } else { "off" })))
            .map_err(Into::into),
        ChatCommand::AddAi(name) => controls
            .add_ai_participant(room, &name)
            .await
            .map(|added| Some(format!("{added} joined the room")))
            .map_err(Into::into),
        ChatCommand::RemoveAi(name) => controls
            .remove_ai_participant(room, &name)
            .await
            .map(|removed| Some(format!("{removed} removed")))
            .map_err(Into::into),
        ChatCommand::Who => {
            for line in format_roster(&connector.store().snapshot()) {
                println!("{line}");
            }
            Ok(None)
        }
        ChatCommand::Help => Ok(Some(HELP.to_string())),
        ChatCommand::Unknown(line) => Err(anyhow::anyhow!("unknown command `{line}`; /help lists commands")),
        ChatCommand::Quit => Ok(None),
    };

    match outcome {
        Ok(Some(note)) => println!("[roomchat: {note}]"),
        Ok(None) => {}
        Err(e) => eprintln!("[roomchat: {e}]"),
    }
}

/// Why the session is over, if it is. Marks the current status as seen.
fn session_over(status_rx: &mut watch::Receiver<SessionStatus>) -> Option<String> {
    let status = status_rx.borrow_and_update();
    match status.phase {
        SessionPhase::Faulted => Some(
            status
                .error
                .clone()
                .unwrap_or_else(|| "session failed".to_string()),
        ),
        SessionPhase::Closed => Some("room closed".to_string()),
        _ => None,
    }
}

fn print_fresh(cursor: &mut LogCursor, state: &ConversationState) {
    for entry in cursor.advance(state.log()) {
        println!("{}", format_entry(entry, state.my_token()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_chat() {
        assert_eq!(parse_line("  hello room "), Some(ChatCommand::Say("hello room".into())));
        assert_eq!(parse_line("   "), None);
    }

    #[test]
    fn slash_commands() {
        assert_eq!(parse_line("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_line("/who"), Some(ChatCommand::Who));
        assert_eq!(parse_line("/facilitator on"), Some(ChatCommand::Facilitator(true)));
        assert_eq!(parse_line("/facilitator off"), Some(ChatCommand::Facilitator(false)));
        assert_eq!(parse_line("/ai add Sage"), Some(ChatCommand::AddAi("Sage".into())));
        assert_eq!(
            parse_line("/ai remove Deep Thought"),
            Some(ChatCommand::RemoveAi("Deep Thought".into()))
        );
    }

    #[test]
    fn fault_before_subscribing_still_ends_the_session() {
        let (tx, _rx) = watch::channel(SessionStatus::default());
        tx.send_replace(SessionStatus {
            phase: SessionPhase::Faulted,
            error: Some("connection rejected: token expired".into()),
        });

        // A late subscriber sees the fault as already seen.
        let mut late = tx.subscribe();
        assert!(!late.has_changed().unwrap());
        assert_eq!(
            session_over(&mut late).as_deref(),
            Some("connection rejected: token expired")
        );
    }

    #[test]
    fn only_terminal_phases_end_the_session() {
        let (tx, mut rx) = watch::channel(SessionStatus {
            phase: SessionPhase::Open,
            error: Some("not connected to a room".into()),
        });
        assert_eq!(session_over(&mut rx), None);

        tx.send_replace(SessionStatus {
            phase: SessionPhase::Closed,
            error: None,
        });
        assert_eq!(session_over(&mut rx).as_deref(), Some("room closed"));

        tx.send_replace(SessionStatus {
            phase: SessionPhase::Faulted,
            error: None,
        });
        assert_eq!(session_over(&mut rx).as_deref(), Some("session failed"));
    }

    #[test]
    fn malformed_commands_are_unknown() {
        assert_eq!(parse_line("/ai add"), Some(ChatCommand::Unknown("/ai add".into())));
        assert_eq!(
            parse_line("/facilitator maybe"),
            Some(ChatCommand::Unknown("/facilitator maybe".into()))
        );
        assert_eq!(parse_line("/dance"), Some(ChatCommand::Unknown("/dance".into())));
    }
}
