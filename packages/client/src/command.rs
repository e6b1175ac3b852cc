//! Line-oriented command parsing.
//!
//! | Input | Frame |
//! |---|---|
//! | `/join <chat>` | `join_chat` (and makes `<chat>` the current chat) |
//! | `/leave <chat>` | `leave_chat` |
//! | `/typing [chat]` / `/stop [chat]` | `typing` / `stop_typing` |
//! | `/ping` | `ping` with the current time |
//! | `/call <user>` | `video_call_invite` |
//! | `/accept <user>` / `/reject <user>` | `video_call_accept` / `video_call_reject` |
//! | `/hangup <user>` | `video_call_end` |
//! | `/online` | HTTP `GET /api/online` |
//! | `/quit` | end the session |
//! | anything else | `message` to the current chat |

use std::sync::Arc;

use gymates_hub_server::infrastructure::dto::websocket::{
    AnswerData, ClientFrame, InviteData, PeerData,
};
use gymates_hub_shared::time::Clock;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Send(ClientFrame),
    ListOnline,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("usage: /{command} <{argument}>")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("no current chat; use /join <chat> first")]
    NoCurrentChat,

    #[error("unknown command '/{0}'")]
    UnknownCommand(String),
}

pub struct CommandParser {
    clock: Arc<dyn Clock>,
    /// Chat that plain lines are sent to (the most recently joined one)
    current_chat: Option<String>,
}

impl CommandParser {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            current_chat: None,
        }
    }

    pub fn current_chat(&self) -> Option<&str> {
        self.current_chat.as_deref()
    }

    pub fn parse(&mut self, line: &str) -> Result<Command, CommandError> {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            let chat_id = self.chat_or_current(None)?;
            return Ok(Command::Send(ClientFrame::Message {
                chat_id,
                content: line.to_string(),
            }));
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let argument = parts.next();

        let frame = match name {
            "join" => {
                let chat_id = required(argument, "join", "chat")?;
                self.current_chat = Some(chat_id.clone());
                ClientFrame::JoinChat { chat_id }
            }
            "leave" => {
                let chat_id = required(argument, "leave", "chat")?;
                if self.current_chat.as_deref() == Some(chat_id.as_str()) {
                    self.current_chat = None;
                }
                ClientFrame::LeaveChat { chat_id }
            }
            "typing" => ClientFrame::Typing {
                chat_id: self.chat_or_current(argument)?,
                is_typing: true,
            },
            "stop" => ClientFrame::StopTyping {
                chat_id: self.chat_or_current(argument)?,
            },
            "ping" => ClientFrame::Ping {
                time: Value::from(self.clock.now_unix_secs()),
            },
            "call" => {
                let mut payload = Map::new();
                payload.insert("call_type".to_string(), Value::from("video"));
                ClientFrame::VideoCallInvite {
                    data: InviteData {
                        callee_id: required(argument, "call", "user")?,
                        payload,
                    },
                }
            }
            "accept" => ClientFrame::VideoCallAccept {
                data: AnswerData {
                    caller_id: required(argument, "accept", "user")?,
                    payload: Map::new(),
                },
            },
            "reject" => ClientFrame::VideoCallReject {
                data: AnswerData {
                    caller_id: required(argument, "reject", "user")?,
                    payload: Map::new(),
                },
            },
            "hangup" => ClientFrame::VideoCallEnd {
                data: PeerData {
                    other_user_id: required(argument, "hangup", "user")?,
                    payload: Map::new(),
                },
            },
            "online" => return Ok(Command::ListOnline),
            "quit" | "exit" => return Ok(Command::Quit),
            other => return Err(CommandError::UnknownCommand(other.to_string())),
        };
        Ok(Command::Send(frame))
    }

    fn chat_or_current(&self, argument: Option<&str>) -> Result<String, CommandError> {
        argument
            .map(str::to_string)
            .or_else(|| self.current_chat.clone())
            .ok_or(CommandError::NoCurrentChat)
    }
}

fn required(
    argument: Option<&str>,
    command: &'static str,
    name: &'static str,
) -> Result<String, CommandError> {
    argument
        .map(str::to_string)
        .ok_or(CommandError::MissingArgument {
            command,
            argument: name,
        })
}
