//! JSON messages exchanged over the chat WebSocket.
//!
//! Every message is an object with a `Type` discriminator. Server-sent
//! messages additionally carry a floating-point `Time` field stamped at send.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message received from a client, routed by `Type`.
///
/// Unrecognised types land in `Unknown` and are dropped by the dispatcher.
/// Missing fields decode as their zero values.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "Type")]
pub enum ClientMessage {
    SetNickName {
        #[serde(rename = "NickName", default)]
        nickname: String,
    },
    Tell {
        #[serde(rename = "Tell", default)]
        tell: String,
    },
    GetNickNames,
    GetAvailableNickNames,
    GetUsers,
    #[serde(other)]
    Unknown,
}

/// One entry in the `Users` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntry {
    #[serde(rename = "Nickname")]
    pub nickname: String,
    #[serde(rename = "Points")]
    pub points: i64,
}

/// Message produced by the room engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "Type")]
pub enum ServerMessage {
    AvailableNickNames {
        #[serde(rename = "AvailableNickNames")]
        available_nicknames: Vec<String>,
    },
    NickNames {
        #[serde(rename = "NickNames")]
        nicknames: Vec<String>,
    },
    Users {
        #[serde(rename = "Users")]
        users: Vec<UserEntry>,
    },
    SetNickNameResult {
        #[serde(rename = "Success")]
        success: bool,
    },
    Join {
        #[serde(rename = "NickName")]
        nickname: String,
    },
    Leave {
        #[serde(rename = "NickName")]
        nickname: String,
    },
    Tell {
        #[serde(rename = "Sender")]
        sender: String,
        #[serde(rename = "Tell")]
        tell: String,
    },
    Award {
        #[serde(rename = "Subject")]
        subject: String,
        #[serde(rename = "Award")]
        award: i64,
        #[serde(rename = "Points")]
        points: i64,
    },
    Penalty {
        #[serde(rename = "Subject")]
        subject: String,
        #[serde(rename = "Penalty")]
        penalty: i64,
        #[serde(rename = "Points")]
        points: i64,
    },
}

impl ServerMessage {
    /// Encode to the wire format, stamping the `Time` field.
    pub fn encode(&self, time: f64) -> String {
        let mut value = serde_json::to_value(self).expect("server message serializes to an object");
        if let Value::Object(fields) = &mut value {
            fields.insert("Time".to_string(), time.into());
        }
        value.to_string()
    }
}
