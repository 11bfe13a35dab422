//! Plugin entry contract of the chat room engine.
//!
//! `load` parses the configuration, starts the room worker and hands back a
//! [`ChatRoom`] whose router serves the configured resource path. Dropping
//! the engine goes through [`ChatRoom::unload`], which stops the worker and
//! tears every session down; a later `load` in the same process starts from
//! a clean room.

use std::sync::Arc;

use axum::Router;
use axum::routing::any;
use serde_json::Value;

use crate::common::diagnostics::{DiagnosticsSink, levels};
use crate::common::time::Clock;
use crate::config::{ConfigError, RoomConfig};
use crate::room::Room;
use crate::ui::handler::chat_room_handler;

/// A loaded chat room engine.
pub struct ChatRoom {
    room: Arc<Room>,
    worker: tokio::task::JoinHandle<()>,
    space: String,
}

/// Load the chat room plugin.
///
/// Configuration errors are reported through the diagnostics sink under the
/// empty sender and fail the load; nothing is registered in that case.
pub async fn load(
    configuration: &Value,
    clock: Arc<dyn Clock>,
    diagnostics: Arc<dyn DiagnosticsSink>,
) -> Result<ChatRoom, ConfigError> {
    let config = match RoomConfig::from_value(configuration) {
        Ok(config) => config,
        Err(error) => {
            diagnostics.diagnostic("", levels::ERROR, &error.to_string());
            return Err(error);
        }
    };
    let room = Arc::new(Room::new(&config, clock, diagnostics));
    let worker = Arc::clone(&room).start().await;
    Ok(ChatRoom {
        room,
        worker,
        space: config.space,
    })
}

impl ChatRoom {
    /// Resource path this room serves, without the leading slash.
    pub fn space(&self) -> &str {
        &self.space
    }

    /// Router serving the configured resource path. Non-WebSocket requests at
    /// the path receive the plain-text fallback response.
    pub fn router(&self) -> Router {
        let path = format!("/{}", self.space);
        Router::new()
            .route(&path, any(chat_room_handler))
            .with_state(Arc::clone(&self.room))
    }

    /// Unregister the engine: stop the worker and drop every session.
    pub async fn unload(self) {
        self.room.stop(self.worker).await;
        self.room.clear().await;
        tracing::info!("chat room at /{} unloaded", self.space);
    }

    // Test back doors, mirrored from the room. Production callers ignore
    // these.

    /// Current quiz question text.
    pub async fn quiz_question(&self) -> String {
        self.room.quiz_question().await
    }

    /// Answer to the current quiz question.
    pub async fn quiz_answer(&self) -> String {
        self.room.quiz_answer().await
    }

    /// Components of the current quiz question.
    pub async fn quiz_components(&self) -> [i64; 3] {
        self.room.quiz_components().await
    }

    /// Override the expected answer and open the round.
    pub async fn set_next_answer(&self, answer: impl Into<String>) {
        self.room.set_next_answer(answer.into()).await;
    }

    /// Close the current round as if it had been answered.
    pub async fn set_answered_correctly(&self) {
        self.room.set_answered_correctly().await;
    }

    /// Wait up to one second for an open quiz round.
    pub async fn await_next_question(&self) -> bool {
        self.room.await_next_question().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::time::ManualClock;
    use crate::domain::{ChannelError, SessionChannel};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Mutex as StdMutex;

    struct RecordingChannel {
        sent: StdMutex<Vec<String>>,
    }

    impl RecordingChannel {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: StdMutex::new(Vec::new()),
            })
        }

        fn received(&self) -> Vec<Value> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|text| serde_json::from_str(text).unwrap())
                .collect()
        }
    }

    #[async_trait]
    impl SessionChannel for RecordingChannel {
        async fn send_text(&self, text: String) -> Result<(), ChannelError> {
            self.sent.lock().unwrap().push(text);
            Ok(())
        }

        async fn close(&self) {}
    }

    #[derive(Default)]
    struct RecordingDiagnostics {
        messages: StdMutex<Vec<(String, usize, String)>>,
    }

    impl RecordingDiagnostics {
        fn recorded(&self) -> Vec<(String, usize, String)> {
            self.messages.lock().unwrap().clone()
        }
    }

    impl DiagnosticsSink for RecordingDiagnostics {
        fn diagnostic(&self, sender: &str, level: usize, message: &str) {
            self.messages.lock().unwrap().push((
                sender.to_string(),
                level,
                message.to_string(),
            ));
        }
    }

    fn collaborators() -> (Arc<ManualClock>, Arc<RecordingDiagnostics>) {
        (
            Arc::new(ManualClock::new(0.0)),
            Arc::new(RecordingDiagnostics::default()),
        )
    }

    #[tokio::test]
    async fn test_load_registers_the_configured_space() {
        // テスト項目: load が space のパスを登録して成功する
        // given (前提条件):
        let (clock, diagnostics) = collaborators();
        let configuration = json!({
            "space": "http://www.example.com/chat",
            "nicknames": ["Alice", "Bob"],
        });

        // when (操作):
        let chat_room = load(&configuration, clock, diagnostics.clone())
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(chat_room.space(), "chat");
        assert!(diagnostics.recorded().is_empty());
        chat_room.unload().await;
    }

    #[tokio::test]
    async fn test_load_without_space_fails_with_a_diagnostic() {
        // テスト項目: space の無い設定は診断メッセージ付きでロードに失敗する
        // given (前提条件):
        let (clock, diagnostics) = collaborators();
        let configuration = json!({"nicknames": ["Alice"]});

        // when (操作):
        let result = load(&configuration, clock, diagnostics.clone()).await;

        // then (期待する結果):
        assert!(matches!(result, Err(ConfigError::MissingSpace)));
        assert_eq!(
            diagnostics.recorded(),
            vec![(
                String::new(),
                levels::ERROR,
                "no 'space' URI in configuration".to_string(),
            )]
        );
    }

    #[tokio::test]
    async fn test_load_with_unparsable_space_fails_with_a_diagnostic() {
        // テスト項目: パースできない space は診断メッセージ付きでロードに失敗する
        // given (前提条件):
        let (clock, diagnostics) = collaborators();
        let configuration = json!({"space": 3.14});

        // when (操作):
        let result = load(&configuration, clock, diagnostics.clone()).await;

        // then (期待する結果):
        assert!(matches!(result, Err(ConfigError::InvalidSpace)));
        assert_eq!(
            diagnostics.recorded(),
            vec![(
                String::new(),
                levels::ERROR,
                "unable to parse 'space' URI in configuration".to_string(),
            )]
        );
    }

    #[tokio::test]
    async fn test_reload_starts_from_a_clean_room() {
        // テスト項目: unload 後に再ロードした部屋は前回の状態を引き継がない
        // given (前提条件): 一度目のロードでニックネームが取得されている
        let configuration = json!({
            "space": "/chat",
            "nicknames": ["Alice", "Bob"],
        });
        let (clock, diagnostics) = collaborators();
        let first = load(&configuration, clock, diagnostics).await.unwrap();
        let channel = RecordingChannel::new();
        let session = first.room.add_session(channel.clone()).await;
        first
            .room
            .receive_message(
                session,
                &json!({"Type": "SetNickName", "NickName": "Bob"}).to_string(),
            )
            .await;
        assert_eq!(first.room.session_count().await, 1);

        // when (操作): unload してから同じ設定で再ロードする
        first.unload().await;
        let (clock, diagnostics) = collaborators();
        let second = load(&configuration, clock, diagnostics.clone())
            .await
            .unwrap();

        // then (期待する結果): セッションは無く、プールは完全な状態に戻っている
        assert_eq!(second.room.session_count().await, 0);
        let channel = RecordingChannel::new();
        let session = second.room.add_session(channel.clone()).await;
        second
            .room
            .receive_message(session, &json!({"Type": "GetAvailableNickNames"}).to_string())
            .await;
        second
            .room
            .receive_message(session, &json!({"Type": "GetNickNames"}).to_string())
            .await;
        let received = channel.received();
        assert_eq!(received.len(), 2);
        assert_eq!(
            received[0]["AvailableNickNames"],
            json!(["Alice", "Bob"])
        );
        assert_eq!(received[1]["NickNames"], json!([]));

        // セッション ID も 1 から振り直される
        second
            .room
            .receive_message(
                session,
                &json!({"Type": "SetNickName", "NickName": "Bob"}).to_string(),
            )
            .await;
        assert_eq!(
            diagnostics.recorded(),
            vec![(
                "Session #1".to_string(),
                levels::INFO,
                "Nickname changed from '' to 'Bob'".to_string(),
            )]
        );
        second.unload().await;
    }

    #[tokio::test]
    async fn test_quiz_back_doors_round_trip() {
        // テスト項目: クイズのバックドアで答えを設定・参照できる
        // given (前提条件):
        let (clock, diagnostics) = collaborators();
        let configuration = json!({"space": "/chat"});
        let chat_room = load(&configuration, clock, diagnostics).await.unwrap();

        // when (操作):
        chat_room.set_next_answer("42").await;

        // then (期待する結果):
        assert_eq!(chat_room.quiz_answer().await, "42");
        assert!(chat_room.await_next_question().await);

        // when (操作): ラウンドを閉じる
        chat_room.set_answered_correctly().await;

        // then (期待する結果): 開いたラウンドを一秒待っても現れない
        assert!(!chat_room.await_next_question().await);
        chat_room.unload().await;
    }
}
