//! Room controller: the single-lock state machine behind the chat room.
//!
//! All room state lives behind one mutex. The UI layer delivers inbound text
//! frames and close notifications; handlers mutate state and broadcast while
//! holding the lock. A background worker polls every 50 ms to post quiz
//! questions and reap sessions whose transport has closed. Removed sessions
//! are torn down only after the lock is released.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;

use crate::common::diagnostics::{DiagnosticsSink, levels};
use crate::common::time::Clock;
use crate::config::RoomConfig;
use crate::domain::{
    MathQuiz, NicknamePool, QUIZ_BOT_NAME, Session, SessionChannel, SessionId,
};
use crate::infrastructure::dto::websocket::{ClientMessage, ServerMessage, UserEntry};

/// Interval between worker wake-ups when nothing else wakes it. Bounds the
/// latency of quiz publication and session cleanup.
const WORKER_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Mutable room state guarded by the room mutex.
struct RoomState {
    /// Live sessions keyed by id; iteration order is id ascending.
    sessions: BTreeMap<SessionId, Session>,
    /// Nicknames still available for claiming.
    nickname_pool: NicknamePool,
    /// Starting score per nickname.
    initial_points: HashMap<String, i64>,
    /// The quiz state machine.
    quiz: MathQuiz,
    /// Next id to assign; ids are never reused.
    next_session_id: SessionId,
    /// Set when a transport reported close; tells the worker to reap.
    users_have_closed: bool,
}

/// One chat room. Constructed per plugin load; all mutation is serialised
/// through the internal mutex.
pub struct Room {
    state: Mutex<RoomState>,
    worker_wake: Notify,
    question_changed: Notify,
    stop_worker: AtomicBool,
    clock: Arc<dyn Clock>,
    diagnostics: Arc<dyn DiagnosticsSink>,
    tell_timeout: f64,
    min_question_cooldown: f64,
    max_question_cooldown: f64,
}

impl Room {
    /// Create a room from its configuration and injected collaborators.
    pub fn new(
        config: &RoomConfig,
        clock: Arc<dyn Clock>,
        diagnostics: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        Self {
            state: Mutex::new(RoomState {
                sessions: BTreeMap::new(),
                nickname_pool: NicknamePool::new(config.nicknames.iter().cloned()),
                initial_points: config.initial_points.clone(),
                quiz: MathQuiz::new(),
                next_session_id: 1,
                users_have_closed: false,
            }),
            worker_wake: Notify::new(),
            question_changed: Notify::new(),
            stop_worker: AtomicBool::new(false),
            clock,
            diagnostics,
            tell_timeout: config.tell_timeout,
            min_question_cooldown: config.min_question_cooldown,
            max_question_cooldown: config.max_question_cooldown,
        }
    }

    /// Schedule the first quiz question and launch the background worker.
    pub async fn start(self: Arc<Self>) -> JoinHandle<()> {
        {
            let mut state = self.state.lock().await;
            let now = self.clock.now();
            state
                .quiz
                .schedule_first(now, self.min_question_cooldown, self.max_question_cooldown);
        }
        self.stop_worker.store(false, Ordering::SeqCst);
        tokio::spawn(async move { self.worker().await })
    }

    /// Signal the worker to stop and wait for it to exit.
    pub async fn stop(&self, worker: JoinHandle<()>) {
        self.stop_worker.store(true, Ordering::SeqCst);
        self.worker_wake.notify_one();
        if worker.await.is_err() {
            tracing::warn!("room worker terminated abnormally");
        }
    }

    /// Drop every session. Channels are closed outside the room lock so the
    /// writer tasks shut down cleanly.
    pub async fn clear(&self) {
        let removed: Vec<Session> = {
            let mut state = self.state.lock().await;
            state.users_have_closed = false;
            std::mem::take(&mut state.sessions).into_values().collect()
        };
        for session in &removed {
            session.channel.close().await;
        }
    }

    /// Register a new session around a freshly opened channel.
    pub async fn add_session(&self, channel: Arc<dyn SessionChannel>) -> SessionId {
        let mut state = self.state.lock().await;
        let id = state.next_session_id;
        state.next_session_id += 1;
        state.sessions.insert(id, Session::new(id, channel));
        tracing::debug!("session #{id} joined the room");
        id
    }

    /// Number of sessions currently in the room (closed but unreaped included).
    pub async fn session_count(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    /// Transport close notification. The session only becomes ineligible for
    /// broadcasts once the reaper removes it.
    pub async fn connection_closed(&self, session_id: SessionId) {
        let mut state = self.state.lock().await;
        if let Some(session) = state.sessions.get_mut(&session_id) {
            session.open = false;
            state.users_have_closed = true;
            self.worker_wake.notify_one();
        }
    }

    /// Dispatch one inbound text frame from a session.
    pub async fn receive_message(&self, session_id: SessionId, text: &str) {
        let message: ClientMessage = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(error) => {
                tracing::debug!("dropping malformed message from session #{session_id}: {error}");
                return;
            }
        };
        let mut state = self.state.lock().await;
        if !state.sessions.contains_key(&session_id) {
            return;
        }
        match message {
            ClientMessage::SetNickName { nickname } => {
                self.set_nickname(&mut state, session_id, nickname).await;
            }
            ClientMessage::Tell { tell } => {
                self.tell(&mut state, session_id, tell).await;
            }
            ClientMessage::GetNickNames => {
                self.get_nicknames(&state, session_id).await;
            }
            ClientMessage::GetAvailableNickNames => {
                self.get_available_nicknames(&state, session_id).await;
            }
            ClientMessage::GetUsers => {
                self.get_users(&state, session_id).await;
            }
            ClientMessage::Unknown => {}
        }
    }

    /// Handle `SetNickName`.
    ///
    /// Claims go through the pool: only configured names can be taken, and a
    /// claim replaces any previous binding of the caller. All membership
    /// broadcasts reach every session (the caller included) before the caller
    /// sees the result reply.
    async fn set_nickname(&self, state: &mut RoomState, session_id: SessionId, nickname: String) {
        let Some(session) = state.sessions.get(&session_id) else {
            return;
        };
        let old_nickname = session.nickname.clone();
        let success;
        if nickname.is_empty() {
            success = true;
            if !old_nickname.is_empty() {
                if let Some(session) = state.sessions.get_mut(&session_id) {
                    session.nickname.clear();
                }
                self.log_nickname_change(state, session_id, &old_nickname, &nickname);
                state.nickname_pool.release(old_nickname.clone());
                self.send_to_all(
                    state,
                    &ServerMessage::Leave {
                        nickname: old_nickname,
                    },
                )
                .await;
            }
        } else if nickname == old_nickname {
            success = true;
        } else if !state.nickname_pool.reserve(&nickname) {
            success = false;
        } else {
            success = true;
            let points = state.initial_points.get(&nickname).copied().unwrap_or(0);
            if let Some(session) = state.sessions.get_mut(&session_id) {
                session.nickname = nickname.clone();
                session.points = points;
            }
            if !old_nickname.is_empty() {
                state.nickname_pool.release(old_nickname.clone());
                self.send_to_all(
                    state,
                    &ServerMessage::Leave {
                        nickname: old_nickname.clone(),
                    },
                )
                .await;
            }
            self.send_to_all(
                state,
                &ServerMessage::Join {
                    nickname: nickname.clone(),
                },
            )
            .await;
            self.log_nickname_change(state, session_id, &old_nickname, &nickname);
        }
        if let Some(session) = state.sessions.get(&session_id) {
            self.send_to_session(session, &ServerMessage::SetNickNameResult { success })
                .await;
        }
    }

    /// Handle `Tell`: rate-limited integer utterances, scored against the
    /// open quiz round.
    async fn tell(&self, state: &mut RoomState, session_id: SessionId, tell: String) {
        let now = self.clock.now();
        let Some(session) = state.sessions.get(&session_id) else {
            return;
        };
        if session.is_lurker() {
            return;
        }
        if now - session.last_tell < self.tell_timeout {
            return;
        }
        if tell.is_empty() || tell.parse::<i64>().is_err() {
            return;
        }
        let sender = session.nickname.clone();
        if let Some(session) = state.sessions.get_mut(&session_id) {
            session.last_tell = now;
        }
        self.send_to_all(
            state,
            &ServerMessage::Tell {
                sender: sender.clone(),
                tell: tell.clone(),
            },
        )
        .await;
        if !state.quiz.is_open() {
            return;
        }
        if tell == state.quiz.answer() {
            state.quiz.close();
            let Some(session) = state.sessions.get_mut(&session_id) else {
                return;
            };
            session.points += 1;
            let points = session.points;
            self.send_to_all(
                state,
                &ServerMessage::Award {
                    subject: sender,
                    award: 1,
                    points,
                },
            )
            .await;
        } else {
            let Some(session) = state.sessions.get_mut(&session_id) else {
                return;
            };
            session.points -= 1;
            let points = session.points;
            self.send_to_all(
                state,
                &ServerMessage::Penalty {
                    subject: sender,
                    penalty: 1,
                    points,
                },
            )
            .await;
        }
    }

    /// Handle `GetNickNames`: the bound nicknames, sorted, to the caller only.
    async fn get_nicknames(&self, state: &RoomState, session_id: SessionId) {
        let nicknames: BTreeSet<String> = state
            .sessions
            .values()
            .filter(|session| !session.is_lurker())
            .map(|session| session.nickname.clone())
            .collect();
        let message = ServerMessage::NickNames {
            nicknames: nicknames.into_iter().collect(),
        };
        if let Some(session) = state.sessions.get(&session_id) {
            self.send_to_session(session, &message).await;
        }
    }

    /// Handle `GetAvailableNickNames`: the free pool, to the caller only.
    async fn get_available_nicknames(&self, state: &RoomState, session_id: SessionId) {
        let message = ServerMessage::AvailableNickNames {
            available_nicknames: state.nickname_pool.available(),
        };
        if let Some(session) = state.sessions.get(&session_id) {
            self.send_to_session(session, &message).await;
        }
    }

    /// Handle `GetUsers`: nickname and score of every non-lurker, in session
    /// id order, to the caller only.
    async fn get_users(&self, state: &RoomState, session_id: SessionId) {
        let users = state
            .sessions
            .values()
            .filter(|session| !session.is_lurker())
            .map(|session| UserEntry {
                nickname: session.nickname.clone(),
                points: session.points,
            })
            .collect();
        let message = ServerMessage::Users { users };
        if let Some(session) = state.sessions.get(&session_id) {
            self.send_to_session(session, &message).await;
        }
    }

    fn log_nickname_change(
        &self,
        state: &RoomState,
        session_id: SessionId,
        old_nickname: &str,
        new_nickname: &str,
    ) {
        if let Some(session) = state.sessions.get(&session_id) {
            self.diagnostics.diagnostic(
                &session.diagnostics_sender_name,
                levels::INFO,
                &format!("Nickname changed from '{old_nickname}' to '{new_nickname}'"),
            );
        }
    }

    /// Send one message to one session, stamped with the current time.
    async fn send_to_session(&self, session: &Session, message: &ServerMessage) {
        let text = message.encode(self.clock.now());
        if session.channel.send_text(text).await.is_err() {
            tracing::warn!("failed to queue message for session #{}", session.id);
        }
    }

    /// Send one message to every session in the room.
    async fn send_to_all(&self, state: &RoomState, message: &ServerMessage) {
        for session in state.sessions.values() {
            self.send_to_session(session, message).await;
        }
    }

    /// Send one message to a snapshot of channels taken under the lock.
    /// Used by the worker, which broadcasts after unlocking. Each send is
    /// stamped individually, as in `send_to_session`.
    async fn send_to_channels(
        &self,
        channels: &[Arc<dyn SessionChannel>],
        message: &ServerMessage,
    ) {
        for channel in channels {
            let text = message.encode(self.clock.now());
            if channel.send_text(text).await.is_err() {
                tracing::warn!("failed to queue broadcast for a departing session");
            }
        }
    }

    /// Background worker: reap closed sessions and post due quiz questions.
    async fn worker(self: Arc<Self>) {
        loop {
            tokio::select! {
                _ = self.worker_wake.notified() => {}
                _ = tokio::time::sleep(WORKER_POLL_INTERVAL) => {}
            }
            if self.stop_worker.load(Ordering::SeqCst) {
                break;
            }
            self.reap_closed_sessions().await;
            self.maybe_post_question().await;
        }
    }

    /// Remove every session whose transport reported close. Non-lurkers give
    /// their nickname back and produce a `Leave` broadcast. The removed
    /// sessions are destroyed after the lock is released; `Leave` goes out to
    /// a snapshot for the same reason.
    async fn reap_closed_sessions(&self) {
        let mut removed = Vec::new();
        let mut leaves = Vec::new();
        let mut snapshot: Vec<Arc<dyn SessionChannel>> = Vec::new();
        {
            let mut state = self.state.lock().await;
            if !state.users_have_closed {
                return;
            }
            let closed_ids: Vec<SessionId> = state
                .sessions
                .iter()
                .filter(|(_, session)| !session.open)
                .map(|(id, _)| *id)
                .collect();
            for id in closed_ids {
                if let Some(session) = state.sessions.remove(&id) {
                    if !session.nickname.is_empty() {
                        state.nickname_pool.release(session.nickname.clone());
                        leaves.push(session.nickname.clone());
                    }
                    tracing::debug!("session #{id} reaped");
                    removed.push(session);
                }
            }
            state.users_have_closed = false;
            if !leaves.is_empty() {
                snapshot = state
                    .sessions
                    .values()
                    .map(|session| Arc::clone(&session.channel))
                    .collect();
            }
        }
        for nickname in leaves {
            self.send_to_channels(&snapshot, &ServerMessage::Leave { nickname })
                .await;
        }
        drop(removed);
    }

    /// Post the next quiz question if it is due.
    async fn maybe_post_question(&self) {
        let question;
        let snapshot: Vec<Arc<dyn SessionChannel>>;
        {
            let mut state = self.state.lock().await;
            if !state.quiz.due(self.clock.now()) {
                return;
            }
            question = state
                .quiz
                .next_question(self.min_question_cooldown, self.max_question_cooldown);
            snapshot = state
                .sessions
                .values()
                .map(|session| Arc::clone(&session.channel))
                .collect();
        }
        tracing::debug!("posting quiz question: {question}");
        self.send_to_channels(
            &snapshot,
            &ServerMessage::Tell {
                sender: QUIZ_BOT_NAME.to_string(),
                tell: question,
            },
        )
        .await;
        self.question_changed.notify_waiters();
    }

    // Test back doors. Production callers ignore these.

    /// Current quiz question text.
    pub async fn quiz_question(&self) -> String {
        self.state.lock().await.quiz.question().to_string()
    }

    /// Answer to the current quiz question.
    pub async fn quiz_answer(&self) -> String {
        self.state.lock().await.quiz.answer().to_string()
    }

    /// Components of the current quiz question.
    pub async fn quiz_components(&self) -> [i64; 3] {
        self.state.lock().await.quiz.components()
    }

    /// Override the expected answer and open the round.
    pub async fn set_next_answer(&self, answer: String) {
        let mut state = self.state.lock().await;
        state.quiz.set_answer(answer);
        self.question_changed.notify_waiters();
    }

    /// Close the current round as if it had been answered.
    pub async fn set_answered_correctly(&self) {
        self.state.lock().await.quiz.close();
    }

    /// Wait up to one second for an open quiz round. Returns whether a round
    /// is open.
    pub async fn await_next_question(&self) -> bool {
        let wait = async {
            loop {
                let notified = self.question_changed.notified();
                if self.state.lock().await.quiz.is_open() {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(Duration::from_secs(1), wait).await.is_ok()
    }
}
