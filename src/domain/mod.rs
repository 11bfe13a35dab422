//! Domain model of the chat room.

mod channel;
mod nickname;
mod quiz;
mod session;

pub use channel::{ChannelError, SessionChannel};
pub use nickname::NicknamePool;
pub use quiz::{MathQuiz, QUIZ_BOT_NAME};
pub use session::{Session, SessionId};
