pub mod api;
pub mod config;
pub mod contact;
pub mod directory;
pub mod notify;
pub mod session;
pub mod storage;
pub mod sync;
pub mod utils;

pub use api::client::{ApiClient, ChatBackend};
pub use api::error::ApiError;
pub use api::models::{Conversation, Message, MessageBody, Outgoing, UserData};
pub use session::{Session, SessionEvent, SessionGuard};
