//! 会话存储：user_id -> 对话记录

mod store;

pub use store::{spawn_sweeper, MemorySessionStore, SessionStore};
