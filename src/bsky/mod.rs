pub mod client;
pub mod session;
pub mod types;

pub use client::BskyClient;
pub use session::{Session, SessionEvent};
