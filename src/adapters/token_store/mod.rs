//! [`TokenStore`](crate::application::use_cases::auth::TokenStore) implementations.

pub mod cookie;
pub mod memory;

pub use cookie::{CookieSettings, CookieTokenStore};
pub use memory::MemoryTokenStore;
