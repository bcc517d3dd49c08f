pub mod auth_event;
pub mod session;
pub mod user_profile;
