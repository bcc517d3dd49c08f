pub mod app_error;
pub mod auth_state;
pub mod in_flight;
pub mod jwt;
pub mod pkce;
pub mod use_cases;
pub mod validators;
