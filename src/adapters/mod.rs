pub mod http;
pub mod identity;
pub mod persistence;
pub mod storage;
pub mod token_store;
