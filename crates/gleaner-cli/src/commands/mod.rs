pub mod chat;
pub mod check_config;
pub mod score;
pub mod sessions;
