pub mod config;
pub mod handlers;
pub mod notification;
pub mod setup;
