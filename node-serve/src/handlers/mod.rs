pub mod chat;
pub mod fleet;
pub mod models;
pub mod scheduler;
