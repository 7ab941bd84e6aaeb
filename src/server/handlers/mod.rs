pub mod chat;
pub mod collection;
pub mod health;
pub mod upload;
