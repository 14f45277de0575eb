pub mod bot;
pub mod chat;
pub mod config;
pub mod dialog;
pub mod reference;
pub mod replies;
pub mod resolver;
pub mod store;
pub mod verbs;
