pub mod command;
pub mod pack;
pub mod pending_definition;
