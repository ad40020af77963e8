//! Banking Assist: a single-page banking assistant with a chat mode and
//! guided account-creation and transaction wizards.

pub mod banking;
pub mod config;
pub mod error;
pub mod llm;
pub mod web;
