//! Agent Host - conversation logic between the UI and the OpenRouter client
//!
//! This crate provides:
//! - the message composer that turns a transcript into a request payload
//! - system prompt library operations
//! - the chat controller that owns application state and consumes UI commands

pub mod composer;
pub mod controller;
pub mod prompts;

pub use composer::{compose, ComposeOptions};
pub use controller::{AppState, ChatController, CommandOutcome, CompletionJob, InFlight};
pub use prompts::PromptError;
