//! SuperExpat: an expatriation assistant.
//!
//! Onboarding collects a destination country, a short profile and a topic
//! category; the chat session then exchanges messages with a remote
//! chat-completions model, framed by a system prompt built from those answers.
//!
//! See `DESIGN.md` for the architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod catalog;
pub mod config;
pub mod credentials;
pub mod logging;
pub mod onboarding;
pub mod profile;
pub mod prompt;
pub mod providers;
pub mod session;
pub mod store;
