//! Provider specific [`ClientWrapper`](crate::client_wrapper::ClientWrapper) implementations.
//!
//! Every model an evaluation run compares is reached through one OpenAI compatible
//! endpoint; the model identifier travels with each call.

pub mod common;

pub mod openrouter;
