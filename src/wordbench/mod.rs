// src/wordbench/mod.rs

pub mod archive;
pub mod client_wrapper;
pub mod clients;
pub mod config;
pub mod episode;
pub mod event;
pub mod games;
pub mod heal_eval;
pub mod healing;
pub mod invoker;
pub mod parser;
pub mod prompts;
pub mod puzzle;
pub mod record;
pub mod retry;

// Let's explicitly export TurnLoop so it can be reached as wordbench::TurnLoop
pub use episode::TurnLoop;
