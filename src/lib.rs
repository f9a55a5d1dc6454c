//! Tutorial bots: echo, state counter, intent recognition, and a weather bot
//! that onboards users and answers forecast questions through dialogs.

pub mod activity;
pub mod bot_runtime;
pub mod config;
pub mod datetime;
pub mod dialog;
pub mod error;
pub mod logger;
pub mod services;
pub mod state;
pub mod subsystems;
pub mod turn;
