#![forbid(unsafe_code)]

pub mod app;
pub mod cli;
pub mod commands;
pub mod error;
pub mod formats;
pub mod id;
pub mod logging;
pub mod markdown;
pub mod render;
