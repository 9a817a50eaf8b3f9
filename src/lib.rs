pub mod cli;
pub mod commands;
pub mod engine;
pub mod utils;
pub mod writers;
