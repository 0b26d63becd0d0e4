pub mod app;
pub mod board;
pub mod cli;
pub mod config;
pub mod loader;
pub mod metrics;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod shell;

#[cfg(test)]
mod tests;
