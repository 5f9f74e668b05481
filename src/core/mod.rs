pub mod alerts;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod feed;
pub mod location;
pub mod model;
pub mod parser;
pub mod state;
pub mod tracker;
pub mod watcher;

#[cfg(test)]
mod sim_test;
