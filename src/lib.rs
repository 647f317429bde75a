pub mod cli;
pub mod config;
pub mod cookies;
pub mod error;
pub mod extract;
pub mod http;
pub mod jobs;
pub mod orchestrator;
pub mod provider;
pub mod report;
pub mod runner;
pub mod util;
