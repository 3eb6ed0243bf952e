pub mod assembler;
pub mod config;
pub mod coordinator;
pub mod fetcher;
pub mod lifecycle;
pub mod logging;
pub mod manifest;
pub mod pipeline;
pub mod progress;
pub mod retry;
