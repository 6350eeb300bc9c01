pub mod chain;
pub mod codec;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod registry;
