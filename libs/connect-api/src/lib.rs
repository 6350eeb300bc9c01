pub mod config;
pub mod error;
pub mod record;
pub mod schema;
pub mod transform;
pub mod value;
