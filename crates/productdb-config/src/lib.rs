pub mod loader;
pub mod model;

pub use loader::EnvLoader;
pub use model::{DatabaseConfig, Driver, RetryPolicy};
