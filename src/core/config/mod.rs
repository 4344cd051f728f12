pub mod data;
pub mod io;

pub use data::{Config, EndpointOverrides};
pub use io::ConfigError;
