//! Load-once secret configuration. The real secret file is read a single time
//! at startup into an immutable `Configuration`; values are redacted in debug
//! output and wiped from memory on drop.

pub mod config;
pub mod exclusion;
pub mod integrity;
pub mod secret;

pub use config::{get, load, ConfigError, Configuration, KeyName, UnknownKeyPolicy};
pub use secret::SecretValue;
