//! 传感器配置的持久化

pub mod config_store;
pub mod sensors_file;

pub use config_store::{ConfigStore, FsStore, StorageError};
pub use sensors_file::{read_sensors, write_sensors, LoadOutcome};
