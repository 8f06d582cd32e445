//! 数据定义
//!
//! 传感器条目、注册表和读数

pub mod reading;
pub mod registry;
pub mod sensor_entry;

pub use reading::Reading;
pub use registry::{Registry, RegistryError, RegistryState};
pub use sensor_entry::{SensorEntry, SensorKind, SensorName};
