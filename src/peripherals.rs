//! 外设
//!
//! 平台接口定义、主机模拟实现，以及 `esp` feature 下的设备实现

pub mod hal;
pub mod sim;
pub mod temperature_sensor;

#[cfg(feature = "esp")]
pub mod esp_board;
#[cfg(feature = "esp")]
pub mod screen;
