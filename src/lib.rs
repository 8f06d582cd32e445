//! DHT 传感器监视器
//!
//! 管理接在扩展口上的 DHT11 / DHT22 传感器：引脚目录、传感器配置文件的
//! 读写、引脚与电源轨的激活/释放，以及添加、编辑、删除传感器的菜单流程。
//! 设备相关的实现（ESP-IDF、DHT 驱动、屏幕）在 `esp` feature 之后。

pub mod app;
pub mod config;
pub mod data;
pub mod peripherals;
pub mod storage;
