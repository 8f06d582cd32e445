//! 配置模块
//!
//! 提供引脚目录、应用常量、引脚管理器和传感器管理器

pub mod gpio_manager;
pub mod manager;
pub mod pins;
pub mod settings;

// 重新导出常用类型
pub use gpio_manager::GPIOManager;
pub use manager::{ManagerError, SensorManager};
pub use settings::AppConfig;
