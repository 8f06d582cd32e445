//! 应用配置常量

use std::path::PathBuf;
use std::time::Duration;

pub const APP_NAME: &str = "DHT monitor";

/// 设备上的配置目录（FATFS 挂载在 /fatfs）
pub const APP_FOLDER: &str = "/fatfs/dht_monitor";

pub const APP_FILENAME: &str = "sensors.txt";

/// 最多保存的传感器数量
pub const MAX_SENSORS: usize = 8;

/// 传感器名称最大长度（字符）
pub const MAX_NAME_LEN: usize = 10;

/// 新建传感器的默认名称
pub const DEFAULT_SENSOR_NAME: &str = "NewSensor";

/// 运行时配置
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// 传感器文件所在目录
    pub folder: PathBuf,
    pub file_name: String,
    /// 两次采样之间的间隔
    pub sample_interval: Duration,
    /// 渲染时等待锁的最长时间，超时则跳过这一帧
    pub render_timeout: Duration,
    /// 事件队列的等待超时
    pub event_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            folder: PathBuf::from(APP_FOLDER),
            file_name: APP_FILENAME.to_string(),
            sample_interval: Duration::from_secs(2),
            render_timeout: Duration::from_millis(25),
            event_timeout: Duration::from_millis(100),
        }
    }
}

impl AppConfig {
    pub fn with_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.folder = folder.into();
        self
    }

    /// 传感器文件的完整路径
    pub fn sensors_path(&self) -> PathBuf {
        self.folder.join(&self.file_name)
    }
}
