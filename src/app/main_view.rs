//! 主界面内容
//!
//! 根据注册表状态和最近一次读数生成要显示的文本行。

use crate::data::reading::Reading;
use crate::data::registry::RegistryState;
use crate::data::sensor_entry::SensorName;
use crate::peripherals::temperature_sensor::SampleError;

pub const TITLE: &str = "DHT Monitor";
pub const LOADING: &str = "Loading...";
pub const NOT_FOUND: &str = "Sensors not found";
pub const TIMEOUT: &str = "timeout";

pub type SensorReadings = Vec<(SensorName, Result<Reading, SampleError>)>;

pub fn main_view_lines(state: RegistryState, readings: &SensorReadings) -> Vec<String> {
    let mut lines = vec![TITLE.to_string()];
    match state {
        RegistryState::Loading => lines.push(LOADING.to_string()),
        RegistryState::Empty => lines.push(NOT_FOUND.to_string()),
        RegistryState::Populated(_) => {
            for (name, result) in readings {
                let value = match result {
                    Ok(reading) => reading.to_string(),
                    Err(_) => TIMEOUT.to_string(),
                };
                lines.push(format!("{name}  {value}"));
            }
        }
    }
    lines
}
