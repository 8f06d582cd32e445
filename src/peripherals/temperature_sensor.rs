use thiserror::Error;

use crate::config::pins::PinHandle;
use crate::data::reading::Reading;
use crate::data::sensor_entry::SensorKind;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SampleError {
    #[error("传感器无响应")]
    Timeout,

    #[error("传感器读取失败: {0}")]
    Read(String),
}

/// 单总线温湿度采样
///
/// 调用前引脚应已处于开漏输出 + 上拉的空闲态。
pub trait Sampler {
    fn sample(&mut self, pin: PinHandle, kind: SensorKind) -> Result<Reading, SampleError>;
}

#[cfg(feature = "esp")]
pub use esp::DhtSampler;

#[cfg(feature = "esp")]
mod esp {
    use embedded_dht_rs::dht11::Dht11;
    use embedded_dht_rs::dht22::Dht22;
    use embedded_dht_rs::SensorError;
    use esp_idf_svc::hal::{
        delay::Ets,
        gpio::{AnyIOPin, PinDriver},
    };

    use super::{SampleError, Sampler};
    use crate::config::pins::PinHandle;
    use crate::data::reading::Reading;
    use crate::data::sensor_entry::SensorKind;
    use crate::peripherals::esp_board::esp_gpio;

    /// DHT11 / DHT22 采样，基于 embedded-dht-rs
    ///
    /// 每次采样临时创建引脚驱动。驱动释放时引脚复位为输入，
    /// 总线由内部上拉维持空闲高电平。
    pub struct DhtSampler;

    impl DhtSampler {
        pub fn new() -> Self {
            Self
        }
    }

    fn map_error(e: SensorError) -> SampleError {
        match e {
            SensorError::Timeout => SampleError::Timeout,
            other => SampleError::Read(format!("{other:?}")),
        }
    }

    impl Sampler for DhtSampler {
        fn sample(&mut self, pin: PinHandle, kind: SensorKind) -> Result<Reading, SampleError> {
            let gpio = esp_gpio(pin).ok_or_else(|| SampleError::Read(format!("引脚 {pin} 未接线")))?;
            // SAFETY: 该引脚只由引脚管理器和这里使用，采样期间不会被其它驱动持有
            let any_pin = unsafe { AnyIOPin::new(gpio) };
            let driver = PinDriver::input_output_od(any_pin)
                .map_err(|e| SampleError::Read(format!("创建引脚驱动失败: {e}")))?;

            match kind {
                SensorKind::Dht11 => {
                    let mut dht = Dht11::new(driver, Ets);
                    let reading = dht.read().map_err(map_error)?;
                    Ok(Reading::new_from_f32(
                        reading.temperature as f32,
                        reading.humidity as f32,
                    ))
                }
                SensorKind::Dht22 => {
                    let mut dht = Dht22::new(driver, Ets);
                    let reading = dht.read().map_err(map_error)?;
                    log::debug!(
                        "传感器读取成功: 温度 {:.1}°C, 湿度 {:.1}%",
                        reading.temperature,
                        reading.humidity
                    );
                    Ok(Reading::new_from_f32(reading.temperature, reading.humidity))
                }
            }
        }
    }
}
