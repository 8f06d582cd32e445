use core::fmt;

/// 一次温湿度读数，内部以 0.1 为单位保存
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    temperature: i16,
    humidity: u16,
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.1}*C/{}%",
            self.get_temperature(),
            self.get_humidity() as i32
        )
    }
}

impl Reading {
    pub fn new(temperature_tenths: i16, humidity_tenths: u16) -> Self {
        Self {
            temperature: temperature_tenths,
            humidity: humidity_tenths,
        }
    }

    pub fn new_from_f32(temperature: f32, humidity: f32) -> Self {
        log::debug!("读数: temperature = {temperature:.1}, humidity = {humidity:.1}");
        Self {
            temperature: (temperature * 10.0).round() as i16,
            humidity: (humidity * 10.0).round().max(0.0) as u16,
        }
    }

    pub fn get_temperature(&self) -> f32 {
        self.temperature as f32 / 10.0
    }

    pub fn get_humidity(&self) -> f32 {
        self.humidity as f32 / 10.0
    }

    pub fn temperature_raw(&self) -> i16 {
        self.temperature
    }

    pub fn humidity_raw(&self) -> u16 {
        self.humidity
    }
}
