//! 模拟板卡
//!
//! 在主机上记录电源轨和每个引脚的状态，供模拟器和测试使用。

use std::collections::HashMap;

use crate::config::pins::PinHandle;
use crate::data::reading::Reading;
use crate::data::sensor_entry::SensorKind;
use crate::peripherals::hal::{GpioPort, HardwareFault, PinMode, PowerRail, Pull, Speed};
use crate::peripherals::temperature_sensor::{SampleError, Sampler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinState {
    pub mode: PinMode,
    pub pull: Pull,
    pub speed: Speed,
    pub high: bool,
}

impl Default for PinState {
    fn default() -> Self {
        Self {
            mode: PinMode::Input,
            pull: Pull::None,
            speed: Speed::Low,
            high: false,
        }
    }
}

/// 记录下来的平台调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    EnableRail,
    DisableRail,
    SetMode(PinHandle, PinMode),
    Write(PinHandle, bool),
}

#[derive(Debug, Default)]
pub struct SimBoard {
    rail: bool,
    pins: HashMap<PinHandle, PinState>,
    calls: Vec<Call>,
    faulty: Vec<PinHandle>,
    mode_faulty: Vec<PinHandle>,
}

impl SimBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rail_on(&self) -> bool {
        self.rail
    }

    /// 模拟外部打开或关闭电源轨
    pub fn set_rail(&mut self, on: bool) {
        self.rail = on;
    }

    pub fn pin(&self, pin: PinHandle) -> Option<PinState> {
        self.pins.get(&pin).copied()
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// 之后对该引脚的所有操作都会失败
    pub fn fail_on(&mut self, pin: PinHandle) {
        self.faulty.push(pin);
    }

    /// 之后对该引脚设置模式会失败，写电平仍然成功
    pub fn fail_mode_on(&mut self, pin: PinHandle) {
        self.mode_faulty.push(pin);
    }

    fn check(&self, pin: PinHandle) -> Result<(), HardwareFault> {
        if self.faulty.contains(&pin) {
            return Err(HardwareFault::Pin {
                pin,
                reason: "simulated fault".to_string(),
            });
        }
        Ok(())
    }
}

impl PowerRail for SimBoard {
    fn rail_enabled(&mut self) -> Result<bool, HardwareFault> {
        Ok(self.rail)
    }

    fn enable_rail(&mut self) -> Result<(), HardwareFault> {
        self.calls.push(Call::EnableRail);
        self.rail = true;
        Ok(())
    }

    fn disable_rail(&mut self) -> Result<(), HardwareFault> {
        self.calls.push(Call::DisableRail);
        self.rail = false;
        Ok(())
    }
}

impl GpioPort for SimBoard {
    fn set_mode(
        &mut self,
        pin: PinHandle,
        mode: PinMode,
        pull: Pull,
        speed: Speed,
    ) -> Result<(), HardwareFault> {
        self.check(pin)?;
        if self.mode_faulty.contains(&pin) {
            return Err(HardwareFault::Pin {
                pin,
                reason: "simulated mode fault".to_string(),
            });
        }
        self.calls.push(Call::SetMode(pin, mode));
        let state = self.pins.entry(pin).or_default();
        state.mode = mode;
        state.pull = pull;
        state.speed = speed;
        Ok(())
    }

    fn write_line(&mut self, pin: PinHandle, high: bool) -> Result<(), HardwareFault> {
        self.check(pin)?;
        self.calls.push(Call::Write(pin, high));
        self.pins.entry(pin).or_default().high = high;
        Ok(())
    }
}

/// 生成假读数，指定引脚总是超时
#[derive(Debug, Default)]
pub struct SimSampler {
    tick: u16,
    silent: Vec<PinHandle>,
}

impl SimSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn silence(&mut self, pin: PinHandle) {
        self.silent.push(pin);
    }
}

impl Sampler for SimSampler {
    fn sample(&mut self, pin: PinHandle, kind: SensorKind) -> Result<Reading, SampleError> {
        if self.silent.contains(&pin) {
            return Err(SampleError::Timeout);
        }
        self.tick = self.tick.wrapping_add(1);
        let wobble = (self.tick % 7) as i16;
        // DHT11 只有整数精度
        let (temperature, humidity) = match kind {
            SensorKind::Dht11 => (220 + wobble * 10, 450),
            SensorKind::Dht22 => (215 + wobble, 473 + wobble as u16),
        };
        Ok(Reading::new(temperature, humidity))
    }
}
