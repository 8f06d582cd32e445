//! 平台接口
//!
//! 引脚控制器只通过这里的 trait 操作硬件，设备端和模拟器各自实现。

use thiserror::Error;

use crate::config::pins::PinHandle;

/// 平台调用失败
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HardwareFault {
    #[error("引脚 {pin} 操作失败: {reason}")]
    Pin { pin: PinHandle, reason: String },

    #[error("电源轨操作失败: {0}")]
    Rail(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input,
    OutputPushPull,
    OutputOpenDrain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    None,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speed {
    Low,
    Medium,
    High,
    VeryHigh,
}

/// 传感器共用的 5V 电源轨
pub trait PowerRail {
    fn rail_enabled(&mut self) -> Result<bool, HardwareFault>;

    fn enable_rail(&mut self) -> Result<(), HardwareFault>;

    fn disable_rail(&mut self) -> Result<(), HardwareFault>;
}

/// 引脚模式和电平
pub trait GpioPort {
    fn set_mode(
        &mut self,
        pin: PinHandle,
        mode: PinMode,
        pull: Pull,
        speed: Speed,
    ) -> Result<(), HardwareFault>;

    fn write_line(&mut self, pin: PinHandle, high: bool) -> Result<(), HardwareFault>;
}

/// 同时提供电源轨和引脚控制的板级实现
pub trait Board: PowerRail + GpioPort {}

impl<T: PowerRail + GpioPort> Board for T {}
