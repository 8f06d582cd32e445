//! ESP32 板级实现
//!
//! 扩展板把外壳上的每个传感器接口接到一个 ESP32 GPIO，
//! 5V 电源轨由一个负载开关控制，开关使能脚接在 GPIO21。

use esp_idf_sys::{self as sys, esp};

use crate::config::pins::{PinHandle, Port};
use crate::peripherals::hal::{GpioPort, HardwareFault, PinMode, PowerRail, Pull, Speed};

/// 电源轨负载开关的使能脚
pub const RAIL_GPIO: i32 = 21;

/// 引脚目录 -> ESP32 GPIO 的接线表
///
/// GPIO0/2/12/18 被屏幕 SPI 占用，不出现在表中
const WIRING: [(PinHandle, i32); 13] = [
    (PinHandle::new(Port::A, 7), 4),
    (PinHandle::new(Port::A, 6), 5),
    (PinHandle::new(Port::A, 4), 6),
    (PinHandle::new(Port::B, 3), 7),
    (PinHandle::new(Port::B, 2), 8),
    (PinHandle::new(Port::C, 3), 9),
    (PinHandle::new(Port::A, 14), 10),
    (PinHandle::new(Port::A, 13), 11),
    (PinHandle::new(Port::B, 6), 13),
    (PinHandle::new(Port::B, 7), 14),
    (PinHandle::new(Port::C, 1), 15),
    (PinHandle::new(Port::C, 0), 16),
    (PinHandle::new(Port::B, 14), 17),
];

/// 查找引脚对应的 GPIO 编号
pub fn esp_gpio(pin: PinHandle) -> Option<i32> {
    WIRING.iter().find(|(h, _)| *h == pin).map(|(_, gpio)| *gpio)
}

pub struct EspBoard;

impl EspBoard {
    /// 把电源轨使能脚设为输入输出模式（可回读电平），不改变当前电平
    pub fn new() -> Result<Self, HardwareFault> {
        let ret = unsafe { sys::gpio_set_direction(RAIL_GPIO, sys::gpio_mode_t_GPIO_MODE_INPUT_OUTPUT) };
        esp!(ret).map_err(|e| HardwareFault::Rail(format!("初始化使能脚失败: {e}")))?;
        Ok(Self)
    }

    fn gpio(pin: PinHandle) -> Result<i32, HardwareFault> {
        esp_gpio(pin).ok_or_else(|| HardwareFault::Pin {
            pin,
            reason: "扩展板上没有接线".to_string(),
        })
    }
}

fn pin_fault(pin: PinHandle, what: &str, e: sys::EspError) -> HardwareFault {
    HardwareFault::Pin {
        pin,
        reason: format!("{what}: {e}"),
    }
}

impl PowerRail for EspBoard {
    fn rail_enabled(&mut self) -> Result<bool, HardwareFault> {
        Ok(unsafe { sys::gpio_get_level(RAIL_GPIO) } != 0)
    }

    fn enable_rail(&mut self) -> Result<(), HardwareFault> {
        let ret = unsafe { sys::gpio_set_level(RAIL_GPIO, 1) };
        esp!(ret).map_err(|e| HardwareFault::Rail(format!("打开失败: {e}")))
    }

    fn disable_rail(&mut self) -> Result<(), HardwareFault> {
        let ret = unsafe { sys::gpio_set_level(RAIL_GPIO, 0) };
        esp!(ret).map_err(|e| HardwareFault::Rail(format!("关闭失败: {e}")))
    }
}

impl GpioPort for EspBoard {
    fn set_mode(
        &mut self,
        pin: PinHandle,
        mode: PinMode,
        pull: Pull,
        speed: Speed,
    ) -> Result<(), HardwareFault> {
        let gpio = Self::gpio(pin)?;

        let mode = match mode {
            PinMode::Input => sys::gpio_mode_t_GPIO_MODE_INPUT,
            PinMode::OutputPushPull => sys::gpio_mode_t_GPIO_MODE_OUTPUT,
            // 开漏时仍需回读电平
            PinMode::OutputOpenDrain => sys::gpio_mode_t_GPIO_MODE_INPUT_OUTPUT_OD,
        };
        let pull = match pull {
            Pull::None => sys::gpio_pull_mode_t_GPIO_FLOATING,
            Pull::Up => sys::gpio_pull_mode_t_GPIO_PULLUP_ONLY,
            Pull::Down => sys::gpio_pull_mode_t_GPIO_PULLDOWN_ONLY,
        };
        let drive = match speed {
            Speed::Low => sys::gpio_drive_cap_t_GPIO_DRIVE_CAP_0,
            Speed::Medium => sys::gpio_drive_cap_t_GPIO_DRIVE_CAP_1,
            Speed::High => sys::gpio_drive_cap_t_GPIO_DRIVE_CAP_2,
            Speed::VeryHigh => sys::gpio_drive_cap_t_GPIO_DRIVE_CAP_3,
        };

        esp!(unsafe { sys::gpio_set_direction(gpio, mode) })
            .map_err(|e| pin_fault(pin, "设置方向失败", e))?;
        esp!(unsafe { sys::gpio_set_pull_mode(gpio, pull) })
            .map_err(|e| pin_fault(pin, "设置上下拉失败", e))?;
        esp!(unsafe { sys::gpio_set_drive_capability(gpio, drive) })
            .map_err(|e| pin_fault(pin, "设置驱动能力失败", e))?;
        Ok(())
    }

    fn write_line(&mut self, pin: PinHandle, high: bool) -> Result<(), HardwareFault> {
        let gpio = Self::gpio(pin)?;
        esp!(unsafe { sys::gpio_set_level(gpio, high as u32) })
            .map_err(|e| pin_fault(pin, "设置电平失败", e))
    }
}
