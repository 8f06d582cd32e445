//! 传感器引脚管理器
//!
//! 跟踪当前由本程序驱动的引脚和电源轨，保证注册表不再引用的引脚
//! 不会一直处于输出状态，退出时电源轨恢复到接管前的状态。

use crate::config::pins::PinHandle;
use crate::data::registry::Registry;
use crate::peripherals::hal::{Board, HardwareFault, PinMode, Pull, Speed};

/// 引脚管理器
///
/// 激活时按注册表中有效条目的顺序配置引脚，同一个引脚只配置一次。
pub struct GPIOManager<B: Board> {
    board: B,
    /// 当前处于激活状态的引脚
    managed_pins: Vec<PinHandle>,
    /// 电源轨是否由本管理器打开
    rail_owned: bool,
}

impl<B: Board> GPIOManager<B> {
    pub fn new(board: B) -> Self {
        Self {
            board,
            managed_pins: Vec::new(),
            rail_owned: false,
        }
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }

    pub fn is_active(&self) -> bool {
        !self.managed_pins.is_empty()
    }

    pub fn managed_pins(&self) -> &[PinHandle] {
        &self.managed_pins
    }

    pub fn owns_rail(&self) -> bool {
        self.rail_owned
    }

    /// 根据注册表激活引脚
    ///
    /// 已经激活的引脚会先被释放，再按新的条目集合重新配置。
    /// 没有有效条目时不再需要电源，由本管理器打开的电源轨会被关闭。
    /// 任何平台调用失败都会中止激活，已经配置的引脚会被尽量释放后返回错误。
    pub fn activate(&mut self, registry: &Registry) -> Result<(), HardwareFault> {
        self.release_pins()?;

        let mut pins: Vec<PinHandle> = Vec::new();
        for pin in registry.active_pins() {
            if !pins.contains(&pin) {
                pins.push(pin);
            }
        }
        if pins.is_empty() {
            log::debug!("没有需要激活的引脚");
            return self.deactivate();
        }

        self.ensure_rail()?;

        for pin in pins {
            if let Err(e) = self.configure_ready(pin) {
                log::error!("激活引脚 {pin} 失败: {e}");
                // 该引脚可能已被拉高但尚未记录
                let rested = self
                    .configure_rest(pin)
                    .or_else(|_| self.board.write_line(pin, false));
                if let Err(rest) = rested {
                    log::error!("复位引脚 {pin} 失败: {rest}");
                }
                if let Err(release) = self.deactivate() {
                    log::error!("回滚时释放引脚失败: {release}");
                }
                return Err(e);
            }
            self.managed_pins.push(pin);
        }

        log::info!("已激活 {} 个传感器引脚", self.managed_pins.len());
        Ok(())
    }

    /// 释放所有引脚，并在电源轨由本管理器打开时关闭它
    pub fn deactivate(&mut self) -> Result<(), HardwareFault> {
        self.release_pins()?;

        if self.rail_owned {
            self.board.disable_rail()?;
            self.rail_owned = false;
            log::info!("已关闭传感器电源");
        }
        Ok(())
    }

    /// 确保电源轨已打开
    ///
    /// 电源轨已被其它功能打开时不接管它；由这里打开时记录所有权，
    /// 之后 [`deactivate`](Self::deactivate) 会把它关掉。
    pub fn ensure_rail(&mut self) -> Result<(), HardwareFault> {
        if self.board.rail_enabled()? {
            return Ok(());
        }
        self.board.enable_rail()?;
        self.rail_owned = true;
        log::info!("已打开传感器电源");
        Ok(())
    }

    /// 空闲态：先拉高，再切到开漏输出 + 上拉
    fn configure_ready(&mut self, pin: PinHandle) -> Result<(), HardwareFault> {
        self.board.write_line(pin, true)?;
        self.board
            .set_mode(pin, PinMode::OutputOpenDrain, Pull::Up, Speed::VeryHigh)
    }

    /// 静止态：高阻输入，无上拉，数据线置低
    fn configure_rest(&mut self, pin: PinHandle) -> Result<(), HardwareFault> {
        self.board.set_mode(pin, PinMode::Input, Pull::None, Speed::Low)?;
        self.board.write_line(pin, false)
    }

    fn release_pins(&mut self) -> Result<(), HardwareFault> {
        // 出错时剩余的引脚仍然保留在列表中，下次释放会再次尝试
        while let Some(&pin) = self.managed_pins.last() {
            self.configure_rest(pin)?;
            self.managed_pins.pop();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::pins::label_to_handle;
    use crate::data::sensor_entry::{SensorEntry, SensorKind};
    use crate::peripherals::sim::{PinState, SimBoard};

    fn registry_with(labels: &[u8]) -> Registry {
        let mut registry = Registry::new();
        for (i, &label) in labels.iter().enumerate() {
            let entry = SensorEntry::with_name(
                &format!("S{i}"),
                SensorKind::Dht22,
                label_to_handle(label).unwrap(),
            )
            .unwrap();
            registry.push(entry).unwrap();
        }
        registry.finish_loading();
        registry
    }

    fn ready() -> PinState {
        PinState {
            mode: PinMode::OutputOpenDrain,
            pull: Pull::Up,
            speed: Speed::VeryHigh,
            high: true,
        }
    }

    fn rest() -> PinState {
        PinState {
            mode: PinMode::Input,
            pull: Pull::None,
            speed: Speed::Low,
            high: false,
        }
    }

    #[test]
    fn activation_enables_rail_and_readies_pins() {
        let mut manager = GPIOManager::new(SimBoard::new());
        manager.activate(&registry_with(&[7, 16])).unwrap();

        let board = manager.board();
        assert!(board.rail_on());
        assert!(manager.owns_rail());
        for label in [7, 16] {
            assert_eq!(board.pin(label_to_handle(label).unwrap()), Some(ready()));
        }
    }

    #[test]
    fn rail_is_restored_when_it_was_off() {
        let mut manager = GPIOManager::new(SimBoard::new());
        manager.activate(&registry_with(&[7])).unwrap();
        manager.deactivate().unwrap();

        assert!(!manager.board().rail_on());
        assert_eq!(manager.board().pin(label_to_handle(7).unwrap()), Some(rest()));
        assert!(!manager.is_active());
    }

    #[test]
    fn external_rail_is_left_enabled() {
        let mut board = SimBoard::new();
        board.set_rail(true);
        let mut manager = GPIOManager::new(board);

        manager.activate(&registry_with(&[7])).unwrap();
        assert!(!manager.owns_rail());
        manager.deactivate().unwrap();

        assert!(manager.board().rail_on());
    }

    #[test]
    fn empty_registry_touches_nothing() {
        let mut manager = GPIOManager::new(SimBoard::new());
        manager.activate(&registry_with(&[])).unwrap();

        assert!(!manager.board().rail_on());
        assert!(manager.board().calls().is_empty());
    }

    #[test]
    fn emptied_registry_turns_owned_rail_off() {
        let mut manager = GPIOManager::new(SimBoard::new());
        manager.activate(&registry_with(&[7])).unwrap();

        manager.activate(&registry_with(&[])).unwrap();

        assert!(!manager.is_active());
        assert!(!manager.owns_rail());
        assert!(!manager.board().rail_on());
        assert_eq!(manager.board().pin(label_to_handle(7).unwrap()), Some(rest()));
    }

    #[test]
    fn invalid_entries_are_not_driven() {
        let mut registry = registry_with(&[7, 16]);
        registry.get_mut(0).unwrap().invalidate();
        let mut manager = GPIOManager::new(SimBoard::new());

        manager.activate(&registry).unwrap();

        assert_eq!(manager.managed_pins(), [label_to_handle(16).unwrap()]);
        assert_eq!(manager.board().pin(label_to_handle(7).unwrap()), None);
    }

    #[test]
    fn shared_pin_is_configured_once() {
        let mut manager = GPIOManager::new(SimBoard::new());
        manager.activate(&registry_with(&[5, 5])).unwrap();
        assert_eq!(manager.managed_pins().len(), 1);
    }

    #[test]
    fn reactivation_releases_dropped_pins() {
        let mut manager = GPIOManager::new(SimBoard::new());
        manager.activate(&registry_with(&[7, 16])).unwrap();
        manager.activate(&registry_with(&[16])).unwrap();

        let board = manager.board();
        assert_eq!(board.pin(label_to_handle(7).unwrap()), Some(rest()));
        assert_eq!(board.pin(label_to_handle(16).unwrap()), Some(ready()));
        assert!(board.rail_on());
    }

    #[test]
    fn fault_aborts_and_releases_configured_pins() {
        let mut board = SimBoard::new();
        board.fail_on(label_to_handle(16).unwrap());
        let mut manager = GPIOManager::new(board);

        let result = manager.activate(&registry_with(&[7, 16]));

        assert!(matches!(result, Err(HardwareFault::Pin { .. })));
        assert!(!manager.is_active());
        assert!(!manager.board().rail_on());
        assert_eq!(manager.board().pin(label_to_handle(7).unwrap()), Some(rest()));
    }

    #[test]
    fn half_configured_pin_is_driven_low_on_fault() {
        let mut board = SimBoard::new();
        board.fail_mode_on(label_to_handle(16).unwrap());
        let mut manager = GPIOManager::new(board);

        assert!(manager.activate(&registry_with(&[7, 16])).is_err());

        let pin = manager.board().pin(label_to_handle(16).unwrap()).unwrap();
        assert!(!pin.high);
        assert!(!manager.board().rail_on());
    }

    #[test]
    fn ensure_rail_reclaims_a_dropped_rail() {
        let mut manager = GPIOManager::new(SimBoard::new());
        manager.activate(&registry_with(&[7])).unwrap();
        manager.board_mut().set_rail(false);

        manager.ensure_rail().unwrap();
        assert!(manager.board().rail_on());
        manager.deactivate().unwrap();
        assert!(!manager.board().rail_on());
    }
}
