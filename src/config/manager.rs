//! 传感器管理器
//!
//! 把注册表、配置文件和引脚管理器组合在一起，对外提供加载、重载、
//! 保存以及引脚激活/释放操作。磁盘上的文件始终是激活引脚的依据：
//! 每次修改都先写文件，再从文件重新加载。

use crate::config::gpio_manager::GPIOManager;
use crate::data::reading::Reading;
use crate::data::registry::{Registry, RegistryError, RegistryState};
use crate::data::sensor_entry::{SensorEntry, SensorName};
use crate::peripherals::hal::{Board, HardwareFault};
use crate::peripherals::temperature_sensor::{SampleError, Sampler};
use crate::storage::config_store::{ConfigStore, StorageError};
use crate::storage::sensors_file::{self, LoadOutcome};

pub struct SensorManager<B: Board, S: ConfigStore> {
    registry: Registry,
    store: S,
    gpio: GPIOManager<B>,
}

impl<B: Board, S: ConfigStore> SensorManager<B, S> {
    /// 创建管理器，注册表处于 `Loading` 状态，直到第一次加载
    pub fn new(board: B, store: S) -> Self {
        Self {
            registry: Registry::new(),
            store,
            gpio: GPIOManager::new(board),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn state(&self) -> RegistryState {
        self.registry.state()
    }

    pub fn gpio(&self) -> &GPIOManager<B> {
        &self.gpio
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// 从文件加载传感器并激活引脚
    ///
    /// 加载前先释放当前引脚，文件中不再引用的引脚不会保持通电。
    ///
    /// # 返回
    /// * `Ok(true)` - 至少加载了一个有效传感器
    /// * `Ok(false)` - 没有传感器，或文件读取失败（错误已记录）
    /// * `Err(HardwareFault)` - 引脚或电源轨配置失败
    pub fn load_registry(&mut self) -> Result<bool, HardwareFault> {
        self.gpio.deactivate()?;

        let loaded = match sensors_file::read_sensors(&mut self.store, &mut self.registry) {
            Ok(LoadOutcome::Loaded(n)) => n,
            Ok(_) => 0,
            Err(e) => {
                log::error!("加载传感器失败: {e}");
                0
            }
        };

        if loaded == 0 {
            return Ok(false);
        }
        self.gpio.activate(&self.registry)?;
        Ok(true)
    }

    /// 修改保存后从文件重新加载
    pub fn reload_registry(&mut self) -> Result<bool, HardwareFault> {
        log::debug!("重新加载传感器");
        self.load_registry()
    }

    /// 把注册表中的有效条目写入文件，返回写入的数量
    pub fn save_registry(&mut self) -> Result<usize, StorageError> {
        sensors_file::write_sensors(&mut self.store, &self.registry).inspect_err(|e| {
            log::error!("无法保存传感器文件: {e}");
        })
    }

    pub fn activate_pins(&mut self) -> Result<(), HardwareFault> {
        self.gpio.activate(&self.registry)
    }

    pub fn deactivate_pins(&mut self) -> Result<(), HardwareFault> {
        self.gpio.deactivate()
    }

    /// 追加条目（不预先校验），满时拒绝
    pub fn append(&mut self, entry: SensorEntry) -> Result<usize, RegistryError> {
        self.registry.push(entry).inspect_err(|e| {
            log::warn!("无法添加传感器: {e}");
        })
    }

    /// 删除第 `index` 个条目：标记无效、保存、重新加载
    pub fn delete(&mut self, index: usize) -> Result<SensorName, ManagerError> {
        let entry = self.registry.get_mut(index)?;
        let name = entry.name.clone();
        entry.invalidate();
        log::info!("删除传感器 {name}");

        if let Err(e) = self.save_registry() {
            // 保存失败时从文件恢复，注册表里不留空白条目
            if let Err(reload) = self.reload_registry() {
                log::error!("重新加载失败: {reload}");
            }
            return Err(e.into());
        }
        self.reload_registry()?;
        Ok(name)
    }

    /// 依次读取所有有效传感器
    pub fn sample_all(
        &mut self,
        sampler: &mut impl Sampler,
    ) -> Vec<(SensorName, Result<Reading, SampleError>)> {
        if !self.gpio.is_active() {
            return Vec::new();
        }
        // 电源轨可能被外部关闭
        if let Err(e) = self.gpio.ensure_rail() {
            log::error!("{e}");
        }

        let mut readings = Vec::new();
        for entry in self.registry.valid_entries() {
            let Some(kind) = entry.kind else { continue };
            let result = sampler.sample(entry.pin, kind);
            if let Err(e) = &result {
                log::debug!("传感器 {} 读取失败: {e}", entry.name);
            }
            readings.push((entry.name.clone(), result));
        }
        readings
    }
}

/// 组合操作（删除、提交）可能出现的错误
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Hardware(#[from] HardwareFault),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::pins::label_to_handle;
    use crate::data::sensor_entry::SensorKind;
    use crate::peripherals::sim::{SimBoard, SimSampler};
    use crate::storage::config_store::FsStore;
    use tempfile::TempDir;

    /// 可以让写入失败的文件存储
    struct FlakyStore {
        inner: FsStore,
        fail_writes: bool,
    }

    impl ConfigStore for FlakyStore {
        fn load(&mut self) -> Result<Option<Vec<u8>>, StorageError> {
            self.inner.load()
        }

        fn store(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
            if self.fail_writes {
                return Err(std::io::Error::other("disk full").into());
            }
            self.inner.store(bytes)
        }
    }

    fn manager_with(dir: &TempDir, text: Option<&str>) -> SensorManager<SimBoard, FsStore> {
        let path = dir.path().join("sensors.txt");
        if let Some(text) = text {
            std::fs::write(&path, text).unwrap();
        }
        SensorManager::new(SimBoard::new(), FsStore::new(path))
    }

    fn names(manager: &SensorManager<SimBoard, FsStore>) -> Vec<String> {
        manager
            .registry()
            .iter()
            .map(|e| e.name.to_string())
            .collect()
    }

    #[test]
    fn load_activates_pins_for_the_example_file() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager_with(&dir, Some("Room 0 7\nGarage 1 16\n"));
        assert_eq!(manager.state(), RegistryState::Loading);

        assert!(manager.load_registry().unwrap());

        assert_eq!(manager.state(), RegistryState::Populated(2));
        assert!(manager.gpio().board().rail_on());
        assert_eq!(
            manager.gpio().managed_pins(),
            [label_to_handle(7).unwrap(), label_to_handle(16).unwrap()]
        );
    }

    #[test]
    fn missing_file_loads_nothing_and_creates_it() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager_with(&dir, None);

        assert!(!manager.load_registry().unwrap());

        assert_eq!(manager.state(), RegistryState::Empty);
        assert!(dir.path().join("sensors.txt").exists());
        assert!(!manager.gpio().board().rail_on());
    }

    #[test]
    fn delete_removes_exactly_one_entry() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager_with(&dir, Some("A 0 2\nB 1 3\nC 0 4\n"));
        manager.load_registry().unwrap();

        let removed = manager.delete(1).unwrap();

        assert_eq!(removed.as_str(), "B");
        assert_eq!(names(&manager), ["A", "C"]);
        let text = std::fs::read_to_string(dir.path().join("sensors.txt")).unwrap();
        assert!(text.ends_with("A 0 2\nC 0 4\n"));
        // 被删除传感器的引脚已被释放
        let pin = label_to_handle(3).unwrap();
        assert!(!manager.gpio().managed_pins().contains(&pin));
        assert_eq!(manager.gpio().board().pin(pin).map(|s| s.high), Some(false));
    }

    #[test]
    fn deleting_the_last_sensor_turns_the_rail_off() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager_with(&dir, Some("Only 1 5\n"));
        manager.load_registry().unwrap();

        manager.delete(0).unwrap();

        assert_eq!(manager.state(), RegistryState::Empty);
        assert!(!manager.gpio().board().rail_on());
    }

    #[test]
    fn reload_with_no_sensors_left_releases_pins() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager_with(&dir, Some("Room 0 7\n"));
        assert!(manager.load_registry().unwrap());

        std::fs::write(dir.path().join("sensors.txt"), "#nothing\n").unwrap();
        assert!(!manager.load_registry().unwrap());

        assert_eq!(manager.state(), RegistryState::Empty);
        assert!(manager.gpio().managed_pins().is_empty());
        assert!(!manager.gpio().board().rail_on());
        let pin = manager.gpio().board().pin(label_to_handle(7).unwrap()).unwrap();
        assert!(!pin.high);
    }

    #[test]
    fn failed_save_during_delete_restores_the_entry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sensors.txt");
        std::fs::write(&path, "Room 0 7\nGarage 1 16\n").unwrap();
        let store = FlakyStore {
            inner: FsStore::new(path),
            fail_writes: false,
        };
        let mut manager = SensorManager::new(SimBoard::new(), store);
        manager.load_registry().unwrap();
        manager.store.fail_writes = true;

        let result = manager.delete(0);

        assert!(matches!(result, Err(ManagerError::Storage(_))));
        let remaining: Vec<_> = manager.registry().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(remaining, ["Room", "Garage"]);
        assert!(manager.gpio().is_active());
        assert!(manager.registry().iter().all(SensorEntry::is_valid));
    }

    #[test]
    fn delete_out_of_range_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager_with(&dir, Some("Only 1 5\n"));
        manager.load_registry().unwrap();
        assert!(matches!(
            manager.delete(4),
            Err(ManagerError::Registry(RegistryError::IndexOutOfRange(4)))
        ));
    }

    #[test]
    fn save_returns_the_number_of_rows() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager_with(&dir, Some("Room 0 7\n"));
        manager.load_registry().unwrap();
        manager
            .append(SensorEntry::with_name("Attic", SensorKind::Dht22, label_to_handle(2).unwrap()).unwrap())
            .unwrap();
        manager
            .append(SensorEntry::with_name("", SensorKind::Dht22, label_to_handle(3).unwrap()).unwrap())
            .unwrap();

        assert_eq!(manager.save_registry().unwrap(), 2);
    }

    #[test]
    fn sampling_reports_timeouts_per_sensor() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager_with(&dir, Some("Room 0 7\nGarage 1 16\n"));
        manager.load_registry().unwrap();
        let mut sampler = SimSampler::new();
        sampler.silence(label_to_handle(16).unwrap());

        let readings = manager.sample_all(&mut sampler);

        assert_eq!(readings.len(), 2);
        assert!(readings[0].1.is_ok());
        assert_eq!(readings[1].1, Err(SampleError::Timeout));
    }
}
