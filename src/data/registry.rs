//! 传感器注册表
//!
//! 固定容量的有序列表，插入顺序即显示顺序和激活顺序。

use heapless::Vec;
use thiserror::Error;

use crate::config::pins::PinHandle;
use crate::config::settings::MAX_SENSORS;
use crate::data::sensor_entry::SensorEntry;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("传感器数量已达上限 {MAX_SENSORS}")]
    CapacityExceeded,

    #[error("无效的传感器序号: {0}")]
    IndexOutOfRange(usize),
}

/// 注册表对外可见的三种状态，主界面据此显示不同内容
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    /// 正在从文件加载
    Loading,
    /// 加载完成，没有传感器
    Empty,
    /// 已加载的条目数量（可能包含编辑中暂时无效的条目）
    Populated(usize),
}

#[derive(Debug, Clone)]
pub struct Registry {
    entries: Vec<SensorEntry, MAX_SENSORS>,
    loaded: bool,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// 新建的注册表处于 `Loading` 状态
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            loaded: false,
        }
    }

    pub fn state(&self) -> RegistryState {
        match (self.loaded, self.entries.len()) {
            (false, _) => RegistryState::Loading,
            (true, 0) => RegistryState::Empty,
            (true, n) => RegistryState::Populated(n),
        }
    }

    /// 清空条目并回到 `Loading` 状态
    pub fn begin_loading(&mut self) {
        self.entries.clear();
        self.loaded = false;
    }

    /// 加载结束（无论成功与否）
    pub fn finish_loading(&mut self) {
        self.loaded = true;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.is_full()
    }

    pub fn capacity(&self) -> usize {
        MAX_SENSORS
    }

    /// 追加条目，满时拒绝且不修改注册表
    pub fn push(&mut self, entry: SensorEntry) -> Result<usize, RegistryError> {
        self.entries
            .push(entry)
            .map_err(|_| RegistryError::CapacityExceeded)?;
        Ok(self.entries.len() - 1)
    }

    pub fn get(&self, index: usize) -> Option<&SensorEntry> {
        self.entries.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut SensorEntry, RegistryError> {
        self.entries
            .get_mut(index)
            .ok_or(RegistryError::IndexOutOfRange(index))
    }

    /// 原位替换
    pub fn replace(&mut self, index: usize, entry: SensorEntry) -> Result<(), RegistryError> {
        *self.get_mut(index)? = entry;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &SensorEntry> {
        self.entries.iter()
    }

    /// 只返回有效条目，保持原有顺序
    pub fn valid_entries(&self) -> impl Iterator<Item = &SensorEntry> {
        self.entries.iter().filter(|e| e.is_valid())
    }

    /// 有效条目使用的引脚（按顺序，可能重复）
    pub fn active_pins(&self) -> impl Iterator<Item = PinHandle> + '_ {
        self.valid_entries().map(|e| e.pin)
    }
}
