//! sensors.txt 的编解码
//!
//! 文件格式：`#` 开头的行为注释，其余非空行为 `<名称> <型号> <引脚编号>`。
//! 写入时整体重写，只保存有效条目；读取时跳过任何无法识别的行。

use std::fmt::Write as _;

use crate::config::pins;
use crate::data::registry::Registry;
use crate::data::sensor_entry::{self, SensorEntry, SensorKind};
use crate::storage::config_store::{ConfigStore, StorageError};

/// 每次保存都会写在文件开头
pub const FILE_HEADER: &str = "#DHT monitor sensors file\n\
#Name - name of sensor. Up to 10 symbols\n\
#Type - type of sensor. DHT11 - 0, DHT22 - 1\n\
#GPIO - connection port. May be 2-7, 10, 12-17\n\
#Name Type GPIO\n";

/// 一次加载的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// 文件不存在，已创建只有文件头的新文件
    Missing,
    /// 文件长度为 0
    Empty,
    /// 解析完成，载入的有效条目数量
    Loaded(usize),
}

impl LoadOutcome {
    pub fn count(self) -> usize {
        match self {
            LoadOutcome::Loaded(n) => n,
            _ => 0,
        }
    }
}

/// 把注册表编码为文件内容，返回内容和写入的条目行数
pub fn encode(registry: &Registry) -> (String, usize) {
    let mut text = String::from(FILE_HEADER);
    let mut lines = 0;
    for entry in registry.valid_entries() {
        // valid_entries 已保证型号和引脚编号存在
        let (Some(kind), Some(label)) = (entry.kind, entry.label()) else {
            continue;
        };
        let _ = writeln!(text, "{} {} {}", entry.name, kind.code(), label);
        lines += 1;
    }
    (text, lines)
}

/// 保存注册表，返回写入的传感器数量
pub fn write_sensors(
    store: &mut impl ConfigStore,
    registry: &Registry,
) -> Result<usize, StorageError> {
    let (text, lines) = encode(registry);
    store.store(text.as_bytes())?;
    log::info!("已保存 {lines} 个传感器");
    Ok(lines)
}

/// 解析一行 `<名称> <型号> <引脚编号>`，不合法时返回 `None`
pub fn parse_line(line: &str) -> Option<SensorEntry> {
    let mut fields = line.split_whitespace();
    let (name, kind, label) = (fields.next()?, fields.next()?, fields.next()?);
    if fields.next().is_some() {
        return None;
    }

    let kind = SensorKind::from_code(kind.parse().ok()?)?;
    let pin = pins::label_to_handle(label.parse().ok()?)?;
    let entry = SensorEntry::new(sensor_entry::make_name(name)?, kind, pin);

    sensor_entry::validate(&entry).then_some(entry)
}

/// 把文件内容追加到注册表，返回载入的条目数量
pub fn decode_into(text: &str, registry: &mut Registry) -> usize {
    let mut loaded = 0;
    for (number, line) in text.split('\n').enumerate() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(entry) = parse_line(line) else {
            log::warn!("忽略第 {} 行: {line:?}", number + 1);
            continue;
        };
        if registry.push(entry).is_err() {
            log::warn!("传感器数量已满，忽略第 {} 行", number + 1);
            continue;
        }
        loaded += 1;
    }
    loaded
}

/// 从存储重新加载注册表
///
/// 注册表先被清空并进入 `Loading` 状态，返回前一定会结束加载。
/// 文件不存在时会写入一个只有文件头的新文件；读取出错时注册表保持为空。
pub fn read_sensors(
    store: &mut impl ConfigStore,
    registry: &mut Registry,
) -> Result<LoadOutcome, StorageError> {
    registry.begin_loading();

    let bytes = match store.load() {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            log::warn!("传感器文件不存在，创建新文件");
            registry.finish_loading();
            if let Err(e) = write_sensors(store, registry) {
                log::error!("创建传感器文件失败: {e}");
            }
            return Ok(LoadOutcome::Missing);
        }
        Err(e) => {
            log::error!("读取传感器文件失败: {e}");
            registry.finish_loading();
            return Err(e);
        }
    };

    if bytes.is_empty() {
        log::warn!("传感器文件为空");
        registry.finish_loading();
        return Ok(LoadOutcome::Empty);
    }

    let text = String::from_utf8_lossy(&bytes);
    let loaded = decode_into(&text, registry);
    registry.finish_loading();
    log::info!("已加载 {loaded} 个传感器");
    Ok(LoadOutcome::Loaded(loaded))
}
