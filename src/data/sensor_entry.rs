//! 传感器条目与校验

use core::fmt;

use heapless::String;

use crate::config::pins::{self, PinHandle, PinLabel};
use crate::config::settings::MAX_NAME_LEN;

/// 有长度上限的传感器名称
pub type SensorName = String<MAX_NAME_LEN>;

/// 支持的传感器型号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    Dht11,
    Dht22,
}

impl SensorKind {
    /// 菜单中的可选型号，顺序即文件中的编码
    pub const ALL: [SensorKind; 2] = [SensorKind::Dht11, SensorKind::Dht22];

    pub fn code(self) -> u8 {
        match self {
            SensorKind::Dht11 => 0,
            SensorKind::Dht22 => 1,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            SensorKind::Dht11 => "DHT11",
            SensorKind::Dht22 => "DHT22",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 一个已配置的传感器
///
/// 编辑过程中条目可以暂时处于无效状态（例如被删除时清空名称、
/// 型号置为 `None`），无效条目不会被写入文件，也不会被激活。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorEntry {
    pub name: SensorName,
    pub kind: Option<SensorKind>,
    pub pin: PinHandle,
}

impl SensorEntry {
    pub fn new(name: SensorName, kind: SensorKind, pin: PinHandle) -> Self {
        Self {
            name,
            kind: Some(kind),
            pin,
        }
    }

    /// 从字符串构造，名称超长时返回 `None`
    pub fn with_name(name: &str, kind: SensorKind, pin: PinHandle) -> Option<Self> {
        let name = make_name(name)?;
        Some(Self::new(name, kind, pin))
    }

    /// 标记为无效，下次保存时会被丢弃
    pub fn invalidate(&mut self) {
        self.name.clear();
        self.kind = None;
    }

    pub fn is_valid(&self) -> bool {
        validate(self)
    }

    pub fn label(&self) -> Option<PinLabel> {
        pins::handle_to_label(self.pin)
    }
}

/// 把字符串转换为有界名称，超过 [`MAX_NAME_LEN`] 个字节时失败
pub fn make_name(name: &str) -> Option<SensorName> {
    SensorName::try_from(name).ok()
}

/// 截断到 [`MAX_NAME_LEN`] 个字节以内（按字符边界），用于文本输入的回写
pub fn truncate_name(name: &str) -> SensorName {
    let mut out = SensorName::new();
    for ch in name.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}

/// 名称规则：1-10 个字符，不以空格开头，不含空白（文件以空格分隔字段）
pub fn name_is_valid(name: &str) -> bool {
    let len = name.chars().count();
    (1..=MAX_NAME_LEN).contains(&len)
        && !name.starts_with(' ')
        && !name.chars().any(char::is_whitespace)
}

/// 判断条目是否可以保存和激活
///
/// 依次检查名称、型号、引脚，任意一项不通过即无效。
pub fn validate(entry: &SensorEntry) -> bool {
    if !name_is_valid(&entry.name) {
        log::debug!("传感器名称无效: {:?}", entry.name.as_str());
        return false;
    }
    if entry.kind.is_none() {
        log::debug!("传感器 {} 型号无效", entry.name);
        return false;
    }
    if pins::handle_to_label(entry.pin).is_none() {
        log::debug!("传感器 {} 引脚 {} 不可用", entry.name, entry.pin);
        return false;
    }
    true
}
