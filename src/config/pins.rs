//! 引脚目录
//!
//! 外壳丝印编号（label）与内部电气标识（端口 + 线号）之间的双向映射。
//! 被设备其它功能占用的引脚不在表中，无法被查询到。

use core::fmt;

/// 外壳上印刷的引脚编号
pub type PinLabel = u8;

/// 查询失败时的编号哨兵值
pub const LABEL_NOT_FOUND: PinLabel = 255;

/// GPIO 控制器
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Port {
    A,
    B,
    C,
}

/// 引脚电气标识：控制器 + 线号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PinHandle {
    pub port: Port,
    pub line: u8,
}

impl PinHandle {
    pub const fn new(port: Port, line: u8) -> Self {
        Self { port, line }
    }
}

impl fmt::Display for PinHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{:?}{}", self.port, self.line)
    }
}

/// 目录中的一项
#[derive(Debug, Clone, Copy)]
pub struct PinItem {
    pub label: PinLabel,
    pub handle: PinHandle,
}

/// 可用引脚表
///
/// 顺序即菜单中的显示顺序：
/// - 2-7: 扩展口 A7, A6, A4, B3, B2, C3
/// - 10, 12: 调试口 SWC (A14), SIO (A13)
/// - 13, 14: 串口 TX (B6), RX (B7)
/// - 15-17: C1, C0, 1-Wire (B14)
pub const PIN_CATALOG: [PinItem; 13] = [
    PinItem { label: 2, handle: PinHandle::new(Port::A, 7) },
    PinItem { label: 3, handle: PinHandle::new(Port::A, 6) },
    PinItem { label: 4, handle: PinHandle::new(Port::A, 4) },
    PinItem { label: 5, handle: PinHandle::new(Port::B, 3) },
    PinItem { label: 6, handle: PinHandle::new(Port::B, 2) },
    PinItem { label: 7, handle: PinHandle::new(Port::C, 3) },
    PinItem { label: 10, handle: PinHandle::new(Port::A, 14) },
    PinItem { label: 12, handle: PinHandle::new(Port::A, 13) },
    PinItem { label: 13, handle: PinHandle::new(Port::B, 6) },
    PinItem { label: 14, handle: PinHandle::new(Port::B, 7) },
    PinItem { label: 15, handle: PinHandle::new(Port::C, 1) },
    PinItem { label: 16, handle: PinHandle::new(Port::C, 0) },
    PinItem { label: 17, handle: PinHandle::new(Port::B, 14) },
];

/// 丝印编号 -> 电气标识
pub fn label_to_handle(label: PinLabel) -> Option<PinHandle> {
    PIN_CATALOG
        .iter()
        .find(|item| item.label == label)
        .map(|item| item.handle)
}

/// 电气标识 -> 丝印编号
///
/// 不在表中的引脚返回 `None`，见 [`label_or_sentinel`]
pub fn handle_to_label(handle: PinHandle) -> Option<PinLabel> {
    PIN_CATALOG
        .iter()
        .find(|item| item.handle == handle)
        .map(|item| item.label)
}

/// 同 [`handle_to_label`]，查不到时返回 [`LABEL_NOT_FOUND`]
pub fn label_or_sentinel(handle: PinHandle) -> PinLabel {
    handle_to_label(handle).unwrap_or(LABEL_NOT_FOUND)
}

/// 按目录顺序取第 `index` 个引脚
pub fn nth_handle(index: usize) -> Option<PinHandle> {
    PIN_CATALOG.get(index).map(|item| item.handle)
}

/// 引脚在目录中的位置
pub fn position_of(handle: PinHandle) -> Option<usize> {
    PIN_CATALOG.iter().position(|item| item.handle == handle)
}

pub fn pin_count() -> usize {
    PIN_CATALOG.len()
}

/// 所有可用编号，用于文件头和菜单
pub fn labels() -> impl Iterator<Item = PinLabel> {
    PIN_CATALOG.iter().map(|item| item.label)
}

/// 校验目录本身：编号与标识都不能重复
///
/// # 返回
/// * `Ok(())` - 目录是双射
/// * `Err(String)` - 包含重复项的描述
pub fn validate_catalog(catalog: &[PinItem]) -> Result<(), String> {
    for i in 0..catalog.len() {
        for j in (i + 1)..catalog.len() {
            if catalog[i].label == catalog[j].label {
                return Err(format!("编号 {} 被重复使用", catalog[i].label));
            }
            if catalog[i].handle == catalog[j].handle {
                return Err(format!("引脚 {} 被重复使用", catalog[i].handle));
            }
        }
        if catalog[i].label == LABEL_NOT_FOUND {
            return Err(format!("编号 {LABEL_NOT_FOUND} 是保留值"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_a_bijection() {
        assert!(validate_catalog(&PIN_CATALOG).is_ok());
    }

    #[test]
    fn every_label_maps_back_to_itself() {
        for label in labels() {
            let handle = label_to_handle(label).unwrap();
            assert_eq!(handle_to_label(handle), Some(label));
        }
    }

    #[test]
    fn reserved_pins_are_not_found() {
        // SWD 之外的 A 口其它线、以及屏幕占用的引脚都不在表中
        let reserved = [
            PinHandle::new(Port::A, 0),
            PinHandle::new(Port::B, 8),
            PinHandle::new(Port::C, 13),
        ];
        for handle in reserved {
            assert_eq!(handle_to_label(handle), None);
            assert_eq!(label_or_sentinel(handle), LABEL_NOT_FOUND);
        }
    }

    #[test]
    fn unknown_labels_are_not_found() {
        for label in [0, 1, 8, 9, 11, 18, 255] {
            assert_eq!(label_to_handle(label), None);
        }
    }

    #[test]
    fn nth_handle_follows_table_order() {
        assert_eq!(nth_handle(0), Some(PinHandle::new(Port::A, 7)));
        assert_eq!(nth_handle(5), label_to_handle(7));
        assert_eq!(nth_handle(12), label_to_handle(17));
        assert_eq!(nth_handle(13), None);
        assert_eq!(position_of(PinHandle::new(Port::C, 0)), Some(11));
    }

    #[test]
    fn duplicate_labels_are_rejected() {
        let broken = [
            PinItem { label: 2, handle: PinHandle::new(Port::A, 7) },
            PinItem { label: 2, handle: PinHandle::new(Port::A, 6) },
        ];
        assert!(validate_catalog(&broken).is_err());
    }

    #[test]
    fn handle_display_names_port_and_line() {
        assert_eq!(PinHandle::new(Port::B, 14).to_string(), "PB14");
    }
}
