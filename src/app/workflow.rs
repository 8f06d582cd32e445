//! 传感器编辑流程
//!
//! 浏览 -> 添加（名称 -> 型号 -> 引脚 -> 保存）-> 浏览，
//! 或 浏览 -> 操作（编辑 / 删除）-> 浏览。
//! 离开浏览界面时总会从文件重新加载一次注册表。

use crate::config::manager::{ManagerError, SensorManager};
use crate::config::pins;
use crate::config::settings::DEFAULT_SENSOR_NAME;
use crate::data::registry::Registry;
use crate::data::sensor_entry::{self, SensorEntry, SensorKind};
use crate::peripherals::hal::Board;
use crate::storage::config_store::ConfigStore;

pub const ADD_ROW: &str = "+ Add new sensor +";
pub const NAME_HEADER: &str = "Sensor name";
const ACTION_ROWS: [&str; 2] = ["Edit", "Delete"];

/// 输入事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditEvent {
    Up,
    Down,
    Left,
    Right,
    Ok,
    Back,
    /// 文本输入完成
    NameSubmitted(String),
}

/// 添加/编辑界面中当前所在的行
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddStep {
    /// 文本输入打开中
    NameEntry,
    KindSelect,
    PinSelect,
    Confirm,
}

/// 正在编辑的条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub entry: SensorEntry,
    kind_index: usize,
    pin_index: usize,
    /// 编辑已有条目时为其序号，新建时为 `None`
    pub target: Option<usize>,
}

impl Draft {
    fn new() -> Self {
        let kind_index = 0;
        let pin_index = 0;
        // 目录至少有一个引脚
        let pin = pins::nth_handle(pin_index).unwrap_or(pins::PIN_CATALOG[0].handle);
        Self {
            entry: SensorEntry::new(
                sensor_entry::truncate_name(DEFAULT_SENSOR_NAME),
                SensorKind::ALL[kind_index],
                pin,
            ),
            kind_index,
            pin_index,
            target: None,
        }
    }

    fn from_entry(index: usize, entry: &SensorEntry) -> Self {
        let kind_index = entry
            .kind
            .and_then(|k| SensorKind::ALL.iter().position(|&x| x == k))
            .unwrap_or(0);
        let pin_index = pins::position_of(entry.pin).unwrap_or(0);
        let mut draft = Self::new();
        draft.entry.name = entry.name.clone();
        draft.kind_index = kind_index;
        draft.pin_index = pin_index;
        draft.sync();
        draft.target = Some(index);
        draft
    }

    fn cycle_kind(&mut self, forward: bool) {
        self.kind_index = cycle(self.kind_index, SensorKind::ALL.len(), forward);
        self.sync();
    }

    fn cycle_pin(&mut self, forward: bool) {
        self.pin_index = cycle(self.pin_index, pins::pin_count(), forward);
        self.sync();
    }

    fn sync(&mut self) {
        self.entry.kind = Some(SensorKind::ALL[self.kind_index]);
        if let Some(pin) = pins::nth_handle(self.pin_index) {
            self.entry.pin = pin;
        }
    }

    pub fn kind_text(&self) -> &'static str {
        SensorKind::ALL[self.kind_index].label()
    }

    pub fn pin_text(&self) -> String {
        pins::PIN_CATALOG[self.pin_index].label.to_string()
    }
}

fn cycle(index: usize, len: usize, forward: bool) -> usize {
    if forward {
        (index + 1) % len
    } else {
        (index + len - 1) % len
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditState {
    Browse { cursor: usize },
    Actions { index: usize, cursor: usize },
    Add { step: AddStep, draft: Draft },
    Finished,
}

/// 一行菜单
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuRow {
    pub text: String,
    pub selected: bool,
}

impl MenuRow {
    fn new(text: impl Into<String>, selected: bool) -> Self {
        Self {
            text: text.into(),
            selected,
        }
    }
}

/// 一次编辑会话
///
/// 会话期间独占注册表，结束前一定会从文件重新加载。
#[derive(Debug)]
pub struct EditSession {
    state: EditState,
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EditSession {
    pub fn new() -> Self {
        Self {
            state: EditState::Browse { cursor: 0 },
        }
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == EditState::Finished
    }

    /// 需要打开文本输入时返回标题和初始内容
    pub fn name_request(&self) -> Option<(&'static str, &str)> {
        match &self.state {
            EditState::Add {
                step: AddStep::NameEntry,
                draft,
            } => Some((NAME_HEADER, draft.entry.name.as_str())),
            _ => None,
        }
    }

    /// 处理一个事件
    ///
    /// 出错时会话回到浏览界面，注册表保持一致。
    pub fn handle<B: Board, S: ConfigStore>(
        &mut self,
        event: EditEvent,
        manager: &mut SensorManager<B, S>,
    ) -> Result<(), ManagerError> {
        let state = std::mem::replace(&mut self.state, EditState::Finished);
        let (next, result) = match state {
            EditState::Browse { cursor } => self.on_browse(cursor, event, manager),
            EditState::Actions { index, cursor } => Self::on_actions(index, cursor, event, manager),
            EditState::Add { step, draft } => Self::on_add(step, draft, event, manager),
            EditState::Finished => (EditState::Finished, Ok(())),
        };
        self.state = next;
        result
    }

    /// 结束会话：从文件重新加载注册表并重新激活引脚
    pub fn exit<B: Board, S: ConfigStore>(
        &mut self,
        manager: &mut SensorManager<B, S>,
    ) -> Result<(), ManagerError> {
        self.state = EditState::Finished;
        manager.reload_registry()?;
        Ok(())
    }

    fn on_browse<B: Board, S: ConfigStore>(
        &mut self,
        cursor: usize,
        event: EditEvent,
        manager: &mut SensorManager<B, S>,
    ) -> (EditState, Result<(), ManagerError>) {
        // 最后一行是“添加”
        let rows = manager.registry().len() + 1;
        let cursor = cursor.min(rows - 1);
        let next = match event {
            EditEvent::Up => EditState::Browse {
                cursor: cycle(cursor, rows, false),
            },
            EditEvent::Down => EditState::Browse {
                cursor: cycle(cursor, rows, true),
            },
            EditEvent::Ok if cursor == rows - 1 => EditState::Add {
                step: AddStep::NameEntry,
                draft: Draft::new(),
            },
            EditEvent::Ok => EditState::Actions { index: cursor, cursor: 0 },
            EditEvent::Back => {
                log::info!("退出传感器菜单");
                return (EditState::Finished, self.exit(manager));
            }
            _ => EditState::Browse { cursor },
        };
        (next, Ok(()))
    }

    fn on_actions<B: Board, S: ConfigStore>(
        index: usize,
        cursor: usize,
        event: EditEvent,
        manager: &mut SensorManager<B, S>,
    ) -> (EditState, Result<(), ManagerError>) {
        let back = EditState::Browse { cursor: index };
        match event {
            EditEvent::Up | EditEvent::Down => (
                EditState::Actions {
                    index,
                    cursor: cycle(cursor, ACTION_ROWS.len(), event == EditEvent::Down),
                },
                Ok(()),
            ),
            EditEvent::Ok if cursor == 0 => match manager.registry().get(index) {
                Some(entry) => (
                    EditState::Add {
                        step: AddStep::NameEntry,
                        draft: Draft::from_entry(index, entry),
                    },
                    Ok(()),
                ),
                None => (back, Ok(())),
            },
            EditEvent::Ok => {
                let result = manager.delete(index).map(|_| ());
                (EditState::Browse { cursor: 0 }, result)
            }
            EditEvent::Back => (back, Ok(())),
            _ => (EditState::Actions { index, cursor }, Ok(())),
        }
    }

    fn on_add<B: Board, S: ConfigStore>(
        step: AddStep,
        mut draft: Draft,
        event: EditEvent,
        manager: &mut SensorManager<B, S>,
    ) -> (EditState, Result<(), ManagerError>) {
        if event == EditEvent::Back {
            log::debug!("放弃编辑 {}", draft.entry.name);
            let cursor = draft.target.unwrap_or(manager.registry().len());
            return (EditState::Browse { cursor }, Ok(()));
        }

        let step = match (step, event) {
            (AddStep::NameEntry, EditEvent::NameSubmitted(name)) => {
                draft.entry.name = sensor_entry::truncate_name(&name);
                AddStep::KindSelect
            }
            (AddStep::NameEntry, _) => AddStep::NameEntry,

            (AddStep::KindSelect, EditEvent::Left) => {
                draft.cycle_kind(false);
                AddStep::KindSelect
            }
            (AddStep::KindSelect, EditEvent::Right) => {
                draft.cycle_kind(true);
                AddStep::KindSelect
            }
            (AddStep::KindSelect, EditEvent::Up) => AddStep::NameEntry,
            (AddStep::KindSelect, EditEvent::Down | EditEvent::Ok) => AddStep::PinSelect,

            (AddStep::PinSelect, EditEvent::Left) => {
                draft.cycle_pin(false);
                AddStep::PinSelect
            }
            (AddStep::PinSelect, EditEvent::Right) => {
                draft.cycle_pin(true);
                AddStep::PinSelect
            }
            (AddStep::PinSelect, EditEvent::Up) => AddStep::KindSelect,
            (AddStep::PinSelect, EditEvent::Down | EditEvent::Ok) => AddStep::Confirm,

            (AddStep::Confirm, EditEvent::Up) => AddStep::PinSelect,
            (AddStep::Confirm, EditEvent::Ok) => {
                let cursor = draft.target.unwrap_or(manager.registry().len());
                let result = Self::commit(draft, manager);
                return (EditState::Browse { cursor }, result);
            }

            (step, _) => step,
        };
        (EditState::Add { step, draft }, Ok(()))
    }

    /// 写入注册表、保存、重新加载
    ///
    /// 条目在追加前不做校验，无效条目会在保存时被丢弃。
    fn commit<B: Board, S: ConfigStore>(
        draft: Draft,
        manager: &mut SensorManager<B, S>,
    ) -> Result<(), ManagerError> {
        let Draft { entry, target, .. } = draft;
        if !entry.is_valid() {
            log::warn!("传感器 {:?} 无效，保存时将被丢弃", entry.name.as_str());
        }
        match target {
            Some(index) => manager.registry_mut().replace(index, entry)?,
            None => {
                manager.append(entry)?;
            }
        }
        manager.save_registry()?;
        manager.reload_registry()?;
        Ok(())
    }

    /// 当前界面要显示的菜单行
    pub fn rows(&self, registry: &Registry) -> Vec<MenuRow> {
        match &self.state {
            EditState::Browse { cursor } => registry
                .iter()
                .map(|e| e.name.to_string())
                .chain(std::iter::once(ADD_ROW.to_string()))
                .enumerate()
                .map(|(i, text)| MenuRow::new(text, i == *cursor))
                .collect(),
            EditState::Actions { cursor, .. } => ACTION_ROWS
                .iter()
                .enumerate()
                .map(|(i, text)| MenuRow::new(*text, i == *cursor))
                .collect(),
            EditState::Add { step, draft } => vec![
                MenuRow::new(format!("Name: {}", draft.entry.name), *step == AddStep::NameEntry),
                MenuRow::new(format!("Type: {}", draft.kind_text()), *step == AddStep::KindSelect),
                MenuRow::new(format!("GPIO: {}", draft.pin_text()), *step == AddStep::PinSelect),
                MenuRow::new("Save", *step == AddStep::Confirm),
            ],
            EditState::Finished => Vec::new(),
        }
    }
}

/// 用一串事件驱动一次完整的编辑会话
///
/// 注册表相关的错误（例如已满）只记录日志，会话继续；
/// 存储或硬件错误会结束会话。事件用完时按“返回”处理，保证注册表被重新加载。
pub fn run_add_or_edit_flow<B: Board, S: ConfigStore>(
    manager: &mut SensorManager<B, S>,
    events: impl IntoIterator<Item = EditEvent>,
) -> Result<(), ManagerError> {
    let mut session = EditSession::new();
    for event in events {
        match session.handle(event, manager) {
            Ok(()) => {}
            Err(ManagerError::Registry(e)) => log::warn!("{e}"),
            Err(e) => {
                if let Err(reload) = session.exit(manager) {
                    log::error!("重新加载失败: {reload}");
                }
                return Err(e);
            }
        }
        if session.is_finished() {
            return Ok(());
        }
    }
    session.exit(manager)
}
