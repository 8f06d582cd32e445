//! 应用上下文与事件循环
//!
//! 所有状态都放在一个 [`AppContext`] 中，由互斥锁保护。事件循环每次取出一个事件，
//! 加锁处理后释放；渲染只在限定时间内尝试加锁，拿不到锁就跳过这一帧。

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::{Mutex, MutexGuard, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::app::console::Command;
use crate::app::main_view::{self, SensorReadings};
use crate::app::workflow::{EditEvent, EditSession};
use crate::config::manager::{ManagerError, SensorManager};
use crate::config::settings::AppConfig;
use crate::peripherals::hal::{Board, HardwareFault};
use crate::peripherals::temperature_sensor::Sampler;
use crate::storage::config_store::ConfigStore;

/// 事件队列容量
pub const EVENT_QUEUE_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// 定时采样
    Tick,
    Command(Command),
}

pub struct AppContext<B: Board, S: ConfigStore, P: Sampler> {
    manager: SensorManager<B, S>,
    sampler: P,
    session: Option<EditSession>,
    readings: SensorReadings,
    running: bool,
}

impl<B: Board, S: ConfigStore, P: Sampler> AppContext<B, S, P> {
    pub fn new(manager: SensorManager<B, S>, sampler: P) -> Self {
        Self {
            manager,
            sampler,
            session: None,
            readings: Vec::new(),
            running: true,
        }
    }

    pub fn manager(&self) -> &SensorManager<B, S> {
        &self.manager
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn in_menu(&self) -> bool {
        self.session.is_some()
    }

    /// 首次加载传感器，并立即采样一次
    pub fn start(&mut self) -> Result<bool, HardwareFault> {
        let loaded = self.manager.load_registry()?;
        self.refresh_readings();
        Ok(loaded)
    }

    fn refresh_readings(&mut self) {
        self.readings = self.manager.sample_all(&mut self.sampler);
    }

    pub fn process(&mut self, event: AppEvent) -> Result<(), ManagerError> {
        match event {
            AppEvent::Tick => {
                // 编辑期间引脚可能正在变化，不采样
                if self.session.is_none() {
                    self.refresh_readings();
                }
                Ok(())
            }
            AppEvent::Command(Command::Quit) => {
                self.running = false;
                Ok(())
            }
            AppEvent::Command(Command::Menu) => {
                if self.session.is_none() {
                    log::info!("打开传感器菜单");
                    self.session = Some(EditSession::new());
                }
                Ok(())
            }
            AppEvent::Command(Command::Edit(event)) => {
                let Some(session) = self.session.as_mut() else {
                    // 主界面上按返回即退出
                    if event == EditEvent::Back {
                        self.running = false;
                    }
                    return Ok(());
                };
                let result = session.handle(event, &mut self.manager);
                if session.is_finished() {
                    self.session = None;
                    // 退出菜单后注册表已重新加载，旧读数可能对不上
                    self.refresh_readings();
                }
                result
            }
        }
    }

    /// 当前画面的文本行
    pub fn screen(&self) -> Vec<String> {
        let Some(session) = &self.session else {
            return main_view::main_view_lines(self.manager.state(), &self.readings);
        };
        if let Some((header, name)) = session.name_request() {
            return vec![format!("{header}: {name}"), "(name <text> / back)".to_string()];
        }
        session
            .rows(self.manager.registry())
            .into_iter()
            .map(|row| format!("{} {}", if row.selected { ">" } else { " " }, row.text))
            .collect()
    }

    /// 退出前释放引脚并恢复电源轨
    pub fn shutdown(&mut self) -> Result<(), ManagerError> {
        if let Some(mut session) = self.session.take() {
            session.exit(&mut self.manager)?;
        }
        self.manager.deactivate_pins()?;
        Ok(())
    }
}

/// 在 `timeout` 内尝试加锁
pub fn lock_with_timeout<T>(mutex: &Mutex<T>, timeout: Duration) -> Option<MutexGuard<'_, T>> {
    let deadline = Instant::now() + timeout;
    loop {
        match mutex.try_lock() {
            Ok(guard) => return Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => return Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => {
                if Instant::now() >= deadline {
                    return None;
                }
                thread::sleep(Duration::from_millis(1));
            }
        }
    }
}

/// 渲染一帧，拿不到锁时返回 `None`
pub fn render<B: Board, S: ConfigStore, P: Sampler>(
    context: &Mutex<AppContext<B, S, P>>,
    timeout: Duration,
) -> Option<Vec<String>> {
    let Some(app) = lock_with_timeout(context, timeout) else {
        log::debug!("渲染时无法获取锁，跳过这一帧");
        return None;
    };
    Some(app.screen())
}

/// 运行事件循环，直到收到退出命令或所有发送端关闭
pub fn run_event_loop<B: Board, S: ConfigStore, P: Sampler>(
    context: &Mutex<AppContext<B, S, P>>,
    events: &Receiver<AppEvent>,
    config: &AppConfig,
    mut on_frame: impl FnMut(&[String]),
) -> Result<()> {
    loop {
        let event = match events.recv_timeout(config.event_timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        let running = {
            let mut app = context.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(event) = event {
                if let Err(e) = app.process(event) {
                    log::error!("处理事件失败: {e}");
                }
            }
            app.is_running()
        };
        if !running {
            break;
        }

        if let Some(frame) = render(context, config.render_timeout) {
            on_frame(&frame);
        }
    }

    let mut app = context.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    app.shutdown()?;
    log::info!("已退出");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::main_view::{NOT_FOUND, TITLE};
    use crate::peripherals::sim::{SimBoard, SimSampler};
    use crate::storage::config_store::FsStore;
    use std::sync::mpsc::sync_channel;
    use tempfile::TempDir;

    type TestContext = AppContext<SimBoard, FsStore, SimSampler>;

    fn context(dir: &TempDir, text: &str) -> TestContext {
        let path = dir.path().join("sensors.txt");
        std::fs::write(&path, text).unwrap();
        let manager = SensorManager::new(SimBoard::new(), FsStore::new(path));
        let mut app = AppContext::new(manager, SimSampler::new());
        app.start().unwrap();
        app
    }

    fn fast_config() -> AppConfig {
        AppConfig {
            event_timeout: Duration::from_millis(5),
            render_timeout: Duration::from_millis(5),
            ..AppConfig::default()
        }
    }

    #[test]
    fn tick_samples_every_sensor() {
        let dir = TempDir::new().unwrap();
        let mut app = context(&dir, "Room 0 7\nGarage 1 16\n");

        app.process(AppEvent::Tick).unwrap();

        let screen = app.screen();
        assert_eq!(screen.len(), 3);
        assert!(screen[1].starts_with("Room"));
        assert!(screen[2].starts_with("Garage"));
    }

    #[test]
    fn sensors_are_listed_right_after_start() {
        let dir = TempDir::new().unwrap();
        let app = context(&dir, "Room 0 7\nGarage 1 16\n");

        let screen = app.screen();
        assert_eq!(screen.len(), 3);
        assert_eq!(screen[0], TITLE);
        assert!(screen[1].starts_with("Room  "));
        assert!(screen[2].starts_with("Garage  "));
    }

    #[test]
    fn menu_session_ends_with_reload() {
        let dir = TempDir::new().unwrap();
        let mut app = context(&dir, "");
        assert_eq!(app.screen(), [TITLE, NOT_FOUND]);

        for event in [
            AppEvent::Command(Command::Menu),
            AppEvent::Command(Command::Edit(EditEvent::Ok)),
            AppEvent::Command(Command::Edit(EditEvent::NameSubmitted("Porch".into()))),
            AppEvent::Command(Command::Edit(EditEvent::Ok)),
            AppEvent::Command(Command::Edit(EditEvent::Ok)),
            AppEvent::Command(Command::Edit(EditEvent::Ok)),
        ] {
            app.process(event).unwrap();
        }
        assert!(app.in_menu());
        assert_eq!(app.screen()[0], "> Porch");

        app.process(AppEvent::Command(Command::Edit(EditEvent::Back))).unwrap();
        assert!(!app.in_menu());
        assert_eq!(app.manager().registry().len(), 1);
        let screen = app.screen();
        assert_eq!(screen.len(), 2);
        assert!(screen[1].starts_with("Porch  "));
        assert!(app.manager().gpio().board().rail_on());
    }

    #[test]
    fn render_skips_frame_while_locked() {
        let dir = TempDir::new().unwrap();
        let context = Mutex::new(context(&dir, ""));

        let guard = context.lock().unwrap();
        assert!(render(&context, Duration::from_millis(5)).is_none());
        drop(guard);

        assert!(render(&context, Duration::from_millis(5)).is_some());
    }

    #[test]
    fn event_loop_restores_rail_on_quit() {
        let dir = TempDir::new().unwrap();
        let context = Mutex::new(context(&dir, "Room 0 7\n"));
        let (tx, rx) = sync_channel(EVENT_QUEUE_LEN);
        tx.send(AppEvent::Tick).unwrap();
        tx.send(AppEvent::Command(Command::Quit)).unwrap();

        let mut frames = 0;
        run_event_loop(&context, &rx, &fast_config(), |_| frames += 1).unwrap();

        let app = context.lock().unwrap();
        assert!(frames >= 1);
        assert!(!app.manager().gpio().board().rail_on());
        assert!(!app.manager().gpio().is_active());
    }

    #[test]
    fn back_on_main_view_quits() {
        let dir = TempDir::new().unwrap();
        let mut app = context(&dir, "");
        app.process(AppEvent::Command(Command::Edit(EditEvent::Back))).unwrap();
        assert!(!app.is_running());
    }
}
