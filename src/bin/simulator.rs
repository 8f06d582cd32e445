//! 主机模拟器
//!
//! 用模拟板卡和假数据运行完整的事件循环，画面输出到终端。
//! 配置目录取第一个命令行参数，其次是 `DHT_MON_DIR`，默认 `./dht_monitor`。

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::mpsc::{sync_channel, SyncSender, TrySendError};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};

use dht_monitor::app::console::parse_command;
use dht_monitor::app::context::{run_event_loop, AppContext, AppEvent, EVENT_QUEUE_LEN};
use dht_monitor::config::{AppConfig, SensorManager};
use dht_monitor::peripherals::sim::{SimBoard, SimSampler};
use dht_monitor::storage::FsStore;

const DIR_ENV: &str = "DHT_MON_DIR";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let folder = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os(DIR_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("dht_monitor"));
    let config = AppConfig::default().with_folder(folder);

    let store = FsStore::open_in(&config.folder, &config.file_name)
        .with_context(|| format!("cannot open {}", config.folder.display()))?;
    log::info!("sensors file: {}", store.path().display());

    let manager = SensorManager::new(SimBoard::new(), store);
    let mut app = AppContext::new(manager, SimSampler::new());
    if let Err(e) = app.start() {
        log::error!("pin activation failed: {e}");
    }
    let app = Mutex::new(app);

    let (tx, rx) = sync_channel(EVENT_QUEUE_LEN);
    spawn_stdin(tx.clone());
    spawn_ticker(tx, config.sample_interval);

    println!("commands: menu, up/down/left/right, ok, back, name <text>, quit");
    let mut last: Vec<String> = Vec::new();
    run_event_loop(&app, &rx, &config, |frame| {
        if frame != last.as_slice() {
            println!("----------------");
            for line in frame {
                println!("{line}");
            }
            last = frame.to_vec();
        }
    })
}

fn spawn_stdin(tx: SyncSender<AppEvent>) {
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match parse_command(&line) {
                Some(command) => {
                    if tx.send(AppEvent::Command(command)).is_err() {
                        break;
                    }
                }
                None => log::warn!("unknown command: {}", line.trim()),
            }
        }
    });
}

fn spawn_ticker(tx: SyncSender<AppEvent>, interval: Duration) {
    thread::spawn(move || loop {
        thread::sleep(interval);
        match tx.try_send(AppEvent::Tick) {
            Ok(()) | Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Disconnected(_)) => break,
        }
    });
}
