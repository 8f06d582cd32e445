use std::io::BufRead;
use std::sync::mpsc::{sync_channel, SyncSender, TrySendError};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_sys::{esp, wl_handle_t, CONFIG_WL_SECTOR_SIZE, WL_INVALID_HANDLE};

use dht_monitor::app::console::parse_command;
use dht_monitor::app::context::{run_event_loop, AppContext, AppEvent, EVENT_QUEUE_LEN};
use dht_monitor::config::{AppConfig, SensorManager};
use dht_monitor::peripherals::esp_board::EspBoard;
use dht_monitor::peripherals::screen::ScreenBuilder;
use dht_monitor::peripherals::temperature_sensor::DhtSampler;
use dht_monitor::storage::FsStore;

fn main() -> Result<()> {
    // It is necessary to call this function once. Otherwise some patches to the runtime
    // implemented by esp-idf-sys might not link properly. See https://github.com/esp-rs/esp-idf-template/issues/71
    esp_idf_svc::sys::link_patches();

    // Bind the log crate to the ESP Logging facilities
    esp_idf_svc::log::EspLogger::initialize_default();

    mount_fatfs()?;

    let peripherals = Peripherals::take()?;
    let pins = peripherals.pins;
    let mut screen = ScreenBuilder::with_pins(
        peripherals.spi2,
        pins.gpio2,
        pins.gpio0,
        pins.gpio18,
        pins.gpio12,
    )?;

    let config = AppConfig::default();
    let store = FsStore::open_in(&config.folder, &config.file_name)
        .with_context(|| format!("无法打开配置目录 {}", config.folder.display()))?;
    let manager = SensorManager::new(EspBoard::new()?, store);

    let mut app = AppContext::new(manager, DhtSampler::new());
    if let Err(e) = app.start() {
        log::error!("激活传感器引脚失败: {e}");
    }
    let app = Mutex::new(app);

    let (tx, rx) = sync_channel(EVENT_QUEUE_LEN);
    spawn_console(tx.clone())?;
    spawn_ticker(tx, config.sample_interval)?;

    log::info!("DHT monitor 已启动，输入 menu 打开传感器菜单");
    run_event_loop(&app, &rx, &config, |frame| {
        if let Err(e) = screen.draw_frame(frame) {
            log::warn!("屏幕刷新失败: {e}");
        }
    })
}

/// 挂载 FATFS 分区到 /fatfs
fn mount_fatfs() -> Result<()> {
    let fatfs_cfg = esp_idf_sys::esp_vfs_fat_mount_config_t {
        max_files: 5,
        format_if_mount_failed: true,
        allocation_unit_size: CONFIG_WL_SECTOR_SIZE as usize,
        disk_status_check_enable: false,
    };

    let mut fat_handle: wl_handle_t = WL_INVALID_HANDLE;

    let res = unsafe {
        esp_idf_sys::esp_vfs_fat_spiflash_mount(
            c"/fatfs".as_ptr(),
            c"fatfs".as_ptr(),
            &fatfs_cfg,
            (&mut fat_handle) as *mut wl_handle_t,
        )
    };
    esp!(res).context("Failed to mount FATFS")?;
    Ok(())
}

/// 从串口读取命令
fn spawn_console(tx: SyncSender<AppEvent>) -> Result<()> {
    thread::Builder::new()
        .name("console".into())
        .stack_size(4096)
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                match parse_command(&line) {
                    Some(command) => {
                        if tx.send(AppEvent::Command(command)).is_err() {
                            break;
                        }
                    }
                    None => log::warn!("未知命令: {}", line.trim()),
                }
            }
        })?;
    Ok(())
}

/// 定时发送采样事件，队列满时丢弃本次
fn spawn_ticker(tx: SyncSender<AppEvent>, interval: Duration) -> Result<()> {
    thread::Builder::new()
        .name("ticker".into())
        .stack_size(4096)
        .spawn(move || loop {
            thread::sleep(interval);
            match tx.try_send(AppEvent::Tick) {
                Ok(()) | Err(TrySendError::Full(_)) => {}
                Err(TrySendError::Disconnected(_)) => break,
            }
        })?;
    Ok(())
}
