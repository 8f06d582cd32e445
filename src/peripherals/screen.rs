use anyhow::Result;
use embedded_hal::spi::SpiDevice;
use esp_idf_svc::hal::gpio::{self, AnyIOPin, InputOutput, PinDriver};
use esp_idf_svc::hal::spi::{SPI2, SpiConfig, SpiDeviceDriver, SpiDriver, SpiDriverConfig};
use ssd1306::{prelude::*, Ssd1306};
use ssd1306::mode::DisplayConfig;
use embedded_graphics::{
    mono_font::{iso_8859_1::FONT_6X10, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    text::Text,
};

type IOPinDriver = PinDriver<'static, gpio::AnyIOPin, InputOutput>;

/// 128x64 屏幕上 6x10 字体可显示的行数
pub const SCREEN_LINES: usize = 6;

const LINE_HEIGHT: i32 = 10;

/// Screen Builder，用于封装 SPI 和屏幕初始化
pub struct ScreenBuilder;

impl ScreenBuilder {
    /// 从 SPI 外设和 GPIO pins 创建 Screen 实例
    ///
    /// 接线：
    /// - GPIO2: SPI SCK
    /// - GPIO0: SPI MOSI
    /// - GPIO18: SPI CS
    /// - GPIO12: DC (数据/命令)
    pub fn with_pins(
        spi2: SPI2,
        sck: impl Into<AnyIOPin>,
        mosi: impl Into<AnyIOPin>,
        cs: impl Into<AnyIOPin>,
        dc: impl Into<AnyIOPin>,
    ) -> Result<Screen<SpiDeviceDriver<'static, SpiDriver<'static>>>> {
        let driver_config = SpiDriverConfig::new();
        let config = SpiConfig::new().write_only(true);

        let spi = SpiDriver::new(
            spi2,
            sck.into(),
            mosi.into(),
            Option::<AnyIOPin>::None,
            &driver_config,
        )?;
        let spi_device = SpiDeviceDriver::new(spi, Some(cs.into()), &config)?;

        Screen::new(spi_device, dc.into())
    }
}

pub struct Screen<SPI: SpiDevice> {
    driver: Ssd1306<SPIInterface<SPI, IOPinDriver>, DisplaySize128x64, ssd1306::mode::BufferedGraphicsMode<DisplaySize128x64>>,
}

impl<SPI: SpiDevice> Screen<SPI> {
    pub fn new(spi: SPI, dc_io: gpio::AnyIOPin) -> Result<Self> {
        let dc_io = PinDriver::input_output(dc_io)?;

        let interface = SPIInterface::new(spi, dc_io);
        let mut driver = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();

        driver.init().map_err(|_| anyhow::anyhow!("Screen init failed"))?;
        Ok(Self { driver })
    }

    /// 清屏后逐行绘制一帧并刷新，超出屏幕的行被丢弃
    pub fn draw_frame(&mut self, lines: &[String]) -> Result<()> {
        self.driver.clear(BinaryColor::Off).map_err(|_| anyhow::anyhow!("Screen clear failed"))?;

        let style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
        for (row, line) in lines.iter().take(SCREEN_LINES).enumerate() {
            let baseline = LINE_HEIGHT * (row as i32 + 1) - 2;
            Text::new(line, Point::new(0, baseline), style)
                .draw(&mut self.driver)
                .map_err(|_| anyhow::anyhow!("Text draw failed"))?;
        }

        // 每次绘制后需要 flush 才会显示
        self.driver.flush().map_err(|_| anyhow::anyhow!("Screen flush failed"))?;
        Ok(())
    }
}
