use std::{thread, time::Duration};

use raspi_bme280::sensor::bme280::{Bme280, Channel, Config, PRIMARY_ADDRESS, Reading};
use raspi_bme280::std_clock::StdClock;
use rppal::hal::Delay;
use rppal::i2c::I2c;

/// 读取间隔（微秒）
const INTERVAL_US: u32 = 1_000_000;

/// BME280传感器测试程序
fn main() -> anyhow::Result<()> {
    // 初始化日志，级别由 RUST_LOG 环境变量控制
    env_logger::init();

    // 初始化全局时钟
    let clock = StdClock::new();
    // 初始化I2C通信总线
    let i2c_bus = I2c::new()?;

    // 创建BME280传感器实例
    let config = Config::default().with_address(PRIMARY_ADDRESS);
    let mut bme280 = Bme280::new(i2c_bus, Delay::new(), &clock, config)?;
    println!("传感器型号: {:?}", bme280.variant());

    // 激活气压计和湿度计
    bme280.activate(Channel::Barometer, true)?;
    bme280.set_interval(Channel::Barometer, INTERVAL_US)?;
    if bme280.variant().has_humidity() {
        bme280.activate(Channel::Humidity, true)?;
    }

    // 死循环读取传感器数据
    loop {
        for channel in [Channel::Barometer, Channel::Humidity] {
            if !bme280.is_active(channel) {
                continue;
            }

            match bme280.fetch(channel) {
                // 读取成功
                Ok(Reading::Barometer(reading)) => {
                    println!(
                        "[{}us] BME280读取到的温度: {:.2}℃, 压力: {:.2}hPa",
                        reading.timestamp_us, reading.temperature, reading.pressure
                    );
                }
                Ok(Reading::Humidity(reading)) => {
                    println!(
                        "[{}us] BME280读取到的湿度: {:.2}%",
                        reading.timestamp_us, reading.humidity
                    );
                }
                // 读取失败
                Err(err) => {
                    eprintln!("读取BME280传感器{:?}通道失败: {}", channel, err);
                }
            }
        }

        // 间隔1s读取一次
        thread::sleep(Duration::from_micros(INTERVAL_US as u64));
    }
}
