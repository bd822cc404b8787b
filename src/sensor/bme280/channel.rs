use embedded_hal::{delay::DelayNs, i2c::I2c};
use embedded_timers::clock::Clock;

use super::Bme280;
use super::error::{Error, Result};

/// 逻辑通道
///
/// 两个通道共用同一个物理传感器和同一份校准参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// 气压计: 温度 + 压力
    Barometer,
    /// 湿度计
    Humidity,
}

impl Channel {
    pub(crate) fn index(self) -> usize {
        match self {
            Self::Barometer => 0,
            Self::Humidity => 1,
        }
    }

    /// 另一个通道
    pub fn other(self) -> Self {
        match self {
            Self::Barometer => Self::Humidity,
            Self::Humidity => Self::Barometer,
        }
    }
}

/// 气压计读数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarometerReading {
    /// 采样时间戳（微秒，从设备句柄创建开始计时）
    pub timestamp_us: u64,
    /// 温度【℃】
    pub temperature: f32,
    /// 空气压力【hPa】
    pub pressure: f32,
}

/// 湿度计读数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HumidityReading {
    /// 采样时间戳（微秒，从设备句柄创建开始计时）
    pub timestamp_us: u64,
    /// 相对湿度【%RH】
    pub humidity: f32,
}

/// 补偿后的读数，每次读取都重新计算
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Barometer(BarometerReading),
    Humidity(HumidityReading),
}

impl Reading {
    /// 采样时间戳（微秒）
    pub fn timestamp_us(&self) -> u64 {
        match self {
            Self::Barometer(reading) => reading.timestamp_us,
            Self::Humidity(reading) => reading.timestamp_us,
        }
    }
}

/// 提供给上层的通道操作接口
pub trait SensorChannel {
    type Error;

    /// 通道标识
    fn channel(&self) -> Channel;

    /// 激活或停用通道，重复调用直接返回成功
    fn activate(&mut self, enable: bool) -> core::result::Result<(), Self::Error>;

    /// 读取一次补偿后的数据
    fn fetch(&mut self) -> core::result::Result<Reading, Self::Error>;

    /// 设置采样间隔（微秒）
    fn set_interval(&mut self, period_us: u32) -> core::result::Result<(), Self::Error>;
}

/// 绑定到某个逻辑通道的设备句柄视图
pub struct ChannelHandle<'d, 'c, I2C, D, C: Clock> {
    device: &'d mut Bme280<'c, I2C, D, C>,
    channel: Channel,
}

impl<'d, 'c, I2C, D, C: Clock> ChannelHandle<'d, 'c, I2C, D, C> {
    pub(crate) fn new(device: &'d mut Bme280<'c, I2C, D, C>, channel: Channel) -> Self {
        Self { device, channel }
    }
}

impl<I2C, D, C> SensorChannel for ChannelHandle<'_, '_, I2C, D, C>
where
    I2C: I2c,
    D: DelayNs,
    C: Clock,
    C::Instant: Copy,
{
    type Error = Error<I2C::Error>;

    fn channel(&self) -> Channel {
        self.channel
    }

    fn activate(&mut self, enable: bool) -> Result<(), I2C::Error> {
        self.device.activate(self.channel, enable)
    }

    fn fetch(&mut self) -> Result<Reading, I2C::Error> {
        self.device.fetch(self.channel)
    }

    fn set_interval(&mut self, period_us: u32) -> Result<(), I2C::Error> {
        self.device.set_interval(self.channel, period_us)
    }
}
