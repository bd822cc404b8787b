mod calibration;
mod channel;
mod compensation;
mod config;
mod error;
mod power;
mod registers;
mod transport;

use embedded_hal::{delay::DelayNs, i2c::I2c};
use embedded_timers::clock::Clock;

pub use calibration::Calibration;
pub use channel::{
    BarometerReading, Channel, ChannelHandle, HumidityReading, Reading, SensorChannel,
};
pub use compensation::{
    FineTemperature, compensate_humidity, compensate_humidity_f64, compensate_pressure,
    compensate_pressure_f64, compensate_temperature, compensate_temperature_f64,
};
pub use config::{
    Config, Filter, MAX_FREQUENCY, OperatingMode, Oversampling, OversamplingConfig,
    PRIMARY_ADDRESS, SECONDARY_ADDRESS, StandbyTime,
};
pub use error::{Error, Result};
pub use power::PowerMode;
pub use transport::{BusVariant, RegisterTransport};

use power::PowerStateMachine;

/// 上电后读取芯片ID之前的等待时间（数据手册要求至少1ms）
const POWER_ON_SETTLE_US: u32 = 2_000;
/// 软复位后的等待时间
const SOFT_RESET_SETTLE_US: u32 = 2_000;
/// 等待NVM数据拷贝完成的最大轮询次数
const IM_UPDATE_POLL_LIMIT: u32 = 5;
/// 另一个通道可以复用同一个原始样本的时间窗口（微秒）
const SAMPLE_REUSE_WINDOW_US: u64 = 10_000;

/// 芯片型号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipVariant {
    /// 温度 + 压力 + 湿度
    Bme280,
    /// 温度 + 压力
    Bmp280,
}

impl ChipVariant {
    /// 根据芯片ID识别型号
    pub fn from_chip_id(chip_id: u8) -> Option<Self> {
        match chip_id {
            registers::CHIP_ID_BME280 => Some(Self::Bme280),
            registers::CHIP_ID_BMP280 => Some(Self::Bmp280),
            _ => None,
        }
    }

    /// 是否带湿度传感器
    pub fn has_humidity(self) -> bool {
        self == Self::Bme280
    }
}

/// 一次连续读取得到的原始ADC数据，三个值来自同一次转换
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    /// 20位压力ADC值
    pub pressure: u32,
    /// 20位温度ADC值
    pub temperature: u32,
    /// 16位湿度ADC值，BMP280没有
    pub humidity: Option<u16>,
}

impl RawSample {
    /// 解析 0xF7 开始的原始数据
    fn parse(data: &[u8]) -> Self {
        // 20位数据: msb[7:0] << 12 | lsb[7:0] << 4 | xlsb[7:4]
        let combine = |d: &[u8]| ((d[0] as u32) << 12) | ((d[1] as u32) << 4) | ((d[2] as u32) >> 4);

        Self {
            pressure: combine(&data[0..3]),
            temperature: combine(&data[3..6]),
            humidity: data
                .get(6..8)
                .map(|h| u16::from_be_bytes([h[0], h[1]])),
        }
    }
}

/// 最近一次读取的原始样本
#[derive(Debug, Clone, Copy)]
struct CachedSample {
    sample: RawSample,
    /// 采样时间戳（微秒）
    timestamp_us: u64,
    /// 各通道是否已经使用过该样本
    consumed: [bool; 2],
}

/// BME280 大气压力、温度、湿度传感器设备句柄
///
/// 一个句柄对应一个物理传感器，两个逻辑通道共享同一个句柄。
/// 所有操作都是同步阻塞的，句柄本身不加锁，调用方需要保证串行访问。
pub struct Bme280<'c, I2C, D, C: Clock> {
    /// 寄存器读写传输层
    transport: RegisterTransport<I2C>,
    /// 延时
    delay: D,
    /// 时钟，用于生成时间戳
    clock: &'c C,
    /// 时间戳起点
    epoch: C::Instant,
    /// 传感器配置
    config: Config,
    /// 芯片型号
    variant: ChipVariant,
    /// 校准参数，创建句柄时读取一次
    calib: Calibration,
    /// 电源状态机
    power: PowerStateMachine,
    /// 各通道是否已激活
    active: [bool; 2],
    /// 各通道设置的采样间隔
    intervals: [Option<StandbyTime>; 2],
    /// 最近一次的原始样本
    last_sample: Option<CachedSample>,
}

impl<'c, I2C, D, C> Bme280<'c, I2C, D, C>
where
    I2C: I2c,
    D: DelayNs,
    C: Clock,
    C::Instant: Copy,
{
    /// 创建BME280传感器实例
    ///
    /// 依次执行: 芯片ID校验 -> 软复位 -> 读取校准参数 -> 初始化为休眠模式
    pub fn new(i2c: I2C, mut delay: D, clock: &'c C, config: Config) -> Result<Self, I2C::Error> {
        // 检查配置
        config.validate().map_err(Error::InvalidArgument)?;

        let mut transport = RegisterTransport::new(i2c, config.address, config.bus_variant);

        // 检查芯片ID
        let variant = Self::check_identity(&mut transport, &mut delay)?;

        // 软复位，等待NVM数据拷贝完成
        Self::soft_reset(&mut transport, &mut delay)?;

        // 读取校准数据
        let calib = Calibration::load(&mut transport, variant)?;

        // 构建传感器实例
        let mut sensor = Self {
            transport,
            delay,
            clock,
            epoch: clock.now(),
            config,
            variant,
            calib,
            power: PowerStateMachine::new(config.oversampling, variant.has_humidity()),
            active: [false; 2],
            intervals: [None; 2],
            last_sample: None,
        };

        // 初始化传感器
        sensor.initialize()?;

        log::info!(
            "{:?} 初始化完成, 地址: 0x{:02X}, 总线时钟: {}Hz",
            variant,
            config.address,
            config.frequency
        );

        // OK
        Ok(sensor)
    }

    /// 检查芯片ID
    ///
    /// 上电后先等待2ms再读取芯片ID，ID不匹配返回 [`Error::DeviceNotFound`]
    fn check_identity(
        transport: &mut RegisterTransport<I2C>,
        delay: &mut D,
    ) -> Result<ChipVariant, I2C::Error> {
        // 传感器上电后必须等待
        delay.delay_us(POWER_ON_SETTLE_US);

        let chip_id = transport.read_u8(registers::CHIP_ID)?;
        ChipVariant::from_chip_id(chip_id).ok_or_else(|| {
            log::error!("芯片ID不匹配: 0x{:02X}", chip_id);
            Error::DeviceNotFound { chip_id }
        })
    }

    /// 软复位传感器，并等待校准数据从NVM拷贝完成
    fn soft_reset(transport: &mut RegisterTransport<I2C>, delay: &mut D) -> Result<(), I2C::Error> {
        transport.write(registers::RESET, registers::SOFT_RESET_CMD)?;

        let mut status = 0;
        for _ in 0..IM_UPDATE_POLL_LIMIT {
            delay.delay_us(SOFT_RESET_SETTLE_US);
            status = transport.read_u8(registers::STATUS)?;
            if status & registers::STATUS_IM_UPDATE == 0 {
                return Ok(());
            }
        }

        log::error!("传感器正在更新校准数据, status=0x{:02X}", status);
        Err(Error::HardwareFault {
            register: registers::STATUS,
            expected: 0,
            actual: status & registers::STATUS_IM_UPDATE,
        })
    }

    /// 初始化传感器
    ///
    /// 进入休眠模式，写入待机时间和滤波器配置并回读校验，所有通道回到未激活状态
    pub fn initialize(&mut self) -> Result<(), I2C::Error> {
        self.active = [false; 2];
        self.intervals = [None; 2];
        self.last_sample = None;

        // CONFIG寄存器只有在休眠模式下写入才能保证生效
        self.power.enter_sleep(&mut self.transport)?;

        self.transport.write_verified(
            registers::CONFIG,
            self.config.config_register(),
            registers::STANDBY_MASK | registers::FILTER_MASK,
        )
    }

    /// 激活或停用某个通道
    ///
    /// 第一个通道激活时唤醒传感器，最后一个通道停用时传感器进入休眠。
    /// 重复激活或重复停用直接返回成功。
    pub fn activate(&mut self, channel: Channel, enable: bool) -> Result<(), I2C::Error> {
        let index = channel.index();
        if self.active[index] == enable {
            return Ok(());
        }

        let other_active = self.active[channel.other().index()];
        if enable && self.power.mode() == PowerMode::Sleep {
            self.power
                .power_up(&mut self.transport, self.config.operating_mode)?;
        } else if !enable && !other_active {
            self.power.enter_sleep(&mut self.transport)?;
            self.last_sample = None;
        }

        log::debug!("{:?} 通道 activated={}", channel, enable);
        self.active[index] = enable;
        Ok(())
    }

    /// 设置某个通道的采样间隔（微秒）
    ///
    /// 两个通道共享同一个待机时间寄存器，以最后一次设置为准
    pub fn set_interval(&mut self, channel: Channel, period_us: u32) -> Result<(), I2C::Error> {
        let standby = self.power.set_standby(&mut self.transport, period_us)?;
        self.intervals[channel.index()] = Some(standby);
        Ok(())
    }

    /// 某个通道最近一次设置的采样间隔（微秒）
    pub fn interval(&self, channel: Channel) -> Option<u32> {
        self.intervals[channel.index()].map(StandbyTime::period_us)
    }

    /// 读取某个通道的补偿后数据
    ///
    /// 传感器处于休眠模式时返回 [`Error::NotReady`]
    pub fn fetch(&mut self, channel: Channel) -> Result<Reading, I2C::Error> {
        if channel == Channel::Humidity && !self.variant.has_humidity() {
            return Err(Error::InvalidArgument("BMP280不支持湿度通道"));
        }
        if self.power.mode() == PowerMode::Sleep {
            return Err(Error::NotReady);
        }

        let (sample, timestamp_us) = self.take_sample(channel)?;

        // 先补偿温度，t_fine 供压力/湿度补偿使用
        let (temperature, t_fine) = compensate_temperature(sample.temperature, &self.calib);

        let reading = match channel {
            Channel::Barometer => {
                let pressure = compensate_pressure(sample.pressure, t_fine, &self.calib);
                Reading::Barometer(BarometerReading {
                    timestamp_us,
                    temperature: (temperature as f64 / 100.0) as f32,
                    // Q24.8 Pa -> hPa
                    pressure: (pressure as f64 / 256.0 / 100.0) as f32,
                })
            }
            Channel::Humidity => {
                let humidity = sample
                    .humidity
                    .map(|adc_h| compensate_humidity(adc_h, t_fine, &self.calib))
                    .unwrap_or_default();
                Reading::Humidity(HumidityReading {
                    timestamp_us,
                    // Q22.10 %RH
                    humidity: (humidity as f64 / 1024.0) as f32,
                })
            }
        };

        log::trace!("{:?}", reading);

        // OK
        Ok(reading)
    }

    /// 获取原始样本
    ///
    /// 另一个通道刚读取过且本通道还没用过的样本直接复用，否则重新读取
    fn take_sample(&mut self, channel: Channel) -> Result<(RawSample, u64), I2C::Error> {
        let index = channel.index();
        let now_us = self.now_us();

        if let Some(cached) = self.last_sample.as_mut() {
            if !cached.consumed[index]
                && now_us.saturating_sub(cached.timestamp_us) < SAMPLE_REUSE_WINDOW_US
            {
                cached.consumed[index] = true;
                return Ok((cached.sample, cached.timestamp_us));
            }
        }

        let sample = self.read_raw_sample()?;
        let timestamp_us = self.now_us();

        let mut consumed = [false; 2];
        consumed[index] = true;
        self.last_sample = Some(CachedSample {
            sample,
            timestamp_us,
            consumed,
        });

        Ok((sample, timestamp_us))
    }

    /// 读取原始ADC数据
    ///
    /// 强制模式下先触发一次转换并等待完成，正常模式下直接读取最近一次转换的结果
    fn read_raw_sample(&mut self) -> Result<RawSample, I2C::Error> {
        if self.power.mode() == PowerMode::Forced {
            self.power
                .trigger_forced(&mut self.transport, &mut self.delay)?;
        }

        // 一次连续读取，保证压力、温度、湿度来自同一次转换
        let mut data = [0u8; registers::DATA_TPH_LEN];
        let len = if self.variant.has_humidity() {
            registers::DATA_TPH_LEN
        } else {
            registers::DATA_TP_LEN
        };
        self.transport.read(registers::DATA, &mut data[..len])?;

        Ok(RawSample::parse(&data[..len]))
    }

    /// 从句柄创建开始经过的微秒数
    fn now_us(&self) -> u64 {
        self.clock.elapsed(self.epoch).as_micros() as u64
    }

    /// 绑定到某个逻辑通道
    pub fn channel(&mut self, channel: Channel) -> ChannelHandle<'_, 'c, I2C, D, C> {
        ChannelHandle::new(self, channel)
    }

    /// 当前电源模式
    pub fn power_mode(&self) -> PowerMode {
        self.power.mode()
    }

    /// 通道是否已激活
    pub fn is_active(&self, channel: Channel) -> bool {
        self.active[channel.index()]
    }

    /// 芯片型号
    pub fn variant(&self) -> ChipVariant {
        self.variant
    }

    /// 校准参数
    pub fn calibration(&self) -> &Calibration {
        &self.calib
    }

    /// 传感器配置
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 释放I2C通信句柄和延时
    pub fn release(self) -> (I2C, D) {
        (self.transport.release(), self.delay)
    }
}
