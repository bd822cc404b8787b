use super::transport::BusVariant;

/// SDO接地时的I2C地址
pub const PRIMARY_ADDRESS: u8 = 0x76;
/// SDO接VCC时的I2C地址
pub const SECONDARY_ADDRESS: u8 = 0x77;
/// I2C总线时钟上限 3.4MHz
pub const MAX_FREQUENCY: u32 = 3_400_000;

/// 过采样倍率
///
/// 倍率越高噪声越小，但单次转换时间越长、功耗越高
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Oversampling {
    /// 跳过该通道的测量
    Skipped = 0,
    #[default]
    X1 = 1,
    X2 = 2,
    X4 = 3,
    X8 = 4,
    X16 = 5,
}

impl Oversampling {
    /// 寄存器位域编码
    pub fn bits(self) -> u8 {
        self as u8
    }

    /// 实际的采样次数，跳过时为0
    pub fn factor(self) -> u32 {
        match self {
            Self::Skipped => 0,
            Self::X1 => 1,
            Self::X2 => 2,
            Self::X4 => 4,
            Self::X8 => 8,
            Self::X16 => 16,
        }
    }
}

/// 温度、压力、湿度三个通道的过采样配置
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OversamplingConfig {
    pub temperature: Oversampling,
    pub pressure: Oversampling,
    pub humidity: Oversampling,
}

/// IIR滤波器系数，仅作用于温度和压力
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Filter {
    #[default]
    Off = 0,
    X2 = 1,
    X4 = 2,
    X8 = 3,
    X16 = 4,
}

/// 正常模式下两次转换之间的待机时间
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StandbyTime {
    /// 0.5ms
    #[default]
    Us500 = 0x00,
    /// 62.5ms
    Ms62_5 = 0x01,
    /// 125ms
    Ms125 = 0x02,
    /// 250ms
    Ms250 = 0x03,
    /// 500ms
    Ms500 = 0x04,
    /// 1000ms
    Ms1000 = 0x05,
    /// 2000ms
    Ms2000 = 0x06,
    /// 4000ms
    Ms4000 = 0x07,
}

impl StandbyTime {
    /// 将采样周期（微秒）映射为待机时间，只接受固定的8个取值
    pub fn from_period_us(period_us: u32) -> Option<Self> {
        match period_us {
            500 => Some(Self::Us500),
            62_500 => Some(Self::Ms62_5),
            125_000 => Some(Self::Ms125),
            250_000 => Some(Self::Ms250),
            500_000 => Some(Self::Ms500),
            1_000_000 => Some(Self::Ms1000),
            2_000_000 => Some(Self::Ms2000),
            4_000_000 => Some(Self::Ms4000),
            _ => None,
        }
    }

    /// 对应的采样周期（微秒）
    pub fn period_us(self) -> u32 {
        match self {
            Self::Us500 => 500,
            Self::Ms62_5 => 62_500,
            Self::Ms125 => 125_000,
            Self::Ms250 => 250_000,
            Self::Ms500 => 500_000,
            Self::Ms1000 => 1_000_000,
            Self::Ms2000 => 2_000_000,
            Self::Ms4000 => 4_000_000,
        }
    }

    /// 寄存器位域编码
    pub fn bits(self) -> u8 {
        self as u8
    }
}

/// 激活后使用的工作模式
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OperatingMode {
    /// 每次读取触发一次转换，转换完成后自动回到休眠
    Forced,
    /// 按待机时间周期性连续转换
    #[default]
    Normal,
}

/// 传感器配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// I2C从设备地址
    pub address: u8,
    /// I2C总线时钟（Hz）
    pub frequency: u32,
    /// 总线写操作帧格式
    pub bus_variant: BusVariant,
    /// 激活后的工作模式
    pub operating_mode: OperatingMode,
    /// 过采样配置
    pub oversampling: OversamplingConfig,
    /// IIR滤波器
    pub filter: Filter,
    /// 初始化时写入的待机时间
    pub standby: StandbyTime,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: PRIMARY_ADDRESS,
            frequency: 400_000,
            bus_variant: BusVariant::Standard,
            operating_mode: OperatingMode::Normal,
            oversampling: OversamplingConfig::default(),
            filter: Filter::Off,
            standby: StandbyTime::Us500,
        }
    }
}

impl Config {
    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    pub fn with_frequency(mut self, frequency: u32) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_bus_variant(mut self, bus_variant: BusVariant) -> Self {
        self.bus_variant = bus_variant;
        self
    }

    pub fn with_operating_mode(mut self, operating_mode: OperatingMode) -> Self {
        self.operating_mode = operating_mode;
        self
    }

    pub fn with_oversampling(mut self, oversampling: OversamplingConfig) -> Self {
        self.oversampling = oversampling;
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_standby(mut self, standby: StandbyTime) -> Self {
        self.standby = standby;
        self
    }

    /// 检查配置是否合法
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.frequency == 0 || self.frequency > MAX_FREQUENCY {
            return Err("I2C总线时钟必须在 (0, 3.4MHz] 范围内");
        }
        if self.oversampling.temperature == Oversampling::Skipped {
            // 压力和湿度补偿都依赖温度
            return Err("温度通道不能跳过测量");
        }
        Ok(())
    }

    /// CONFIG寄存器的值（待机时间 + 滤波器）
    pub(crate) fn config_register(&self) -> u8 {
        (self.standby.bits() << super::registers::STANDBY_POS)
            | ((self.filter as u8) << super::registers::FILTER_POS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_periods_round_trip() {
        for period in [
            500, 62_500, 125_000, 250_000, 500_000, 1_000_000, 2_000_000, 4_000_000,
        ] {
            let standby = StandbyTime::from_period_us(period).unwrap();
            assert_eq!(standby.period_us(), period);
        }
    }

    #[test]
    fn unsupported_periods_are_rejected() {
        for period in [0, 1, 499, 501, 62_000, 100_000, 3_000_000, u32::MAX] {
            assert_eq!(StandbyTime::from_period_us(period), None);
        }
    }

    #[test]
    fn default_config_register() {
        let config = Config::default();
        assert_eq!(config.config_register(), 0x00);

        let config = config
            .with_standby(StandbyTime::Ms1000)
            .with_filter(Filter::X4);
        assert_eq!(config.config_register(), 0b1010_1000);
    }

    #[test]
    fn frequency_above_limit_is_invalid() {
        assert!(Config::default().validate().is_ok());
        assert!(Config::default().with_frequency(3_400_001).validate().is_err());
        assert!(Config::default().with_frequency(0).validate().is_err());
    }

    #[test]
    fn temperature_cannot_be_skipped() {
        let config = Config::default().with_oversampling(OversamplingConfig {
            temperature: Oversampling::Skipped,
            ..Default::default()
        });
        assert!(config.validate().is_err());
    }
}
