use embedded_hal::{delay::DelayNs, i2c::I2c};

use super::config::{OperatingMode, OversamplingConfig, StandbyTime};
use super::error::{Error, Result};
use super::registers;
use super::transport::RegisterTransport;

/// 强制模式下等待转换完成时，额外轮询状态寄存器的最大次数
const MEASURING_POLL_LIMIT: u32 = 10;
/// 每次轮询之间的间隔（微秒）
const MEASURING_POLL_INTERVAL_US: u32 = 1_000;

/// 传感器电源模式
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PowerMode {
    /// 休眠，不做任何转换，寄存器可读写
    #[default]
    Sleep,
    /// 单次转换，转换完成后自动回到休眠
    Forced,
    /// 按待机时间周期性连续转换
    Normal,
}

impl PowerMode {
    /// CTRL_MEAS寄存器 mode[1:0] 编码
    pub fn bits(self) -> u8 {
        match self {
            Self::Sleep => 0b00,
            Self::Forced => 0b01,
            Self::Normal => 0b11,
        }
    }
}

/// 电源状态机
///
/// 负责工作模式切换、过采样与待机时间寄存器的写入，每次配置写入后都回读校验
#[derive(Debug)]
pub(crate) struct PowerStateMachine {
    /// 当前电源模式
    mode: PowerMode,
    /// 过采样配置
    oversampling: OversamplingConfig,
    /// 芯片是否带湿度传感器
    has_humidity: bool,
}

impl PowerStateMachine {
    pub fn new(oversampling: OversamplingConfig, has_humidity: bool) -> Self {
        Self {
            mode: PowerMode::Sleep,
            oversampling,
            has_humidity,
        }
    }

    /// 当前电源模式
    pub fn mode(&self) -> PowerMode {
        self.mode
    }

    /// 计算CTRL_MEAS寄存器的值
    fn ctrl_meas(&self, mode: PowerMode) -> u8 {
        (self.oversampling.temperature.bits() << registers::OSRS_T_POS)
            | (self.oversampling.pressure.bits() << registers::OSRS_P_POS)
            | (mode.bits() & registers::MODE_MASK)
    }

    /// 按数据手册附录B计算单次转换的最长时间（微秒）
    ///
    /// 例如温度、压力均为1倍过采样且不测湿度时为 6425us
    pub fn measurement_time_us(&self) -> u32 {
        let osr_t = self.oversampling.temperature.factor();
        let osr_p = self.oversampling.pressure.factor();
        let osr_h = if self.has_humidity {
            self.oversampling.humidity.factor()
        } else {
            0
        };

        let mut time_us = 1250 + 2300 * osr_t;
        if osr_p > 0 {
            time_us += 2300 * osr_p + 575;
        }
        if osr_h > 0 {
            time_us += 2300 * osr_h + 575;
        }
        time_us
    }

    /// 进入休眠模式
    pub fn enter_sleep<I2C: I2c>(
        &mut self,
        transport: &mut RegisterTransport<I2C>,
    ) -> Result<(), I2C::Error> {
        transport.write_verified(
            registers::CTRL_MEAS,
            self.ctrl_meas(PowerMode::Sleep),
            0xFF,
        )?;

        log::debug!("{:?} -> Sleep", self.mode);
        self.mode = PowerMode::Sleep;
        Ok(())
    }

    /// 从休眠模式唤醒
    ///
    /// - 正常模式: 写入过采样配置并开始连续转换
    /// - 强制模式: 只写入过采样配置，每次读取时再触发转换
    pub fn power_up<I2C: I2c>(
        &mut self,
        transport: &mut RegisterTransport<I2C>,
        operating_mode: OperatingMode,
    ) -> Result<(), I2C::Error> {
        // 湿度过采样配置要在写入CTRL_MEAS之后才生效，所以先写
        if self.has_humidity {
            transport.write_verified(
                registers::CTRL_HUM,
                self.oversampling.humidity.bits(),
                registers::OSRS_H_MASK,
            )?;
        }

        let (mode, register_mode) = match operating_mode {
            OperatingMode::Normal => (PowerMode::Normal, PowerMode::Normal),
            OperatingMode::Forced => (PowerMode::Forced, PowerMode::Sleep),
        };
        transport.write_verified(registers::CTRL_MEAS, self.ctrl_meas(register_mode), 0xFF)?;

        log::debug!("{:?} -> {:?}", self.mode, mode);
        self.mode = mode;
        Ok(())
    }

    /// 强制模式下触发一次转换并等待转换完成
    ///
    /// mode位在转换完成后会自动清零，所以这里不做回读校验
    pub fn trigger_forced<I2C: I2c, D: DelayNs>(
        &mut self,
        transport: &mut RegisterTransport<I2C>,
        delay: &mut D,
    ) -> Result<(), I2C::Error> {
        if self.mode != PowerMode::Forced {
            return Err(Error::NotReady);
        }

        // 触发转换
        transport.write(registers::CTRL_MEAS, self.ctrl_meas(PowerMode::Forced))?;

        // 等待最长转换时间
        delay.delay_us(self.measurement_time_us());

        // 检查转换是否完成
        let mut status = 0;
        for _ in 0..MEASURING_POLL_LIMIT {
            status = transport.read_u8(registers::STATUS)?;
            if status & registers::STATUS_MEASURING == 0 {
                return Ok(());
            }
            delay.delay_us(MEASURING_POLL_INTERVAL_US);
        }

        log::error!("等待转换完成超时, status=0x{:02X}", status);
        Err(Error::HardwareFault {
            register: registers::STATUS,
            expected: 0,
            actual: status & registers::STATUS_MEASURING,
        })
    }

    /// 设置正常模式下的待机时间
    ///
    /// 只接受 500, 62500, 125000, 250000, 500000, 1000000, 2000000, 4000000 微秒，
    /// 其他取值返回 [`Error::InvalidArgument`] 且不访问总线。
    /// 正常模式下先进入休眠再写入，写完后恢复正常模式；中途失败时停留在最后一次校验通过的模式
    pub fn set_standby<I2C: I2c>(
        &mut self,
        transport: &mut RegisterTransport<I2C>,
        period_us: u32,
    ) -> Result<StandbyTime, I2C::Error> {
        let standby = StandbyTime::from_period_us(period_us)
            .ok_or(Error::InvalidArgument("不支持的采样间隔"))?;

        // 正常模式下写入CONFIG可能被忽略，先切到休眠
        let resume = self.mode == PowerMode::Normal;
        if resume {
            self.enter_sleep(transport)?;
        }

        // 读-改-写 CONFIG 寄存器的 t_sb[7:5]
        let config = transport.read_u8(registers::CONFIG)?;
        let config = (config & !registers::STANDBY_MASK)
            | (standby.bits() << registers::STANDBY_POS);
        transport.write_verified(registers::CONFIG, config, registers::STANDBY_MASK)?;

        // 恢复连续转换
        if resume {
            transport.write_verified(
                registers::CTRL_MEAS,
                self.ctrl_meas(PowerMode::Normal),
                0xFF,
            )?;
            log::debug!("{:?} -> Normal", self.mode);
            self.mode = PowerMode::Normal;
        }

        log::debug!("standby = {:?}", standby);
        Ok(standby)
    }
}
