use embedded_hal::i2c::{I2c, Operation};

use super::error::{Error, Result};

/// I2C总线写操作的帧格式
///
/// 部分I2C控制器在单次寄存器写入后必须跟随一次读操作，写入才能被正确地
/// 组帧发送，构造时通过该枚举选择
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum BusVariant {
    /// 标准写入: 单次事务发送 `[寄存器, 数值]`
    #[default]
    Standard,
    /// 写入 `[寄存器, 数值]` 后在同一事务中追加1字节的空读
    DummyReadAfterWrite,
}

/// 寄存器读写传输层
pub struct RegisterTransport<I2C> {
    /// I2C通信句柄
    i2c: I2C,
    /// I2C从设备地址
    address: u8,
    /// 总线帧格式
    variant: BusVariant,
}

impl<I2C: I2c> RegisterTransport<I2C> {
    /// 创建传输层实例
    pub fn new(i2c: I2C, address: u8, variant: BusVariant) -> Self {
        Self {
            i2c,
            address,
            variant,
        }
    }

    /// 从 `sub_address` 开始连续读取 `buf.len()` 个字节
    ///
    /// 先写入1字节寄存器地址，不释放总线（重复起始条件）紧接着读取数据
    pub fn read(&mut self, sub_address: u8, buf: &mut [u8]) -> Result<(), I2C::Error> {
        // 读取长度必须大于0
        if buf.is_empty() {
            return Err(Error::InvalidArgument("读取长度必须大于0"));
        }

        log::trace!("read start=0x{:02X}, size={}", sub_address, buf.len());
        self.i2c
            .write_read(self.address, &[sub_address], buf)
            .map_err(|err| {
                log::error!("I2C读取寄存器0x{:02X}失败: {:?}", sub_address, err);
                Error::Bus(err)
            })
    }

    /// 读取单个寄存器
    pub fn read_u8(&mut self, register: u8) -> Result<u8, I2C::Error> {
        let mut data = [0u8];
        self.read(register, &mut data)?;
        Ok(data[0])
    }

    /// 写入单个寄存器
    pub fn write(&mut self, register: u8, value: u8) -> Result<(), I2C::Error> {
        log::trace!("write reg=0x{:02X}, val=0x{:02X}", register, value);
        let buffer = [register, value];
        let result = match self.variant {
            BusVariant::Standard => self.i2c.write(self.address, &buffer),
            BusVariant::DummyReadAfterWrite => {
                // 空读的数据直接丢弃
                let mut dummy = [0u8];
                self.i2c.transaction(
                    self.address,
                    &mut [Operation::Write(&buffer), Operation::Read(&mut dummy)],
                )
            }
        };

        result.map_err(|err| {
            log::error!("I2C写入寄存器0x{:02X}失败: {:?}", register, err);
            Error::Bus(err)
        })
    }

    /// 写入寄存器后回读校验，只比较 `mask` 覆盖的位
    ///
    /// 回读不一致时返回 [`Error::HardwareFault`]
    pub fn write_verified(&mut self, register: u8, value: u8, mask: u8) -> Result<(), I2C::Error> {
        self.write(register, value)?;

        let actual = self.read_u8(register)?;
        if actual & mask != value & mask {
            log::error!(
                "寄存器0x{:02X}回读校验失败: 写入0x{:02X}, 回读0x{:02X}",
                register,
                value,
                actual
            );
            return Err(Error::HardwareFault {
                register,
                expected: value & mask,
                actual: actual & mask,
            });
        }

        // OK
        Ok(())
    }

    /// 释放I2C通信句柄
    pub fn release(self) -> I2C {
        self.i2c
    }
}
