use std::fmt::{self, Debug};

/// BME280 驱动错误
///
/// `E` 为底层I2C总线的错误类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<E> {
    /// I2C总线传输失败，调用方可以重试
    Bus(E),
    /// 芯片ID不匹配，该设备不可使用
    DeviceNotFound {
        /// 实际读取到的芯片ID
        chip_id: u8,
    },
    /// 配置写入后回读校验失败，或者传感器未在规定时间内就绪
    HardwareFault {
        /// 出错的寄存器地址
        register: u8,
        /// 期望值
        expected: u8,
        /// 实际回读值
        actual: u8,
    },
    /// 参数不合法（不支持的采样间隔、空缓冲区、芯片不支持的通道等），不产生任何副作用
    InvalidArgument(&'static str),
    /// 传感器处于休眠模式时读取数据
    NotReady,
}

impl<E: Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(err) => write!(f, "I2C总线传输失败: {:?}", err),
            Self::DeviceNotFound { chip_id } => {
                write!(f, "未找到BME280传感器, 芯片ID: 0x{:02X}", chip_id)
            }
            Self::HardwareFault {
                register,
                expected,
                actual,
            } => write!(
                f,
                "寄存器0x{:02X}校验失败, 期望: 0x{:02X}, 实际: 0x{:02X}",
                register, expected, actual
            ),
            Self::InvalidArgument(reason) => write!(f, "参数不合法: {}", reason),
            Self::NotReady => write!(f, "传感器处于休眠模式, 请先激活"),
        }
    }
}

impl<E: Debug> std::error::Error for Error<E> {}

/// BME280 驱动操作结果
pub type Result<T, E> = core::result::Result<T, Error<E>>;

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::ErrorKind;

    #[test]
    fn display_names_the_faulty_register() {
        let err: Error<ErrorKind> = Error::HardwareFault {
            register: 0xF5,
            expected: 0x20,
            actual: 0x00,
        };
        let text = err.to_string();
        assert!(text.contains("0xF5"));
        assert!(text.contains("0x20"));
    }

    #[test]
    fn converts_into_anyhow() {
        let err: Error<ErrorKind> = Error::DeviceNotFound { chip_id: 0x55 };
        let err: anyhow::Error = err.into();
        assert!(err.to_string().contains("0x55"));
    }
}
