use embedded_hal::i2c::I2c;

use super::ChipVariant;
use super::error::Result;
use super::registers;
use super::transport::RegisterTransport;

/// BME280传感器校准参数
///
/// 出厂时写入传感器NVM，每颗芯片各不相同，用于把ADC原始读数换算为物理量。
/// 设备句柄创建时在芯片ID校验通过之后读取一次，之后不再改变。
///
/// # 存储分布
/// - 温度/压力参数: 地址 0x88-0x9F (24字节, 小端序)
/// - 湿度参数: 地址 0xA1, 0xE1-0xE7
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    /// 温度校准系数1，无符号，0x88-0x89
    pub dig_t1: u16,
    /// 温度校准系数2，0x8A-0x8B
    pub dig_t2: i16,
    /// 温度校准系数3，0x8C-0x8D
    pub dig_t3: i16,

    /// 压力校准系数1，无符号，0x8E-0x8F
    ///
    /// 压力补偿公式的分母与该系数成正比，为0时补偿结果恒为0
    pub dig_p1: u16,
    pub dig_p2: i16,
    pub dig_p3: i16,
    pub dig_p4: i16,
    pub dig_p5: i16,
    pub dig_p6: i16,
    pub dig_p7: i16,
    pub dig_p8: i16,
    /// 压力校准系数9，0x9E-0x9F
    pub dig_p9: i16,

    /// 湿度校准系数1，0xA1
    pub dig_h1: u8,
    /// 湿度校准系数2，0xE1-0xE2 (小端序)
    pub dig_h2: i16,
    /// 湿度校准系数3，0xE3
    pub dig_h3: u8,
    /// 湿度校准系数4，12位有符号数: 0xE4[7:0] << 4 | 0xE5[3:0]
    pub dig_h4: i16,
    /// 湿度校准系数5，12位有符号数: 0xE6[7:0] << 4 | 0xE5[7:4]
    pub dig_h5: i16,
    /// 湿度校准系数6，0xE7
    pub dig_h6: i8,
}

impl Calibration {
    /// 从传感器读取并解析校准参数
    ///
    /// BMP280没有湿度传感器，湿度参数保持为0
    pub fn load<I2C: I2c>(
        transport: &mut RegisterTransport<I2C>,
        variant: ChipVariant,
    ) -> Result<Self, I2C::Error> {
        // 一次性连续读取温度/压力校准参数 (0x88-0xA1)
        let mut tp_block = [0u8; registers::CALIB_TP_LEN];
        transport.read(registers::CALIB_TP, &mut tp_block)?;

        // 读取湿度校准参数 (0xE1-0xE7)
        let h_block = if variant.has_humidity() {
            let mut h_block = [0u8; registers::CALIB_H_LEN];
            transport.read(registers::CALIB_H, &mut h_block)?;
            Some(h_block)
        } else {
            None
        };

        let calib = Self::parse(&tp_block, h_block.as_ref());
        log::debug!("校准参数: {:?}", calib);

        // OK
        Ok(calib)
    }

    /// 解析校准数据块
    pub fn parse(
        tp_block: &[u8; registers::CALIB_TP_LEN],
        h_block: Option<&[u8; registers::CALIB_H_LEN]>,
    ) -> Self {
        let word = |i: usize| [tp_block[i], tp_block[i + 1]];

        let mut calib = Self {
            dig_t1: u16::from_le_bytes(word(0)),
            dig_t2: i16::from_le_bytes(word(2)),
            dig_t3: i16::from_le_bytes(word(4)),
            dig_p1: u16::from_le_bytes(word(6)),
            dig_p2: i16::from_le_bytes(word(8)),
            dig_p3: i16::from_le_bytes(word(10)),
            dig_p4: i16::from_le_bytes(word(12)),
            dig_p5: i16::from_le_bytes(word(14)),
            dig_p6: i16::from_le_bytes(word(16)),
            dig_p7: i16::from_le_bytes(word(18)),
            dig_p8: i16::from_le_bytes(word(20)),
            dig_p9: i16::from_le_bytes(word(22)),
            ..Default::default()
        };

        if let Some(h) = h_block {
            // 0xA0 为保留字节，0xA1 为 dig_H1
            calib.dig_h1 = tp_block[25];
            calib.dig_h2 = i16::from_le_bytes([h[0], h[1]]);
            calib.dig_h3 = h[2];
            // 高8位需要按有符号数扩展
            calib.dig_h4 = ((h[3] as i8 as i16) << 4) | (h[4] & 0x0F) as i16;
            calib.dig_h5 = ((h[5] as i8 as i16) << 4) | (h[4] >> 4) as i16;
            calib.dig_h6 = h[6] as i8;
        }

        calib
    }
}

/// 测试用的参考校准数据（Bosch数据手册中的计算示例）
#[cfg(test)]
pub(crate) mod fixtures {
    use super::Calibration;

    /// 0x88-0xA1
    pub const TP_BLOCK: [u8; 26] = [
        0x70, 0x6B, 0x43, 0x67, 0x18, 0xFC, 0x7D, 0x8E, 0x43, 0xD6, 0xD0, 0x0B, 0x27, 0x0B, 0x8C,
        0x00, 0xF9, 0xFF, 0x8C, 0x3C, 0xF8, 0xC6, 0x70, 0x17, 0x00, 0x4B,
    ];

    /// 0xE1-0xE7
    pub const H_BLOCK: [u8; 7] = [0x6A, 0x01, 0x00, 0x13, 0x29, 0x03, 0x1E];

    pub fn reference() -> Calibration {
        Calibration {
            dig_t1: 27504,
            dig_t2: 26435,
            dig_t3: -1000,
            dig_p1: 36477,
            dig_p2: -10685,
            dig_p3: 3024,
            dig_p4: 2855,
            dig_p5: 140,
            dig_p6: -7,
            dig_p7: 15500,
            dig_p8: -14600,
            dig_p9: 6000,
            dig_h1: 75,
            dig_h2: 362,
            dig_h3: 0,
            dig_h4: 313,
            dig_h5: 50,
            dig_h6: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::bme280::transport::BusVariant;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    #[test]
    fn parse_reference_blocks() {
        let calib = Calibration::parse(&fixtures::TP_BLOCK, Some(&fixtures::H_BLOCK));
        assert_eq!(calib, fixtures::reference());
    }

    #[test]
    fn humidity_nibbles_are_sign_extended() {
        let h_block = [0x00, 0x00, 0x00, 0xF0, 0x89, 0xFF, 0x00];
        let calib = Calibration::parse(&fixtures::TP_BLOCK, Some(&h_block));
        // 0xF0 << 4 | 0x9
        assert_eq!(calib.dig_h4, -247);
        // 0xFF << 4 | 0x8
        assert_eq!(calib.dig_h5, -8);
    }

    #[test]
    fn bmp280_skips_humidity_block() {
        let i2c = I2cMock::new(&[I2cTransaction::write_read(
            0x76,
            vec![0x88],
            fixtures::TP_BLOCK.to_vec(),
        )]);
        let mut transport = RegisterTransport::new(i2c, 0x76, BusVariant::Standard);
        let calib = Calibration::load(&mut transport, ChipVariant::Bmp280).unwrap();
        assert_eq!(calib.dig_t1, 27504);
        assert_eq!(calib.dig_p9, 6000);
        assert_eq!(calib.dig_h1, 0);
        assert_eq!(calib.dig_h2, 0);
        transport.release().done();
    }

    #[test]
    fn bme280_reads_both_blocks() {
        let i2c = I2cMock::new(&[
            I2cTransaction::write_read(0x76, vec![0x88], fixtures::TP_BLOCK.to_vec()),
            I2cTransaction::write_read(0x76, vec![0xE1], fixtures::H_BLOCK.to_vec()),
        ]);
        let mut transport = RegisterTransport::new(i2c, 0x76, BusVariant::Standard);
        let calib = Calibration::load(&mut transport, ChipVariant::Bme280).unwrap();
        assert_eq!(calib, fixtures::reference());
        transport.release().done();
    }
}
