//! BME280 寄存器地址与位域定义

/// 芯片ID寄存器
pub const CHIP_ID: u8 = 0xD0;
/// 软复位寄存器
pub const RESET: u8 = 0xE0;
/// 温度/压力校准参数起始地址 (0x88-0xA1, 含 dig_H1)
pub const CALIB_TP: u8 = 0x88;
/// 湿度校准参数起始地址 (0xE1-0xE7)
pub const CALIB_H: u8 = 0xE1;
/// 湿度采样控制寄存器
pub const CTRL_HUM: u8 = 0xF2;
/// 状态寄存器
pub const STATUS: u8 = 0xF3;
/// 温度/压力采样与工作模式控制寄存器
pub const CTRL_MEAS: u8 = 0xF4;
/// 待机时间与滤波器配置寄存器
pub const CONFIG: u8 = 0xF5;
/// 原始数据起始地址 (压力 0xF7-0xF9, 温度 0xFA-0xFC, 湿度 0xFD-0xFE)
pub const DATA: u8 = 0xF7;

/// BME280 芯片ID
pub const CHIP_ID_BME280: u8 = 0x60;
/// BMP280 芯片ID (无湿度传感器)
pub const CHIP_ID_BMP280: u8 = 0x58;

/// 软复位命令字
pub const SOFT_RESET_CMD: u8 = 0xB6;

/// 温度/压力校准数据长度
pub const CALIB_TP_LEN: usize = 26;
/// 湿度校准数据长度
pub const CALIB_H_LEN: usize = 7;
/// 压力+温度原始数据长度
pub const DATA_TP_LEN: usize = 6;
/// 压力+温度+湿度原始数据长度
pub const DATA_TPH_LEN: usize = 8;

/// STATUS: 正在转换
pub const STATUS_MEASURING: u8 = 0x08;
/// STATUS: 正在从NVM拷贝校准数据
pub const STATUS_IM_UPDATE: u8 = 0x01;

/// CTRL_MEAS: 工作模式位 [1:0]
pub const MODE_MASK: u8 = 0x03;
/// CTRL_MEAS: 温度过采样位 [7:5]
pub const OSRS_T_POS: u8 = 5;
/// CTRL_MEAS: 压力过采样位 [4:2]
pub const OSRS_P_POS: u8 = 2;
/// CTRL_HUM: 湿度过采样位 [2:0]
pub const OSRS_H_MASK: u8 = 0x07;

/// CONFIG: 待机时间位 [7:5]
pub const STANDBY_POS: u8 = 5;
pub const STANDBY_MASK: u8 = 0x07 << STANDBY_POS;
/// CONFIG: IIR滤波器位 [4:2]
pub const FILTER_POS: u8 = 2;
pub const FILTER_MASK: u8 = 0x07 << FILTER_POS;
