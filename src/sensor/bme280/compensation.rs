use super::calibration::Calibration;

/// 温度补偿的中间结果 t_fine
///
/// 压力和湿度补偿都以它为输入，只能由温度补偿函数产生，保证每个样本只计算一次
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FineTemperature(i32);

impl FineTemperature {
    pub fn value(self) -> i32 {
        self.0
    }
}

/// BME280温度补偿函数 (数据手册 4.2.3 节)
///
/// ## 参数
/// - `adc_t`: 寄存器 0xFA-0xFC 读取的20位温度ADC值
///
/// ## 返回
/// - 温度，单位 0.01°C (例如 5123 表示 51.23°C)
/// - t_fine
pub fn compensate_temperature(adc_t: u32, calib: &Calibration) -> (i32, FineTemperature) {
    // 数据手册中使用32位有符号整型，这里放宽到64位以避免异常读数导致溢出
    let adc_t = adc_t as i64;
    let dig_t1 = calib.dig_t1 as i64;
    let dig_t2 = calib.dig_t2 as i64;
    let dig_t3 = calib.dig_t3 as i64;

    let var1 = (((adc_t >> 3) - (dig_t1 << 1)) * dig_t2) >> 11;
    let var2 = (((((adc_t >> 4) - dig_t1) * ((adc_t >> 4) - dig_t1)) >> 12) * dig_t3) >> 14;

    let t_fine = var1 + var2;
    let temperature = (t_fine * 5 + 128) >> 8;

    (temperature as i32, FineTemperature(t_fine as i32))
}

/// BME280压力补偿函数 (数据手册 4.2.3 节, 64位版本)
///
/// ## 返回
/// - 压力，Q24.8 格式的帕斯卡值 (例如 24674867 表示 24674867/256 = 96386.2 Pa)
///
/// 当分母项为0时返回0，不做除法
pub fn compensate_pressure(adc_p: u32, t_fine: FineTemperature, calib: &Calibration) -> u32 {
    // 在128位下累加，异常的原始值也不会溢出，正常范围内结果与64位一致
    let dig_p1 = calib.dig_p1 as i128;
    let dig_p2 = calib.dig_p2 as i128;
    let dig_p3 = calib.dig_p3 as i128;
    let dig_p4 = calib.dig_p4 as i128;
    let dig_p5 = calib.dig_p5 as i128;
    let dig_p6 = calib.dig_p6 as i128;
    let dig_p7 = calib.dig_p7 as i128;
    let dig_p8 = calib.dig_p8 as i128;
    let dig_p9 = calib.dig_p9 as i128;

    let mut var1 = t_fine.value() as i128 - 128000;
    let mut var2 = var1 * var1 * dig_p6;
    var2 += (var1 * dig_p5) << 17;
    var2 += dig_p4 << 35;
    var1 = ((var1 * var1 * dig_p3) >> 8) + ((var1 * dig_p2) << 12);
    var1 = (((1i128 << 47) + var1) * dig_p1) >> 33;

    if var1 == 0 {
        log::warn!("压力补偿分母为0, 返回0");
        return 0;
    }

    let mut p = 1048576 - adc_p as i128;
    p = (((p << 31) - var2) * 3125) / var1;
    var1 = (dig_p9 * (p >> 13) * (p >> 13)) >> 25;
    var2 = (dig_p8 * p) >> 19;
    p = ((p + var1 + var2) >> 8) + (dig_p7 << 4);

    p.clamp(0, u32::MAX as i128) as u32
}

/// 湿度输出上限 100%RH (Q22.10 << 12)
const HUMIDITY_MAX: i64 = 419430400;

/// BME280湿度补偿函数 (数据手册 4.2.3 节)
///
/// ## 返回
/// - 相对湿度，Q22.10 格式 (例如 47445 表示 47445/1024 = 46.333 %RH)，范围 0-100%
pub fn compensate_humidity(adc_h: u16, t_fine: FineTemperature, calib: &Calibration) -> u32 {
    let adc_h = adc_h as i64;
    let dig_h1 = calib.dig_h1 as i64;
    let dig_h2 = calib.dig_h2 as i64;
    let dig_h3 = calib.dig_h3 as i64;
    let dig_h4 = calib.dig_h4 as i64;
    let dig_h5 = calib.dig_h5 as i64;
    let dig_h6 = calib.dig_h6 as i64;

    let var1 = t_fine.value() as i64 - 76800;

    let var2 = ((adc_h << 14) - (dig_h4 << 20) - (dig_h5 * var1) + 16384) >> 15;
    let var3 = (((((var1 * dig_h6) >> 10) * (((var1 * dig_h3) >> 11) + 32768)) >> 10) + 2097152)
        * dig_h2
        + 8192;
    let mut var5 = var2 * (var3 >> 14);

    // 负值最终会被截断为0，超过32位的值最终会被截断为100%
    var5 = var5.clamp(0, i32::MAX as i64);
    var5 -= ((((var5 >> 15) * (var5 >> 15)) >> 7) * dig_h1) >> 4;
    var5 = var5.clamp(0, HUMIDITY_MAX);

    (var5 >> 12) as u32
}

/// 浮点版本的温度补偿 (数据手册 8.1 节)
///
/// 返回摄氏度和 t_fine
pub fn compensate_temperature_f64(adc_t: u32, calib: &Calibration) -> (f64, FineTemperature) {
    let adc_t = adc_t as f64;
    let dig_t1 = calib.dig_t1 as f64;
    let dig_t2 = calib.dig_t2 as f64;
    let dig_t3 = calib.dig_t3 as f64;

    let var1 = (adc_t / 16384.0 - dig_t1 / 1024.0) * dig_t2;
    let var2 = (adc_t / 131072.0 - dig_t1 / 8192.0) * (adc_t / 131072.0 - dig_t1 / 8192.0) * dig_t3;

    let t_fine = var1 + var2;
    (t_fine / 5120.0, FineTemperature(t_fine as i32))
}

/// 浮点版本的压力补偿，返回帕斯卡，分母为0时返回0
pub fn compensate_pressure_f64(adc_p: u32, t_fine: FineTemperature, calib: &Calibration) -> f64 {
    let dig_p1 = calib.dig_p1 as f64;
    let dig_p2 = calib.dig_p2 as f64;
    let dig_p3 = calib.dig_p3 as f64;
    let dig_p4 = calib.dig_p4 as f64;
    let dig_p5 = calib.dig_p5 as f64;
    let dig_p6 = calib.dig_p6 as f64;
    let dig_p7 = calib.dig_p7 as f64;
    let dig_p8 = calib.dig_p8 as f64;
    let dig_p9 = calib.dig_p9 as f64;

    let mut var1 = t_fine.value() as f64 / 2.0 - 64000.0;
    let mut var2 = var1 * var1 * dig_p6 / 32768.0;
    var2 += var1 * dig_p5 * 2.0;
    var2 = var2 / 4.0 + dig_p4 * 65536.0;
    var1 = (dig_p3 * var1 * var1 / 524288.0 + dig_p2 * var1) / 524288.0;
    var1 = (1.0 + var1 / 32768.0) * dig_p1;

    if var1 == 0.0 {
        log::warn!("压力补偿分母为0, 返回0");
        return 0.0;
    }

    let mut p = 1048576.0 - adc_p as f64;
    p = (p - var2 / 4096.0) * 6250.0 / var1;
    var1 = dig_p9 * p * p / 2147483648.0;
    var2 = p * dig_p8 / 32768.0;

    p + (var1 + var2 + dig_p7) / 16.0
}

/// 浮点版本的湿度补偿，返回 %RH，范围 0-100
pub fn compensate_humidity_f64(adc_h: u16, t_fine: FineTemperature, calib: &Calibration) -> f64 {
    let dig_h1 = calib.dig_h1 as f64;
    let dig_h2 = calib.dig_h2 as f64;
    let dig_h3 = calib.dig_h3 as f64;
    let dig_h4 = calib.dig_h4 as f64;
    let dig_h5 = calib.dig_h5 as f64;
    let dig_h6 = calib.dig_h6 as f64;

    let var_h = t_fine.value() as f64 - 76800.0;
    let var_h = (adc_h as f64 - (dig_h4 * 64.0 + dig_h5 / 16384.0 * var_h))
        * (dig_h2 / 65536.0
            * (1.0 + dig_h6 / 67108864.0 * var_h * (1.0 + dig_h3 / 67108864.0 * var_h)));
    let var_h = var_h * (1.0 - dig_h1 * var_h / 524288.0);

    var_h.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::bme280::calibration::fixtures;

    const ADC_T: u32 = 519888;
    const ADC_P: u32 = 415148;

    #[test]
    fn reference_temperature() {
        let calib = fixtures::reference();
        let (temperature, t_fine) = compensate_temperature(ADC_T, &calib);
        assert_eq!(temperature, 2508);
        assert_eq!(t_fine.value(), 128422);

        let (temperature, t_fine) = compensate_temperature_f64(ADC_T, &calib);
        assert!((temperature - 25.08).abs() < 0.01);
        assert_eq!(t_fine.value(), 128422);
    }

    #[test]
    fn reference_pressure() {
        let calib = fixtures::reference();
        let (_, t_fine) = compensate_temperature(ADC_T, &calib);

        let pressure = compensate_pressure(ADC_P, t_fine, &calib);
        assert_eq!(pressure, 25767233);
        assert!((pressure as f64 / 256.0 - 100653.27).abs() < 0.1);

        let pressure = compensate_pressure_f64(ADC_P, t_fine, &calib);
        assert!((pressure - 100653.27).abs() < 0.1);
    }

    #[test]
    fn reference_humidity() {
        let calib = fixtures::reference();
        let (_, t_fine) = compensate_temperature(ADC_T, &calib);

        let humidity = compensate_humidity(30000, t_fine, &calib);
        assert_eq!(humidity, 56317);

        let humidity_f64 = compensate_humidity_f64(30000, t_fine, &calib);
        assert!((humidity_f64 - humidity as f64 / 1024.0).abs() < 0.01);
    }

    #[test]
    fn humidity_is_clamped() {
        let calib = fixtures::reference();
        let (_, t_fine) = compensate_temperature(ADC_T, &calib);

        assert_eq!(compensate_humidity(0, t_fine, &calib), 0);
        assert_eq!(compensate_humidity(u16::MAX, t_fine, &calib), 100 * 1024);
        assert_eq!(compensate_humidity_f64(0, t_fine, &calib), 0.0);
        assert_eq!(compensate_humidity_f64(u16::MAX, t_fine, &calib), 100.0);
    }

    #[test]
    fn temperature_increases_with_raw_count() {
        let calib = fixtures::reference();
        let mut last = i32::MIN;
        for adc_t in (0..=0xF_FFFF).step_by(256) {
            let (temperature, _) = compensate_temperature(adc_t, &calib);
            assert!(temperature > last, "adc_t = {}", adc_t);
            last = temperature;
        }
    }

    #[test]
    fn zero_denominator_yields_sentinel() {
        let calib = Calibration {
            dig_p1: 0,
            ..fixtures::reference()
        };
        let (_, t_fine) = compensate_temperature(ADC_T, &calib);
        assert_eq!(compensate_pressure(ADC_P, t_fine, &calib), 0);
        assert_eq!(compensate_pressure_f64(ADC_P, t_fine, &calib), 0.0);
    }

    #[test]
    fn extreme_raw_values_do_not_panic() {
        let calib = fixtures::reference();
        for adc_t in [0, 0x8_0000, 0xF_FFFF] {
            let (_, t_fine) = compensate_temperature(adc_t, &calib);
            for adc_p in [0, 0x8_0000, 0xF_FFFF] {
                let _ = compensate_pressure(adc_p, t_fine, &calib);
            }
            for adc_h in [0, 0x8000, 0xFFFF] {
                let humidity = compensate_humidity(adc_h, t_fine, &calib);
                assert!(humidity <= 100 * 1024);
            }
        }
    }
}
