//! One-shot hardware peripheral initialization and raw peripheral access.
//!
//! Configures the soil ADC channel, the pump LEDC timer/channel and the
//! on-chip temperature sensor using raw ESP-IDF sys calls. Called once
//! from `main()` before the control loop starts.
//!
//! On the host every accessor is backed by in-memory simulation state so
//! the sensor and pump drivers run unchanged in tests.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;
#[cfg(target_os = "espidf")]
use log::{info, warn};
#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::Ordering;

use embedded_hal::delay::DelayNs;
use embedded_hal::pwm::{ErrorKind, ErrorType, SetDutyCycle};

use crate::error::SensorError;
#[cfg(target_os = "espidf")]
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    LedcInitFailed(i32),
    TempSensorFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC1 init failed (rc={})", rc),
            Self::LedcInitFailed(rc) => write!(f, "LEDC timer/channel config failed (rc={})", rc),
            Self::TempSensorFailed(rc) => write!(f, "temperature sensor init failed (rc={})", rc),
        }
    }
}

impl From<HwInitError> for crate::error::Error {
    fn from(e: HwInitError) -> Self {
        match e {
            HwInitError::AdcInitFailed(_) => Self::Init("ADC1"),
            HwInitError::LedcInitFailed(_) => Self::Init("LEDC"),
            HwInitError::TempSensorFailed(_) => Self::Init("temperature sensor"),
        }
    }
}

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the control loop; single-threaded.
    unsafe {
        init_adc()?;
        init_ledc()?;
        if let Err(e) = init_temp_sensor() {
            // Temperature is informational only; run without it.
            warn!("hw_init: {}", e);
        }
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// SAFETY: Must be called only from the single-threaded init path or the
/// main-loop ADC read path.
#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

#[cfg(target_os = "espidf")]
unsafe fn init_adc() -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    let ret = unsafe { adc_oneshot_config_channel(adc1_handle(), pins::SOIL_ADC_CHANNEL, &chan_cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    info!("hw_init: ADC1 configured (CH{}=soil)", pins::SOIL_ADC_CHANNEL);
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn adc1_read(channel: u32) -> Result<u16, SensorError> {
    let mut raw: i32 = 0;
    // SAFETY: adc1_handle() contract: single-threaded main-loop access only.
    let ret = unsafe { adc_oneshot_read(adc1_handle(), channel, &mut raw) };
    if ret != ESP_OK as i32 {
        return Err(SensorError::AdcReadFailed);
    }
    Ok(raw.clamp(0, 4095) as u16)
}

#[cfg(not(target_os = "espidf"))]
mod sim {
    use core::sync::atomic::{AtomicI32, AtomicU16, AtomicU8};

    /// `u16::MAX` simulates a failing ADC read.
    pub static SOIL_ADC: AtomicU16 = AtomicU16::new(2000);
    /// Tenths of a degree; `i32::MIN` simulates a missing sensor.
    pub static CHIP_TEMP_TENTHS: AtomicI32 = AtomicI32::new(250);
    pub static PUMP_DUTY: AtomicU8 = AtomicU8::new(0);
}

#[cfg(not(target_os = "espidf"))]
pub fn adc1_read(_channel: u32) -> Result<u16, SensorError> {
    match sim::SOIL_ADC.load(Ordering::Relaxed) {
        u16::MAX => Err(SensorError::AdcReadFailed),
        raw => Ok(raw.min(4095)),
    }
}

/// Inject the next simulated soil ADC reading (`None` = read failure).
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_soil_adc(raw: Option<u16>) {
    sim::SOIL_ADC.store(raw.unwrap_or(u16::MAX), Ordering::Relaxed);
}

// ── On-chip temperature sensor ────────────────────────────────

#[cfg(target_os = "espidf")]
static mut TEMP_HANDLE: temperature_sensor_handle_t = core::ptr::null_mut();

#[cfg(target_os = "espidf")]
unsafe fn init_temp_sensor() -> Result<(), HwInitError> {
    let cfg = temperature_sensor_config_t {
        range_min: -10,
        range_max: 80,
        ..Default::default()
    };
    // SAFETY: TEMP_HANDLE is only written here, once at boot.
    let ret = unsafe { temperature_sensor_install(&cfg, &raw mut TEMP_HANDLE) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::TempSensorFailed(ret));
    }
    let ret = unsafe { temperature_sensor_enable(TEMP_HANDLE) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::TempSensorFailed(ret));
    }
    info!("hw_init: chip temperature sensor enabled");
    Ok(())
}

/// Die temperature in °C.
#[cfg(target_os = "espidf")]
pub fn chip_temp_celsius() -> Result<f32, SensorError> {
    // SAFETY: TEMP_HANDLE written once during init; main-loop read only.
    let handle = unsafe { TEMP_HANDLE };
    if handle.is_null() {
        return Err(SensorError::TempUnavailable);
    }
    let mut celsius: f32 = 0.0;
    let ret = unsafe { temperature_sensor_get_celsius(handle, &mut celsius) };
    if ret != ESP_OK as i32 {
        return Err(SensorError::TempUnavailable);
    }
    Ok(celsius)
}

#[cfg(not(target_os = "espidf"))]
pub fn chip_temp_celsius() -> Result<f32, SensorError> {
    match sim::CHIP_TEMP_TENTHS.load(Ordering::Relaxed) {
        i32::MIN => Err(SensorError::TempUnavailable),
        tenths => Ok(tenths as f32 / 10.0),
    }
}

/// Inject the simulated die temperature (`None` = sensor missing).
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_chip_temp(celsius: Option<f32>) {
    let v = celsius.map_or(i32::MIN, |c| (c * 10.0).round() as i32);
    sim::CHIP_TEMP_TENTHS.store(v, Ordering::Relaxed);
}

// ── LEDC PWM ─────────────────────────────────────────────────

pub const LEDC_CH_PUMP: u32 = 0;

#[cfg(target_os = "espidf")]
unsafe fn init_ledc() -> Result<(), HwInitError> {
    // Timer 0: pump motor (25 kHz, 8-bit)
    let timer0 = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: ledc_timer_t_LEDC_TIMER_0,
        duty_resolution: ledc_timer_bit_t_LEDC_TIMER_8_BIT,
        freq_hz: pins::PUMP_PWM_FREQ_HZ,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    // SAFETY: Called from single main-task context via init_peripherals().
    let ret = unsafe { ledc_timer_config(&timer0) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::LedcInitFailed(ret));
    }

    let ret = unsafe {
        ledc_channel_config(&ledc_channel_config_t {
            speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
            channel: LEDC_CH_PUMP,
            timer_sel: ledc_timer_t_LEDC_TIMER_0,
            gpio_num: pins::PUMP_PWM_GPIO,
            duty: 0,
            hpoint: 0,
            ..Default::default()
        })
    };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::LedcInitFailed(ret));
    }

    info!("hw_init: LEDC configured (pump=CH{})", LEDC_CH_PUMP);
    Ok(())
}

/// PWM write failure on an LEDC channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedcError(pub i32);

impl embedded_hal::pwm::Error for LedcError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// One 8-bit LEDC channel exposed through `embedded-hal`'s [`SetDutyCycle`].
pub struct LedcPwm {
    channel: u32,
    #[cfg(not(target_os = "espidf"))]
    duty: u8,
}

impl LedcPwm {
    /// The pump channel configured by [`init_peripherals`].
    pub fn pump() -> Self {
        Self {
            channel: LEDC_CH_PUMP,
            #[cfg(not(target_os = "espidf"))]
            duty: 0,
        }
    }

    pub fn channel(&self) -> u32 {
        self.channel
    }

    /// Last duty written (simulation only).
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_duty(&self) -> u8 {
        self.duty
    }
}

impl ErrorType for LedcPwm {
    type Error = LedcError;
}

impl SetDutyCycle for LedcPwm {
    fn max_duty_cycle(&self) -> u16 {
        (1 << crate::pins::PWM_RESOLUTION_BITS) - 1
    }

    #[cfg(target_os = "espidf")]
    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        // SAFETY: LEDC channel was configured in init_ledc(); duty register
        // writes are race-free since only the main loop calls this.
        let ret = unsafe { ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, self.channel, u32::from(duty)) };
        if ret != ESP_OK as i32 {
            return Err(LedcError(ret));
        }
        let ret = unsafe { ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, self.channel) };
        if ret != ESP_OK as i32 {
            return Err(LedcError(ret));
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.duty = duty.min(255) as u8;
        sim::PUMP_DUTY.store(self.duty, Ordering::Relaxed);
        Ok(())
    }
}

/// Last duty written to the simulated pump channel.
#[cfg(not(target_os = "espidf"))]
pub fn sim_pump_duty() -> u8 {
    sim::PUMP_DUTY.load(Ordering::Relaxed)
}

// ── Blocking delay ───────────────────────────────────────────

/// `DelayNs` over `std::thread::sleep`, which yields to FreeRTOS on the
/// device.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockingDelay;

impl DelayNs for BlockingDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(u64::from(ns)));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    }
}
