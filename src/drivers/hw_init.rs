//! One-shot peripheral initialisation and the buzzer's LEDC tone output.
//!
//! GPIO pins are owned by `esp-idf-hal` drivers created in `main()`; the
//! buzzer needs a variable frequency, which the HAL's fixed-frequency
//! LEDC driver does not offer, so it is driven through raw sys calls.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::pins;

/// 50 % duty at 10-bit resolution.
#[cfg(target_os = "espidf")]
const BUZZER_DUTY: u32 = 512;

// ── Error type ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    LedcInitFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::LedcInitFailed(rc) => write!(f, "LEDC timer/channel config failed (rc={})", rc),
        }
    }
}

// ── Init ──────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    let timer = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: pins::BUZZER_LEDC_TIMER,
        duty_resolution: ledc_timer_bit_t_LEDC_TIMER_10_BIT,
        freq_hz: 1_000,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    // SAFETY: called once from main() before the loop starts.
    let ret = unsafe { ledc_timer_config(&timer) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::LedcInitFailed(ret));
    }

    let channel = ledc_channel_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        channel: pins::BUZZER_LEDC_CHANNEL,
        timer_sel: pins::BUZZER_LEDC_TIMER,
        gpio_num: pins::BUZZER_GPIO,
        duty: 0,
        hpoint: 0,
        ..Default::default()
    };
    // SAFETY: as above.
    let ret = unsafe { ledc_channel_config(&channel) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::LedcInitFailed(ret));
    }

    info!("hw_init: buzzer LEDC configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── Buzzer ────────────────────────────────────────────────────

/// Start a square wave at `hz`, or silence the buzzer when `hz == 0`.
#[cfg(target_os = "espidf")]
pub fn buzzer_tone(hz: u32) {
    // SAFETY: the channel was configured in init_peripherals(); only the
    // main loop writes it.
    unsafe {
        if hz == 0 {
            ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, pins::BUZZER_LEDC_CHANNEL, 0);
        } else {
            ledc_set_freq(ledc_mode_t_LEDC_LOW_SPEED_MODE, pins::BUZZER_LEDC_TIMER, hz);
            ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, pins::BUZZER_LEDC_CHANNEL, BUZZER_DUTY);
        }
        ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, pins::BUZZER_LEDC_CHANNEL);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn buzzer_tone(_hz: u32) {}

// ── Timebase ──────────────────────────────────────────────────

/// Microseconds since boot.
#[cfg(target_os = "espidf")]
pub fn micros() -> u64 {
    // SAFETY: esp_timer_get_time reads a free-running counter.
    unsafe { esp_timer_get_time() as u64 }
}

#[cfg(not(target_os = "espidf"))]
pub fn micros() -> u64 {
    use std::sync::OnceLock;
    use std::time::Instant;
    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_micros() as u64
}
