//! Task Watchdog Timer (TWDT) driver.
//!
//! Resets the device if the main loop stalls.  The loop calls
//! [`Watchdog::feed`] on every pass.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// Longest tolerated stall of the main loop.
pub const WATCHDOG_TIMEOUT_MS: u32 = 8_000;

pub struct Watchdog {
    #[cfg(target_os = "espidf")]
    subscribed: bool,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}

impl Watchdog {
    /// Configure the TWDT and subscribe the calling task.
    pub fn new() -> Self {
        #[cfg(target_os = "espidf")]
        {
            let cfg = esp_task_wdt_config_t {
                timeout_ms: WATCHDOG_TIMEOUT_MS,
                idle_core_mask: 0,
                trigger_panic: true,
            };
            // SAFETY: plain FFI calls on the current task during start-up.
            let ret = unsafe { esp_task_wdt_reconfigure(&cfg) };
            if ret != ESP_OK as i32 {
                log::warn!("TWDT reconfigure returned {} (may already be configured)", ret);
            }
            // SAFETY: as above.
            let subscribed = unsafe { esp_task_wdt_add(core::ptr::null_mut()) } == ESP_OK as i32;
            if subscribed {
                log::info!("Watchdog: subscribed ({} ms timeout)", WATCHDOG_TIMEOUT_MS);
            } else {
                log::warn!("Watchdog: failed to subscribe");
            }
            Self { subscribed }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            log::info!("Watchdog(sim): no-op");
            Self {}
        }
    }

    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        if self.subscribed {
            // SAFETY: resets the current task's TWDT entry.
            unsafe {
                esp_task_wdt_reset();
            }
        }
    }
}
