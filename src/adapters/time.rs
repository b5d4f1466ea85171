//! ESP32 time adapters.
//!
//! - [`Esp32TimeAdapter`]: monotonic milliseconds since boot, the loop's
//!   timebase.
//! - [`SntpTimeSource`]: network UTC for the software clock.  Returns 0
//!   until SNTP has completed, which the clock treats as a failed query.
//!
//! On `target_os = "espidf"` these wrap `esp_timer_get_time()` and
//! `EspSntp`; elsewhere `std::time::Instant` and a settable value.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sntp::{EspSntp, SyncStatus};

/// Time adapter for the ESP32 platform.
pub struct Esp32TimeAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Milliseconds since boot (monotonic).
    #[cfg(target_os = "espidf")]
    pub fn uptime_ms(&self) -> u64 {
        // SAFETY: esp_timer_get_time reads a free-running counter.
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
    }

    /// Milliseconds since boot (monotonic).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

// ───────────────────────────────────────────────────────────────
// SNTP
// ───────────────────────────────────────────────────────────────

pub struct SntpTimeSource {
    #[cfg(target_os = "espidf")]
    sntp: Option<EspSntp<'static>>,
    #[cfg(not(target_os = "espidf"))]
    sim_utc: u64,
}

impl SntpTimeSource {
    /// Start SNTP with the default pool servers.  A start failure is
    /// logged and leaves the source permanently unsynced.
    #[cfg(target_os = "espidf")]
    pub fn start() -> Self {
        let sntp = match EspSntp::new_default() {
            Ok(s) => {
                log::info!("SNTP initialised");
                Some(s)
            }
            Err(e) => {
                log::warn!("SNTP start failed: {:?}", e);
                None
            }
        };
        Self { sntp }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn start() -> Self {
        Self { sim_utc: 0 }
    }

    /// Simulation: the value the next query answers (0 = not synced).
    #[cfg(not(target_os = "espidf"))]
    pub fn set_sim_utc(&mut self, utc: u64) {
        self.sim_utc = utc;
    }

    /// Current UTC seconds, or 0 when not synchronised.
    #[cfg(target_os = "espidf")]
    pub fn query(&mut self) -> u64 {
        let synced = self
            .sntp
            .as_ref()
            .is_some_and(|s| s.get_sync_status() == SyncStatus::Completed);
        if !synced {
            return 0;
        }
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn query(&mut self) -> u64 {
        self.sim_utc
    }
}
