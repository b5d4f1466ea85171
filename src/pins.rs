//! GPIO / peripheral pin assignments for the garage controller board.
//!
//! Single source of truth: every driver references this module rather
//! than hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Door actuation
// ---------------------------------------------------------------------------

/// Digital output driving the opener relay (active HIGH).
pub const RELAY_GPIO: i32 = 15;

// ---------------------------------------------------------------------------
// Door sensing
// ---------------------------------------------------------------------------

/// Ultrasonic ranger trigger output.
pub const SONAR_TRIG_GPIO: i32 = 12;
/// Ultrasonic ranger echo input.
pub const SONAR_ECHO_GPIO: i32 = 14;

/// Magnetic door switch input, pulled up.  Which level means "closed"
/// depends on the mount type option.
pub const DOOR_SWITCH_GPIO: i32 = 4;

/// One-wire / DHT data line of the optional climate sensor.
pub const CLIMATE_GPIO: i32 = 5;

// ---------------------------------------------------------------------------
// Front panel
// ---------------------------------------------------------------------------

/// Push button, active LOW with pull-up.
pub const BUTTON_GPIO: i32 = 0;

/// Status LED (active HIGH).
pub const LED_GPIO: i32 = 2;

/// Piezo buzzer, driven by an LEDC channel.
pub const BUZZER_GPIO: i32 = 13;
/// LEDC channel and timer used for the buzzer.
pub const BUZZER_LEDC_CHANNEL: u32 = 0;
pub const BUZZER_LEDC_TIMER: u32 = 0;
