//! Shared mutable context threaded through every lifecycle handler.
//!
//! The service writes the inputs (time, association status) before each
//! tick; handlers read them, keep their own deadlines here and queue
//! [`LifecycleCommand`]s for the service to carry out.

use crate::config::DeviceMode;
use crate::ui::LedMode;

/// Deadline for the first association in station mode.
pub const ASSOCIATE_TIMEOUT_MS: u64 = 60_000;

/// Grace period after losing association before rebooting.
pub const LINK_LOSS_GRACE_MS: u64 = 60_000;

/// Delay between persisting station mode and rebooting into it, so the
/// provisioning client sees the response first.
pub const PROVISIONED_RESTART_MS: u64 = 10_000;

// ---------------------------------------------------------------------------
// Commands (written by state handlers; consumed by the service)
// ---------------------------------------------------------------------------

/// Side effects requested by the lifecycle handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleCommand {
    StartAccessPoint,
    StartCaptiveDns,
    RegisterApEndpoints,
    BeginStation,
    /// Associate while keeping the access point up (provisioning).
    BeginStationWithAp,
    RegisterStationEndpoints,
    RegisterNameService,
    ConnectBroker,
    /// Let the HTTP / DNS / update stack process requests.
    ServeRequests,
    /// Run clock, door pipeline and broker upkeep for this pass.
    RunPipeline,
    PersistStationMode,
    SetLed(LedMode),
    WipeConfig,
    ClearLog,
    Reboot,
}

// ---------------------------------------------------------------------------
// LifecycleContext
// ---------------------------------------------------------------------------

pub struct LifecycleContext {
    // -- Timing --
    /// Monotonic milliseconds at the start of this pass.
    pub now_ms: u64,

    // -- Configuration snapshot --
    pub mode: DeviceMode,
    pub broker_configured: bool,

    // -- Inputs --
    /// Station link is up with an address.
    pub associated: bool,

    // -- Timers --
    pub connect_deadline_ms: Option<u64>,
    /// Set when a healthy link was lost; cleared when it comes back.
    pub link_lost_deadline_ms: Option<u64>,
    /// When the pending reboot fires.  Once set it is never moved.
    pub restart_at_ms: Option<u64>,
    pub reboot_issued: bool,

    // -- Outputs --
    pub commands: Vec<LifecycleCommand>,
}

impl LifecycleContext {
    pub fn new(mode: DeviceMode, broker_configured: bool) -> Self {
        Self {
            now_ms: 0,
            mode,
            broker_configured,
            associated: false,
            connect_deadline_ms: None,
            link_lost_deadline_ms: None,
            restart_at_ms: None,
            reboot_issued: false,
            commands: Vec::new(),
        }
    }

    pub fn push(&mut self, cmd: LifecycleCommand) {
        self.commands.push(cmd);
    }

    /// Arm the reboot timer `delay_ms` from `now_ms`.  Returns `false` if
    /// a reboot is already pending.
    pub fn request_restart(&mut self, delay_ms: u64, now_ms: u64) -> bool {
        if self.restart_at_ms.is_some() {
            return false;
        }
        self.restart_at_ms = Some(now_ms + delay_ms);
        true
    }

    pub fn restart_pending(&self) -> bool {
        self.restart_at_ms.is_some()
    }

    pub fn is_station(&self) -> bool {
        self.mode == DeviceMode::Station
    }
}
