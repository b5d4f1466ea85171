//! Concrete lifecycle state handlers and table builder.
//!
//! Each state is defined by plain `fn` pointers: no closures, no
//! dynamic dispatch.
//!
//! ```text
//!            ┌──[AP mode]─────────────────────────────┐
//!  INITIAL ──┤                                        ▼
//!            └──[station]──▶ CONNECTING ──[assoc]──▶ CONNECTED
//!                                │                    │   ▲
//!                           [60 s timeout]   [link lost 60 s / provisioned]
//!                                ▼                    │   │
//!                           WAIT_RESTART ◀────────────┘   │
//!                                ▲                        │
//!  RESET ──[wipe]────────────────┘        TRY_CONNECT ────┘ (unconditional)
//! ```
//!
//! TRY_CONNECT moves to CONNECTED whether or not the association
//! attempt succeeds; the AP stays up as the fallback and the CONNECTED
//! AP handler notices a successful link later.

use super::context::{
    ASSOCIATE_TIMEOUT_MS, LINK_LOSS_GRACE_MS, LifecycleCommand, LifecycleContext,
    PROVISIONED_RESTART_MS,
};
use super::{StateDescriptor, StateId};
use crate::ui::LedMode;
use crate::ui::led::{FAST_BLINK_MS, SLOW_BLINK_MS};
use log::{info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0: Initial
        StateDescriptor {
            id: StateId::Initial,
            name: "Initial",
            on_enter: Some(initial_enter),
            on_exit: None,
            on_update: initial_update,
        },
        // Index 1: TryConnect
        StateDescriptor {
            id: StateId::TryConnect,
            name: "TryConnect",
            on_enter: None,
            on_exit: None,
            on_update: try_connect_update,
        },
        // Index 2: Connecting
        StateDescriptor {
            id: StateId::Connecting,
            name: "Connecting",
            on_enter: None,
            on_exit: Some(connecting_exit),
            on_update: connecting_update,
        },
        // Index 3: Connected
        StateDescriptor {
            id: StateId::Connected,
            name: "Connected",
            on_enter: Some(connected_enter),
            on_exit: None,
            on_update: connected_update,
        },
        // Index 4: Reset
        StateDescriptor {
            id: StateId::Reset,
            name: "Reset",
            on_enter: None,
            on_exit: None,
            on_update: reset_update,
        },
        // Index 5: WaitRestart
        StateDescriptor {
            id: StateId::WaitRestart,
            name: "WaitRestart",
            on_enter: Some(wait_restart_enter),
            on_exit: None,
            on_update: wait_restart_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  INITIAL
// ═══════════════════════════════════════════════════════════════════════════

fn initial_enter(ctx: &mut LifecycleContext) {
    ctx.push(LifecycleCommand::SetLed(LedMode::Blink(FAST_BLINK_MS)));
}

fn initial_update(ctx: &mut LifecycleContext) -> Option<StateId> {
    if ctx.is_station() {
        info!("INITIAL: station mode, associating");
        ctx.push(LifecycleCommand::SetLed(LedMode::Blink(SLOW_BLINK_MS)));
        ctx.push(LifecycleCommand::BeginStation);
        ctx.connect_deadline_ms = Some(ctx.now_ms + ASSOCIATE_TIMEOUT_MS);
        Some(StateId::Connecting)
    } else {
        info!("INITIAL: access point mode, starting portal");
        ctx.push(LifecycleCommand::StartAccessPoint);
        ctx.push(LifecycleCommand::StartCaptiveDns);
        ctx.push(LifecycleCommand::RegisterApEndpoints);
        Some(StateId::Connected)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  TRY_CONNECT: provisioning attempt from the AP portal
// ═══════════════════════════════════════════════════════════════════════════

fn try_connect_update(ctx: &mut LifecycleContext) -> Option<StateId> {
    ctx.push(LifecycleCommand::BeginStationWithAp);
    Some(StateId::Connected)
}

// ═══════════════════════════════════════════════════════════════════════════
//  CONNECTING
// ═══════════════════════════════════════════════════════════════════════════

fn connecting_update(ctx: &mut LifecycleContext) -> Option<StateId> {
    if ctx.associated {
        ctx.push(LifecycleCommand::RegisterStationEndpoints);
        ctx.push(LifecycleCommand::RegisterNameService);
        if ctx.broker_configured {
            ctx.push(LifecycleCommand::ConnectBroker);
        }
        ctx.push(LifecycleCommand::SetLed(LedMode::Steady(false)));
        return Some(StateId::Connected);
    }

    match ctx.connect_deadline_ms {
        Some(deadline) if ctx.now_ms > deadline => {
            warn!("CONNECTING: association timed out, rebooting");
            ctx.request_restart(0, ctx.now_ms);
            Some(StateId::WaitRestart)
        }
        _ => None,
    }
}

fn connecting_exit(ctx: &mut LifecycleContext) {
    ctx.connect_deadline_ms = None;
}

// ═══════════════════════════════════════════════════════════════════════════
//  CONNECTED: steady state
// ═══════════════════════════════════════════════════════════════════════════

fn connected_enter(ctx: &mut LifecycleContext) {
    ctx.link_lost_deadline_ms = None;
}

fn connected_update(ctx: &mut LifecycleContext) -> Option<StateId> {
    if !ctx.is_station() {
        ctx.push(LifecycleCommand::ServeRequests);
        if ctx.associated {
            info!("CONNECTED(AP): station link up, switching to station mode");
            ctx.push(LifecycleCommand::PersistStationMode);
            ctx.request_restart(PROVISIONED_RESTART_MS, ctx.now_ms);
            return Some(StateId::WaitRestart);
        }
        return None;
    }

    if ctx.associated {
        if ctx.link_lost_deadline_ms.take().is_some() {
            info!("CONNECTED: link restored");
        }
        ctx.push(LifecycleCommand::RunPipeline);
        ctx.push(LifecycleCommand::ServeRequests);
        return None;
    }

    match ctx.link_lost_deadline_ms {
        None => {
            warn!("CONNECTED: link lost, rebooting in {} s unless restored", LINK_LOSS_GRACE_MS / 1000);
            ctx.link_lost_deadline_ms = Some(ctx.now_ms + LINK_LOSS_GRACE_MS);
            None
        }
        Some(deadline) if ctx.now_ms > deadline => {
            warn!("CONNECTED: link still down, rebooting");
            ctx.request_restart(0, ctx.now_ms);
            Some(StateId::WaitRestart)
        }
        Some(_) => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  RESET: factory reset
// ═══════════════════════════════════════════════════════════════════════════

fn reset_update(ctx: &mut LifecycleContext) -> Option<StateId> {
    warn!("RESET: wiping options and log");
    ctx.push(LifecycleCommand::WipeConfig);
    ctx.push(LifecycleCommand::ClearLog);
    ctx.request_restart(0, ctx.now_ms);
    Some(StateId::WaitRestart)
}

// ═══════════════════════════════════════════════════════════════════════════
//  WAIT_RESTART: drain until the reboot timer fires
// ═══════════════════════════════════════════════════════════════════════════

fn wait_restart_enter(ctx: &mut LifecycleContext) {
    if let Some(at) = ctx.restart_at_ms {
        info!("WAIT_RESTART: reboot at {} ms", at);
    }
}

fn wait_restart_update(ctx: &mut LifecycleContext) -> Option<StateId> {
    ctx.push(LifecycleCommand::ServeRequests);
    // Entered without a timer (forced from outside): reboot now.
    let at = *ctx.restart_at_ms.get_or_insert(ctx.now_ms);
    if !ctx.reboot_issued && ctx.now_ms >= at {
        ctx.reboot_issued = true;
        ctx.push(LifecycleCommand::Reboot);
    }
    None
}
