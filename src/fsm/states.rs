//! Concrete state handler functions and table builder.
//!
//! Each state is defined by plain `fn` pointers and never closures or dynamic
//! dispatch.
//!
//! ```text
//!  IDLE ──[trigger]──▶ CAPTURING ──[classified]──▶ DECIDING
//!    ▲                     │                          │
//!    │                [aborted]                  [decision]
//!    │                     ▼                          ▼
//!    └──[cooldown]──── COOLING_DOWN ◀──[done/fault]── ACTUATING
//!
//!  Any state ──[shutdown | fatal]──▶ TERMINAL
//! ```

use log::{info, warn};

use super::context::{ActuationOutcome, CaptureOutcome, FsmContext, Job};
use super::{StateDescriptor, StateId};
use crate::control::gate::{self, SortDecision};
use crate::drivers::led::LedColour;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        StateDescriptor {
            id: StateId::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
        },
        StateDescriptor {
            id: StateId::Capturing,
            name: "Capturing",
            on_enter: Some(capturing_enter),
            on_exit: None,
            on_update: capturing_update,
        },
        StateDescriptor {
            id: StateId::Deciding,
            name: "Deciding",
            on_enter: Some(deciding_enter),
            on_exit: None,
            on_update: deciding_update,
        },
        StateDescriptor {
            id: StateId::Actuating,
            name: "Actuating",
            on_enter: Some(actuating_enter),
            on_exit: None,
            on_update: actuating_update,
        },
        StateDescriptor {
            id: StateId::CoolingDown,
            name: "CoolingDown",
            on_enter: Some(cooling_down_enter),
            on_exit: None,
            on_update: cooling_down_update,
        },
        StateDescriptor {
            id: StateId::Terminal,
            name: "Terminal",
            on_enter: Some(terminal_enter),
            on_exit: None,
            on_update: terminal_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut FsmContext) {
    ctx.clear_cycle();
    ctx.job = Some(Job::Indicate(LedColour::Idle));
    info!("IDLE: waiting for an item");
}

fn idle_update(ctx: &mut FsmContext) -> Option<StateId> {
    if ctx.must_stop() {
        return Some(StateId::Terminal);
    }
    if ctx.trigger_pending {
        ctx.trigger_pending = false;
        return Some(StateId::Capturing);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  CAPTURING: let the hand withdraw, then take the frame
// ═══════════════════════════════════════════════════════════════════════════

fn capturing_enter(ctx: &mut FsmContext) {
    ctx.capture_requested = false;
    ctx.capture = None;
    ctx.job = Some(Job::Indicate(LedColour::Processing));
    info!(
        "CAPTURING: frame in {}ms",
        ctx.config.capture_grace_ms
    );
}

fn capturing_update(ctx: &mut FsmContext) -> Option<StateId> {
    if ctx.must_stop() {
        return Some(StateId::Terminal);
    }

    match &ctx.capture {
        Some(CaptureOutcome::Classified(_)) => return Some(StateId::Deciding),
        Some(CaptureOutcome::Aborted) => {
            warn!("CAPTURING: no frame, cycle aborted");
            return Some(StateId::CoolingDown);
        }
        None => {}
    }

    if !ctx.capture_requested && ctx.ms_in_state >= ctx.config.capture_grace_ms {
        ctx.capture_requested = true;
        ctx.job = Some(Job::Capture);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  DECIDING: pure gate, no I/O
// ═══════════════════════════════════════════════════════════════════════════

fn deciding_enter(ctx: &mut FsmContext) {
    let decision = match &ctx.capture {
        Some(CaptureOutcome::Classified(result)) => {
            match gate::decide(result, ctx.config.unlock_threshold, ctx.now_ms) {
                Ok(d) => d,
                Err(e) => {
                    warn!("DECIDING: {}; treating as non-recyclable", e);
                    SortDecision::non_recyclable_fallback(ctx.now_ms)
                }
            }
        }
        _ => SortDecision::non_recyclable_fallback(ctx.now_ms),
    };
    info!(
        "DECIDING: {} ({:.2}) -> {:?}",
        decision.category_name,
        decision.score,
        decision.kind()
    );
    ctx.decision = Some(decision);
}

fn deciding_update(ctx: &mut FsmContext) -> Option<StateId> {
    if ctx.must_stop() {
        return Some(StateId::Terminal);
    }
    Some(StateId::Actuating)
}

// ═══════════════════════════════════════════════════════════════════════════
//  ACTUATING
// ═══════════════════════════════════════════════════════════════════════════

fn actuating_enter(ctx: &mut FsmContext) {
    ctx.actuation = None;
    if let Some(decision) = &ctx.decision {
        ctx.job = Some(Job::Actuate(decision.kind()));
    }
}

fn actuating_update(ctx: &mut FsmContext) -> Option<StateId> {
    if ctx.must_stop() {
        return Some(StateId::Terminal);
    }
    let Some(decision) = &ctx.decision else {
        return Some(StateId::CoolingDown);
    };
    match ctx.actuation {
        None => None,
        Some(ActuationOutcome::Refused) => {
            let backoff = ctx.config.watchdog_retry_backoff_ms;
            if ctx.now_ms >= ctx.refused_at_ms.saturating_add(backoff) {
                ctx.actuation = None;
                ctx.job = Some(Job::Actuate(decision.kind()));
            }
            None
        }
        Some(_) => Some(StateId::CoolingDown),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  COOLING_DOWN: outputs off, short hold-off before the next item
// ═══════════════════════════════════════════════════════════════════════════

fn cooling_down_enter(ctx: &mut FsmContext) {
    ctx.job = Some(Job::Cleanup);
}

fn cooling_down_update(ctx: &mut FsmContext) -> Option<StateId> {
    if ctx.must_stop() {
        return Some(StateId::Terminal);
    }
    if ctx.ms_in_state >= ctx.config.cooldown_ms {
        return Some(StateId::Idle);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  TERMINAL: absorbing
// ═══════════════════════════════════════════════════════════════════════════

fn terminal_enter(ctx: &mut FsmContext) {
    ctx.trigger_pending = false;
    ctx.job = Some(Job::SafeState);
    if ctx.fatal {
        warn!("TERMINAL: fatal error, shutting down");
    } else {
        info!("TERMINAL: shutting down");
    }
}

fn terminal_update(_ctx: &mut FsmContext) -> Option<StateId> {
    None
}
