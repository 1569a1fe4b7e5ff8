//! Jam interlock tests: break-beam watchdog through the real controller.

use recycler::app::events::BinEvent;
use recycler::error::{LedZone, ServoId};
use recycler::drivers::led::LedColour;
use recycler::sensors::{BeamId, SensorSource};

use crate::mock_hw::{Harness, category, rgb};

fn lock_moves(h: &Harness) -> usize {
    h.ctrl
        .hardware()
        .positions(ServoId::Lock)
        .iter()
        .filter(|p| **p == 1.0)
        .count()
}

#[test]
fn beam_blocked_past_confirm_delay_locks_once() {
    let mut h = Harness::started(vec![]);
    h.hw().set_beam(BeamId::Beam2, true);
    h.edge(SensorSource::Beam(BeamId::Beam2));

    h.run_for(9_900);
    assert_eq!(lock_moves(&h), 0, "must not lock before the confirm delay");

    h.run_for(10_000);
    assert_eq!(lock_moves(&h), 1);
    assert_eq!(
        h.count(|e| *e == BinEvent::JamLockEngaged(BeamId::Beam2)),
        1
    );
    assert!(h.ctrl.status().lock_engaged);
    assert_eq!(
        h.ctrl.hardware().last_colour(LedZone::Status),
        Some(rgb(LedColour::Locked))
    );
    assert_eq!(h.ctrl.status().armed_watchdogs, 0);
}

#[test]
fn beam_cleared_before_confirm_does_not_lock() {
    let mut h = Harness::started(vec![]);
    h.hw().set_beam(BeamId::Beam4, true);
    h.edge(SensorSource::Beam(BeamId::Beam4));
    h.run_for(3_000);
    h.hw().set_beam(BeamId::Beam4, false);
    h.run_for(10_000);

    assert_eq!(lock_moves(&h), 0);
    assert_eq!(h.count(|e| matches!(e, BinEvent::JamLockEngaged(_))), 0);
    assert_eq!(h.ctrl.status().armed_watchdogs, 0);
}

#[test]
fn second_edge_restarts_the_confirm_delay() {
    let mut h = Harness::started(vec![]);
    h.hw().set_beam(BeamId::Beam1, true);
    h.edge(SensorSource::Beam(BeamId::Beam1));
    h.run_for(6_000);
    h.edge(SensorSource::Beam(BeamId::Beam1));

    // 10 s after the first edge, but only 4 s after the second.
    h.run_for(4_500);
    assert_eq!(lock_moves(&h), 0);
    assert_eq!(h.ctrl.status().armed_watchdogs, 1);

    h.run_for(6_000);
    assert_eq!(lock_moves(&h), 1);
}

#[test]
fn busy_sequencer_defers_lock_by_backoff() {
    let mut h = Harness::started(vec![]);
    h.hw().set_beam(BeamId::Beam2, true);
    h.edge(SensorSource::Beam(BeamId::Beam2));

    let claim = h.ctrl.sequencer().claim().expect("sequencer idle");
    h.run_for(10_100);
    assert_eq!(lock_moves(&h), 0);
    let pending = h.ctrl.watchdog().pending(BeamId::Beam2).copied();
    assert!(pending.is_some_and(|t| t.retried));

    drop(claim);
    h.run_for(600);
    assert_eq!(lock_moves(&h), 1);
    assert_eq!(
        h.count(|e| *e == BinEvent::JamLockEngaged(BeamId::Beam2)),
        1
    );
}

#[test]
fn lock_dropped_when_still_busy_after_retry() {
    let mut h = Harness::started(vec![]);
    h.hw().set_beam(BeamId::Beam2, true);
    h.edge(SensorSource::Beam(BeamId::Beam2));

    let claim = h.ctrl.sequencer().claim().expect("sequencer idle");
    h.run_for(11_000);
    assert_eq!(h.ctrl.status().armed_watchdogs, 0);
    drop(claim);

    h.run_for(5_000);
    assert_eq!(lock_moves(&h), 0);
}

#[test]
fn occluded_lock_beam_after_routing_locks_in_sequence() {
    let mut h = Harness::started(vec![vec![category("plastic_bottle", 0.82)]]);
    h.hw().set_beam(BeamId::Beam2, true);
    h.sort_one();

    assert_eq!(
        h.count(|e| *e
            == BinEvent::SequenceCompleted {
                kind: recycler::control::sequencer::SequenceKind::Recycle,
                lock_engaged: true,
            }),
        1
    );
    assert_eq!(lock_moves(&h), 1);
    assert!(h.ctrl.status().lock_engaged);
}

#[test]
fn already_locked_door_is_not_driven_again() {
    let mut h = Harness::started(vec![]);
    h.hw().set_beam(BeamId::Beam2, true);
    h.hw().set_beam(BeamId::Beam3, true);
    h.edge(SensorSource::Beam(BeamId::Beam2));
    h.edge(SensorSource::Beam(BeamId::Beam3));
    h.run_for(12_000);

    assert_eq!(lock_moves(&h), 1);
    assert_eq!(h.count(|e| matches!(e, BinEvent::JamLockEngaged(_))), 1);
}

#[test]
fn shutdown_cancels_pending_checks() {
    let mut h = Harness::started(vec![]);
    h.hw().set_beam(BeamId::Beam2, true);
    h.edge(SensorSource::Beam(BeamId::Beam2));
    h.run_for(1_000);
    assert_eq!(h.ctrl.status().armed_watchdogs, 1);

    h.shutdown.request();
    h.run_for(50);
    assert!(h.ctrl.is_finished());
    assert_eq!(h.ctrl.status().armed_watchdogs, 0);
}
