//! Integration tests for the BinController → FSM → sequencer pipeline.
//!
//! Every test drives the real controller against `mock_hw` adapters with
//! a hand-cranked clock.

use recycler::app::commands::ControlRequest;
use recycler::app::events::BinEvent;
use recycler::config::BinConfig;
use recycler::control::gate::NON_RECYCLABLE;
use recycler::control::sequencer::{LockPosition, SequenceKind};
use recycler::drivers::led::LedColour;
use recycler::error::{ActuatorFault, CameraError, ChallengeError, Error, LedZone, ServoId};
use recycler::fsm::StateId;
use recycler::sensors::{BeamId, SensorSource};

use crate::mock_hw::{Harness, category, rgb};

fn decided(h: &Harness) -> Vec<recycler::control::gate::SortDecision> {
    h.events()
        .into_iter()
        .filter_map(|e| match e {
            BinEvent::Decided(d) => Some(d),
            _ => None,
        })
        .collect()
}

// ── Startup ──────────────────────────────────────────────────

#[test]
fn start_homes_actuators_and_idles() {
    let h = Harness::started(vec![]);
    let hw = h.ctrl.hardware();

    assert_eq!(h.ctrl.state(), StateId::Idle);
    assert_eq!(hw.positions(ServoId::Selector), vec![0.0]);
    assert_eq!(hw.positions(ServoId::Lock), vec![-1.0]);
    assert!(hw.released(ServoId::Selector) && hw.released(ServoId::Lock));
    assert_eq!(hw.last_colour(LedZone::Interior), Some(rgb(LedColour::Idle)));
    assert_eq!(h.events()[0], BinEvent::Started(StateId::Idle));
}

// ── End-to-end sort cycles ───────────────────────────────────

#[test]
fn confident_bottle_is_recycled() {
    let mut h = Harness::started(vec![vec![category("plastic_bottle", 0.82)]]);
    h.sort_one();

    let d = decided(&h);
    assert_eq!(d.len(), 1);
    assert!(d[0].is_recyclable);
    assert_eq!(d[0].category_name, "plastic_bottle");

    let hw = h.ctrl.hardware();
    assert_eq!(hw.positions(ServoId::Selector), vec![0.0, -1.0, 0.0]);
    assert_eq!(
        hw.colours(LedZone::Interior),
        vec![
            rgb(LedColour::Idle),
            rgb(LedColour::Processing),
            rgb(LedColour::Accepted),
            rgb(LedColour::Off),
            rgb(LedColour::Idle),
        ]
    );
    assert_eq!(h.ctrl.state(), StateId::Idle);
    assert_eq!(h.ctrl.status().cycles, 1);
    assert_eq!(
        h.count(|e| matches!(
            e,
            BinEvent::SequenceCompleted {
                kind: SequenceKind::Recycle,
                lock_engaged: false
            }
        )),
        1
    );
}

#[test]
fn food_waste_is_rejected_regardless_of_score() {
    let mut h = Harness::started(vec![vec![category("nonRecyclable_food_waste", 0.95)]]);
    h.sort_one();

    let d = decided(&h);
    assert!(!d[0].is_recyclable);
    assert_eq!(d[0].category_name, NON_RECYCLABLE);

    let hw = h.ctrl.hardware();
    assert_eq!(hw.positions(ServoId::Selector), vec![0.0, 1.0, 0.0]);
    assert_eq!(
        hw.colours(LedZone::Interior),
        vec![
            rgb(LedColour::Idle),
            rgb(LedColour::Processing),
            rgb(LedColour::Rejected),
            rgb(LedColour::Off),
            rgb(LedColour::Idle),
        ]
    );
}

#[test]
fn empty_classification_falls_back_to_reject() {
    let mut h = Harness::started(vec![vec![]]);
    h.sort_one();

    let d = decided(&h);
    assert_eq!(d.len(), 1);
    assert!(!d[0].is_recyclable);
    assert_eq!(d[0].category_name, NON_RECYCLABLE);
    assert_eq!(d[0].score, 0.0);
    assert_eq!(
        h.count(|e| matches!(
            e,
            BinEvent::SequenceCompleted {
                kind: SequenceKind::Reject,
                ..
            }
        )),
        1
    );
    assert_eq!(h.ctrl.state(), StateId::Idle);
}

#[test]
fn low_scores_are_filtered_before_the_gate() {
    // Below the classifier's score_threshold, so nothing survives.
    let mut h = Harness::started(vec![vec![category("cardboard", 0.1)]]);
    h.sort_one();
    assert_eq!(decided(&h)[0].category_name, NON_RECYCLABLE);
}

#[test]
fn score_at_threshold_rejects() {
    let mut h = Harness::started(vec![vec![category("can", 0.6)]]);
    h.sort_one();
    assert!(!decided(&h)[0].is_recyclable);
}

// ── Triggers ─────────────────────────────────────────────────

#[test]
fn motion_edge_starts_a_cycle() {
    let mut h = Harness::started(vec![vec![category("can", 0.9)]]);
    h.hw().set_motion(true);
    h.edge(SensorSource::Motion);
    h.run_for(100);
    assert_eq!(h.ctrl.state(), StateId::Capturing);
}

#[test]
fn stale_motion_edge_is_ignored() {
    let mut h = Harness::started(vec![]);
    h.hw().set_motion(false);
    h.edge(SensorSource::Motion);
    h.run_for(100);
    assert_eq!(h.ctrl.state(), StateId::Idle);
}

#[test]
fn motion_burst_yields_one_cycle() {
    let mut h = Harness::started(vec![vec![category("can", 0.9)]]);
    h.hw().set_motion(true);
    for _ in 0..5 {
        h.edge(SensorSource::Motion);
        h.run_for(50);
    }
    h.run_for(12_000);
    assert_eq!(decided(&h).len(), 1);
}

#[test]
fn activation_ignored_mid_cycle() {
    let mut h = Harness::started(vec![vec![category("can", 0.9)]]);
    let requests = h.ctrl.requests();
    requests.push_event(ControlRequest::Activate);
    h.run_for(100);
    assert_eq!(h.ctrl.state(), StateId::Capturing);
    requests.push_event(ControlRequest::Activate);
    h.run_for(12_000);
    assert_eq!(decided(&h).len(), 1);
    assert_eq!(h.ctrl.state(), StateId::Idle);
}

// ── Camera ───────────────────────────────────────────────────

#[test]
fn camera_timeout_aborts_cycle() {
    let mut h = Harness::new(BinConfig::default(), vec![Err(CameraError::Timeout)], vec![]);
    h.ctrl.start();
    h.sort_one();
    assert!(decided(&h).is_empty());
    assert_eq!(h.ctrl.state(), StateId::Idle);
    assert_eq!(h.ctrl.maintenance_count(), 0);
}

#[test]
fn camera_loss_is_fatal_but_leaves_outputs_safe() {
    let mut h = Harness::new(
        BinConfig::default(),
        vec![Err(CameraError::Disconnected)],
        vec![],
    );
    h.ctrl.requests().push_event(ControlRequest::Activate);

    let result = h.ctrl.run();

    assert!(matches!(result, Err(Error::Camera(CameraError::Disconnected))));
    assert_eq!(h.ctrl.state(), StateId::Terminal);
    assert!(h.ctrl.sequencer().is_safe());
    assert_eq!(h.count(|e| *e == BinEvent::ShutdownComplete), 1);
}

// ── Persistence ──────────────────────────────────────────────

#[test]
fn recyclable_frames_saved_when_enabled() {
    let config = BinConfig {
        save_images: true,
        ..BinConfig::default()
    };
    let mut h = Harness::new(
        config,
        vec![],
        vec![
            vec![category("plastic_bottle", 0.82)],
            vec![category("nonRecyclable_food_waste", 0.95)],
        ],
    );
    h.ctrl.start();
    h.sort_one();
    h.sort_one();

    assert_eq!(*h.images.saved.lock().unwrap(), vec!["plastic_bottle"]);
    assert_eq!(h.count(|e| matches!(e, BinEvent::ImageSaved(_))), 1);
}

#[test]
fn frames_not_saved_by_default() {
    let mut h = Harness::started(vec![vec![category("plastic_bottle", 0.82)]]);
    h.sort_one();
    assert!(h.images.saved.lock().unwrap().is_empty());
}

// ── Challenge window ─────────────────────────────────────────

#[test]
fn challenge_just_inside_window_is_uploaded() {
    let mut h = Harness::started(vec![vec![category("plastic_bottle", 0.82)]]);
    h.sort_one();
    let at = h.ctrl.status().last_decision.unwrap().decided_at_ms;

    h.ctrl.requests().push_event(ControlRequest::Challenge {
        at_ms: at + 10_000 - 1,
    });
    h.run_for(50);

    let tickets = h.uploads.tickets.lock().unwrap().clone();
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0].category_name, "plastic_bottle");
    assert_eq!(
        h.count(|e| matches!(e, BinEvent::ChallengeAccepted { category, .. } if category == "plastic_bottle")),
        1
    );
}

#[test]
fn challenge_just_outside_window_expires() {
    let mut h = Harness::started(vec![vec![category("plastic_bottle", 0.82)]]);
    h.sort_one();
    let at = h.ctrl.status().last_decision.unwrap().decided_at_ms;

    h.ctrl.requests().push_event(ControlRequest::Challenge {
        at_ms: at + 10_000 + 1,
    });
    h.run_for(50);

    assert!(h.uploads.tickets.lock().unwrap().is_empty());
    assert_eq!(
        h.count(|e| *e == BinEvent::ChallengeRejected(ChallengeError::Expired)),
        1
    );
}

#[test]
fn same_capture_challenged_once() {
    let mut h = Harness::started(vec![vec![category("can", 0.9)]]);
    h.sort_one();
    let at = h.ctrl.status().last_decision.unwrap().decided_at_ms;
    let requests = h.ctrl.requests();
    requests.push_event(ControlRequest::Challenge { at_ms: at + 1 });
    requests.push_event(ControlRequest::Challenge { at_ms: at + 2 });
    h.run_for(50);

    assert_eq!(h.uploads.tickets.lock().unwrap().len(), 1);
    assert_eq!(
        h.count(|e| *e == BinEvent::ChallengeRejected(ChallengeError::AlreadyChallenged)),
        1
    );
}

#[test]
fn challenge_before_any_decision_is_refused() {
    let mut h = Harness::started(vec![]);
    h.ctrl
        .requests()
        .push_event(ControlRequest::Challenge { at_ms: 0 });
    h.run_for(50);
    assert_eq!(
        h.count(|e| *e == BinEvent::ChallengeRejected(ChallengeError::NoDecision)),
        1
    );
}

#[test]
fn failed_upload_can_be_retried() {
    let mut h = Harness::started(vec![vec![category("can", 0.9)]]);
    h.sort_one();
    let at = h.ctrl.status().last_decision.unwrap().decided_at_ms;

    h.uploads.fail.store(true, std::sync::atomic::Ordering::SeqCst);
    h.ctrl
        .requests()
        .push_event(ControlRequest::Challenge { at_ms: at + 1 });
    h.run_for(50);
    assert_eq!(
        h.count(|e| *e == BinEvent::ChallengeRejected(ChallengeError::UploadFailed)),
        1
    );

    h.uploads.fail.store(false, std::sync::atomic::Ordering::SeqCst);
    h.ctrl
        .requests()
        .push_event(ControlRequest::Challenge { at_ms: at + 2 });
    h.run_for(50);
    assert_eq!(h.uploads.tickets.lock().unwrap().len(), 1);
}

// ── Faults ───────────────────────────────────────────────────

#[test]
fn servo_fault_recovers_to_idle_and_flags_maintenance() {
    let mut h = Harness::started(vec![vec![category("plastic_bottle", 0.82)]]);
    h.hw().fail_servo = Some(ServoId::Selector);
    h.sort_one();

    assert_eq!(h.ctrl.state(), StateId::Idle);
    assert_eq!(h.ctrl.maintenance_count(), 1);
    assert_eq!(
        h.count(|e| *e
            == BinEvent::ActuatorFault(ActuatorFault::ServoWriteFailed(ServoId::Selector))),
        1
    );
    let entries = h.ctrl.maintenance_entries();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].reason.contains("selector"));

    // Safe state locked the door; the lock servo was released afterwards.
    let status = h.ctrl.status();
    assert!(status.lock_engaged);
    assert!(h.ctrl.hardware().released(ServoId::Lock));
    assert_eq!(h.count(|e| matches!(e, BinEvent::SequenceCompleted { .. })), 0);
}

#[test]
fn reset_maintenance_clears_fault_log() {
    let mut h = Harness::started(vec![vec![category("can", 0.9)]]);
    h.hw().fail_servo = Some(ServoId::Selector);
    h.sort_one();
    assert_eq!(h.ctrl.maintenance_count(), 1);

    h.ctrl.requests().push_event(ControlRequest::ResetMaintenance);
    h.run_for(50);

    assert_eq!(h.ctrl.maintenance_count(), 0);
    assert!(h.ctrl.maintenance_entries().is_empty());
    assert_eq!(h.ctrl.status().faults, 0);
    assert_eq!(h.count(|e| *e == BinEvent::MaintenanceCleared(1)), 1);
}

#[test]
fn beam_read_fault_mid_sequence_aborts_safely() {
    let mut h = Harness::started(vec![vec![category("can", 0.9)]]);
    h.ctrl.requests().push_event(ControlRequest::Activate);
    h.run_for(100);
    h.hw().fail_reads = true;
    h.run_for(12_000);

    assert_eq!(
        h.count(|e| *e == BinEvent::ActuatorFault(ActuatorFault::SensorIo(BeamId::Beam2))),
        1
    );
    assert_eq!(h.ctrl.state(), StateId::Idle);
    assert_eq!(h.ctrl.maintenance_count(), 1);
}

#[test]
fn sensor_error_on_edge_mid_cycle_aborts_cycle() {
    let mut h = Harness::started(vec![vec![category("can", 0.9)]]);
    h.ctrl.requests().push_event(ControlRequest::Activate);
    h.run_for(100);
    assert_eq!(h.ctrl.state(), StateId::Capturing);

    h.hw().fail_reads = true;
    h.edge(SensorSource::Beam(BeamId::Beam1));
    h.run_for(50);

    assert_eq!(h.ctrl.state(), StateId::CoolingDown);
    assert!(h.ctrl.sequencer().is_safe());
    assert_eq!(h.ctrl.maintenance_count(), 1);
    h.hw().fail_reads = false;
    h.run_for(1_000);
    assert_eq!(h.ctrl.state(), StateId::Idle);
    assert!(decided(&h).is_empty());
}

#[test]
fn led_fault_entering_capture_aborts_cycle() {
    let mut h = Harness::started(vec![vec![category("plastic_bottle", 0.82)]]);
    h.hw().fail_led = Some(rgb(LedColour::Processing));
    h.sort_one();

    assert_eq!(
        h.count(|e| *e == BinEvent::ActuatorFault(ActuatorFault::LedWriteFailed(LedZone::Interior))),
        1
    );
    assert_eq!(h.ctrl.maintenance_count(), 1);
    assert!(decided(&h).is_empty());
    assert_eq!(h.count(|e| matches!(e, BinEvent::SequenceCompleted { .. })), 0);
    assert!(
        !h.ctrl.hardware().positions(ServoId::Selector).contains(&-1.0),
        "selector left the safe state"
    );
    assert_eq!(h.ctrl.state(), StateId::Idle);
    assert_eq!(h.ctrl.status().cycles, 0);
}

#[test]
fn busy_sequencer_delays_sort_until_released() {
    let mut h = Harness::started(vec![vec![category("plastic_bottle", 0.82)]]);
    let claim = h.ctrl.sequencer().claim().expect("sequencer idle");
    h.sort_one();

    assert_eq!(h.ctrl.state(), StateId::Actuating);
    assert!(!h.ctrl.hardware().positions(ServoId::Selector).contains(&-1.0));
    assert!(h.ctrl.status().last_decision.is_none(), "unsorted item is challengeable");

    drop(claim);
    h.run_for(20_000);

    assert!(h.ctrl.hardware().positions(ServoId::Selector).contains(&-1.0));
    assert_eq!(h.count(|e| matches!(e, BinEvent::SequenceCompleted { .. })), 1);
    assert_eq!(decided(&h).len(), 1);
    assert_eq!(h.ctrl.state(), StateId::Idle);
    assert_eq!(
        h.ctrl.status().last_decision.map(|d| d.category_name),
        Some("plastic_bottle".to_string())
    );
    assert_eq!(h.ctrl.maintenance_count(), 0);
}

#[test]
fn sort_abandoned_when_sequencer_stays_busy() {
    let mut h = Harness::started(vec![vec![category("can", 0.9)]]);
    let _claim = h.ctrl.sequencer().claim().expect("sequencer idle");
    h.sort_one();
    h.run_for(12_000);

    assert_eq!(h.ctrl.state(), StateId::Idle);
    assert_eq!(h.ctrl.maintenance_count(), 1);
    assert!(h.ctrl.maintenance_entries()[0].reason.contains("busy"));
    assert!(!h.ctrl.hardware().positions(ServoId::Selector).contains(&-1.0));
    assert_eq!(decided(&h).len(), 1);

    let at = h.now();
    h.ctrl
        .requests()
        .push_event(ControlRequest::Challenge { at_ms: at });
    h.run_for(50);
    assert_eq!(
        h.count(|e| *e == BinEvent::ChallengeRejected(ChallengeError::NoDecision)),
        1
    );
}

#[test]
fn clear_lock_releases_door() {
    let mut h = Harness::started(vec![]);
    h.hw().set_beam(BeamId::Beam2, true);
    h.edge(SensorSource::Beam(BeamId::Beam2));
    h.run_for(13_000);
    assert!(h.ctrl.status().lock_engaged);

    h.hw().set_beam(BeamId::Beam2, false);
    h.ctrl.requests().push_event(ControlRequest::ClearLock);
    h.run_for(3_000);

    let status = h.ctrl.status();
    assert!(!status.lock_engaged);
    assert_eq!(status.actuators.lock, LockPosition::Released);
    assert_eq!(h.count(|e| *e == BinEvent::LockCleared), 1);
    assert_eq!(h.ctrl.hardware().last_colour(LedZone::Status), Some(rgb(LedColour::Off)));
}

// ── Shutdown ─────────────────────────────────────────────────

#[test]
fn shutdown_while_idle_drives_safe_state() {
    let mut h = Harness::started(vec![]);
    h.shutdown.request();
    h.run_for(50);

    assert!(h.ctrl.is_finished());
    assert_eq!(h.ctrl.state(), StateId::Terminal);
    assert!(h.ctrl.sequencer().is_safe());
    let hw = h.ctrl.hardware();
    assert_eq!(hw.last_colour(LedZone::Interior), Some(rgb(LedColour::Off)));
    assert_eq!(hw.last_colour(LedZone::Status), Some(rgb(LedColour::Off)));
    assert_eq!(hw.positions(ServoId::Lock).last(), Some(&1.0));
    assert!(hw.released(ServoId::Selector) && hw.released(ServoId::Lock));
    assert_eq!(h.count(|e| *e == BinEvent::ShutdownComplete), 1);
}

#[test]
fn shutdown_mid_sequence_interrupts_settle_delay() {
    let mut h = Harness::started(vec![vec![category("plastic_bottle", 0.82)]]);
    h.ctrl.requests().push_event(ControlRequest::Activate);
    h.run_for(100);
    // Cancel part-way through the first selector settle.
    let cancel_at = h.now() + 1_500;
    h.ctrl.time_mut().cancel_at = Some(cancel_at);
    h.run_for(12_000);

    assert!(h.ctrl.is_finished());
    assert!(h.ctrl.sequencer().is_safe());
    assert_eq!(h.count(|e| matches!(e, BinEvent::SequenceCompleted { .. })), 0);
    assert_eq!(h.count(|e| *e == BinEvent::ShutdownComplete), 1);
    assert_eq!(h.ctrl.maintenance_count(), 0);
}

#[test]
fn run_returns_ok_after_requested_shutdown() {
    let mut h = Harness::new(BinConfig::default(), vec![], vec![]);
    h.ctrl.time_mut().cancel_at = Some(30_000);
    assert!(h.ctrl.run().is_ok());
    assert!(h.ctrl.sequencer().is_safe());
}

#[test]
fn invalid_config_is_rejected() {
    let config = BinConfig {
        unlock_threshold: 2.0,
        ..BinConfig::default()
    };
    let result = std::panic::catch_unwind(|| Harness::new(config, vec![], vec![]));
    assert!(result.is_err(), "harness expects a valid config");
}
