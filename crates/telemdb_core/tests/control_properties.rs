//! End-to-end behaviour of the controller, gate and region together.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use telemdb_core::{
    Authority, ChannelKey, Concurrency, Config, ControlError, Controller, GateConfig, Resource,
    Subject, TimeRange,
};

#[derive(Debug, Clone, PartialEq)]
struct Channel {
    key: u32,
    value: i32,
}

impl Resource for Channel {
    fn channel_key(&self) -> ChannelKey {
        ChannelKey::new(self.key)
    }
}

/// Returns a gate config whose resource callback counts its invocations.
fn counted(
    key: &str,
    range: TimeRange,
    authority: Authority,
    value: i32,
) -> (GateConfig<Channel>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let config = GateConfig::new(Subject::new(key, key), range, authority).open_resource(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Channel { key: 1, value })
    });
    (config, calls)
}

fn gate(key: &str, authority: Authority) -> GateConfig<Channel> {
    counted(key, TimeRange::MAX, authority, 1).0
}

fn exclusive() -> Controller<Channel> {
    Controller::new(Config::default())
}

const ABS: Authority = Authority::ABSOLUTE;

#[test]
fn single_gate_always_authorized() {
    let c = exclusive();
    for authority in [Authority::new(0), Authority::new(100), ABS] {
        let (config, calls) = counted("only", TimeRange::MAX, authority, 10);
        let (g, t) = c.open_gate(config).unwrap();
        assert!(t.is_acquire());
        assert!(!t.is_transfer());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(g.authorize().unwrap().value, 10);
        g.release();
    }
}

#[test]
fn higher_authority_opened_first_keeps_control() {
    let c = exclusive();
    let (g1, t1) = c.open_gate(gate("g1", ABS)).unwrap();
    assert_eq!(t1.to.as_ref().unwrap().subject.key, "g1");
    let (g2, t2) = c.open_gate(gate("g2", ABS.lower(1))).unwrap();
    assert!(!t2.occurred());

    assert!(g2.authorize().unwrap_err().is_unauthorized());
    assert!(g1.authorize().is_ok());
    assert!(g2.authorize().unwrap_err().is_unauthorized());
}

#[test]
fn equal_authority_goes_to_earlier_gate() {
    let c = exclusive();
    let (g1, _) = c.open_gate(gate("g1", ABS)).unwrap();
    let (g2, t) = c.open_gate(gate("g2", ABS)).unwrap();
    assert!(!t.occurred());
    assert!(g1.authorize().is_ok());
    let err = g2.authorize().unwrap_err();
    assert_eq!(err.holder().unwrap().key, "g1");
}

#[test]
fn release_hands_off_to_next_gate() {
    let c = exclusive();
    let (g1, _) = c.open_gate(gate("g1", ABS)).unwrap();
    let (g2, _) = c.open_gate(gate("g2", ABS.lower(1))).unwrap();

    let (resource, t) = g1.release();
    assert_eq!(resource.unwrap().value, 1);
    assert!(t.is_transfer());
    assert!(!t.is_release());
    assert_eq!(t.from.unwrap().subject.key, "g1");
    assert_eq!(t.to.unwrap().subject.key, "g2");
    assert!(g2.authorize().is_ok());
    assert!(g1.authorize().unwrap_err().is_unauthorized());
}

#[test]
fn full_release_removes_region() {
    let c = exclusive();
    let (config, first_calls) = counted("test", TimeRange::MAX, ABS, 11);
    let (g, _) = c.open_gate(config).unwrap();
    assert_eq!(first_calls.load(Ordering::SeqCst), 1);

    let (resource, t) = g.release();
    assert!(t.occurred());
    assert!(t.is_release());
    assert!(t.to.is_none());
    assert_eq!(resource.unwrap().value, 11);
    assert_eq!(c.region_count(), 0);

    let (config, second_calls) = counted("test", TimeRange::MAX, ABS, 42);
    let (g2, t2) = c.open_gate(config).unwrap();
    assert!(t2.is_acquire());
    assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    assert_eq!(g2.authorize().unwrap().value, 42);
}

#[test]
fn released_gate_is_unauthorized() {
    let c = exclusive();
    let (g, _) = c.open_gate(gate("g", ABS)).unwrap();
    g.release();
    assert!(g.is_released());
    let err = g.authorize().unwrap_err();
    assert!(err.is_unauthorized());
    assert!(err.to_string().contains("was already released"));

    let (resource, t) = g.release();
    assert!(resource.is_none());
    assert!(!t.occurred());
}

#[test]
fn shared_mode_co_authorizes_ties() {
    let c = Controller::<Channel>::new(Config::shared());
    assert_eq!(c.concurrency(), Concurrency::Shared);
    let (g1, t1) = c.open_gate(gate("g1", ABS)).unwrap();
    assert!(t1.occurred());
    let (g2, t2) = c.open_gate(gate("g2", ABS)).unwrap();
    assert!(!t2.occurred());
    let (g3, _) = c.open_gate(gate("g3", ABS.lower(1))).unwrap();

    assert!(g1.authorize().is_ok());
    assert!(g2.authorize().is_ok());
    assert!(g3.authorize().unwrap_err().is_unauthorized());
}

#[test]
fn duplicate_subject_rejected() {
    let c = exclusive();
    let (g1, _) = c.open_gate(gate("test", ABS)).unwrap();
    let (config, calls) = counted("test", TimeRange::MAX, ABS, 1);
    let err = c.open_gate(config).unwrap_err();
    assert!(err.is_validation());
    assert!(err
        .to_string()
        .contains("control subject [test]<test> is already registered in the region"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(g1.authorize().is_ok());
}

#[test]
fn lowering_leader_authority_hands_off() {
    let c = exclusive();
    let (g1, _) = c.open_gate(gate("g1", ABS)).unwrap();
    let (g2, _) = c.open_gate(gate("g2", ABS.lower(1))).unwrap();

    let t = g1.set_authority(ABS.lower(2));
    assert!(t.occurred());
    assert_eq!(t.from.unwrap().subject.key, "g1");
    assert_eq!(t.to.unwrap().subject.key, "g2");
    assert_eq!(g1.authority(), ABS.lower(2));
    assert!(g2.authorize().is_ok());
    assert!(g1.authorize().unwrap_err().is_unauthorized());
}

#[test]
fn lowering_leader_to_tie_keeps_control() {
    let c = exclusive();
    let (g1, _) = c.open_gate(gate("g1", ABS)).unwrap();
    let (g2, _) = c.open_gate(gate("g2", ABS.lower(1))).unwrap();

    let t = g1.set_authority(ABS.lower(1));
    assert!(t.occurred());
    assert_eq!(t.to.unwrap().subject.key, "g1");
    assert!(g1.authorize().is_ok());
    assert!(g2.authorize().is_err());
}

#[test]
fn raising_follower_takes_control() {
    let c = exclusive();
    let (g1, _) = c.open_gate(gate("g1", ABS.lower(1))).unwrap();
    let (g2, _) = c.open_gate(gate("g2", ABS.lower(2))).unwrap();

    let t = g2.set_authority(ABS);
    assert_eq!(t.from.unwrap().subject, Subject::new("g1", "g1"));
    assert_eq!(t.to.unwrap().subject, Subject::new("g2", "g2"));
    assert!(g2.authorize().is_ok());
    assert!(g1.authorize().is_err());

    // Releasing the follower changes nothing.
    let (resource, t) = g1.release();
    assert!(resource.is_none());
    assert!(!t.occurred());
    assert!(g2.authorize().is_ok());
}

#[test]
fn leader_lowering_to_tie_with_earlier_gate_hands_back() {
    let c = exclusive();
    let (g1, _) = c.open_gate(gate("g1", ABS.lower(1))).unwrap();
    let (g2, t) = c.open_gate(gate("g2", ABS)).unwrap();
    assert!(t.is_transfer());

    let t = g2.set_authority(ABS.lower(1));
    assert_eq!(t.from.unwrap().subject.key, "g2");
    assert_eq!(t.to.unwrap().subject.key, "g1");
    assert!(g1.authorize().is_ok());
    assert!(g2.authorize().is_err());
}

#[test]
fn three_gates_escalating_authority() {
    let c = exclusive();
    let (g1, t) = c.open_gate(gate("g1", ABS.lower(2))).unwrap();
    assert!(t.is_acquire());
    let (g2, t) = c.open_gate(gate("g2", ABS.lower(1))).unwrap();
    assert_eq!(t.from.unwrap().subject.key, "g1");
    let (g3, t) = c.open_gate(gate("g3", ABS)).unwrap();
    assert_eq!(t.from.unwrap().subject.key, "g2");
    assert_eq!(t.to.unwrap().subject.key, "g3");

    assert!(g1.authorize().is_err());
    assert!(g2.authorize().is_err());
    assert!(g3.authorize().is_ok());
}

#[test]
fn release_picks_highest_then_earliest() {
    let c = exclusive();
    let (g1, _) = c.open_gate(gate("g1", ABS)).unwrap();
    let (g2, _) = c.open_gate(gate("g2", ABS.lower(2))).unwrap();
    let (g3, _) = c.open_gate(gate("g3", ABS.lower(1))).unwrap();
    let (g4, _) = c.open_gate(gate("g4", ABS.lower(1))).unwrap();

    let (_, t) = g1.release();
    assert_eq!(t.to.unwrap().subject.key, "g3");
    assert!(g3.authorize().is_ok());
    assert!(g2.authorize().is_err());
    assert!(g4.authorize().is_err());
}

#[test]
fn scenario_overlapping_writers() {
    let c = exclusive();
    let (g1, t) = c
        .open_gate(counted("w1", TimeRange::from_seconds(0, 100), Authority::new(10), 1).0)
        .unwrap();
    assert!(t.is_acquire());
    assert!(g1.authorize().is_ok());

    let (g2, t) = c
        .open_gate(counted("w2", TimeRange::from_seconds(50, 150), Authority::new(9), 2).0)
        .unwrap();
    assert!(!t.occurred());
    assert_eq!(g2.time_range(), TimeRange::from_seconds(0, 150));
    assert!(g2.authorize().is_err());

    let (_, t) = g1.release();
    assert_eq!(t.from.unwrap().subject.key, "w1");
    assert_eq!(t.to.unwrap().subject.key, "w2");

    let (_, t) = g2.release();
    assert_eq!(t.from.unwrap().subject.key, "w2");
    assert!(t.to.is_none());
    assert_eq!(c.region_count(), 0);
}

#[test]
fn err_if_controlled_blocks_second_gate() {
    let c = exclusive();
    let (g1, t) = c
        .open_gate(gate("g1", Authority::new(0)).err_if_controlled(true))
        .unwrap();
    assert!(t.is_acquire());
    assert!(g1.authorize().is_ok());

    let err = c
        .open_absolute_gate_if_uncontrolled(
            TimeRange::from_seconds(99, 110),
            Subject::with_key("g2"),
            || Ok(Channel { key: 1, value: 0 }),
        )
        .unwrap_err();
    assert!(err.is_unauthorized());
    assert!(err.to_string().contains("overlaps with a controlled region"));
    assert!(err.to_string().contains("already being controlled"));
    assert_eq!(err.holder().unwrap().key, "g1");
}

#[test]
fn absolute_gate_on_uncontrolled_region() {
    let c = exclusive();
    c.register(TimeRange::MAX, Channel { key: 1, value: 3 }).unwrap();
    let (g, t) = c
        .open_absolute_gate_if_uncontrolled(TimeRange::MAX, Subject::with_key("g"), || {
            Ok(Channel { key: 1, value: 0 })
        })
        .unwrap();
    assert!(t.occurred());
    assert_eq!(g.authorize().unwrap().value, 3);

    let (g1, t) = c.open_gate(gate("g1", ABS)).unwrap();
    assert!(!t.occurred());
    assert!(g1.authorize().is_err());
    assert!(g.authorize().is_ok());
}

#[test]
fn err_on_unauthorized_open() {
    let c = exclusive();
    let (g, t) = c
        .open_gate(gate("solo", Authority::new(0)).err_on_unauthorized_open(true))
        .unwrap();
    assert!(t.is_acquire());
    g.release();

    let (_g1, _) = c.open_gate(gate("g1", ABS)).unwrap();
    let (config, _) = counted("g2", TimeRange::MAX, ABS.lower(1), 1);
    let err = c.open_gate(config.err_on_unauthorized_open(true)).unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(err.holder().unwrap().key, "g1");
}

#[test]
fn failed_open_resource_propagates() {
    let c = exclusive();
    let config = GateConfig::<Channel>::new(Subject::with_key("a"), TimeRange::from_seconds(5, 15), ABS)
        .open_resource(|| Err(ControlError::open_resource("haha error")));
    let err = c.open_gate(config).unwrap_err();
    assert!(matches!(err, ControlError::OpenResource { .. }));
    assert!(err.to_string().contains("haha error"));
    assert_eq!(c.region_count(), 0);
}

#[test]
fn invalid_configs_rejected() {
    let c = exclusive();
    let mut config = gate("a", ABS);
    config.time_range = TimeRange::ZERO;
    assert!(c
        .open_gate(config)
        .unwrap_err()
        .to_string()
        .contains("time_range: must be non-zero"));

    let config = gate("", ABS);
    assert!(c
        .open_gate(config)
        .unwrap_err()
        .to_string()
        .contains("subject.key: required"));

    let config = GateConfig::<Channel>::new(Subject::with_key("a"), TimeRange::MAX, ABS);
    assert!(c.open_gate(config).unwrap_err().is_validation());
}

#[test]
fn multiple_region_overlap_rejected_without_side_effects() {
    let c = exclusive();
    let (_g1, _) = c
        .open_gate(counted("t1", TimeRange::from_seconds(1, 5), ABS, 1).0)
        .unwrap();
    let (_g2, t) = c
        .open_gate(counted("t2", TimeRange::from_seconds(5, 10), ABS, 1).0)
        .unwrap();
    assert!(t.is_acquire());

    let (config, calls) = counted("t3", TimeRange::from_seconds(0, 20), ABS, 1);
    let err = c.open_gate(config).unwrap_err();
    assert!(matches!(err, ControlError::UnsupportedConfiguration { .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(c.region_count(), 2);
}

#[test]
fn peek_resource_without_control() {
    let c = exclusive();
    let (g1, _) = c
        .open_gate(counted("g1", TimeRange::MAX, ABS, 12).0)
        .unwrap();
    let (g2, _) = c.open_gate(gate("g2", Authority::new(0))).unwrap();
    assert_eq!(g1.peek_resource().value, 12);
    assert_eq!(g2.peek_resource().value, 12);
}

#[test]
fn leading_state_reports_holder() {
    let c = exclusive();
    assert!(c.leading_state().is_none());
    let (g, _) = c.open_gate(gate("test", ABS)).unwrap();
    let lead = c.leading_state().unwrap();
    assert_eq!(lead.subject, Subject::new("test", "test"));
    assert_eq!(lead.resource, ChannelKey::new(1));
    assert_eq!(lead.authority, ABS);
    g.release();
    assert!(c.leading_state().is_none());
}
