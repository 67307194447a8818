//! Test fixtures and controller helpers.
//!
//! Provides a minimal resource type, resource callbacks that count how often
//! they run, and log setup for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use telemdb_core::{
    Authority, ChannelKey, Config, ControlResult, Controller, GateConfig, Resource, Subject,
    TimeRange,
};
use tracing_subscriber::EnvFilter;

/// A stand-in for a channel writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResource {
    /// The channel the resource writes to.
    pub channel: ChannelKey,
    /// Distinguishes resources opened for the same channel.
    pub generation: u64,
}

impl TestResource {
    /// Creates a resource for `channel`.
    pub fn new(channel: u32, generation: u64) -> Self {
        Self {
            channel: ChannelKey::new(channel),
            generation,
        }
    }
}

impl Resource for TestResource {
    fn channel_key(&self) -> ChannelKey {
        self.channel
    }
}

/// Hands out resource callbacks and counts how many of them ran.
///
/// Each callback opens a [`TestResource`] whose generation is the number of
/// callbacks that ran before it.
#[derive(Debug, Clone, Default)]
pub struct OpenCounter {
    calls: Arc<AtomicUsize>,
}

impl OpenCounter {
    /// Creates a counter with no calls recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a callback that opens a resource on `channel`.
    pub fn callback(
        &self,
        channel: u32,
    ) -> impl FnOnce() -> ControlResult<TestResource> + Send + 'static {
        let calls = Arc::clone(&self.calls);
        move || {
            let generation = calls.fetch_add(1, Ordering::SeqCst) as u64;
            Ok(TestResource::new(channel, generation))
        }
    }

    /// Returns the number of callbacks that ran.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Creates a controller with exclusive concurrency.
pub fn exclusive_controller() -> Controller<TestResource> {
    Controller::new(Config::exclusive())
}

/// Creates a controller with shared concurrency.
pub fn shared_controller() -> Controller<TestResource> {
    Controller::new(Config::shared())
}

/// Gate config for `key` over all time, opening a resource on channel 1.
pub fn writer(key: &str, authority: u8) -> GateConfig<TestResource> {
    writer_on(key, TimeRange::MAX, authority)
}

/// Gate config for `key` over `time_range`, opening a resource on channel 1.
pub fn writer_on(key: &str, time_range: TimeRange, authority: u8) -> GateConfig<TestResource> {
    GateConfig::new(Subject::new(key, key), time_range, Authority::new(authority))
        .open_resource(|| Ok(TestResource::new(1, 0)))
}

/// Installs a log subscriber for tests.
///
/// Honors `RUST_LOG` and defaults to `telemdb_core=debug`. Safe to call from
/// every test.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("telemdb_core=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
