//! # Global runtime configuration.
//!
//! Provides [`Config`] centralized settings for the orchestrator core.
//!
//! Config is used in three places:
//! 1. **Event bus**: default dispatch discipline and failure channel capacity
//! 2. **Endpoint allocation**: host name and dynamic port range
//! 3. **Lifecycle**: whether the graph topology is frozen at `BeforeStart`
//!
//! ## Sentinel values
//! - `failure_channel_capacity = 0` → clamped to 1

use std::ops::RangeInclusive;

use crate::events::DispatchBehavior;

/// Global configuration for the orchestrator core.
///
/// ## Field semantics
/// - `default_dispatch`: discipline used by [`EventBus::publish_default`](crate::EventBus::publish_default)
///   and by the lifecycle pipeline
/// - `failure_channel_capacity`: ring buffer size of the non-blocking failure channel (min 1)
/// - `endpoint_host`: host written into every allocated endpoint
/// - `port_range`: ports handed out to endpoints without a fixed port
/// - `freeze_on_start`: reject new resources once `BeforeStart` is published
///
/// ## Notes
/// All fields are public. Prefer the helper accessors over sentinel checks.
#[derive(Clone, Debug)]
pub struct Config {
    /// Dispatch discipline for lifecycle events and `publish_default`.
    pub default_dispatch: DispatchBehavior,

    /// Capacity of the broadcast channel carrying non-blocking handler failures.
    ///
    /// Receivers lagging behind more than `failure_channel_capacity` records
    /// observe `Lagged` and skip the oldest ones.
    pub failure_channel_capacity: usize,

    /// Host name used for allocated endpoints.
    pub endpoint_host: String,

    /// Range of ports used for dynamically allocated endpoints.
    pub port_range: RangeInclusive<u16>,

    /// Freeze graph topology when the pipeline publishes `BeforeStart`.
    pub freeze_on_start: bool,
}

impl Config {
    /// Returns the failure channel capacity clamped to a minimum of 1.
    #[inline]
    pub fn failure_capacity_clamped(&self) -> usize {
        self.failure_channel_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `default_dispatch = BlockingSequential`
    /// - `failure_channel_capacity = 256`
    /// - `endpoint_host = "localhost"`
    /// - `port_range = 10000..=10999`
    /// - `freeze_on_start = true`
    fn default() -> Self {
        Self {
            default_dispatch: DispatchBehavior::default(),
            failure_channel_capacity: 256,
            endpoint_host: "localhost".to_string(),
            port_range: 10000..=10999,
            freeze_on_start: true,
        }
    }
}
