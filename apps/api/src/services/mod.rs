//! Session services for SyncJam
//!
//! This module contains the core session logic:
//! - Session registry and expiry sweeping
//! - Host authority and failover
//! - Membership lifecycle
//! - Playlist and voting engine
//! - Follower-side clock synchronization
//! - Health and stats reporting

pub mod clock;
pub mod health;
pub mod host;
pub mod membership;
pub mod playlist;
pub mod registry;

pub use clock::{
    ClockOffset, Follower, HostReporter, LatencyProbe, LatencyQuality, Player, SyncOutcome,
};
pub use health::{HealthReport, HealthService, RoomSummary, StatsReport};
pub use host::HostChange;
pub use registry::{LiveSession, SessionHandle, SessionRegistry};
