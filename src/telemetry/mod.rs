// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Interface telemetry engine
//!
//! Deduplicated periodic polling of router interface counters with
//! non-blocking fan-out to any number of subscribers.

mod handle;
mod registry;
mod sample;
mod sampler;
mod session;

pub use handle::SampleStream;
pub use registry::{SessionInfo, SubscriptionRegistry};
pub use sample::{Sample, SessionKey};
pub use sampler::{Sampler, stats_command};
pub use session::SessionState;
