/*!
Topology module

This module turns polled device data into the correlated topology.

Structure:
- `source`: async traits (`SwitchSource`, `BmcSource`) returning one device's raw payload, and
            the per-device error types.
- `poller`: fans device polls out over a bounded worker pool and collects them into a `PollStore`.
- `store`: per-device slots of one polling run; normalizes them into the correlation input.
- `resolver`: MAC to BMC-reported server identity lookup.
- `correlation`: classifies every interface and reconciles switch links into a `TopologyGraph`.
- `warning`: the non-fatal degradations collected along the way.
*/

pub mod correlation;
pub mod poller;
pub mod resolver;
pub mod source;
pub mod store;
pub mod warning;

pub use correlation::CorrelationEngine;
pub use poller::Poller;
pub use source::{BmcSource, SwitchSource};
