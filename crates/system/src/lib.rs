//! The scaling engine: instance-count deltas for declared systems, with
//! recursive dependency resolution and scale telemetry.

pub mod balancer;
pub mod host;
pub mod runtime;
pub mod scale;
pub mod system;
pub mod tracker;

pub use balancer::{Balancer, NullBalancer};
pub use host::DockerHost;
pub use runtime::{ContainerHost, RunInstanceOptions};
pub use scale::{ScaleOptions, Scaler};
pub use system::{parse_envs, Instance, InstanceData, Scalable, System, DAEMON_TYPE};
pub use tracker::{system_hash, NullTracker, ScaleEvent, Tracker};
