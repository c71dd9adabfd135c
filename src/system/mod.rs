pub mod gpu;
pub mod rapl;
pub mod sampler;
pub mod snapshot;
pub mod sysfs;
pub mod thermal;

use snapshot::Snapshot;

/// Produces one snapshot per relay tick.
pub trait SnapshotSource {
    fn sample(&mut self) -> Snapshot;
}
