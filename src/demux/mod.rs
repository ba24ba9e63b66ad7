mod buckets;
pub mod classifier;
pub mod flush;
mod summary;

pub use buckets::BucketSet;
pub use classifier::BarcodeIndex;
pub use classifier::Classification;
pub use classifier::DemuxSummary;
pub use classifier::Demultiplexer;
pub use flush::FlushController;
pub use flush::FlushEvent;
pub use flush::FlushState;
pub use flush::FlushTarget;
pub use summary::write_read_summary;
