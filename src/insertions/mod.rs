pub mod extractor;
pub mod junction;
mod parallel;

pub use extractor::{ExtractionResult, InsertionCounts, InsertionExtractor, RejectCounts, TnEnd};
pub use junction::{Junction, JunctionFinder, JunctionOutcome};
pub use parallel::extract_parallel;
