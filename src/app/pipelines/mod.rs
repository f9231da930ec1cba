pub mod daily_pipeline;

pub use daily_pipeline::{ArchiveSelection, DailyIngestPipeline};
