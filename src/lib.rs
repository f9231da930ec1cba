pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{SftpSource, ShareSource};
pub use app::pipelines::{ArchiveSelection, DailyIngestPipeline};
pub use config::{IngestConfig, SourceType};
pub use core::{etl::EtlEngine, schedule::DailySchedule};
pub use utils::error::{EtlError, Result};
