pub mod archive;
pub mod contract;
pub mod download;
pub mod etl;
pub mod load;
pub mod schedule;
pub mod transform;

pub use crate::domain::model::{LoadOutcome, RawSalesRow, RunSummary, SalesRecord, TransformResult};
pub use crate::domain::ports::{Pipeline, RemoteSource};
pub use crate::utils::error::Result;
