mod item;
mod pipeline;
mod store;

pub use item::{
    ImageData, ItemId, ItemStatus, ItemSummary, UploadItem, ANALYSIS_FAILED_MESSAGE,
    ANALYZING_START_PROGRESS, COMPRESSION_FAILED_MESSAGE, COMPRESSION_START_PROGRESS,
};
pub use pipeline::{AddOutcome, CompressionPipeline, CompressionSettings, FileInput};
pub use store::{SharedStore, StoreSnapshot, UploadStore, MAX_ITEMS};
