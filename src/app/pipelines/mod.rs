pub mod draft_pipeline;

pub use draft_pipeline::{DraftPipeline, PreparedDraft};
