pub mod pipeline;
pub mod validator;

pub use pipeline::{EtlPipeline, PipelineResult, PipelineTables};
pub use validator::{QualityStats, QualityValidator, ValidationResult};
