//! Batch classification pipeline: preparation, group routing, per-group requests, and reply
//! parsing.

pub mod categories;
mod group;
pub mod parser;
pub mod prepare;
pub mod routing;
mod service;
pub mod strategy;
pub mod types;

pub use categories::CategorySet;
pub use group::{ClassifierSettings, GroupClassifier};
pub use service::{ClassificationApi, ClassificationService, FileUpload};
pub use types::{
    Classification, ClassificationError, ClassificationResults, ContentGroup, RenderedResults,
    UnknownReason, UploadedDocument,
};
