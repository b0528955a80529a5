#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cases;
pub mod clean;
pub mod error;
pub mod merge;

pub use cases::{CaseLabel, CasePartition, SourcePresence};
pub use clean::{CleanedMatrix, CleanerConfig, ClipBounds, FeatureCleaner};
pub use error::{PipelineError, Result};
pub use merge::{ApplicantFeatureMerger, MergeInputs};

/// Applicant-ID column shared by every table in the pipeline.
pub const ID_COL: &str = "sk_id_curr";
