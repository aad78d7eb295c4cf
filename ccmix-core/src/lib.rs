pub mod types;
pub mod error;
pub mod prng;
pub mod text;
pub mod vocab;
pub mod config;
pub mod stats;
pub mod posterior;
pub mod sampler;

pub use config::{OovPolicy, SamplerConfig};
pub use error::{ModelError, Result};
pub use posterior::{Estimates, PosteriorMean};
pub use sampler::{compute_log_likelihood, sample_categorical, IterationReport, Sampler};
pub use stats::SufficientStatistics;
pub use text::{Document, DocumentSet, parse_documents, write_log_likelihoods, write_report};
pub use vocab::Vocabulary;
