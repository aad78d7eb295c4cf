//! Error types for the sampler and its statistics.
//!
//! Every variant is fatal: they signal a bad configuration or a bookkeeping
//! defect, never a transient condition, so nothing here is retried.

use thiserror::Error;

use crate::types::TokenSite;

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// Bad hyperparameters, malformed input lines or unsupported corpus ids.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A token was looked up in a vocabulary that never saw it.
    #[error("unknown token {token:?}{}", site_suffix(.site))]
    UnknownToken {
        token: String,
        site: Option<TokenSite>,
    },

    /// A decrement would drive a count table entry below zero.
    #[error("count consistency violated at {site}: {table} would go negative")]
    CountConsistency {
        table: &'static str,
        site: TokenSite,
    },

    /// A categorical draw over weights with no usable mass.
    #[error("degenerate distribution over {len} outcomes (total weight {total}){}", site_suffix(.site))]
    DegenerateDistribution {
        len: usize,
        total: f64,
        site: Option<TokenSite>,
    },

    /// A token probability in the log-likelihood was not strictly positive.
    #[error("non-positive token probability {value} for {token:?} at {site}")]
    NumericalInvariant {
        value: f64,
        token: String,
        site: TokenSite,
    },
}

fn site_suffix(site: &Option<TokenSite>) -> String {
    match site {
        Some(s) => format!(" at {s}"),
        None => String::new(),
    }
}

impl ModelError {
    pub fn config(msg: impl Into<String>) -> Self {
        ModelError::Configuration(msg.into())
    }

    /// Attach a token location to errors raised without one.
    pub fn at(self, at: TokenSite) -> Self {
        match self {
            ModelError::UnknownToken { token, site: None } => {
                ModelError::UnknownToken { token, site: Some(at) }
            }
            ModelError::DegenerateDistribution { len, total, site: None } => {
                ModelError::DegenerateDistribution { len, total, site: Some(at) }
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SetRole;

    #[test]
    fn at_fills_missing_site_only() {
        let site = TokenSite { set: SetRole::Test, doc: 3, position: 5 };
        let err = ModelError::DegenerateDistribution { len: 3, total: 0.0, site: None }.at(site);
        assert_eq!(
            err.to_string(),
            "degenerate distribution over 3 outcomes (total weight 0) at test document 3, position 5"
        );

        let other = TokenSite { set: SetRole::Train, doc: 0, position: 0 };
        let kept = err.clone().at(other);
        assert_eq!(kept, err);
    }

    #[test]
    fn unknown_token_without_site() {
        let err = ModelError::UnknownToken { token: "zebra".into(), site: None };
        assert_eq!(err.to_string(), "unknown token \"zebra\"");
    }
}
