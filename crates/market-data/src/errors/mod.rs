//! Error types and retry classification for price oracles.
//!
//! - [`MarketDataError`]: everything an oracle call can fail with
//! - [`RetryClass`]: how the caller should react to a failure
//! - [`RetryPolicy`]: the single-retry rule applied around every oracle request

mod retry;

pub use retry::{RetryClass, RetryPolicy};

use thiserror::Error;

/// Errors that can occur while fetching a historical price.
///
/// Each variant is classified into a [`RetryClass`] via [`retry_class`](Self::retry_class).
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The oracle does not list this asset at all.
    #[error("Asset not supported by {provider}: {asset}")]
    AssetNotSupported { provider: String, asset: String },

    /// The oracle cannot quote prices in this unit.
    #[error("Unit not supported by {provider}: {unit}")]
    UnitNotSupported { provider: String, unit: String },

    /// The asset is listed but no data exists for the requested day.
    #[error("No data for date: {0}")]
    NoDataForDate(String),

    /// HTTP 429 or an equivalent rate limit message.
    #[error("Rate limited: {provider}")]
    RateLimited { provider: String },

    /// The request did not complete in time.
    #[error("Timeout: {provider}")]
    Timeout { provider: String },

    /// The oracle answered with something we could not use.
    #[error("Provider error: {provider} - {message}")]
    ProviderError { provider: String, message: String },

    /// A response parsed but held an unusable price.
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MarketDataError {
    /// Returns the retry classification for this error.
    ///
    /// ```
    /// use valuemachine_market_data::errors::{MarketDataError, RetryClass};
    ///
    /// let error = MarketDataError::RateLimited { provider: "COINGECKO".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    ///
    /// let error = MarketDataError::NoDataForDate("2017-01-01".to_string());
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::AssetNotSupported { .. }
            | Self::UnitNotSupported { .. }
            | Self::NoDataForDate(_)
            | Self::ValidationFailed { .. } => RetryClass::Never,

            Self::RateLimited { .. } | Self::Timeout { .. } => RetryClass::WithBackoff,

            Self::ProviderError { .. } | Self::Network(_) => RetryClass::NextProvider,
        }
    }

    /// Builds a provider error from a free-form message, recognising the
    /// timeout and rate limit wording some endpoints put in their bodies.
    pub fn from_message(provider: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let lowered = message.to_lowercase();
        if lowered.contains("timeout") || lowered.contains("timed out") {
            Self::Timeout {
                provider: provider.to_string(),
            }
        } else if message.contains("429") || lowered.contains("rate limit") {
            Self::RateLimited {
                provider: provider.to_string(),
            }
        } else {
            Self::ProviderError {
                provider: provider.to_string(),
                message,
            }
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}
