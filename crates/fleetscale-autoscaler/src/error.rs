//! Error types for context assembly.

use fleetscale_cloudprovider::CloudProviderError;
use fleetscale_expander::ExpanderError;
use thiserror::Error;

/// Coarse classification of an [`AutoscalerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    /// The cloud provider could not be built or reached.
    CloudProvider,
    /// The options name something that does not exist or cannot work.
    Configuration,
}

/// Errors surfaced while assembling the autoscaling context.
#[derive(Debug, Error)]
pub enum AutoscalerError {
    #[error("context assembly: cloud provider {provider:?}: {source}")]
    CloudProvider {
        provider: String,
        #[source]
        source: CloudProviderError,
    },

    #[error("context assembly: expander {expander:?}: {source}")]
    Expander {
        expander: String,
        #[source]
        source: ExpanderError,
    },
}

impl AutoscalerError {
    pub fn error_type(&self) -> ErrorType {
        match self {
            AutoscalerError::CloudProvider { .. } => ErrorType::CloudProvider,
            AutoscalerError::Expander { .. } => ErrorType::Configuration,
        }
    }

    /// Fatal errors must terminate the process; there is nothing the
    /// caller can fall back to.
    pub fn is_fatal(&self) -> bool {
        self.error_type() == ErrorType::CloudProvider
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetscale_expander::ExpanderKind;

    #[test]
    fn provider_errors_are_fatal() {
        let err = AutoscalerError::CloudProvider {
            provider: "gce".to_string(),
            source: CloudProviderError::UnknownProvider("gce".to_string()),
        };
        assert!(err.is_fatal());
        assert_eq!(err.error_type(), ErrorType::CloudProvider);
        assert!(err.to_string().starts_with("context assembly"));
    }

    #[test]
    fn expander_errors_are_recoverable() {
        let err = AutoscalerError::Expander {
            expander: "bogus".to_string(),
            source: ExpanderKind::parse("bogus").unwrap_err(),
        };
        assert!(!err.is_fatal());
        assert_eq!(err.error_type(), ErrorType::Configuration);
        assert!(err.to_string().contains("bogus"));
    }
}
