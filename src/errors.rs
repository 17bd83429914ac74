//! Error utilities

use crate::identity::ResourceTypeIdentity;

/// Terminal failure of a counting run.
#[derive(Debug, thiserror::Error)]
pub enum CountError {
    #[error("invalid input kind name: '{0}'")]
    InvalidInput(String),
    #[error("failed to load resource type catalog")]
    Catalog(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("no matching resource types for '{tokens}'")]
    Resolution { tokens: String },
    #[error("failed to sync {} cache", join_identities(.identities))]
    SyncFailure {
        identities: Vec<ResourceTypeIdentity>,
    },
    #[error("no resources found")]
    EmptyResult,
    #[error("failed to marshal {format} data")]
    Render {
        format: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

fn join_identities(identities: &[ResourceTypeIdentity]) -> String {
    identities
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Describes error reason
#[non_exhaustive]
#[derive(Debug, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    Forbidden,
    Unauthorized,
    ServiceUnavailable,
    /// Catch-all variant. Since this enum is non-exhaustive,
    /// it should be handled with `_` pattern
    Unknown,
}

/// Tries to classify k8s error
pub fn classify(error_reason: &str) -> ErrorClass {
    match error_reason {
        "NotFound" => ErrorClass::NotFound,
        "Forbidden" => ErrorClass::Forbidden,
        "Unauthorized" => ErrorClass::Unauthorized,
        "ServiceUnavailable" => ErrorClass::ServiceUnavailable,
        _ => ErrorClass::Unknown,
    }
}

/// Tries to classify k8s error, wrapped in kube Error
pub fn classify_kube(error: &kube::Error) -> ErrorClass {
    match error {
        kube::Error::Api(api) => classify(&api.reason),
        _ => ErrorClass::Unknown,
    }
}
