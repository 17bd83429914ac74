//! Counting live objects of Kubernetes resource types.
//!
//! A run resolves user supplied type names against a [`catalog::TypeCatalog`],
//! opens one watch per resolved type, waits until every watch has listed its
//! objects and reports the counts per namespace.

pub mod aggregate;
pub mod catalog;
pub mod controller;
pub mod counter;
pub mod errors;
pub mod identity;
pub mod kubeconfig;
pub mod multiwatch;
pub mod resolve;
pub mod wait;

pub use aggregate::{AggregateOptions, Record, SortOrder};
pub use controller::{CountConfig, CounterController};
pub use errors::CountError;
pub use identity::{ResourceTypeDescriptor, ResourceTypeIdentity};
