//! Sources of known resource types

use crate::{
    errors::{classify_kube, ErrorClass},
    identity::{ResourceTypeDescriptor, ResourceTypeIdentity},
};
use anyhow::Context as _;
use async_trait::async_trait;
use futures::future::join_all;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{
    APIGroup, APIResource, APIResourceList, GroupVersionForDiscovery,
};
use std::collections::{HashMap, HashSet};

#[async_trait]
pub trait TypeCatalog: Send + Sync {
    /// Returns every known resource type
    async fn lookup(&self) -> anyhow::Result<Vec<ResourceTypeDescriptor>>;
}

/// Fixed list of descriptors
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog(pub Vec<ResourceTypeDescriptor>);

#[async_trait]
impl TypeCatalog for StaticCatalog {
    async fn lookup(&self) -> anyhow::Result<Vec<ResourceTypeDescriptor>> {
        Ok(self.0.clone())
    }
}

/// Catalog backed by the API server's discovery endpoints.
///
/// For every group the preferred version is consulted first; other versions
/// only contribute resources the group has not served yet.
pub struct DiscoveryCatalog {
    client: kube::Client,
}

impl DiscoveryCatalog {
    pub fn new(client: kube::Client) -> Self {
        DiscoveryCatalog { client }
    }

    async fn group_resources(&self, group: &APIGroup) -> Vec<ResourceTypeDescriptor> {
        let versions = ordered_versions(group);
        let listings = join_all(
            versions
                .iter()
                .map(|v| self.client.list_api_group_resources(&v.group_version)),
        )
        .await;
        let listings = versions
            .into_iter()
            .map(|v| v.group_version)
            .zip(listings)
            .collect();
        group_descriptors(group, listings)
    }
}

#[async_trait]
impl TypeCatalog for DiscoveryCatalog {
    #[tracing::instrument(skip(self))]
    async fn lookup(&self) -> anyhow::Result<Vec<ResourceTypeDescriptor>> {
        let mut out = Vec::new();

        let core = self
            .client
            .list_core_api_versions()
            .await
            .context("failed to list core API versions")?;
        if let Some(version) = core.versions.first() {
            let list = self
                .client
                .list_core_api_resources(version)
                .await
                .context("failed to list core API resources")?;
            out.extend(descriptors_from_list("", version, &list));
        }

        let groups = self
            .client
            .list_api_groups()
            .await
            .context("failed to list API groups")?;
        let per_group = join_all(groups.groups.iter().map(|g| self.group_resources(g))).await;
        out.extend(per_group.into_iter().flatten());
        tracing::debug!(count = out.len(), "discovered resource types");
        Ok(out)
    }
}

/// Versions of a group, preferred one first
fn ordered_versions(group: &APIGroup) -> Vec<GroupVersionForDiscovery> {
    let mut versions = Vec::new();
    if let Some(preferred) = &group.preferred_version {
        versions.push(preferred.clone());
    }
    for v in &group.versions {
        if !versions.iter().any(|p| p.group_version == v.group_version) {
            versions.push(v.clone());
        }
    }
    versions
}

fn skip_reason(err: &kube::Error) -> &'static str {
    match classify_kube(err) {
        ErrorClass::ServiceUnavailable => "API service is unavailable",
        ErrorClass::NotFound => "group version is no longer served",
        ErrorClass::Forbidden | ErrorClass::Unauthorized => "not allowed to list resources",
        _ => "failed to list resources",
    }
}

/// Merges the listings of one group, keyed by group version. A resource is
/// taken from the first version serving it, preferred version first; failed
/// listings are skipped.
pub(crate) fn group_descriptors(
    group: &APIGroup,
    mut listings: HashMap<String, kube::Result<APIResourceList>>,
) -> Vec<ResourceTypeDescriptor> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for v in ordered_versions(group) {
        let list = match listings.remove(&v.group_version) {
            Some(Ok(list)) => list,
            Some(Err(err)) => {
                tracing::warn!(
                    group_version = v.group_version.as_str(),
                    "{}, skipping: {:#}",
                    skip_reason(&err),
                    err
                );
                continue;
            }
            None => continue,
        };
        for desc in descriptors_from_list(&group.name, &v.version, &list) {
            if seen.insert(desc.identity.plural.clone()) {
                out.push(desc);
            }
        }
    }
    out
}

fn is_countable(res: &APIResource) -> bool {
    !res.name.contains('/')
        && res.verbs.iter().any(|v| v == "list")
        && res.verbs.iter().any(|v| v == "watch")
}

/// Converts one discovery listing into descriptors, skipping subresources
/// and types that can't be listed and watched.
pub(crate) fn descriptors_from_list(
    group: &str,
    version: &str,
    list: &APIResourceList,
) -> Vec<ResourceTypeDescriptor> {
    list.resources
        .iter()
        .filter(|res| is_countable(res))
        .map(|res| ResourceTypeDescriptor {
            identity: ResourceTypeIdentity::new(
                &res.kind,
                res.group.as_deref().unwrap_or(group),
                res.version.as_deref().unwrap_or(version),
                &res.name,
            ),
            singular: res.singular_name.clone(),
            short_names: res.short_names.clone().unwrap_or_default(),
            namespaced: res.namespaced,
        })
        .collect()
}
