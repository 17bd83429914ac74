//! Mapping user supplied type tokens to concrete resource types

use crate::{
    errors::CountError,
    identity::{ResourceTypeDescriptor, ResourceTypeIdentity},
};
use std::collections::HashMap;

/// Splits a comma-separated token list, dropping empty tokens.
pub fn split_tokens(s: &str) -> Vec<&str> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
}

/// Resolved resource types, in the order tokens resolved them.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// May contain the same identity several times if a token was repeated
    pub order: Vec<ResourceTypeIdentity>,
    namespaced: HashMap<ResourceTypeIdentity, bool>,
}

impl Resolution {
    /// Returns false for cluster-scoped types
    pub fn is_namespaced(&self, identity: &ResourceTypeIdentity) -> bool {
        self.namespaced.get(identity).copied().unwrap_or(true)
    }
}

pub struct ResourceTypeResolver {
    descriptors: Vec<ResourceTypeDescriptor>,
    /// alias -> indices into `descriptors`
    index: HashMap<String, Vec<usize>>,
}

impl ResourceTypeResolver {
    pub fn new(descriptors: Vec<ResourceTypeDescriptor>) -> Self {
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, desc) in descriptors.iter().enumerate() {
            for alias in desc.aliases() {
                let entries = index.entry(alias).or_default();
                // kind and singular name usually coincide
                if !entries.contains(&i) {
                    entries.push(i);
                }
            }
        }
        ResourceTypeResolver { descriptors, index }
    }

    /// Descriptors matching a single token
    pub fn lookup(&self, token: &str) -> impl Iterator<Item = &ResourceTypeDescriptor> + '_ {
        self.index
            .get(token)
            .into_iter()
            .flatten()
            .map(move |&i| &self.descriptors[i])
    }

    #[tracing::instrument(skip(self))]
    pub fn resolve(&self, tokens: &str) -> Result<Resolution, CountError> {
        let parts = split_tokens(tokens);
        if parts.is_empty() {
            return Err(CountError::InvalidInput(tokens.to_string()));
        }

        let mut order = Vec::new();
        let mut namespaced = HashMap::new();
        for token in parts {
            let mut matched = false;
            for desc in self.lookup(token) {
                matched = true;
                if namespaced
                    .insert(desc.identity.clone(), desc.namespaced)
                    .is_some()
                {
                    tracing::warn!(
                        token,
                        identity = %desc.identity,
                        "resource type requested more than once, it will be counted again"
                    );
                }
                order.push(desc.identity.clone());
            }
            if !matched {
                tracing::debug!(token, "token matches no resource type");
            }
        }

        if order.is_empty() {
            return Err(CountError::Resolution {
                tokens: tokens.to_string(),
            });
        }
        Ok(Resolution { order, namespaced })
    }
}
