use crate::{
    aggregate::{aggregate, AggregateOptions, Record},
    catalog::TypeCatalog,
    counter::CounterStore,
    errors::CountError,
    multiwatch::{StreamSource, WatchMultiplexer},
    resolve::{split_tokens, ResourceTypeResolver},
};
use std::{sync::Arc, time::Duration};

#[derive(Debug, Clone, Default)]
pub struct CountConfig {
    /// Restricts namespaced resource types to this namespace
    pub namespace: Option<String>,
    /// How long to wait for every watch to list its objects.
    /// `None` waits forever.
    pub sync_timeout: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
enum Phase {
    Resolving,
    Watching,
    Syncing,
    Snapshotting,
    Aggregating,
    Done,
}

fn enter(phase: Phase) {
    tracing::debug!(%phase, "entering phase");
}

/// Counts live objects of the requested resource types, once.
pub struct CounterController<C, S: ?Sized> {
    catalog: C,
    source: Arc<S>,
    config: CountConfig,
}

impl<C: TypeCatalog, S: StreamSource + ?Sized + 'static> CounterController<C, S> {
    pub fn new(catalog: C, source: Arc<S>, config: CountConfig) -> Self {
        CounterController {
            catalog,
            source,
            config,
        }
    }

    /// Resolves `tokens`, watches every matching resource type until its
    /// initial listing is complete and returns the counts.
    #[tracing::instrument(skip(self, options))]
    pub async fn run(
        &self,
        tokens: &str,
        options: &AggregateOptions,
    ) -> Result<Vec<Record>, CountError> {
        enter(Phase::Resolving);
        if split_tokens(tokens).is_empty() {
            return Err(CountError::InvalidInput(tokens.to_string()));
        }
        let descriptors = self
            .catalog
            .lookup()
            .await
            .map_err(|err| CountError::Catalog(err.into()))?;
        let resolution = ResourceTypeResolver::new(descriptors).resolve(tokens)?;
        tracing::info!(
            resources = resolution.order.len(),
            "resolved resource types"
        );

        enter(Phase::Watching);
        let store = Arc::new(CounterStore::new());
        let mut mux =
            WatchMultiplexer::new(self.source.clone(), self.config.namespace.clone(), store.clone());
        for identity in &resolution.order {
            mux.watch(identity.clone(), resolution.is_namespaced(identity));
        }

        enter(Phase::Syncing);
        let synced = mux.barrier().wait(self.config.sync_timeout).await;
        // nothing may write into the store once the workers are joined
        mux.shutdown().await;
        synced?;

        enter(Phase::Snapshotting);
        let snapshot = store.snapshot();

        enter(Phase::Aggregating);
        let records = aggregate(&snapshot, &resolution.order, options);
        if records.is_empty() {
            return Err(CountError::EmptyResult);
        }

        enter(Phase::Done);
        Ok(records)
    }
}
