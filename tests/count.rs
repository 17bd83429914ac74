use futures::stream::StreamExt;
use kube_count::{
    catalog::{StaticCatalog, TypeCatalog},
    multiwatch::{EventStream, StreamEvent, StreamSource, WatchScope},
    AggregateOptions, CountConfig, CountError, CounterController, Record,
    ResourceTypeDescriptor, ResourceTypeIdentity, SortOrder,
};
use std::{collections::HashMap, sync::Arc, time::Duration};

enum Step {
    Add(&'static str),
    Delete(&'static str),
    Synced,
    Fail,
    /// Ends the stream
    Close,
}

/// Replays scripted events per `<plural>.<groupVersion>` and keeps the
/// stream open afterwards, like a real watch, unless the script closes it.
#[derive(Default)]
struct ScriptedSource {
    scripts: HashMap<String, Vec<Step>>,
}

impl ScriptedSource {
    fn script(mut self, identity: &ResourceTypeIdentity, steps: Vec<Step>) -> Self {
        self.scripts.insert(identity.to_string(), steps);
        self
    }
}

impl StreamSource for ScriptedSource {
    fn open(&self, identity: &ResourceTypeIdentity, _scope: &WatchScope) -> EventStream {
        let steps = self
            .scripts
            .get(&identity.to_string())
            .map(Vec::as_slice)
            .unwrap_or_default();
        let closes = steps.iter().any(|step| matches!(step, Step::Close));
        let events = steps
            .iter()
            .take_while(|step| !matches!(step, Step::Close))
            .map(|step| match step {
                Step::Add(ns) => Ok(StreamEvent::Added(ns.to_string())),
                Step::Delete(ns) => Ok(StreamEvent::Deleted(ns.to_string())),
                Step::Synced => Ok(StreamEvent::Synced),
                Step::Fail | Step::Close => Err(anyhow::anyhow!("connection reset")),
            })
            .collect::<Vec<_>>();
        if closes {
            futures::stream::iter(events).boxed()
        } else {
            futures::stream::iter(events)
                .chain(futures::stream::pending())
                .boxed()
        }
    }
}

/// Catalog whose API server can't be reached
struct UnreachableCatalog;

#[async_trait::async_trait]
impl TypeCatalog for UnreachableCatalog {
    async fn lookup(&self) -> anyhow::Result<Vec<ResourceTypeDescriptor>> {
        anyhow::bail!("connection refused")
    }
}

fn pod() -> ResourceTypeIdentity {
    ResourceTypeIdentity::new("Pod", "", "v1", "pods")
}

fn hpa(version: &str) -> ResourceTypeIdentity {
    ResourceTypeIdentity::new(
        "HorizontalPodAutoscaler",
        "autoscaling",
        version,
        "horizontalpodautoscalers",
    )
}

fn catalog() -> StaticCatalog {
    let desc = |identity: ResourceTypeIdentity, singular: &str, short: &str| {
        ResourceTypeDescriptor {
            identity,
            singular: singular.to_string(),
            short_names: vec![short.to_string()],
            namespaced: true,
        }
    };
    StaticCatalog(vec![
        desc(pod(), "pod", "po"),
        desc(hpa("v1"), "horizontalpodautoscaler", "hpa"),
        desc(hpa("v2"), "horizontalpodautoscaler", "hpa"),
    ])
}

fn controller(source: ScriptedSource) -> CounterController<StaticCatalog, ScriptedSource> {
    CounterController::new(
        catalog(),
        Arc::new(source),
        CountConfig {
            namespace: None,
            sync_timeout: Some(Duration::from_secs(10)),
        },
    )
}

fn two_namespaces() -> ScriptedSource {
    ScriptedSource::default().script(
        &pod(),
        vec![Step::Add("ns1"), Step::Add("ns2"), Step::Add("ns1"), Step::Synced],
    )
}

fn record(ns: &str, identity: ResourceTypeIdentity, count: i64) -> Record {
    Record {
        namespace: ns.to_string(),
        identity,
        count,
    }
}

#[tokio::test]
async fn per_namespace_ascending() {
    let records = controller(two_namespaces())
        .run("pods", &AggregateOptions::default())
        .await
        .unwrap();
    assert_eq!(
        records,
        vec![record("ns2", pod(), 1), record("ns1", pod(), 2)]
    );
}

#[tokio::test]
async fn per_namespace_descending() {
    let options = AggregateOptions {
        order: SortOrder::Descending,
        all_namespaces: false,
    };
    let records = controller(two_namespaces())
        .run("po", &options)
        .await
        .unwrap();
    assert_eq!(
        records,
        vec![record("ns1", pod(), 2), record("ns2", pod(), 1)]
    );
}

#[tokio::test]
async fn all_namespaces_collapses_counts() {
    let options = AggregateOptions {
        order: SortOrder::Ascending,
        all_namespaces: true,
    };
    let records = controller(two_namespaces())
        .run("pods", &options)
        .await
        .unwrap();
    assert_eq!(records, vec![record("", pod(), 3)]);
    assert_eq!(records[0].identity.group_version(), "v1");
}

#[tokio::test]
async fn ambiguous_token_counts_each_version_separately() {
    let source = ScriptedSource::default()
        .script(&hpa("v1"), vec![Step::Add("a"), Step::Synced])
        .script(
            &hpa("v2"),
            vec![Step::Add("a"), Step::Add("b"), Step::Add("b"), Step::Synced],
        )
        .script(&pod(), vec![Step::Add("a"), Step::Synced]);
    let records = controller(source)
        .run("hpa,pods", &AggregateOptions::default())
        .await
        .unwrap();
    assert_eq!(
        records,
        vec![
            record("a", hpa("v1"), 1),
            record("a", hpa("v2"), 1),
            record("b", hpa("v2"), 2),
            record("a", pod(), 1),
        ]
    );
}

#[tokio::test]
async fn delete_before_add_is_negative() {
    let source = ScriptedSource::default().script(
        &pod(),
        vec![Step::Add("ns1"), Step::Delete("ns3"), Step::Synced],
    );
    let records = controller(source)
        .run("pods", &AggregateOptions::default())
        .await
        .unwrap();
    assert_eq!(
        records,
        vec![record("ns3", pod(), -1), record("ns1", pod(), 1)]
    );
}

#[tokio::test]
async fn transient_errors_are_swallowed() {
    let source = ScriptedSource::default().script(
        &pod(),
        vec![Step::Fail, Step::Add("ns1"), Step::Fail, Step::Synced],
    );
    let records = controller(source)
        .run("pods", &AggregateOptions::default())
        .await
        .unwrap();
    assert_eq!(records, vec![record("ns1", pod(), 1)]);
}

#[tokio::test]
async fn repeated_token_counts_twice() {
    let source = ScriptedSource::default().script(&pod(), vec![Step::Add("ns1"), Step::Synced]);
    let records = controller(source)
        .run("pods,pod", &AggregateOptions::default())
        .await
        .unwrap();
    assert_eq!(
        records,
        vec![record("ns1", pod(), 2), record("ns1", pod(), 2)]
    );
}

#[tokio::test]
async fn unknown_tokens_fail_resolution() {
    let err = controller(ScriptedSource::default())
        .run("widgets", &AggregateOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CountError::Resolution { .. }), "{}", err);
}

#[tokio::test]
async fn no_objects_is_an_empty_result() {
    let source = ScriptedSource::default().script(&pod(), vec![Step::Synced]);
    let err = controller(source)
        .run("pods", &AggregateOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CountError::EmptyResult), "{}", err);
}

#[tokio::test(start_paused = true)]
async fn stalled_stream_fails_sync() {
    let source = ScriptedSource::default()
        .script(&pod(), vec![Step::Add("ns1"), Step::Synced])
        .script(&hpa("v2"), vec![Step::Add("ns1"), Step::Fail]);
    let err = controller(source)
        .run("pods,hpa", &AggregateOptions::default())
        .await
        .unwrap_err();
    match err {
        CountError::SyncFailure { identities } => {
            assert_eq!(identities, vec![hpa("v1"), hpa("v2")])
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn stream_closed_before_sync_fails_sync() {
    let source = ScriptedSource::default().script(
        &pod(),
        vec![Step::Add("ns1"), Step::Add("ns2"), Step::Close],
    );
    let err = controller(source)
        .run("pods", &AggregateOptions::default())
        .await
        .unwrap_err();
    match err {
        CountError::SyncFailure { identities } => assert_eq!(identities, vec![pod()]),
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn blank_tokens_fail_before_catalog_lookup() {
    let controller = CounterController::new(
        UnreachableCatalog,
        Arc::new(ScriptedSource::default()),
        CountConfig::default(),
    );
    let err = controller
        .run(" , ", &AggregateOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CountError::InvalidInput(_)), "{}", err);

    let err = controller
        .run("pods", &AggregateOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CountError::Catalog(_)), "{}", err);
}
