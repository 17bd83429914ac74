use crate::{
    counter::CounterStore,
    identity::ResourceTypeIdentity,
    wait::{SyncBarrier, SyncFlag},
};
use event_listener::Event as SyncEvent;
use futures::stream::{BoxStream, StreamExt};
use kube::api::{Api, DynamicObject};
use kube_runtime::{
    watcher::{self, Event},
    WatchStreamExt,
};
use std::{collections::HashSet, sync::Arc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Minimal typed event delivered by a change stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// An object appeared in the given namespace
    Added(String),
    /// An object disappeared from the given namespace
    Deleted(String),
    /// Initial listing has been delivered completely
    Synced,
}

/// Change feed of one resource type. Dropping it stops delivery.
pub type EventStream = BoxStream<'static, anyhow::Result<StreamEvent>>;

/// Where a stream looks for objects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchScope {
    Cluster,
    Namespace(String),
}

pub trait StreamSource: Send + Sync {
    /// Opens a change feed. It must first deliver the current objects as
    /// `Added` events followed by `Synced`, then incremental events.
    fn open(&self, identity: &ResourceTypeIdentity, scope: &WatchScope) -> EventStream;
}

/// Receives the events of one stream
pub trait EventSink: Send + 'static {
    fn on_add(&self, namespace: &str);
    fn on_delete(&self, namespace: &str);
}

/// Sink that counts events of one resource type in a shared store
pub struct CounterSink {
    identity: ResourceTypeIdentity,
    store: Arc<CounterStore>,
}

impl CounterSink {
    pub fn new(identity: ResourceTypeIdentity, store: Arc<CounterStore>) -> Self {
        CounterSink { identity, store }
    }
}

impl EventSink for CounterSink {
    fn on_add(&self, namespace: &str) {
        self.store.increment(&self.identity, namespace);
    }

    fn on_delete(&self, namespace: &str) {
        self.store.decrement(&self.identity, namespace);
    }
}

async fn consume<S: EventSink>(
    mut events: EventStream,
    sink: S,
    sync: Arc<SyncFlag>,
    cancel: CancellationToken,
) {
    tracing::debug!("starting watch");
    loop {
        let item = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            item = events.next() => item,
        };
        match item {
            Some(Ok(StreamEvent::Added(ns))) => sink.on_add(&ns),
            Some(Ok(StreamEvent::Deleted(ns))) => sink.on_delete(&ns),
            Some(Ok(StreamEvent::Synced)) => {
                tracing::debug!("initial listing complete");
                sync.set();
            }
            Some(Err(err)) => {
                // the stream keeps going; if it never lists, the barrier reports it
                tracing::warn!("watch error: {:#}", err);
            }
            None => {
                if !sync.is_synced() {
                    tracing::error!("watch closed before initial listing completed");
                }
                break;
            }
        }
    }
}

/// Runs one counting stream per registered resource type.
pub struct WatchMultiplexer<S: ?Sized> {
    source: Arc<S>,
    namespace: Option<String>,
    store: Arc<CounterStore>,
    cancel: CancellationToken,
    changed: Arc<SyncEvent>,
    streams: Vec<(ResourceTypeIdentity, Arc<SyncFlag>)>,
    tasks: JoinSet<()>,
}

impl<S: StreamSource + ?Sized + 'static> WatchMultiplexer<S> {
    /// `namespace` restricts namespaced types; `None` watches cluster-wide
    pub fn new(source: Arc<S>, namespace: Option<String>, store: Arc<CounterStore>) -> Self {
        WatchMultiplexer {
            source,
            namespace,
            store,
            cancel: CancellationToken::new(),
            changed: Arc::new(SyncEvent::new()),
            streams: Vec::new(),
            tasks: JoinSet::new(),
        }
    }

    fn scope(&self, namespaced: bool) -> WatchScope {
        match &self.namespace {
            Some(ns) if namespaced => WatchScope::Namespace(ns.clone()),
            _ => WatchScope::Cluster,
        }
    }

    /// Starts a stream. Registering the same type twice counts it twice.
    pub fn watch(&mut self, identity: ResourceTypeIdentity, namespaced: bool) {
        let scope = self.scope(namespaced);
        let events = self.source.open(&identity, &scope);
        let sync = Arc::new(SyncFlag::new(self.changed.clone()));
        let sink = CounterSink::new(identity.clone(), self.store.clone());
        let span = tracing::info_span!("watch", resource = %identity, scope = ?scope);
        self.tasks.spawn(consume(events, sink, sync.clone(), self.cancel.clone()).instrument(span));
        self.streams.push((identity, sync));
    }

    pub fn barrier(&self) -> SyncBarrier {
        SyncBarrier {
            streams: self.streams.clone(),
            changed: self.changed.clone(),
            cancel: self.cancel.clone(),
        }
    }

    /// Cancels every stream and waits for their tasks to finish
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        while let Some(res) = self.tasks.join_next().await {
            if let Err(err) = res {
                tracing::error!("watch task failed: {}", err);
            }
        }
    }
}

/// Turns watcher events into add/delete events the way an informer does:
/// applying an object that is already known is an update and is ignored,
/// and objects missing from a re-list are reported as deleted.
#[derive(Debug, Default)]
struct ObjectTracker {
    known: HashSet<(String, String)>,
    /// objects seen during the re-list in progress
    listing: Option<HashSet<(String, String)>>,
    synced: bool,
}

fn object_key(obj: &DynamicObject) -> (String, String) {
    (
        obj.metadata.namespace.clone().unwrap_or_default(),
        obj.metadata.name.clone().unwrap_or_default(),
    )
}

impl ObjectTracker {
    fn apply(&mut self, ev: Event<DynamicObject>) -> Vec<StreamEvent> {
        match ev {
            Event::Init => {
                self.listing = Some(HashSet::new());
                Vec::new()
            }
            Event::InitApply(obj) => {
                let key = object_key(&obj);
                if let Some(listing) = &mut self.listing {
                    listing.insert(key.clone());
                }
                self.added(key)
            }
            Event::InitDone => {
                let mut out = Vec::new();
                if let Some(listing) = self.listing.take() {
                    let gone = self
                        .known
                        .difference(&listing)
                        .cloned()
                        .collect::<Vec<_>>();
                    for key in gone {
                        self.known.remove(&key);
                        out.push(StreamEvent::Deleted(key.0));
                    }
                }
                if !self.synced {
                    self.synced = true;
                    out.push(StreamEvent::Synced);
                }
                out
            }
            Event::Apply(obj) => self.added(object_key(&obj)),
            Event::Delete(obj) => {
                let key = object_key(&obj);
                self.known.remove(&key);
                vec![StreamEvent::Deleted(key.0)]
            }
        }
    }

    fn added(&mut self, key: (String, String)) -> Vec<StreamEvent> {
        if self.known.insert(key.clone()) {
            vec![StreamEvent::Added(key.0)]
        } else {
            Vec::new()
        }
    }
}

/// Stream source on top of kube-runtime's watcher
pub struct KubeSource {
    client: kube::Client,
}

impl KubeSource {
    pub fn new(client: kube::Client) -> Self {
        KubeSource { client }
    }
}

impl StreamSource for KubeSource {
    fn open(&self, identity: &ResourceTypeIdentity, scope: &WatchScope) -> EventStream {
        let ar = identity.api_resource();
        let api = match scope {
            WatchScope::Namespace(ns) => {
                Api::<DynamicObject>::namespaced_with(self.client.clone(), ns, &ar)
            }
            WatchScope::Cluster => Api::<DynamicObject>::all_with(self.client.clone(), &ar),
        };
        let mut tracker = ObjectTracker::default();
        kube_runtime::watcher(api, watcher::Config::default())
            .default_backoff()
            .flat_map(move |item| {
                let out: Vec<anyhow::Result<StreamEvent>> = match item {
                    Ok(ev) => tracker.apply(ev).into_iter().map(Ok).collect(),
                    Err(err) => vec![Err(anyhow::Error::new(err))],
                };
                futures::stream::iter(out)
            })
            .boxed()
    }
}
