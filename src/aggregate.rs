//! Turning counter snapshots into ordered report records

use crate::{counter::Snapshot, identity::ResourceTypeIdentity};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::EnumString, strum::Display)]
#[strum(ascii_case_insensitive)]
pub enum SortOrder {
    #[default]
    #[strum(to_string = "asc", serialize = "a")]
    Ascending,
    #[strum(to_string = "desc", serialize = "d")]
    Descending,
}

#[derive(Debug, Clone, Default)]
pub struct AggregateOptions {
    pub order: SortOrder,
    /// Collapse the namespaces of each resource type into one record
    pub all_namespaces: bool,
}

/// Object count of one resource type in one namespace (or in all of them,
/// in which case `namespace` is empty).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub namespace: String,
    pub identity: ResourceTypeIdentity,
    pub count: i64,
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Record", 4)?;
        s.serialize_field("namespace", &self.namespace)?;
        s.serialize_field("kind", &self.identity.kind)?;
        s.serialize_field("groupVersion", &self.identity.group_version())?;
        s.serialize_field("count", &self.count)?;
        s.end()
    }
}

fn compare(a: &Record, b: &Record, order: SortOrder) -> Ordering {
    let by_count = match order {
        SortOrder::Ascending => a.count.cmp(&b.count),
        SortOrder::Descending => b.count.cmp(&a.count),
    };
    // equal counts are ordered by namespace so output is reproducible
    by_count.then_with(|| a.namespace.cmp(&b.namespace))
}

/// Builds records for every resource type in `order`, one group per entry.
///
/// Types that never saw an event produce no records.
pub fn aggregate(
    snapshot: &Snapshot,
    order: &[ResourceTypeIdentity],
    options: &AggregateOptions,
) -> Vec<Record> {
    let mut out = Vec::new();
    for identity in order {
        let counts = match snapshot.get(identity) {
            Some(counts) => counts,
            None => continue,
        };
        let mut group = if options.all_namespaces {
            vec![Record {
                namespace: String::new(),
                identity: identity.clone(),
                count: counts.values().sum(),
            }]
        } else {
            counts
                .iter()
                .map(|(ns, &count)| Record {
                    namespace: ns.clone(),
                    identity: identity.clone(),
                    count,
                })
                .collect::<Vec<_>>()
        };
        group.sort_by(|a, b| compare(a, b, options.order));
        out.extend(group);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::NamespaceCounts;

    fn id(kind: &str, version: &str) -> ResourceTypeIdentity {
        ResourceTypeIdentity::new(kind, "autoscaling", version, &format!("{}s", kind))
    }

    fn counts(pairs: &[(&str, i64)]) -> NamespaceCounts {
        pairs.iter().map(|(ns, c)| (ns.to_string(), *c)).collect()
    }

    fn snapshot() -> Snapshot {
        let mut snap = Snapshot::new();
        snap.insert(id("a", "v1"), counts(&[("x", 3), ("y", -1), ("z", 0), ("w", 3)]));
        snap.insert(id("b", "v2"), counts(&[("x", 1), ("y", 7)]));
        snap
    }

    fn shape(records: &[Record]) -> Vec<(String, String, i64)> {
        records
            .iter()
            .map(|r| (r.identity.kind.clone(), r.namespace.clone(), r.count))
            .collect()
    }

    fn row(kind: &str, ns: &str, count: i64) -> (String, String, i64) {
        (kind.to_string(), ns.to_string(), count)
    }

    #[test]
    fn ascending_within_groups_in_resolution_order() {
        let records = aggregate(
            &snapshot(),
            &[id("b", "v2"), id("a", "v1")],
            &AggregateOptions::default(),
        );
        assert_eq!(
            shape(&records),
            vec![
                row("b", "x", 1),
                row("b", "y", 7),
                row("a", "y", -1),
                row("a", "z", 0),
                row("a", "w", 3),
                row("a", "x", 3),
            ]
        );
    }

    #[test]
    fn descending_keeps_group_order() {
        let options = AggregateOptions {
            order: SortOrder::Descending,
            all_namespaces: false,
        };
        let records = aggregate(&snapshot(), &[id("a", "v1"), id("b", "v2")], &options);
        assert_eq!(
            shape(&records),
            vec![
                row("a", "w", 3),
                row("a", "x", 3),
                row("a", "z", 0),
                row("a", "y", -1),
                row("b", "y", 7),
                row("b", "x", 1),
            ]
        );
    }

    #[test]
    fn all_namespaces_sums_and_keeps_group_version() {
        let options = AggregateOptions {
            order: SortOrder::Ascending,
            all_namespaces: true,
        };
        let records = aggregate(&snapshot(), &[id("a", "v1"), id("b", "v2")], &options);
        assert_eq!(shape(&records), vec![row("a", "", 5), row("b", "", 8)]);
        assert_eq!(records[1].identity.group_version(), "autoscaling/v2");
    }

    #[test]
    fn unobserved_types_and_repeats() {
        let order = [id("c", "v1"), id("b", "v2"), id("b", "v2")];
        let options = AggregateOptions {
            order: SortOrder::Ascending,
            all_namespaces: true,
        };
        let records = aggregate(&snapshot(), &order, &options);
        assert_eq!(shape(&records), vec![row("b", "", 8), row("b", "", 8)]);
    }

    #[test]
    fn sort_order_parsing() {
        assert_eq!("asc".parse::<SortOrder>().unwrap(), SortOrder::Ascending);
        assert_eq!("A".parse::<SortOrder>().unwrap(), SortOrder::Ascending);
        assert_eq!("DESC".parse::<SortOrder>().unwrap(), SortOrder::Descending);
        assert_eq!("d".parse::<SortOrder>().unwrap(), SortOrder::Descending);
        assert!("sideways".parse::<SortOrder>().is_err());
        assert_eq!(SortOrder::Descending.to_string(), "desc");
    }

    #[test]
    fn record_serializes_with_group_version() {
        let record = Record {
            namespace: "kube-system".to_string(),
            identity: ResourceTypeIdentity::new("Pod", "", "v1", "pods"),
            count: 4,
        };
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            serde_json::json!({
                "namespace": "kube-system",
                "kind": "Pod",
                "groupVersion": "v1",
                "count": 4,
            })
        );
    }
}
