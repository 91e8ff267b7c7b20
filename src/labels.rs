//! Series label handling
//!
//! A store replica marks the series it returns with one or more replica
//! labels (for example `replica="a"`). Two series that only differ in those
//! labels are the same logical series. [`ReplicaLabels`] splits a label set
//! into identity labels, used for comparison and output, and replica labels,
//! which are stripped.

use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::HashSet;

use crate::proto::Label;

/// The configured set of replica label names
///
/// Empty by default, in which case no deduplication across replicas takes
/// place and every label is an identity label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Vec<String>")]
pub struct ReplicaLabels {
    names: HashSet<String>,
}

impl From<Vec<String>> for ReplicaLabels {
    fn from(names: Vec<String>) -> Self {
        Self::new(names)
    }
}

/// A label set split into identity and replica labels
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionedLabels {
    /// Labels that determine series identity, sorted by name
    pub identity: Vec<Label>,
    /// Replica labels in their input order
    pub replica: Vec<Label>,
}

impl ReplicaLabels {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names
                .into_iter()
                .map(Into::into)
                .filter(|name: &String| !name.is_empty())
                .collect(),
        }
    }

    /// Parse a comma separated list such as `replica,prometheus_replica`
    pub fn from_csv(value: &str) -> Self {
        Self::new(value.split(',').map(str::trim))
    }

    /// Whether replica deduplication is active
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Names in sorted order, for display
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.names.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Split `labels` into identity and replica labels
    pub fn partition(&self, labels: Vec<Label>) -> PartitionedLabels {
        let (mut identity, replica): (Vec<Label>, Vec<Label>) = if self.names.is_empty() {
            (labels, Vec::new())
        } else {
            labels.into_iter().partition(|l| !self.names.contains(&l.name))
        };
        sort_labels(&mut identity);
        PartitionedLabels { identity, replica }
    }
}

/// Sort a label set into canonical order
pub fn sort_labels(labels: &mut [Label]) {
    labels.sort_by(compare_label);
}

fn compare_label(a: &Label, b: &Label) -> Ordering {
    a.name.cmp(&b.name).then_with(|| a.value.cmp(&b.value))
}

/// Total order over sorted label sets
///
/// Labels are compared pairwise by name then value; when one set is a
/// prefix of the other the shorter set sorts first.
pub fn compare_labels(a: &[Label], b: &[Label]) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        match compare_label(x, y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> Vec<Label> {
        pairs.iter().map(|(n, v)| Label::new(*n, *v)).collect()
    }

    #[test]
    fn test_partition_without_replica_labels() {
        let replicas = ReplicaLabels::default();
        let parts = replicas.partition(labels(&[("job", "node"), ("__name__", "up")]));

        assert!(parts.replica.is_empty());
        assert_eq!(parts.identity, labels(&[("__name__", "up"), ("job", "node")]));
    }

    #[test]
    fn test_partition_with_replica_labels() {
        let replicas = ReplicaLabels::from_csv("replica, prometheus_replica");
        let parts = replicas.partition(labels(&[
            ("prometheus_replica", "p1"),
            ("__name__", "up"),
            ("replica", "a"),
            ("instance", "host:9100"),
        ]));

        assert_eq!(
            parts.identity,
            labels(&[("__name__", "up"), ("instance", "host:9100")])
        );
        // Relative input order is kept for replica labels
        assert_eq!(
            parts.replica,
            labels(&[("prometheus_replica", "p1"), ("replica", "a")])
        );
    }

    #[test]
    fn test_from_csv_ignores_empty_entries() {
        let replicas = ReplicaLabels::from_csv("");
        assert!(replicas.is_empty());

        let replicas = ReplicaLabels::from_csv("a,,b,");
        assert_eq!(replicas.len(), 2);
        assert_eq!(replicas.names(), vec!["a", "b"]);
    }

    #[test]
    fn test_compare_labels_total_order() {
        let a = labels(&[("__name__", "up"), ("job", "a")]);
        let b = labels(&[("__name__", "up"), ("job", "b")]);
        let prefix = labels(&[("__name__", "up")]);

        assert_eq!(compare_labels(&a, &a), Ordering::Equal);
        assert_eq!(compare_labels(&a, &b), Ordering::Less);
        assert_eq!(compare_labels(&b, &a), Ordering::Greater);
        assert_eq!(compare_labels(&prefix, &a), Ordering::Less);
        assert_eq!(compare_labels(&[], &prefix), Ordering::Less);
    }

    #[test]
    fn test_name_compared_before_value() {
        let a = labels(&[("a", "z")]);
        let b = labels(&[("b", "a")]);
        assert_eq!(compare_labels(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_deserialize_from_list() {
        let replicas: ReplicaLabels = serde_json::from_str(r#"["replica"]"#).unwrap();
        assert!(replicas.contains("replica"));
    }

    #[test]
    fn test_deserialize_drops_empty_names() {
        let replicas: ReplicaLabels = serde_json::from_str(r#"[""]"#).unwrap();
        assert!(replicas.is_empty());

        let replicas: ReplicaLabels = serde_json::from_str(r#"["", "replica"]"#).unwrap();
        assert_eq!(replicas.names(), vec!["replica"]);
    }
}
