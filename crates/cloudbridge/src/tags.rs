//! Tag normalization and delta computation
//!
//! Vendors return tags as maps, as lists of `{Key, Value}` structs under
//! several spellings, or as parallel key/value lists. All of them become a
//! [`Tags`] map here. [`TagDelta`] turns "current" and "desired" maps into
//! the remove/add calls a vendor needs.

use crate::error::{CloudError, Result};
use crate::resource::Tags;
use serde::Deserialize;
use std::future::Future;

/// One tag in list-of-struct form
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TagEntry {
    #[serde(alias = "Key", alias = "TagKey", alias = "tagKey")]
    pub key: String,
    #[serde(default, alias = "Value", alias = "TagValue", alias = "tagValue")]
    pub value: String,
}

/// Build tags from `{key, value}` entries; later duplicates win
pub fn from_entries<I>(entries: I) -> Tags
where
    I: IntoIterator<Item = TagEntry>,
{
    entries
        .into_iter()
        .map(|entry| (entry.key, entry.value))
        .collect()
}

/// Build tags from parallel key and value lists
pub fn from_pairs<K, V>(keys: &[K], values: &[V]) -> Result<Tags>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    if keys.len() != values.len() {
        return Err(CloudError::InputParameter(format!(
            "{} tag keys but {} values",
            keys.len(),
            values.len()
        )));
    }
    Ok(keys
        .iter()
        .zip(values)
        .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
        .collect())
}

/// Normalize a raw vendor tag payload (map, entry list or null)
pub fn normalize(raw: &serde_json::Value) -> Result<Tags> {
    match raw {
        serde_json::Value::Null => Ok(Tags::new()),
        serde_json::Value::Object(map) => Ok(map
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    serde_json::Value::String(s) => s.clone(),
                    serde_json::Value::Null => String::new(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect()),
        serde_json::Value::Array(_) => {
            let entries: Vec<TagEntry> = serde_json::from_value(raw.clone())?;
            Ok(from_entries(entries))
        }
        other => Err(CloudError::InputParameter(format!(
            "unsupported tag payload: {}",
            other
        ))),
    }
}

/// Keys a vendor reserves for itself
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagPolicy {
    /// Keys with these prefixes cannot be set or removed by callers
    pub reserved_prefixes: Vec<String>,
    /// Keys callers may overwrite but never remove
    pub protected_keys: Vec<String>,
}

impl TagPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reserve_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.reserved_prefixes.push(prefix.into());
        self
    }

    pub fn protect_key(mut self, key: impl Into<String>) -> Self {
        self.protected_keys.push(key.into());
        self
    }

    pub fn is_reserved(&self, key: &str) -> bool {
        self.reserved_prefixes
            .iter()
            .any(|prefix| key.starts_with(prefix.as_str()))
    }

    fn may_remove(&self, key: &str) -> bool {
        !self.is_reserved(key) && !self.protected_keys.iter().any(|k| k == key)
    }

    /// Split vendor tags into (user tags, system tags)
    pub fn split(&self, tags: Tags) -> (Tags, Tags) {
        tags.into_iter().partition(|(k, _)| !self.is_reserved(k))
    }

    /// Reject desired tags that use a reserved prefix
    pub fn check(&self, desired: &Tags) -> Result<()> {
        let mut reserved: Vec<&str> = desired
            .keys()
            .map(String::as_str)
            .filter(|k| self.is_reserved(k))
            .collect();
        if reserved.is_empty() {
            return Ok(());
        }
        reserved.sort_unstable();
        Err(CloudError::NotSupported(format!(
            "reserved tag keys: {}",
            reserved.join(", ")
        )))
    }
}

/// Tags to remove and add to turn one tag set into another
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDelta {
    /// Keys to remove, with their current values
    pub removed: Tags,
    /// Keys to add or overwrite, with their desired values
    pub added: Tags,
}

impl TagDelta {
    /// Changed keys are removed (old value) and added (new value). With
    /// `replace`, keys missing from `desired` are removed as well;
    /// otherwise they are left alone.
    pub fn compute(current: &Tags, desired: &Tags, replace: bool) -> Self {
        let mut delta = Self::default();

        for (key, value) in desired {
            match current.get(key) {
                Some(old) if old == value => {}
                Some(old) => {
                    delta.removed.insert(key.clone(), old.clone());
                    delta.added.insert(key.clone(), value.clone());
                }
                None => {
                    delta.added.insert(key.clone(), value.clone());
                }
            }
        }

        if replace {
            for (key, value) in current {
                if !desired.contains_key(key) {
                    delta.removed.insert(key.clone(), value.clone());
                }
            }
        }

        delta
    }

    /// [`TagDelta::compute`] under a vendor policy: reserved keys in
    /// `desired` are rejected, reserved and protected keys are never removed.
    pub fn plan(current: &Tags, desired: &Tags, replace: bool, policy: &TagPolicy) -> Result<Self> {
        policy.check(desired)?;
        let mut delta = Self::compute(current, desired, replace);
        delta.removed.retain(|key, _| policy.may_remove(key));
        Ok(delta)
    }

    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }

    pub fn removed_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.removed.keys().cloned().collect();
        keys.sort();
        keys
    }
}

/// Issue the remove call then the add call of `delta`, skipping either when
/// it has nothing to do.
pub async fn apply_tag_delta<RF, RFut, AF, AFut>(delta: &TagDelta, remove: RF, add: AF) -> Result<()>
where
    RF: FnOnce(Tags) -> RFut,
    RFut: Future<Output = Result<()>>,
    AF: FnOnce(Tags) -> AFut,
    AFut: Future<Output = Result<()>>,
{
    if !delta.removed.is_empty() {
        tracing::debug!("removing tags {:?}", delta.removed_keys());
        remove(delta.removed.clone()).await?;
    }
    if !delta.added.is_empty() {
        tracing::debug!("adding {} tags", delta.added.len());
        add(delta.added.clone()).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::cell::RefCell;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_replace_delta() {
        let current = tags(&[("a", "1"), ("c", "3")]);
        let desired = tags(&[("a", "1"), ("b", "2")]);

        let delta = TagDelta::compute(&current, &desired, true);

        assert_eq!(delta.added, tags(&[("b", "2")]));
        assert_eq!(delta.removed, tags(&[("c", "3")]));
    }

    #[test]
    fn test_merge_keeps_unlisted_keys() {
        let current = tags(&[("a", "1"), ("c", "3")]);
        let desired = tags(&[("b", "2")]);

        let delta = TagDelta::compute(&current, &desired, false);

        assert_eq!(delta.added, tags(&[("b", "2")]));
        assert!(delta.removed.is_empty());
    }

    #[test]
    fn test_changed_value_is_removed_and_added() {
        let current = tags(&[("env", "dev")]);
        let desired = tags(&[("env", "prod")]);

        let delta = TagDelta::compute(&current, &desired, false);

        assert_eq!(delta.removed, tags(&[("env", "dev")]));
        assert_eq!(delta.added, tags(&[("env", "prod")]));
    }

    #[test]
    fn test_same_tags_are_a_no_op() {
        let current = tags(&[("a", "1"), ("b", "2")]);

        assert!(TagDelta::compute(&current, &current, true).is_empty());
        assert!(TagDelta::compute(&current, &current, false).is_empty());
    }

    #[test]
    fn test_policy_rejects_reserved_keys() {
        let policy = TagPolicy::new().reserve_prefix("aws:");
        let desired = tags(&[("aws:cloudformation:stack", "x"), ("team", "infra")]);

        let err = TagDelta::plan(&Tags::new(), &desired, false, &policy).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotSupported);
        assert!(err.to_string().contains("aws:cloudformation:stack"));
    }

    #[test]
    fn test_policy_never_removes_protected_keys() {
        let policy = TagPolicy::new().reserve_prefix("aws:").protect_key("Name");
        let current = tags(&[("Name", "web-1"), ("aws:autoscaling", "g1"), ("old", "x")]);
        let desired = tags(&[("Name", "web-2")]);

        let delta = TagDelta::plan(&current, &desired, true, &policy).unwrap();

        assert_eq!(delta.removed, tags(&[("old", "x")]));
        assert_eq!(delta.added, tags(&[("Name", "web-2")]));
    }

    #[test]
    fn test_policy_split() {
        let policy = TagPolicy::new().reserve_prefix("volc:");
        let (user, sys) = policy.split(tags(&[("volc:project", "p"), ("team", "a")]));

        assert_eq!(user, tags(&[("team", "a")]));
        assert_eq!(sys, tags(&[("volc:project", "p")]));
    }

    #[test]
    fn test_normalize_shapes() {
        let list = serde_json::json!([
            {"Key": "a", "Value": "1"},
            {"TagKey": "b", "TagValue": "2"},
            {"key": "c", "value": "3"},
            {"Key": "d"}
        ]);
        assert_eq!(
            normalize(&list).unwrap(),
            tags(&[("a", "1"), ("b", "2"), ("c", "3"), ("d", "")])
        );

        let map = serde_json::json!({"a": "1", "n": 5});
        assert_eq!(normalize(&map).unwrap(), tags(&[("a", "1"), ("n", "5")]));

        assert!(normalize(&serde_json::Value::Null).unwrap().is_empty());
        assert!(normalize(&serde_json::json!("a=1")).is_err());
    }

    #[test]
    fn test_from_pairs() {
        let parsed = from_pairs(&["a", "b"], &["1", "2"]).unwrap();
        assert_eq!(parsed, tags(&[("a", "1"), ("b", "2")]));

        let err = from_pairs(&["a"], &["1", "2"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputParameter);
    }

    #[tokio::test]
    async fn test_apply_removes_before_adding() {
        let calls = RefCell::new(Vec::new());
        let delta = TagDelta::compute(
            &tags(&[("env", "dev"), ("gone", "x")]),
            &tags(&[("env", "prod")]),
            true,
        );

        apply_tag_delta(
            &delta,
            |removed| {
                calls.borrow_mut().push(format!("remove {}", removed.len()));
                async { Ok(()) }
            },
            |added| {
                calls.borrow_mut().push(format!("add {}", added.len()));
                async { Ok(()) }
            },
        )
        .await
        .unwrap();

        assert_eq!(*calls.borrow(), vec!["remove 2", "add 1"]);
    }

    #[tokio::test]
    async fn test_apply_skips_empty_calls() {
        let calls = RefCell::new(Vec::new());
        let delta = TagDelta::compute(&tags(&[("a", "1")]), &tags(&[("a", "1"), ("b", "2")]), false);

        apply_tag_delta(
            &delta,
            |_| {
                calls.borrow_mut().push("remove");
                async { Ok(()) }
            },
            |_| {
                calls.borrow_mut().push("add");
                async { Ok(()) }
            },
        )
        .await
        .unwrap();

        assert_eq!(*calls.borrow(), vec!["add"]);
    }
}
