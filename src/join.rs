//! Collection joins.
//!
//! One partition query returns a flat list of heterogeneously typed items.
//! The join engine rebuilds the nested parent/child object graph from that
//! list - pure in-memory transformation, no I/O - guided by a reusable
//! [`Join`] tree built once at schema-definition time.
//!
//! Three strategies pick a parent's candidate children:
//!
//! - [`JoinStrategy::ByType`]: every item of the child type, wherever it sits.
//!   Right when the partition holds one parent, or children are shared.
//! - [`JoinStrategy::Position`]: everything between the parent and its next
//!   same-typed sibling in the sorted result. The natural consequence of
//!   lexicographically sorted range keys under single-table design.
//! - [`JoinStrategy::Resolver`]: a caller predicate over (parent, candidate),
//!   for many-parents partitions that need custom matching.

use crate::common::key::TableLayout;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::{cmp, fmt, sync::Arc};

/// How many children a join attaches.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Cardinality {
    /// Attach the first matching child, or nothing at all when none match.
    #[default]
    Single,
    /// Attach every matching child as a list, empty when none match.
    Multiple,
}

/// Caller predicate deciding whether a candidate belongs to a parent.
pub type Resolver = Arc<dyn Fn(&Map<String, Value>, &Map<String, Value>) -> bool + Send + Sync>;

/// Caller ordering for the children of a `Multiple` join.
pub type Sorter = Arc<dyn Fn(&Value, &Value) -> cmp::Ordering + Send + Sync>;

/// Caller mapping from a matched raw child to its exposed shape.
pub type Extractor = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// How a join picks its candidate children.
#[derive(Clone, Default)]
pub enum JoinStrategy {
    /// Every item of the child type is a candidate.
    ByType,
    /// Items between the parent and its next same-typed sibling, relying on
    /// the store's sort order within one partition.
    #[default]
    Position,
    /// Items of the child type for which the predicate holds.
    Resolver(Resolver),
}

impl fmt::Debug for JoinStrategy {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByType => formatter.write_str("ByType"),
            Self::Position => formatter.write_str("Position"),
            Self::Resolver(_) => formatter.write_str("Resolver(..)"),
        }
    }
}

/// One edge of the join tree: which children to attach to a parent, under
/// which key, and how.
///
/// Built once per schema and shared read-only across calls.
#[derive(Clone, Default)]
pub struct Join {
    /// How many children to attach.
    pub cardinality: Cardinality,
    /// The type discriminator of the children.
    pub child_type: String,
    /// Maps each matched raw child to its exposed shape, before internal
    /// attributes are stripped.
    pub extractor: Option<Extractor>,
    /// The key the children are attached under on the parent.
    pub name: String,
    /// Joins applied to each attached child in turn.
    pub nested: Vec<Join>,
    /// Re-sorts the children of a `Multiple` join; the sort is stable and
    /// works on a copy, the source list is never reordered.
    pub sorter: Option<Sorter>,
    /// How candidates are picked.
    pub strategy: JoinStrategy,
}

impl Join {
    /// A `Single` join under the given key, positional by default.
    pub fn single(name: impl Into<String>, child_type: impl Into<String>) -> Self {
        Self {
            cardinality: Cardinality::Single,
            child_type: child_type.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// A `Multiple` join under the given key, positional by default.
    pub fn multiple(name: impl Into<String>, child_type: impl Into<String>) -> Self {
        Self {
            cardinality: Cardinality::Multiple,
            child_type: child_type.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}

impl fmt::Debug for Join {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Join")
            .field("name", &self.name)
            .field("child_type", &self.child_type)
            .field("cardinality", &self.cardinality)
            .field("strategy", &self.strategy)
            .field("sorter", &self.sorter.is_some())
            .field("extractor", &self.extractor.is_some())
            .field("nested", &self.nested)
            .finish()
    }
}

/// The join engine for one table layout.
#[derive(Clone, Copy, Debug)]
pub struct CollectionJoin<'a> {
    layout: &'a TableLayout,
}

impl<'a> CollectionJoin<'a> {
    /// An engine reading partition, range and type attributes per the layout.
    pub fn new(layout: &'a TableLayout) -> Self {
        Self { layout }
    }

    /// Rebuild the object graph around the first item of the start type.
    ///
    /// `None` when no item of the start type exists - absence is
    /// distinguishable from an empty join result.
    pub fn single(&self, items: &[Value], start_type: &str, joins: &[Join]) -> Option<Value> {
        let by_type = self.group_by_type(items);
        let start = by_type.get(start_type)?.first().copied()?;
        let mut assembled = self.attach(items, &by_type, start, joins);
        self.strip(&mut assembled);
        Some(assembled)
    }

    /// Rebuild one object graph per item of the start type, in store order.
    pub fn multiple(&self, items: &[Value], start_type: &str, joins: &[Join]) -> Vec<Value> {
        let by_type = self.group_by_type(items);
        let starts = by_type.get(start_type).cloned().unwrap_or_default();
        starts
            .into_iter()
            .map(|start| {
                let mut assembled = self.attach(items, &by_type, start, joins);
                self.strip(&mut assembled);
                assembled
            })
            .collect()
    }

    /// Group items by their type attribute, preserving relative order.
    fn group_by_type<'i>(&self, items: &'i [Value]) -> IndexMap<String, Vec<&'i Map<String, Value>>> {
        let mut by_type: IndexMap<String, Vec<&Map<String, Value>>> = IndexMap::new();
        for item in items {
            if let Value::Object(object) = item {
                if let Some(Value::String(kind)) = object.get(&self.layout.type_attribute) {
                    by_type.entry(kind.clone()).or_default().push(object);
                }
            }
        }
        by_type
    }

    fn attach(
        &self,
        items: &[Value],
        by_type: &IndexMap<String, Vec<&Map<String, Value>>>,
        parent: &Map<String, Value>,
        joins: &[Join],
    ) -> Value {
        let mut assembled = parent.clone();
        for join in joins {
            let candidates: Vec<&Map<String, Value>> = match &join.strategy {
                JoinStrategy::ByType => by_type.get(&join.child_type).cloned().unwrap_or_default(),
                JoinStrategy::Resolver(resolver) => by_type
                    .get(&join.child_type)
                    .map(|children| {
                        children
                            .iter()
                            .copied()
                            .filter(|child| resolver(parent, child))
                            .collect()
                    })
                    .unwrap_or_default(),
                JoinStrategy::Position => {
                    self.position_candidates(items, parent, &join.child_type)
                }
            };
            match join.cardinality {
                Cardinality::Single => {
                    // no candidate: the key stays absent, not null
                    if let Some(child) = candidates.first() {
                        let value = self.resolve_child(items, by_type, child, join);
                        assembled.insert(join.name.clone(), value);
                    }
                }
                Cardinality::Multiple => {
                    let mut children: Vec<Value> = candidates
                        .iter()
                        .map(|child| self.resolve_child(items, by_type, child, join))
                        .collect();
                    if let Some(sorter) = &join.sorter {
                        children.sort_by(|left, right| sorter(left, right));
                    }
                    assembled.insert(join.name.clone(), Value::Array(children));
                }
            }
        }
        Value::Object(assembled)
    }

    /// Extract, then nest. A non-object extraction passes through unchanged
    /// and takes no nested joins; nested joins always search the full item
    /// list, never the already-filtered children.
    fn resolve_child(
        &self,
        items: &[Value],
        by_type: &IndexMap<String, Vec<&Map<String, Value>>>,
        child: &Map<String, Value>,
        join: &Join,
    ) -> Value {
        let raw = Value::Object(child.clone());
        let extracted = match &join.extractor {
            Some(extractor) => extractor(raw),
            None => raw,
        };
        match extracted {
            Value::Object(object) => self.attach(items, by_type, &object, &join.nested),
            other => other,
        }
    }

    /// Everything between the parent and its next same-typed sibling belongs
    /// to the parent. A parent whose range attribute is empty or missing is a
    /// synthetic root anchored at index 0. Linear scan per parent.
    fn position_candidates<'i>(
        &self,
        items: &'i [Value],
        parent: &Map<String, Value>,
        child_type: &str,
    ) -> Vec<&'i Map<String, Value>> {
        let parent_type = Self::text(parent.get(&self.layout.type_attribute));
        let range_empty = match parent.get(&self.layout.range_attribute) {
            None | Some(Value::Null) => true,
            Some(Value::String(text)) => text.is_empty(),
            _ => false,
        };
        let start = if range_empty {
            0
        } else {
            items
                .iter()
                .position(|item| self.is_same_item(item, parent))
                .unwrap_or(0)
        };
        let mut end = items.len();
        for (position, item) in items.iter().enumerate().skip(start + 1) {
            if let Value::Object(object) = item {
                if parent_type.is_some()
                    && Self::text(object.get(&self.layout.type_attribute)) == parent_type
                {
                    end = position;
                    break;
                }
            }
        }
        items[start..end]
            .iter()
            .filter_map(|item| match item {
                Value::Object(object)
                    if Self::text(object.get(&self.layout.type_attribute))
                        == Some(child_type) =>
                {
                    Some(object)
                }
                _ => None,
            })
            .collect()
    }

    fn is_same_item(&self, item: &Value, parent: &Map<String, Value>) -> bool {
        let Value::Object(object) = item else {
            return false;
        };
        object.get(&self.layout.partition_attribute)
            == parent.get(&self.layout.partition_attribute)
            && object.get(&self.layout.range_attribute) == parent.get(&self.layout.range_attribute)
    }

    /// Remove the layout's internal attributes from every object node,
    /// recursively. Non-object, non-array values pass through untouched.
    fn strip(&self, value: &mut Value) {
        match value {
            Value::Object(object) => {
                object.remove(&self.layout.partition_attribute);
                object.remove(&self.layout.range_attribute);
                if !self.layout.retain_type {
                    object.remove(&self.layout.type_attribute);
                }
                for child in object.values_mut() {
                    self.strip(child);
                }
            }
            Value::Array(entries) => {
                for entry in entries {
                    self.strip(entry);
                }
            }
            _ => {}
        }
    }

    fn text(value: Option<&Value>) -> Option<&str> {
        value.and_then(Value::as_str)
    }
}
