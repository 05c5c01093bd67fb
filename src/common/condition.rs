use crate::{common, error};

use aws_sdk_dynamodb::types;
use serde::Serialize;
use serde_dynamo::to_attribute_value;
use std::{collections, ops};

/// Logical operator joining a condition with its left neighbor.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum LogicalOperator {
    /// Logical AND - both sides must be true.
    #[default]
    And,
    /// Logical OR - at least one side must be true.
    Or,
}

impl ops::Deref for LogicalOperator {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
        }
    }
}

/// Comparison applied to one property.
///
/// ```rust
/// use dynamodb_single_table::common::condition;
///
/// let equal = condition::Operation::Equal("active".to_string());
/// let range = condition::Operation::Between(10, 20);
/// let present: condition::Operation<String> = condition::Operation::Exists;
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Operation<T> {
    /// The attribute begins with the given prefix (string attributes only).
    BeginsWith(String),
    /// The attribute is between two values (inclusive).
    Between(T, T),
    /// The attribute contains the given value.
    Contains(T),
    /// The attribute equals the given value.
    Equal(T),
    /// The attribute exists on the item.
    Exists,
    /// The attribute is greater than the given value.
    GreaterThan(T),
    /// The attribute is greater than or equal to the given value.
    GreaterThanOrEqual(T),
    /// The attribute equals one of the given values.
    In(Vec<T>),
    /// The attribute is less than the given value.
    LessThan(T),
    /// The attribute is less than or equal to the given value.
    LessThanOrEqual(T),
    /// The attribute does not contain the given value.
    NotContains(T),
    /// The attribute does not equal the given value.
    NotEqual(T),
    /// The attribute does not exist on the item.
    NotExists,
    /// The attribute equals none of the given values.
    NotIn(Vec<T>),
}

impl<T: Serialize> Operation<T> {
    /// Compile this operation against a property into an expression fragment.
    ///
    /// Placeholders are stable per property and prefix: `Between` binds
    /// `_low`/`_high` suffixes, `In`/`NotIn` bind one `_<position>` suffix per
    /// value, every other value-carrying operation binds the bare root. Reuse
    /// of one property within one prefix therefore reuses its placeholders.
    pub(crate) fn into_fragment(
        self,
        property: &str,
        prefix: &str,
    ) -> error::Result<common::ExpressionFragment> {
        let name = common::name_placeholder(prefix, property);
        let value_root = common::value_placeholder(prefix, property);
        let mut values = collections::HashMap::new();
        let expression = match self {
            Self::BeginsWith(text) => {
                values.insert(value_root.clone(), types::AttributeValue::S(text));
                format!("begins_with({name}, {value_root})")
            }
            Self::Between(low, high) => {
                let low_placeholder = format!("{value_root}_low");
                let high_placeholder = format!("{value_root}_high");
                values.insert(low_placeholder.clone(), to_attribute_value(low)?);
                values.insert(high_placeholder.clone(), to_attribute_value(high)?);
                format!("{name} BETWEEN {low_placeholder} AND {high_placeholder}")
            }
            Self::Contains(value) => {
                values.insert(value_root.clone(), to_attribute_value(value)?);
                format!("contains({name}, {value_root})")
            }
            Self::Equal(value) => {
                values.insert(value_root.clone(), to_attribute_value(value)?);
                format!("{name} = {value_root}")
            }
            Self::Exists => format!("attribute_exists({name})"),
            Self::GreaterThan(value) => {
                values.insert(value_root.clone(), to_attribute_value(value)?);
                format!("{name} > {value_root}")
            }
            Self::GreaterThanOrEqual(value) => {
                values.insert(value_root.clone(), to_attribute_value(value)?);
                format!("{name} >= {value_root}")
            }
            Self::In(entries) => {
                let placeholders = Self::bind_list(&value_root, entries, &mut values)?;
                format!("{name} IN ({placeholders})")
            }
            Self::LessThan(value) => {
                values.insert(value_root.clone(), to_attribute_value(value)?);
                format!("{name} < {value_root}")
            }
            Self::LessThanOrEqual(value) => {
                values.insert(value_root.clone(), to_attribute_value(value)?);
                format!("{name} <= {value_root}")
            }
            Self::NotContains(value) => {
                values.insert(value_root.clone(), to_attribute_value(value)?);
                format!("NOT contains({name}, {value_root})")
            }
            Self::NotEqual(value) => {
                values.insert(value_root.clone(), to_attribute_value(value)?);
                format!("{name} <> {value_root}")
            }
            Self::NotExists => format!("attribute_not_exists({name})"),
            Self::NotIn(entries) => {
                let placeholders = Self::bind_list(&value_root, entries, &mut values)?;
                format!("NOT {name} IN ({placeholders})")
            }
        };
        let names = collections::HashMap::from([(name, property.to_string())]);
        Ok(common::ExpressionFragment {
            expression,
            names,
            values,
        })
    }

    fn bind_list(
        value_root: &str,
        entries: Vec<T>,
        values: &mut collections::HashMap<String, types::AttributeValue>,
    ) -> error::Result<String> {
        let mut placeholders = Vec::with_capacity(entries.len());
        for (position, entry) in entries.into_iter().enumerate() {
            let placeholder = format!("{value_root}_{position}");
            values.insert(placeholder.clone(), to_attribute_value(entry)?);
            placeholders.push(placeholder);
        }
        Ok(placeholders.join(", "))
    }
}

/// One node of a boolean condition tree.
///
/// A node is either a single property comparison or a parenthesized group of
/// further nodes. Each node carries the operator joining it to the node before
/// it; the first node's operator is ignored.
///
/// ```rust
/// use dynamodb_single_table::common::condition::{ConditionNode, Operation};
///
/// let filter = vec![
///     ConditionNode::leaf("status", Operation::Equal("open".to_string())),
///     ConditionNode::group(vec![
///         ConditionNode::leaf("total", Operation::GreaterThan("100".to_string())),
///         ConditionNode::or_leaf("priority", Operation::Equal("high".to_string())),
///     ]),
/// ];
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum ConditionNode<T> {
    /// A single property comparison.
    Leaf {
        /// The property the comparison applies to.
        property: String,
        /// The comparison itself.
        operation: Operation<T>,
        /// How this node joins with the previous sibling.
        join_as: LogicalOperator,
    },
    /// A parenthesized group of nodes.
    Group {
        /// How this group joins with the previous sibling.
        join_as: LogicalOperator,
        /// The nodes inside the parentheses.
        nodes: Vec<ConditionNode<T>>,
    },
}

impl<T> ConditionNode<T> {
    /// A leaf joined to its left neighbor with AND.
    pub fn leaf(property: impl Into<String>, operation: Operation<T>) -> Self {
        Self::Leaf {
            property: property.into(),
            operation,
            join_as: LogicalOperator::And,
        }
    }

    /// A leaf joined to its left neighbor with OR.
    pub fn or_leaf(property: impl Into<String>, operation: Operation<T>) -> Self {
        Self::Leaf {
            property: property.into(),
            operation,
            join_as: LogicalOperator::Or,
        }
    }

    /// A parenthesized group joined to its left neighbor with AND.
    pub fn group(nodes: Vec<Self>) -> Self {
        Self::Group {
            join_as: LogicalOperator::And,
            nodes,
        }
    }

    /// A parenthesized group joined to its left neighbor with OR.
    pub fn or_group(nodes: Vec<Self>) -> Self {
        Self::Group {
            join_as: LogicalOperator::Or,
            nodes,
        }
    }
}

/// Compile a condition tree into an expression fragment under one placeholder
/// prefix.
///
/// Pure: the same nodes and prefix always compile to the same fragment, and
/// nothing is sent anywhere.
pub(crate) fn build_expression<T: Serialize>(
    nodes: Vec<ConditionNode<T>>,
    prefix: &str,
) -> error::Result<common::ExpressionFragment> {
    let mut merged = common::ExpressionFragment::default();
    for node in nodes {
        match node {
            ConditionNode::Leaf {
                property,
                operation,
                join_as,
            } => {
                let fragment = operation.into_fragment(&property, prefix)?;
                merged.append(&join_as, fragment);
            }
            ConditionNode::Group { join_as, nodes } => {
                let mut inner = build_expression(nodes, prefix)?;
                inner.expression = format!("({})", inner.expression);
                merged.append(&join_as, inner);
            }
        }
    }
    Ok(merged)
}

/// Condition applied to the range key of a query's key condition expression.
#[derive(Clone, Debug, PartialEq)]
pub struct SortCondition<T> {
    /// The physical range key attribute name.
    pub name: String,
    /// The comparison to apply to the range key.
    pub operation: Operation<T>,
}

/// Compile a query's key condition: partition equality plus an optional range
/// key comparison.
pub(crate) fn key_condition_fragment<T: Serialize>(
    partition: common::key::Key<T>,
    sort: Option<SortCondition<T>>,
) -> error::Result<common::ExpressionFragment> {
    let mut fragment =
        Operation::Equal(partition.value).into_fragment(&partition.name, common::KEY_PREFIX)?;
    if let Some(sort) = sort {
        let sort_fragment = sort.operation.into_fragment(&sort.name, common::KEY_PREFIX)?;
        fragment.append(&LogicalOperator::And, sort_fragment);
    }
    Ok(fragment)
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;
    use serde_json::{Value, json};

    #[rstest]
    #[case::single_equal(
        vec![
            ConditionNode::leaf(
                "a",
                Operation::Equal(
                    json!("b")
                )
            ),
        ],
        common::ExpressionFragment {
            expression: "#f_a = :f_a".to_string(),
            names: collections::HashMap::from(
                [(
                    "#f_a".to_string(),
                    "a".to_string(),
                )]
            ),
            values: collections::HashMap::from(
                [(
                    ":f_a".to_string(),
                    types::AttributeValue::S(
                        "b".to_string()
                    ),
                )]
            ),
        }
    )]
    #[case::and_pair(
        vec![
            ConditionNode::leaf(
                "a",
                Operation::Equal(
                    json!("b")
                )
            ),
            ConditionNode::leaf(
                "c",
                Operation::GreaterThan(
                    json!(1)
                )
            ),
        ],
        common::ExpressionFragment {
            expression: "#f_a = :f_a AND #f_c > :f_c".to_string(),
            names: collections::HashMap::from(
                [
                    ("#f_a".to_string(), "a".to_string()),
                    ("#f_c".to_string(), "c".to_string()),
                ]
            ),
            values: collections::HashMap::from(
                [
                    (
                        ":f_a".to_string(),
                        types::AttributeValue::S(
                            "b".to_string()
                        )
                    ),
                    (
                        ":f_c".to_string(),
                        types::AttributeValue::N(
                            "1".to_string()
                        )
                    ),
                ]
            ),
        }
    )]
    #[case::between_binds_low_and_high(
        vec![
            ConditionNode::leaf(
                "a",
                Operation::Between(
                    json!(1),
                    json!(10),
                )
            ),
        ],
        common::ExpressionFragment {
            expression: "#f_a BETWEEN :f_a_low AND :f_a_high".to_string(),
            names: collections::HashMap::from(
                [(
                    "#f_a".to_string(),
                    "a".to_string(),
                )]
            ),
            values: collections::HashMap::from(
                [
                    (
                        ":f_a_low".to_string(),
                        types::AttributeValue::N(
                            "1".to_string()
                        )
                    ),
                    (
                        ":f_a_high".to_string(),
                        types::AttributeValue::N(
                            "10".to_string()
                        )
                    ),
                ]
            ),
        }
    )]
    #[case::in_binds_one_placeholder_per_value(
        vec![
            ConditionNode::leaf(
                "a",
                Operation::In(
                    vec![
                        json!("x"),
                        json!("y"),
                    ]
                )
            ),
        ],
        common::ExpressionFragment {
            expression: "#f_a IN (:f_a_0, :f_a_1)".to_string(),
            names: collections::HashMap::from(
                [(
                    "#f_a".to_string(),
                    "a".to_string(),
                )]
            ),
            values: collections::HashMap::from(
                [
                    (
                        ":f_a_0".to_string(),
                        types::AttributeValue::S(
                            "x".to_string()
                        )
                    ),
                    (
                        ":f_a_1".to_string(),
                        types::AttributeValue::S(
                            "y".to_string()
                        )
                    ),
                ]
            ),
        }
    )]
    #[case::not_in_negates(
        vec![
            ConditionNode::leaf(
                "a",
                Operation::NotIn(
                    vec![
                        json!("x"),
                    ]
                )
            ),
        ],
        common::ExpressionFragment {
            expression: "NOT #f_a IN (:f_a_0)".to_string(),
            names: collections::HashMap::from(
                [(
                    "#f_a".to_string(),
                    "a".to_string(),
                )]
            ),
            values: collections::HashMap::from(
                [(
                    ":f_a_0".to_string(),
                    types::AttributeValue::S(
                        "x".to_string()
                    ),
                )]
            ),
        }
    )]
    #[case::exists_binds_no_value(
        vec![
            ConditionNode::leaf(
                "a",
                Operation::<Value>::Exists
            ),
            ConditionNode::or_leaf(
                "b",
                Operation::NotExists
            ),
        ],
        common::ExpressionFragment {
            expression: "attribute_exists(#f_a) OR attribute_not_exists(#f_b)".to_string(),
            names: collections::HashMap::from(
                [
                    ("#f_a".to_string(), "a".to_string()),
                    ("#f_b".to_string(), "b".to_string()),
                ]
            ),
            values: collections::HashMap::new(),
        }
    )]
    #[case::nested_group_parenthesized(
        vec![
            ConditionNode::leaf(
                "a",
                Operation::Equal(
                    json!("b")
                )
            ),
            ConditionNode::group(
                vec![
                    ConditionNode::leaf(
                        "c",
                        Operation::BeginsWith(
                            "d".to_string()
                        )
                    ),
                    ConditionNode::or_leaf(
                        "e",
                        Operation::Contains(
                            json!("f")
                        )
                    ),
                ]
            ),
        ],
        common::ExpressionFragment {
            expression: "#f_a = :f_a AND (begins_with(#f_c, :f_c) OR contains(#f_e, :f_e))"
                .to_string(),
            names: collections::HashMap::from(
                [
                    ("#f_a".to_string(), "a".to_string()),
                    ("#f_c".to_string(), "c".to_string()),
                    ("#f_e".to_string(), "e".to_string()),
                ]
            ),
            values: collections::HashMap::from(
                [
                    (
                        ":f_a".to_string(),
                        types::AttributeValue::S(
                            "b".to_string()
                        )
                    ),
                    (
                        ":f_c".to_string(),
                        types::AttributeValue::S(
                            "d".to_string()
                        )
                    ),
                    (
                        ":f_e".to_string(),
                        types::AttributeValue::S(
                            "f".to_string()
                        )
                    ),
                ]
            ),
        }
    )]
    #[case::group_inside_group(
        vec![
            ConditionNode::group(
                vec![
                    ConditionNode::leaf(
                        "a",
                        Operation::Equal(
                            json!(1)
                        )
                    ),
                    ConditionNode::or_group(
                        vec![
                            ConditionNode::leaf(
                                "b",
                                Operation::LessThan(
                                    json!(2)
                                )
                            ),
                            ConditionNode::leaf(
                                "c",
                                Operation::GreaterThanOrEqual(
                                    json!(3)
                                )
                            ),
                        ]
                    ),
                ]
            ),
        ],
        common::ExpressionFragment {
            expression: "(#f_a = :f_a OR (#f_b < :f_b AND #f_c >= :f_c))".to_string(),
            names: collections::HashMap::from(
                [
                    ("#f_a".to_string(), "a".to_string()),
                    ("#f_b".to_string(), "b".to_string()),
                    ("#f_c".to_string(), "c".to_string()),
                ]
            ),
            values: collections::HashMap::from(
                [
                    (
                        ":f_a".to_string(),
                        types::AttributeValue::N(
                            "1".to_string()
                        )
                    ),
                    (
                        ":f_b".to_string(),
                        types::AttributeValue::N(
                            "2".to_string()
                        )
                    ),
                    (
                        ":f_c".to_string(),
                        types::AttributeValue::N(
                            "3".to_string()
                        )
                    ),
                ]
            ),
        }
    )]
    fn test_build_expression(
        #[case] nodes: Vec<ConditionNode<Value>>,
        #[case] expected: common::ExpressionFragment,
    ) {
        let actual = build_expression(nodes, common::FILTER_PREFIX).unwrap();
        assert_eq!(actual, expected);
    }

    /// Every name referenced in the expression appears in the name map and
    /// every value placeholder appears in the value map.
    #[test]
    fn test_expression_references_resolve() {
        let nodes = vec![
            ConditionNode::leaf("status", Operation::Equal(json!("open"))),
            ConditionNode::leaf("total", Operation::Between(json!(1), json!(9))),
            ConditionNode::or_leaf("tag", Operation::In(vec![json!("a"), json!("b")])),
        ];
        let fragment = build_expression(nodes, common::CONDITION_PREFIX).unwrap();
        for name in fragment.names.keys() {
            assert!(fragment.expression.contains(name.as_str()));
        }
        for value in fragment.values.keys() {
            assert!(fragment.expression.contains(value.as_str()));
        }
    }

    #[test]
    fn test_key_condition_with_sort() {
        let fragment = key_condition_fragment(
            common::key::Key {
                name: "pk".to_string(),
                value: json!("customer#42"),
            },
            Some(SortCondition {
                name: "sk".to_string(),
                operation: Operation::BeginsWith("order#".to_string()),
            }),
        )
        .unwrap();
        assert_eq!(
            fragment.expression,
            "#k_pk = :k_pk AND begins_with(#k_sk, :k_sk)"
        );
    }

    #[test]
    fn test_key_condition_partition_only() {
        let fragment = key_condition_fragment(
            common::key::Key {
                name: "pk".to_string(),
                value: json!("customer#42"),
            },
            None::<SortCondition<Value>>,
        )
        .unwrap();
        assert_eq!(fragment.expression, "#k_pk = :k_pk");
        assert_eq!(
            fragment.values,
            collections::HashMap::from([(
                ":k_pk".to_string(),
                types::AttributeValue::S("customer#42".to_string())
            )])
        );
    }
}
