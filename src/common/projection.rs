use crate::common;

use indexmap::IndexMap;
use std::collections;

/// Which attributes a read should return.
///
/// ```rust
/// use dynamodb_single_table::common::projection;
///
/// let projection = projection::Projection::Attributes(vec![
///     "id".to_string(),
///     "name".to_string(),
/// ]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Projection {
    /// A flat list of top-level attribute names.
    Attributes(Vec<String>),
    /// Nested selection of attributes under hierarchical paths.
    Paths(IndexMap<String, Projection>),
}

impl Projection {
    /// Compile this projection into an expression fragment under one
    /// placeholder prefix.
    pub(crate) fn into_fragment(self, prefix: &str) -> common::ExpressionFragment {
        self.into_fragment_at(&[], prefix)
    }

    fn into_fragment_at(self, path: &[String], prefix: &str) -> common::ExpressionFragment {
        let fragments: Vec<_> = match self {
            Self::Attributes(attributes) => attributes
                .into_iter()
                .map(|attribute| {
                    let placeholder = common::name_placeholder(prefix, &attribute);
                    let mut segments = path.to_vec();
                    segments.push(placeholder.clone());
                    common::ExpressionFragment {
                        expression: segments.join("."),
                        names: collections::HashMap::from([(placeholder, attribute)]),
                        ..Default::default()
                    }
                })
                .collect(),
            Self::Paths(map) => map
                .into_iter()
                .map(|(attribute, nested)| {
                    let placeholder = common::name_placeholder(prefix, &attribute);
                    let mut segments = path.to_vec();
                    segments.push(placeholder.clone());
                    let mut fragment = nested.into_fragment_at(&segments, prefix);
                    fragment.names.insert(placeholder, attribute);
                    fragment
                })
                .collect(),
        };
        common::ExpressionFragment::join(", ", fragments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case::single_attribute(
        Projection::Attributes(
            vec![
                "a".to_string(),
            ]
        ),
        common::ExpressionFragment {
            expression: "#p_a".to_string(),
            names: collections::HashMap::from(
                [
                    ("#p_a".to_string(), "a".to_string()),
                ]
            ),
            ..Default::default()
        }
    )]
    #[case::multiple_attributes(
        Projection::Attributes(
            vec![
                "a".to_string(),
                "b".to_string(),
            ]
        ),
        common::ExpressionFragment {
            expression: "#p_a, #p_b".to_string(),
            names: collections::HashMap::from(
                [
                    ("#p_a".to_string(), "a".to_string()),
                    ("#p_b".to_string(), "b".to_string()),
                ]
            ),
            ..Default::default()
        }
    )]
    #[case::nested_paths(
        Projection::Paths(
            IndexMap::from(
                [
                    (
                        "a".to_string(),
                        Projection::Attributes(
                            vec![
                                "b".to_string(),
                                "c".to_string(),
                            ]
                        )
                    ),
                    (
                        "d".to_string(),
                        Projection::Attributes(
                            vec![
                                "e".to_string(),
                            ]
                        )
                    ),
                ]
            )
        ),
        common::ExpressionFragment {
            expression: "#p_a.#p_b, #p_a.#p_c, #p_d.#p_e".to_string(),
            names: collections::HashMap::from(
                [
                    ("#p_a".to_string(), "a".to_string()),
                    ("#p_b".to_string(), "b".to_string()),
                    ("#p_c".to_string(), "c".to_string()),
                    ("#p_d".to_string(), "d".to_string()),
                    ("#p_e".to_string(), "e".to_string()),
                ]
            ),
            ..Default::default()
        }
    )]
    #[case::paths_inside_paths(
        Projection::Paths(
            IndexMap::from(
                [
                    (
                        "a".to_string(),
                        Projection::Paths(
                            IndexMap::from(
                                [
                                    (
                                        "b".to_string(),
                                        Projection::Attributes(
                                            vec![
                                                "c".to_string(),
                                            ]
                                        )
                                    ),
                                ]
                            )
                        )
                    ),
                ]
            )
        ),
        common::ExpressionFragment {
            expression: "#p_a.#p_b.#p_c".to_string(),
            names: collections::HashMap::from(
                [
                    ("#p_a".to_string(), "a".to_string()),
                    ("#p_b".to_string(), "b".to_string()),
                    ("#p_c".to_string(), "c".to_string()),
                ]
            ),
            ..Default::default()
        }
    )]
    fn test_projection_to_fragment(
        #[case] projection: Projection,
        #[case] expected: common::ExpressionFragment,
    ) {
        let actual = projection.into_fragment(common::PROJECTION_PREFIX);
        assert_eq!(actual, expected);
    }
}
