use crate::{common, error};

use serde::Serialize;
use std::collections;

/// Arguments shared by the multi-item read operations (Query, Scan).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReadArgs<T> {
    /// Whether to use a strongly consistent read.
    ///
    /// `true` for strongly consistent reads, `false` or `None` for eventually
    /// consistent reads.
    pub consistent_read: Option<bool>,
    /// Filter condition applied server-side to the results.
    pub filter: Option<Vec<common::condition::ConditionNode<T>>>,
    /// Secondary index to read instead of the base table.
    pub index_name: Option<String>,
    /// Which attributes to return.
    pub projection: Option<common::projection::Projection>,
    /// The table to read from.
    pub table_name: String,
}

/// Compiled form of [`ReadArgs`]: expressions built, placeholder maps merged.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct ReadInput {
    pub(crate) consistent_read: Option<bool>,
    pub(crate) expression_attribute_names: Option<collections::HashMap<String, String>>,
    pub(crate) expression_attribute_values: Option<common::Attributes>,
    pub(crate) filter_expression: Option<String>,
    pub(crate) index_name: Option<String>,
    pub(crate) projection_expression: Option<String>,
    pub(crate) table_name: String,
}

impl<T: Serialize> TryFrom<ReadArgs<T>> for ReadInput {
    type Error = error::Error;

    fn try_from(read_args: ReadArgs<T>) -> error::Result<Self> {
        let mut expression_attribute_names = None;
        let mut expression_attribute_values = None;
        let filter_expression = read_args
            .filter
            .map(|nodes| common::condition::build_expression(nodes, common::FILTER_PREFIX))
            .transpose()?
            .map(|fragment| {
                fragment.merge_into(
                    &mut expression_attribute_names,
                    &mut expression_attribute_values,
                )
            });
        let projection_expression = read_args.projection.map(|projection| {
            projection
                .into_fragment(common::PROJECTION_PREFIX)
                .merge_into(
                    &mut expression_attribute_names,
                    &mut expression_attribute_values,
                )
        });
        let input = Self {
            consistent_read: read_args.consistent_read,
            expression_attribute_names,
            expression_attribute_values,
            filter_expression,
            index_name: read_args.index_name,
            projection_expression,
            table_name: read_args.table_name,
        };
        Ok(input)
    }
}
