use crate::{common, error};

use serde::Serialize;
use std::collections;

/// Arguments shared by all write operations (Put, Update, Delete).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteArgs<T> {
    /// Condition that must hold for the operation to succeed.
    ///
    /// When the condition evaluates false the store rejects the write with a
    /// conditional check failure.
    pub condition: Option<Vec<common::condition::ConditionNode<T>>>,
    /// The table to write to.
    pub table_name: String,
}

/// Compiled form of [`WriteArgs`]: condition built, placeholder maps merged.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct WriteInput {
    pub(crate) condition_expression: Option<String>,
    pub(crate) expression_attribute_names: Option<collections::HashMap<String, String>>,
    pub(crate) expression_attribute_values: Option<common::Attributes>,
    pub(crate) table_name: String,
}

impl WriteInput {
    /// Merge a further expression fragment into this input's placeholder maps,
    /// returning its expression string.
    pub(crate) fn merge_expression(&mut self, fragment: common::ExpressionFragment) -> String {
        fragment.merge_into(
            &mut self.expression_attribute_names,
            &mut self.expression_attribute_values,
        )
    }
}

impl<T: Serialize> TryFrom<WriteArgs<T>> for WriteInput {
    type Error = error::Error;

    fn try_from(write_args: WriteArgs<T>) -> error::Result<Self> {
        let mut expression_attribute_names = None;
        let mut expression_attribute_values = None;
        let condition_expression = write_args
            .condition
            .map(|nodes| common::condition::build_expression(nodes, common::CONDITION_PREFIX))
            .transpose()?
            .map(|fragment| {
                fragment.merge_into(
                    &mut expression_attribute_names,
                    &mut expression_attribute_values,
                )
            });
        let input = Self {
            condition_expression,
            expression_attribute_names,
            expression_attribute_values,
            table_name: write_args.table_name,
        };
        Ok(input)
    }
}
