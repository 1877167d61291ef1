//! Typed model of the dashboard's `ui_state` tree.
//!
//! A published fragment only carries the keys being updated; the backend
//! merges it into the existing aggregate. Every field is therefore optional
//! and skipped when unset.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// A lat/long fix, optionally with altitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub long: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UiValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Position(Position),
}

impl From<bool> for UiValue {
    fn from(value: bool) -> Self {
        UiValue::Bool(value)
    }
}

impl From<f64> for UiValue {
    fn from(value: f64) -> Self {
        UiValue::Number(value)
    }
}

impl From<i64> for UiValue {
    fn from(value: i64) -> Self {
        UiValue::Number(value as f64)
    }
}

impl From<String> for UiValue {
    fn from(value: String) -> Self {
        UiValue::Text(value)
    }
}

impl From<&str> for UiValue {
    fn from(value: &str) -> Self {
        UiValue::Text(value.to_string())
    }
}

impl From<Position> for UiValue {
    fn from(value: Position) -> Self {
        UiValue::Position(value)
    }
}

/// One coloured band on a gauge or graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiRange {
    pub min: f64,
    pub max: f64,
    pub colour: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub show_on_graph: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiLeaf {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_value: Option<UiValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub var_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dec_precision: Option<u32>,
    /// `Some(None)` is sent as an explicit `null` so the merge clears an
    /// icon left by an earlier fragment.
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub status_icon: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranges: Option<Vec<UiRange>>,
}

/// Distinguish an absent key (`None`) from an explicit `null` (`Some(None)`).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl UiLeaf {
    /// Update-only leaf carrying just a value.
    pub fn value(value: impl Into<UiValue>) -> Self {
        UiLeaf {
            current_value: Some(value.into()),
            ..Default::default()
        }
    }

    /// Schema leaf: a named, typed variable.
    pub fn variable(name: &str, display: &str, var_type: &str) -> Self {
        UiLeaf {
            kind: Some("uiVariable".to_string()),
            name: Some(name.to_string()),
            display_string: Some(display.to_string()),
            var_type: Some(var_type.to_string()),
            ..Default::default()
        }
    }

    pub fn with_units(mut self, units: &str) -> Self {
        self.units = Some(units.to_string());
        self
    }

    pub fn with_precision(mut self, dec_precision: u32) -> Self {
        self.dec_precision = Some(dec_precision);
        self
    }

    pub fn with_ranges(mut self, ranges: Vec<UiRange>) -> Self {
        self.ranges = Some(ranges);
        self
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display_string = Some(display.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiContainer {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_string: Option<String>,
    pub children: BTreeMap<String, UiNode>,
}

impl UiContainer {
    pub fn new(kind: &str, name: &str, display: &str) -> Self {
        UiContainer {
            kind: Some(kind.to_string()),
            name: Some(name.to_string()),
            display_string: Some(display.to_string()),
            children: BTreeMap::new(),
        }
    }

    pub fn child(mut self, key: &str, node: impl Into<UiNode>) -> Self {
        self.children.insert(key.to_string(), node.into());
        self
    }

    /// Insert a value-only leaf when `value` is present.
    pub fn set_value<V: Into<UiValue>>(&mut self, key: &str, value: Option<V>) {
        if let Some(value) = value {
            self.children
                .insert(key.to_string(), UiLeaf::value(value).into());
        }
    }
}

/// A node is a container when it has `children`, otherwise a leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UiNode {
    Container(UiContainer),
    Leaf(UiLeaf),
}

impl From<UiLeaf> for UiNode {
    fn from(leaf: UiLeaf) -> Self {
        UiNode::Leaf(leaf)
    }
}

impl From<UiContainer> for UiNode {
    fn from(container: UiContainer) -> Self {
        UiNode::Container(container)
    }
}

/// Body published to the `ui_state` channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiStateFragment {
    pub state: UiNode,
}

impl UiStateFragment {
    /// Fragment updating only the given top-level children.
    pub fn from_children<I>(children: I) -> Self
    where
        I: IntoIterator<Item = (String, UiNode)>,
    {
        UiStateFragment {
            state: UiNode::Container(UiContainer {
                children: children.into_iter().collect(),
                ..Default::default()
            }),
        }
    }

    pub fn from_root(root: UiContainer) -> Self {
        UiStateFragment {
            state: UiNode::Container(root),
        }
    }

    pub fn children(&self) -> Option<&BTreeMap<String, UiNode>> {
        match &self.state {
            UiNode::Container(container) => Some(&container.children),
            UiNode::Leaf(_) => None,
        }
    }

    /// Leaf at the top level of the fragment, if present.
    pub fn leaf(&self, key: &str) -> Option<&UiLeaf> {
        match self.children()?.get(key)? {
            UiNode::Leaf(leaf) => Some(leaf),
            UiNode::Container(_) => None,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
