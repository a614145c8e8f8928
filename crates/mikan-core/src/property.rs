// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Property type tags carried on the wire.
//!
//! Declared component properties travel as single-character codes instead
//! of richer descriptors to keep the cross-context payload small.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A declared property type, serialized as its one-character code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyTag {
    /// `s`
    #[serde(rename = "s")]
    String,
    /// `n`
    #[serde(rename = "n")]
    Number,
    /// `b`
    #[serde(rename = "b")]
    Boolean,
    /// `o`
    #[serde(rename = "o")]
    Object,
    /// `a`
    #[serde(rename = "a")]
    Array,
    /// `f`
    #[serde(rename = "f")]
    Function,
}

impl PropertyTag {
    /// The one-character wire code.
    #[must_use]
    pub fn code(self) -> char {
        match self {
            PropertyTag::String => 's',
            PropertyTag::Number => 'n',
            PropertyTag::Boolean => 'b',
            PropertyTag::Object => 'o',
            PropertyTag::Array => 'a',
            PropertyTag::Function => 'f',
        }
    }

    /// Parses a wire code; `None` for unknown codes.
    #[must_use]
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            's' => Some(PropertyTag::String),
            'n' => Some(PropertyTag::Number),
            'b' => Some(PropertyTag::Boolean),
            'o' => Some(PropertyTag::Object),
            'a' => Some(PropertyTag::Array),
            'f' => Some(PropertyTag::Function),
            _ => None,
        }
    }
}

/// One property entry inside a `firstRender` initial-props map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireProperty {
    /// Accepted types, primary type first.
    #[serde(rename = "type")]
    pub types: Vec<PropertyTag>,
    /// Default value taken from the blueprint, if declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Marks an external class rather than a data property.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cls: bool,
}

impl WireProperty {
    /// An external-class entry: string typed, flagged `cls`.
    #[must_use]
    pub fn external_class() -> Self {
        Self {
            types: vec![PropertyTag::String],
            default: None,
            cls: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tags_round_trip_codes() {
        for tag in [
            PropertyTag::String,
            PropertyTag::Number,
            PropertyTag::Boolean,
            PropertyTag::Object,
            PropertyTag::Array,
            PropertyTag::Function,
        ] {
            assert_eq!(PropertyTag::from_code(tag.code()), Some(tag));
        }
        assert_eq!(PropertyTag::from_code('x'), None);
    }

    #[test]
    fn wire_property_serializes_compactly() {
        let prop = WireProperty {
            types: vec![PropertyTag::Number],
            default: Some(json!(0)),
            cls: false,
        };
        assert_eq!(
            serde_json::to_value(&prop).unwrap(),
            json!({ "type": ["n"], "default": 0 })
        );
    }

    #[test]
    fn external_class_entry_is_flagged() {
        let prop = WireProperty::external_class();
        assert_eq!(
            serde_json::to_value(&prop).unwrap(),
            json!({ "type": ["s"], "cls": true })
        );
    }
}
