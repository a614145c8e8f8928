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

//! Identifier newtypes used across context boundaries.
//!
//! All ids are plain strings on the wire; the newtypes only exist so the
//! logic runtime cannot confuse a session scope with an instance or a
//! stored callback.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps an existing id received over the wire.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The raw string form, as carried in envelope bodies.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id! {
    /// Scopes every envelope to one session (one render surface).
    BridgeId
}

string_id! {
    /// Identifies one live page/component instance inside a session.
    InstanceId
}

string_id! {
    /// Addresses one of a session's independent page stacks ("windows").
    StackId
}

string_id! {
    /// Correlates an `invoke` with its later `triggerCallback`.
    CallbackId
}

impl CallbackId {
    /// Generates a fresh correlation id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = InstanceId::new("m1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"m1\"");
        let back: InstanceId = serde_json::from_str("\"m1\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn generated_callback_ids_differ() {
        assert_ne!(CallbackId::generate(), CallbackId::generate());
    }
}
