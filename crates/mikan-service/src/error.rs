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

//! Runtime errors of the logic context.
//!
//! Most of these are expected cross-context races (a message arriving for
//! an instance that already detached) and are logged-and-dropped at the
//! envelope boundary rather than propagated.

use mikan_core::error::PathError;
use thiserror::Error;

/// An error raised while handling a logic-context operation.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No blueprint registered under the requested path.
    #[error("module '{0}' is not registered")]
    ModuleNotFound(String),

    /// The envelope referenced a session this context does not host.
    #[error("unknown session '{0}'")]
    SessionNotFound(String),

    /// The envelope referenced an instance that does not exist (any more).
    #[error("instance '{0}' does not exist")]
    InstanceNotFound(String),

    /// A view event named a method the instance does not declare.
    #[error("method '{method}' not found on instance '{instance}'")]
    MethodNotFound {
        /// The addressed instance.
        instance: String,
        /// The missing method name.
        method: String,
    },

    /// The envelope body did not deserialize into the expected shape.
    #[error("malformed '{kind}' message")]
    MalformedMessage {
        /// The envelope type tag.
        kind: String,
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// A `setData` patch key failed to parse or apply.
    #[error(transparent)]
    Path(#[from] PathError),
}
