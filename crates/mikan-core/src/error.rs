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

//! Error types for the wire-level contracts.

use std::fmt;

/// An error while parsing or applying a data path such as `a.b[2].c`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The path string was empty.
    Empty,
    /// A bracket segment did not contain a valid array index.
    InvalidIndex {
        /// The offending segment text.
        segment: String,
    },
    /// The path text could not be tokenized.
    Malformed {
        /// The full path that failed to parse.
        path: String,
    },
    /// The path walked into a value of the wrong shape, e.g. indexing
    /// into a string.
    TypeMismatch {
        /// The full path that was being applied.
        path: String,
    },
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::Empty => write!(f, "empty data path"),
            PathError::InvalidIndex { segment } => {
                write!(f, "invalid array index in data path segment '{segment}'")
            }
            PathError::Malformed { path } => write!(f, "malformed data path '{path}'"),
            PathError::TypeMismatch { path } => {
                write!(f, "data path '{path}' does not match the value shape")
            }
        }
    }
}

impl std::error::Error for PathError {}
