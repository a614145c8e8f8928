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

//! # Mikan Core
//!
//! Wire-level contracts shared by every mikan execution context: the
//! message envelope, context/instance identifiers, property type tags,
//! data-path utilities, the transport abstraction and the correlation
//! callback registry.
//!
//! The three execution contexts (logic, render, container) share no
//! memory; everything they exchange is an [`Envelope`] carried over a
//! [`Transport`]. This crate deliberately knows nothing about instances,
//! lifecycles or sessions — those live in `mikan-service`.

#![warn(missing_docs)]

pub mod callback;
pub mod envelope;
pub mod error;
pub mod id;
pub mod path;
pub mod property;
pub mod transport;

pub use envelope::{Envelope, MessageTarget};
pub use id::{BridgeId, CallbackId, InstanceId, StackId};
pub use transport::Transport;
