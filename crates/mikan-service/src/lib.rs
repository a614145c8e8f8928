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

//! # Mikan Service
//!
//! The logic-context runtime of the mikan mini-program platform. It
//! consumes compiled module blueprints, runs them as live page/component
//! instances, and keeps their data and lifecycle in sync with the render
//! context and the native container through serialized envelopes.
//!
//! The context is single-threaded with run-to-completion semantics: one
//! envelope is handled to completion before the next one is taken, so the
//! engines below never need internal synchronization. All state lives in
//! explicit [`session::Session`] values passed through every engine call;
//! there are no module-level registries.

#![warn(missing_docs)]

pub mod api;
pub mod app;
pub mod blueprint;
pub mod engine;
pub mod error;
pub mod instance;
pub mod scope;
pub mod service;
pub mod session;

pub use error::ServiceError;
pub use scope::SessionScope;
pub use service::Service;
