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

//! The per-context message transport.
//!
//! Each execution context owns exactly one physical transport. `send` is
//! fire-and-forget toward a neighboring context; `invoke` is the
//! context→container control path whose results come back asynchronously
//! through the correlation callback registry.

mod channel;

pub use self::channel::{ChannelTransport, MessageChannel};

use crate::envelope::Envelope;

/// The outbound half of a context's messaging.
pub trait Transport {
    /// Fire-and-forget delivery toward the envelope's target context.
    ///
    /// Ordering is preserved per sender only; failures are logged, never
    /// surfaced — a torn-down peer is an expected race.
    fn send(&self, envelope: Envelope);

    /// Control call toward the container.
    ///
    /// Not request/response: correlation happens through an explicit
    /// callback id embedded in the envelope body.
    fn invoke(&self, envelope: Envelope);
}
