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

//! The application singleton.
//!
//! One app lives per logic context, across every session. `onLaunch`
//! fires exactly once, on the first page load after the app bundle
//! installs; `onShow`/`onHide` follow the container's foreground state.

use crate::scope::SessionScope;
use serde_json::Value;
use std::rc::Rc;

/// An app-level hook receiving its JSON payload (launch/show options).
pub type AppHookFn = Rc<dyn Fn(&mut SessionScope<'_>, Value) -> anyhow::Result<()>>;

/// The app-level error sink. Infallible; last resort before the log.
pub type AppErrorFn = Rc<dyn Fn(&mut SessionScope<'_>, &anyhow::Error)>;

/// Builder for the application module, mirroring the `App(spec)`
/// registration call.
#[derive(Default)]
pub struct AppSpec {
    pub(crate) global_data: Value,
    pub(crate) on_launch: Option<AppHookFn>,
    pub(crate) on_show: Option<AppHookFn>,
    pub(crate) on_hide: Option<AppHookFn>,
    pub(crate) on_error: Option<AppErrorFn>,
}

impl AppSpec {
    /// An empty app spec.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the initial global data.
    #[must_use]
    pub fn global_data(mut self, data: Value) -> Self {
        self.global_data = data;
        self
    }

    /// Sets `onLaunch`.
    #[must_use]
    pub fn on_launch<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut SessionScope<'_>, Value) -> anyhow::Result<()> + 'static,
    {
        self.on_launch = Some(Rc::new(f));
        self
    }

    /// Sets `onShow`.
    #[must_use]
    pub fn on_show<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut SessionScope<'_>, Value) -> anyhow::Result<()> + 'static,
    {
        self.on_show = Some(Rc::new(f));
        self
    }

    /// Sets `onHide`.
    #[must_use]
    pub fn on_hide<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut SessionScope<'_>, Value) -> anyhow::Result<()> + 'static,
    {
        self.on_hide = Some(Rc::new(f));
        self
    }

    /// Sets `onError`, the app-level error sink.
    #[must_use]
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut SessionScope<'_>, &anyhow::Error) + 'static,
    {
        self.on_error = Some(Rc::new(f));
        self
    }
}

/// The composed, immutable app module.
pub struct AppBlueprint {
    pub(crate) initial_global_data: Value,
    pub(crate) on_launch: Option<AppHookFn>,
    pub(crate) on_show: Option<AppHookFn>,
    pub(crate) on_hide: Option<AppHookFn>,
    pub(crate) on_error: Option<AppErrorFn>,
}

impl AppBlueprint {
    pub(crate) fn from_spec(spec: AppSpec) -> Self {
        Self {
            initial_global_data: spec.global_data,
            on_launch: spec.on_launch,
            on_show: spec.on_show,
            on_hide: spec.on_hide,
            on_error: spec.on_error,
        }
    }
}

/// The live application: blueprint plus mutable global data and the
/// launched flag.
pub struct AppInstance {
    blueprint: Rc<AppBlueprint>,
    /// Mutable app-global state, shared across sessions.
    pub global_data: Value,
    launched: bool,
}

impl AppInstance {
    /// Instantiates the app from its blueprint. Does not launch.
    #[must_use]
    pub fn new(blueprint: Rc<AppBlueprint>) -> Self {
        let global_data = blueprint.initial_global_data.clone();
        Self {
            blueprint,
            global_data,
            launched: false,
        }
    }

    /// `true` once `onLaunch` has run.
    #[must_use]
    pub fn launched(&self) -> bool {
        self.launched
    }

    /// Runs `onLaunch` followed by `onShow`, once. Subsequent calls are
    /// a no-op; foreground transitions use [`AppInstance::show`].
    pub fn launch(&mut self, scope: &mut SessionScope<'_>, options: Value) {
        if self.launched {
            return;
        }
        self.launched = true;
        log::info!("app launch: {options}");
        if let Some(hook) = self.blueprint.on_launch.clone() {
            let result = hook(scope, options.clone());
            self.contain(scope, result);
        }
        if let Some(hook) = self.blueprint.on_show.clone() {
            let result = hook(scope, options);
            self.contain(scope, result);
        }
    }

    /// Runs `onShow` for a foreground transition.
    pub fn show(&mut self, scope: &mut SessionScope<'_>, options: Value) {
        if !self.launched {
            return;
        }
        if let Some(hook) = self.blueprint.on_show.clone() {
            let result = hook(scope, options);
            self.contain(scope, result);
        }
    }

    /// Runs `onHide` for a background transition.
    pub fn hide(&mut self, scope: &mut SessionScope<'_>) {
        if !self.launched {
            return;
        }
        if let Some(hook) = self.blueprint.on_hide.clone() {
            let result = hook(scope, Value::Null);
            self.contain(scope, result);
        }
    }

    /// Routes a caught user-code error to `onError`, or the log.
    pub fn contain(&self, scope: &mut SessionScope<'_>, result: anyhow::Result<()>) {
        let Err(err) = result else { return };
        match self.blueprint.on_error.clone() {
            Some(sink) => sink(scope, &err),
            None => log::error!("uncaught app error: {err:#}"),
        }
    }
}
