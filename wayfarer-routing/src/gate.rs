//! One-time engine initialization
//!
//! `Uninitialized -> Building -> Ready | Failed`. The first caller runs the
//! build while every other caller blocks; a failed or panicked build stays
//! failed.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::{error, info};
use wayfarer_common::{Error, Result};

use crate::engine::Engine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GateStatus {
    Uninitialized,
    Building,
    Ready,
    Failed,
}

enum GateState {
    Uninitialized,
    Building,
    Ready(Arc<Engine>),
    Failed(String),
}

pub struct EngineGate {
    state: Mutex<GateState>,
    changed: Condvar,
}

impl Default for EngineGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Marks the gate failed if the build unwinds before finishing
struct BuildGuard<'a> {
    gate: &'a EngineGate,
    armed: bool,
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.gate
                .finish(GateState::Failed("engine build panicked".to_string()));
        }
    }
}

impl EngineGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState::Uninitialized),
            changed: Condvar::new(),
        }
    }

    pub fn status(&self) -> GateStatus {
        match &*self.state.lock() {
            GateState::Uninitialized => GateStatus::Uninitialized,
            GateState::Building => GateStatus::Building,
            GateState::Ready(_) => GateStatus::Ready,
            GateState::Failed(_) => GateStatus::Failed,
        }
    }

    /// The engine if it is ready, without waiting
    pub fn get(&self) -> Option<Arc<Engine>> {
        match &*self.state.lock() {
            GateState::Ready(engine) => Some(Arc::clone(engine)),
            _ => None,
        }
    }

    /// Return the engine, running `build` if nobody has yet.
    ///
    /// Exactly one caller runs `build`; concurrent callers wait for it and
    /// share the outcome.
    pub fn get_or_build<F>(&self, build: F) -> Result<Arc<Engine>>
    where
        F: FnOnce() -> Result<Engine>,
    {
        {
            let mut state = self.state.lock();
            loop {
                match &*state {
                    GateState::Ready(engine) => return Ok(Arc::clone(engine)),
                    GateState::Failed(reason) => {
                        return Err(Error::EngineUnavailable(reason.clone()))
                    }
                    GateState::Building => {}
                    GateState::Uninitialized => break,
                }
                self.changed.wait(&mut state);
            }
            *state = GateState::Building;
        }

        info!("building routing engine");
        let mut guard = BuildGuard {
            gate: self,
            armed: true,
        };
        let outcome = build();
        guard.armed = false;

        match outcome {
            Ok(engine) => {
                let engine = Arc::new(engine);
                self.finish(GateState::Ready(Arc::clone(&engine)));
                Ok(engine)
            }
            Err(e) => {
                error!(error = %e, "routing engine build failed");
                let reason = e.to_string();
                self.finish(GateState::Failed(reason));
                Err(e)
            }
        }
    }

    /// Block until a build started elsewhere has finished.
    ///
    /// Fails with `EngineUnavailable` if the build failed or none was
    /// started.
    pub fn wait(&self) -> Result<Arc<Engine>> {
        let mut state = self.state.lock();
        loop {
            match &*state {
                GateState::Ready(engine) => return Ok(Arc::clone(engine)),
                GateState::Failed(reason) => return Err(Error::EngineUnavailable(reason.clone())),
                GateState::Building => {}
                GateState::Uninitialized => {
                    return Err(Error::EngineUnavailable("engine build not started".to_string()))
                }
            }
            self.changed.wait(&mut state);
        }
    }

    fn finish(&self, next: GateState) {
        *self.state.lock() = next;
        self.changed.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::records::VecSource;
    use wayfarer_common::BuildError;

    fn tiny_engine() -> Result<Engine> {
        let mut src = VecSource::default();
        src.node(1, 0.0, 0.0)
            .node(2, 0.0, 0.001)
            .way(1, &[1, 2], &[("highway", "residential")]);
        Engine::build(&mut src, EngineConfig::default())
    }

    #[test]
    fn test_build_once_then_reuse() {
        let gate = EngineGate::new();
        assert_eq!(gate.status(), GateStatus::Uninitialized);
        assert!(gate.get().is_none());

        let a = gate.get_or_build(tiny_engine).unwrap();
        assert_eq!(gate.status(), GateStatus::Ready);

        let b = gate
            .get_or_build(|| panic!("second build must not run"))
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &gate.wait().unwrap()));
    }

    #[test]
    fn test_failure_is_sticky() {
        let gate = EngineGate::new();
        let err = gate
            .get_or_build(|| Err(BuildError::NoProfiles.into()))
            .unwrap_err();
        assert!(matches!(err, Error::Build(BuildError::NoProfiles)));
        assert_eq!(gate.status(), GateStatus::Failed);

        assert!(matches!(
            gate.get_or_build(tiny_engine),
            Err(Error::EngineUnavailable(_))
        ));
        assert!(matches!(gate.wait(), Err(Error::EngineUnavailable(_))));
    }

    #[test]
    fn test_wait_without_build() {
        let gate = EngineGate::new();
        assert!(matches!(gate.wait(), Err(Error::EngineUnavailable(_))));
    }

    #[test]
    fn test_panicking_build_marks_failed() {
        let gate = EngineGate::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = gate.get_or_build(|| panic!("boom"));
        }));
        assert!(result.is_err());
        assert_eq!(gate.status(), GateStatus::Failed);
    }
}
