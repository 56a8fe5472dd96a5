//! Background readiness gate for engines with an expensive load.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

use super::OcrBackend;
use crate::error::OcrError;

/// Published state of a gated engine.
#[derive(Clone)]
enum EngineState {
    Initializing,
    Ready(Arc<dyn OcrBackend>),
    Unavailable(String),
}

/// Snapshot of a gate's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum EngineStatus {
    Initializing,
    Ready,
    Unavailable(String),
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initializing => f.write_str("initializing"),
            Self::Ready => f.write_str("ready"),
            Self::Unavailable(reason) => write!(f, "unavailable ({reason})"),
        }
    }
}

/// Process-wide handle to an engine that may still be loading.
///
/// Cloning is cheap; all clones observe the same state. Reading the state
/// never blocks.
#[derive(Clone)]
pub struct EngineGate {
    rx: watch::Receiver<EngineState>,
}

impl EngineGate {
    /// Load an engine on a background thread.
    ///
    /// The gate starts in `Initializing` and moves to `Ready` or
    /// `Unavailable` once `loader` returns.
    pub fn spawn<F>(loader: F) -> Self
    where
        F: FnOnce() -> Result<Arc<dyn OcrBackend>, OcrError> + Send + 'static,
    {
        let (tx, rx) = watch::channel(EngineState::Initializing);
        let spawned = std::thread::Builder::new()
            .name("ocr-engine-loader".to_string())
            .spawn(move || {
                let state = match loader() {
                    Ok(engine) => {
                        info!("OCR engine ready ({})", engine.kind());
                        EngineState::Ready(engine)
                    }
                    Err(e) => {
                        warn!("OCR engine unavailable: {}", e);
                        EngineState::Unavailable(e.to_string())
                    }
                };
                tx.send_replace(state);
            });

        match spawned {
            Ok(_) => Self { rx },
            Err(e) => Self::unavailable(format!("could not start loader thread: {e}")),
        }
    }

    /// A gate that is already open.
    pub fn ready(engine: Arc<dyn OcrBackend>) -> Self {
        let (_tx, rx) = watch::channel(EngineState::Ready(engine));
        Self { rx }
    }

    /// A gate that will never open.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        let (_tx, rx) = watch::channel(EngineState::Unavailable(reason.into()));
        Self { rx }
    }

    /// Current state.
    pub fn status(&self) -> EngineStatus {
        match &*self.rx.borrow() {
            EngineState::Ready(_) => EngineStatus::Ready,
            EngineState::Unavailable(reason) => EngineStatus::Unavailable(reason.clone()),
            // The loader dropped its sender without publishing: it panicked.
            EngineState::Initializing if self.rx.has_changed().is_err() => {
                EngineStatus::Unavailable("engine loader exited".to_string())
            }
            EngineState::Initializing => EngineStatus::Initializing,
        }
    }

    /// The engine, if it is ready now.
    pub fn engine(&self) -> Option<Arc<dyn OcrBackend>> {
        match &*self.rx.borrow() {
            EngineState::Ready(engine) => Some(Arc::clone(engine)),
            _ => None,
        }
    }

    /// Wait until the gate leaves `Initializing`.
    pub async fn wait(&self) -> EngineStatus {
        let mut rx = self.rx.clone();
        // An error means the loader went away; status() reports that.
        let _ = rx
            .wait_for(|state| !matches!(state, EngineState::Initializing))
            .await;
        self.status()
    }
}

impl fmt::Debug for EngineGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineGate")
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::ScriptedOcr;
    use crate::ocr::OcrEngineKind;
    use std::sync::mpsc;

    #[test]
    fn test_ready_and_unavailable_gates() {
        let engine: Arc<dyn OcrBackend> = Arc::new(ScriptedOcr::new(OcrEngineKind::Neural, "x"));
        let gate = EngineGate::ready(engine);
        assert_eq!(gate.status(), EngineStatus::Ready);
        assert!(gate.engine().is_some());

        let gate = EngineGate::unavailable("no models");
        assert_eq!(gate.status(), EngineStatus::Unavailable("no models".to_string()));
        assert!(gate.engine().is_none());
    }

    #[tokio::test]
    async fn test_spawned_gate_is_initializing_until_loaded() {
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let gate = EngineGate::spawn(move || {
            release_rx.recv().ok();
            Ok(Arc::new(ScriptedOcr::new(OcrEngineKind::Neural, "warm")) as Arc<dyn OcrBackend>)
        });

        assert_eq!(gate.status(), EngineStatus::Initializing);
        assert!(gate.engine().is_none());

        release_tx.send(()).unwrap();
        assert_eq!(gate.wait().await, EngineStatus::Ready);
        assert!(gate.engine().is_some());
    }

    #[tokio::test]
    async fn test_failed_load_is_unavailable() {
        let gate = EngineGate::spawn(|| Err(OcrError::ModelLoad("missing det.onnx".to_string())));
        match gate.wait().await {
            EngineStatus::Unavailable(reason) => assert!(reason.contains("det.onnx")),
            other => panic!("unexpected status: {other}"),
        }
    }

    #[tokio::test]
    async fn test_panicking_loader_is_unavailable() {
        let gate = EngineGate::spawn(|| panic!("loader blew up"));
        assert!(matches!(gate.wait().await, EngineStatus::Unavailable(_)));
    }
}
