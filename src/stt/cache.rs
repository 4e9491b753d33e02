//! Lazily-initialised, shared speech model.
//!
//! [`ModelCache`] builds the model through a [`ModelLoader`] the first time
//! it is asked for one and hands out the same `Arc<dyn SttEngine>` afterwards.
//! Concurrent first callers all wait on the single in-progress load.
//!
//! The outcome of that load is cached either way: after a failure every later
//! [`ModelCache::get`] returns the same error and nothing is reloaded until
//! the process is restarted.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::stt::engine::{SttEngine, SttError, WhisperEngine};
use crate::stt::model::{ensure_model, ModelInfo, ModelPaths};
use crate::stt::transcribe::TranscribeParams;

// ---------------------------------------------------------------------------
// ModelLoader
// ---------------------------------------------------------------------------

/// Something that can construct the speech model.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    /// Build a ready-to-use engine. Called at most once per [`ModelCache`].
    async fn load(&self) -> Result<Arc<dyn SttEngine>, SttError>;
}

/// Loads a GGML Whisper model from disk, fetching it first when allowed.
#[derive(Debug, Clone)]
pub struct WhisperLoader {
    paths: ModelPaths,
    model: &'static ModelInfo,
    params: TranscribeParams,
    auto_download: bool,
}

impl WhisperLoader {
    pub fn new(
        paths: ModelPaths,
        model: &'static ModelInfo,
        params: TranscribeParams,
        auto_download: bool,
    ) -> Self {
        Self {
            paths,
            model,
            params,
            auto_download,
        }
    }
}

#[async_trait]
impl ModelLoader for WhisperLoader {
    async fn load(&self) -> Result<Arc<dyn SttEngine>, SttError> {
        let path = if self.auto_download {
            ensure_model(&self.paths, self.model).await?
        } else {
            let path = self.paths.model_path(self.model);
            if !self.paths.is_available(self.model) {
                return Err(SttError::ModelNotFound(path.display().to_string()));
            }
            path
        };

        // Reading ~500 MB of weights blocks; keep it off the async workers.
        let params = self.params.clone();
        let engine = tokio::task::spawn_blocking(move || WhisperEngine::load(&path, params))
            .await
            .map_err(|e| SttError::Internal(format!("model load task: {e}")))??;

        Ok(Arc::new(engine))
    }
}

// ---------------------------------------------------------------------------
// ModelCache
// ---------------------------------------------------------------------------

/// Owns the one model instance shared by every transcription request.
pub struct ModelCache {
    loader: Arc<dyn ModelLoader>,
    slot: Arc<OnceCell<LoadResult>>,
}

type LoadResult = Result<Arc<dyn SttEngine>, SttError>;

impl ModelCache {
    pub fn new(loader: impl ModelLoader + 'static) -> Self {
        Self {
            loader: Arc::new(loader),
            slot: Arc::new(OnceCell::new()),
        }
    }

    /// A cache that is already initialised with `engine`.
    pub fn ready(engine: Arc<dyn SttEngine>) -> Self {
        Self {
            loader: Arc::new(Preloaded),
            slot: Arc::new(OnceCell::new_with(Some(Ok(engine)))),
        }
    }

    /// Return the model, loading it first if no load has happened yet.
    ///
    /// Waits for an in-progress load instead of starting another.  The load
    /// runs on its own task, so dropping the returned future does not abort
    /// it and a later caller picks up the same load.
    pub async fn get(&self) -> Result<Arc<dyn SttEngine>, SttError> {
        if let Some(result) = self.slot.get() {
            return result.clone();
        }

        let slot = Arc::clone(&self.slot);
        let loader = Arc::clone(&self.loader);
        let task = tokio::spawn(async move {
            slot.get_or_init(|| async {
                log::info!("stt: loading speech model");
                let started = Instant::now();
                let result = loader.load().await;
                match &result {
                    Ok(_) => log::info!(
                        "stt: speech model ready in {} ms",
                        started.elapsed().as_millis()
                    ),
                    Err(e) => log::error!("stt: speech model failed to load: {e}"),
                }
                result
            })
            .await
            .clone()
        });

        task.await
            .map_err(|e| SttError::Internal(format!("model load task: {e}")))?
    }

    /// `true` once a load has finished successfully.
    pub fn is_ready(&self) -> bool {
        matches!(self.slot.get(), Some(Ok(_)))
    }
}

impl std::fmt::Debug for ModelCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.slot.get() {
            None => "empty",
            Some(Ok(_)) => "ready",
            Some(Err(_)) => "failed",
        };
        f.debug_struct("ModelCache")
            .field("state", &state)
            .finish_non_exhaustive()
    }
}

struct Preloaded;

#[async_trait]
impl ModelLoader for Preloaded {
    async fn load(&self) -> Result<Arc<dyn SttEngine>, SttError> {
        Err(SttError::Internal("preloaded cache has no loader".into()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
