//! Load coordination: runs parse-then-assemble pipelines on a worker pool.
//!
//! Each pipeline owns its own [`RawGeometry`]; nothing mutable is shared
//! between pipelines, so a batch needs no locking beyond the final join.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc,
    },
};

use rayon::prelude::*;

use crate::{
    error::{ErrorKind, LoadError},
    mesh::{MeshBuffers, RawGeometry},
    obj,
    source::{SourceId, SourceProvider, SourceReader},
};

/// Loader tuning knobs.
#[derive(Clone, Debug, Default)]
pub struct LoaderConfig {
    /// Worker threads in the pool. `0` lets rayon pick (one per core).
    pub worker_threads: usize,
}

/// A single thing to load.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LoadRequest {
    pub source: SourceId,
}

impl LoadRequest {
    pub fn new(source: impl Into<SourceId>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// Outcome of one request. Never mutated once produced.
#[derive(Debug)]
pub enum LoadResult {
    Success(MeshBuffers),
    Failure { source: SourceId, error: LoadError },
}

impl LoadResult {
    pub fn is_success(&self) -> bool {
        matches!(self, LoadResult::Success(_))
    }

    pub fn mesh(&self) -> Option<&MeshBuffers> {
        match self {
            LoadResult::Success(mesh) => Some(mesh),
            LoadResult::Failure { .. } => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            LoadResult::Success(_) => None,
            LoadResult::Failure { error, .. } => Some(error.kind()),
        }
    }

    pub fn into_result(self) -> Result<MeshBuffers, LoadError> {
        match self {
            LoadResult::Success(mesh) => Ok(mesh),
            LoadResult::Failure { error, .. } => Err(error),
        }
    }

    fn failure(source: &SourceId, error: LoadError) -> Self {
        LoadResult::Failure {
            source: source.clone(),
            error,
        }
    }
}

/// Pipeline progress. `Completed` is terminal.
pub enum LoadState {
    Pending,
    Parsing(SourceReader),
    Assembling(RawGeometry),
    Completed(LoadResult),
}

impl LoadState {
    pub fn is_completed(&self) -> bool {
        matches!(self, LoadState::Completed(_))
    }

    fn label(&self) -> &'static str {
        match self {
            LoadState::Pending => "pending",
            LoadState::Parsing(_) => "parsing",
            LoadState::Assembling(_) => "assembling",
            LoadState::Completed(_) => "completed",
        }
    }
}

impl fmt::Debug for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadState::Completed(result) => f.debug_tuple("Completed").field(result).finish(),
            other => f.write_str(other.label()),
        }
    }
}

/// The parse-then-assemble sequence for one request.
pub struct Pipeline<'p> {
    request: LoadRequest,
    provider: &'p dyn SourceProvider,
    state: LoadState,
}

impl<'p> Pipeline<'p> {
    pub fn new(request: LoadRequest, provider: &'p dyn SourceProvider) -> Self {
        Self {
            request,
            provider,
            state: LoadState::Pending,
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    /// Advance by one stage. No-op once completed.
    pub fn step(&mut self) {
        let source = &self.request.source;
        let state = std::mem::replace(&mut self.state, LoadState::Pending);
        self.state = match state {
            LoadState::Pending => match self.provider.open(source) {
                Ok(reader) => LoadState::Parsing(reader),
                Err(err) => LoadState::Completed(LoadResult::failure(source, err)),
            },
            LoadState::Parsing(reader) => match obj::parse_source(reader, source.path()) {
                Ok(raw) => LoadState::Assembling(raw),
                Err(err) => LoadState::Completed(LoadResult::failure(source, err)),
            },
            LoadState::Assembling(raw) => match MeshBuffers::assemble(raw) {
                Ok(mesh) => LoadState::Completed(LoadResult::Success(mesh)),
                Err(err) => LoadState::Completed(LoadResult::failure(source, err)),
            },
            done @ LoadState::Completed(_) => done,
        };
        log::debug!("{}: {}", source, self.state.label());
    }

    /// Drive to a terminal state and return the result.
    pub fn run(mut self) -> LoadResult {
        while !self.state.is_completed() {
            self.step();
        }
        match self.state {
            LoadState::Completed(result) => result,
            _ => unreachable!("loop exits only on completion"),
        }
    }
}

/// Batch-level cancellation flag. Clones share the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Pending result of [`Loader::spawn`].
pub struct LoadHandle {
    rx: mpsc::Receiver<LoadResult>,
    source: SourceId,
}

impl LoadHandle {
    /// Block until the load reaches a terminal state.
    pub fn wait(self) -> LoadResult {
        self.rx
            .recv()
            .unwrap_or_else(|_| LoadResult::failure(&self.source, lost_worker()))
    }
}

/// Pending result of [`Loader::spawn_batch`].
pub struct BatchHandle {
    rx: mpsc::Receiver<Vec<LoadResult>>,
    sources: Vec<SourceId>,
    cancel: CancelToken,
}

impl BatchHandle {
    /// Stop starting new requests. In-flight ones finish normally.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Block until every request in the batch reaches a terminal state.
    pub fn wait(self) -> Vec<LoadResult> {
        self.rx.recv().unwrap_or_else(|_| {
            self.sources
                .iter()
                .map(|s| LoadResult::failure(s, lost_worker()))
                .collect()
        })
    }
}

fn lost_worker() -> LoadError {
    LoadError::FatalInvariant("worker exited without reporting a result".to_string())
}

/// Runs load pipelines on a dedicated thread pool.
pub struct Loader {
    pool: rayon::ThreadPool,
    provider: Arc<dyn SourceProvider>,
}

impl Loader {
    pub fn new(
        config: &LoaderConfig,
        provider: Arc<dyn SourceProvider>,
    ) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(|i| format!("obj-loader-{i}"))
            .build()?;
        log::info!("Loader ready with {} worker(s)", pool.current_num_threads());
        Ok(Self {
            pool,
            provider,
        })
    }

    /// Load one request on the calling thread.
    pub fn load(&self, request: &LoadRequest) -> LoadResult {
        run_one(request, self.provider.as_ref())
    }

    /// Load on the pool and hand the result to `on_complete`, exactly once.
    pub fn load_with<F>(&self, request: LoadRequest, on_complete: F)
    where
        F: FnOnce(LoadResult) + Send + 'static,
    {
        let provider = Arc::clone(&self.provider);
        self.pool.spawn(move || {
            on_complete(run_one(&request, provider.as_ref()));
        });
    }

    /// Load on the pool, returning a handle to wait on.
    pub fn spawn(&self, request: LoadRequest) -> LoadHandle {
        let (tx, rx) = mpsc::channel();
        let source = request.source.clone();
        self.load_with(request, move |result| {
            // The handle may have been dropped; nobody is waiting then.
            let _ = tx.send(result);
        });
        LoadHandle { rx, source }
    }

    /// Load every request in parallel. Results come back in request order.
    ///
    /// Requests that have not started when `cancel` is raised complete as
    /// [`LoadError::Cancelled`]; the returned vector always has one entry per request.
    pub fn load_batch(&self, requests: &[LoadRequest], cancel: &CancelToken) -> Vec<LoadResult> {
        let provider = self.provider.as_ref();
        self.pool.install(|| run_batch(requests, provider, cancel))
    }

    /// Start a batch on the pool and return immediately.
    pub fn spawn_batch(&self, requests: Vec<LoadRequest>) -> BatchHandle {
        let (tx, rx) = mpsc::channel();
        let cancel = CancelToken::new();
        let sources = requests.iter().map(|r| r.source.clone()).collect();
        let provider = Arc::clone(&self.provider);
        let token = cancel.clone();
        self.pool.spawn(move || {
            let _ = tx.send(run_batch(&requests, provider.as_ref(), &token));
        });
        BatchHandle {
            rx,
            sources,
            cancel,
        }
    }
}

fn run_one(request: &LoadRequest, provider: &dyn SourceProvider) -> LoadResult {
    log::info!("Loading {}", request.source);
    let result = Pipeline::new(request.clone(), provider).run();
    match &result {
        LoadResult::Success(mesh) => log::info!(
            "Loaded {}: {} vertices, {} triangles",
            request.source,
            mesh.vertex_count(),
            mesh.triangle_count()
        ),
        LoadResult::Failure { source, error } => log::warn!("Failed to load {source}: {error}"),
    }
    result
}

fn run_batch(
    requests: &[LoadRequest],
    provider: &dyn SourceProvider,
    cancel: &CancelToken,
) -> Vec<LoadResult> {
    let results: Vec<LoadResult> = requests
        .par_iter()
        .map(|request| {
            if cancel.is_cancelled() {
                LoadResult::failure(&request.source, LoadError::Cancelled)
            } else {
                run_one(request, provider)
            }
        })
        .collect();

    let ok = results.iter().filter(|r| r.is_success()).count();
    log::info!("Batch finished: {ok}/{} loaded", results.len());
    results
}
