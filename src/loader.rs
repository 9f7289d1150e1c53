use crate::{
    ElfParser, Error, LibrarySpec, Logger, Result,
    cache::LibraryCache,
    installer::{ArchiveInstaller, LibraryInstaller},
    invalid_argument, load_failed,
    logger::Diagnostics,
    os::{LibraryLoader, LoadAttempt, SystemLoader},
    pool::{WorkerPool, default_workers},
    registry::LoadedLibraries,
};
use crossbeam_channel::{Receiver, TryRecvError, bounded};
use hashbrown::HashSet;
use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, OnceLock},
};

/// Where one library is in the relinking process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Nothing has been tried yet.
    NotAttempted,
    /// The platform loader could not find the library by name.
    NormalLoadFailed,
    /// The library is present in the cache directory.
    Installing,
    /// Dependencies of the installed file are being loaded first.
    DependencyResolution,
    /// The library is loaded. Terminal.
    ExplicitLoaded,
    /// A step failed and the error was surfaced. Terminal.
    Failed,
}

/// Callbacks for [`Relinker::load_async`], run on the worker thread.
pub trait LoadListener: Send + 'static {
    fn success(&self);
    fn failure(&self, error: &Error);
}

impl<F> LoadListener for F
where
    F: Fn(core::result::Result<(), &Error>) + Send + 'static,
{
    fn success(&self) {
        (self)(Ok(()))
    }

    fn failure(&self, error: &Error) {
        (self)(Err(error))
    }
}

/// The pending outcome of an asynchronous load.
#[derive(Debug)]
pub struct LoadHandle {
    receiver: Receiver<Result<()>>,
}

impl LoadHandle {
    fn ready(result: Result<()>) -> Self {
        let (sender, receiver) = bounded(1);
        let _ = sender.send(result);
        Self { receiver }
    }

    /// Blocks until the load finishes.
    pub fn wait(self) -> Result<()> {
        self.receiver
            .recv()
            .unwrap_or_else(|_| Err(load_failed("load task ended without reporting a result")))
    }

    /// Returns the outcome if the load has finished.
    pub fn try_wait(&self) -> Option<Result<()>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(load_failed(
                "load task ended without reporting a result",
            ))),
        }
    }
}

/// What the worklist should do after one state transition.
enum Step {
    /// The frame moved to another state; step it again.
    Continue,
    /// Load this dependency (a logical name) before continuing.
    Descend(String),
    /// The frame reached a terminal state.
    Done,
}

struct Frame {
    spec: LibrarySpec,
    state: LoadState,
    path: Option<PathBuf>,
    pending: VecDeque<String>,
}

impl Frame {
    fn new(spec: LibrarySpec) -> Self {
        Self {
            spec,
            state: LoadState::NotAttempted,
            path: None,
            pending: VecDeque::new(),
        }
    }

    fn installed_path(&self) -> Result<&Path> {
        self.path.as_deref().ok_or_else(|| {
            load_failed(format!("{} has no installed path", self.spec.name))
        })
    }
}

/// Loads native libraries, falling back to extracting them from package
/// archives when the platform loader cannot find them.
///
/// A `Relinker` is cheap to clone; clones share the loader, installer,
/// registry and worker pool.
///
/// # Examples
/// ```no_run
/// use relinker::Relinker;
///
/// let relinker = Relinker::new("/data/data/app/lib-cache", ["/data/app/base.apk"])
///     .recursively()
///     .log(|msg: &str| eprintln!("{msg}"));
/// relinker.load("foo").unwrap();
/// ```
pub struct Relinker<L = SystemLoader, I = ArchiveInstaller>
where
    L: LibraryLoader,
    I: LibraryInstaller,
{
    loader: Arc<L>,
    installer: Arc<I>,
    cache: LibraryCache,
    registry: Arc<LoadedLibraries>,
    diagnostics: Diagnostics,
    force: bool,
    recursive: bool,
    workers: usize,
    pool: Arc<OnceLock<Option<WorkerPool>>>,
}

impl<L: LibraryLoader, I: LibraryInstaller> Clone for Relinker<L, I> {
    fn clone(&self) -> Self {
        Self {
            loader: self.loader.clone(),
            installer: self.installer.clone(),
            cache: self.cache.clone(),
            registry: self.registry.clone(),
            diagnostics: self.diagnostics.clone(),
            force: self.force,
            recursive: self.recursive,
            workers: self.workers,
            pool: self.pool.clone(),
        }
    }
}

impl Relinker<SystemLoader, ArchiveInstaller> {
    /// Creates a relinker using the platform loader and the given package
    /// archives, installing into `cache_dir`.
    pub fn new<P: Into<PathBuf>>(
        cache_dir: impl Into<PathBuf>,
        archives: impl IntoIterator<Item = P>,
    ) -> Self {
        Self::with_parts(cache_dir, SystemLoader, ArchiveInstaller::new(archives))
    }
}

impl<L: LibraryLoader, I: LibraryInstaller> Relinker<L, I> {
    /// Creates a relinker from custom loader and installer implementations.
    pub fn with_parts(cache_dir: impl Into<PathBuf>, loader: L, installer: I) -> Self {
        Self {
            loader: Arc::new(loader),
            installer: Arc::new(installer),
            cache: LibraryCache::new(cache_dir),
            registry: LoadedLibraries::global(),
            diagnostics: Diagnostics::default(),
            force: false,
            recursive: false,
            workers: default_workers(),
            pool: Arc::new(OnceLock::new()),
        }
    }

    /// Reinstalls libraries even when a cached copy exists, deleting every
    /// cached version first, and reloads names already in the registry.
    pub fn force(mut self) -> Self {
        self.force = true;
        self
    }

    /// Loads the `DT_NEEDED` dependencies of a relinked library before the
    /// library itself.
    pub fn recursively(mut self) -> Self {
        self.recursive = true;
        self
    }

    /// Sends diagnostics to `logger` in addition to the `log` facade.
    pub fn log(mut self, logger: impl Logger + 'static) -> Self {
        self.diagnostics = Diagnostics::new(Some(Arc::new(logger)));
        self
    }

    /// Sets the number of threads used by [`load_async`](Self::load_async).
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self.pool = Arc::new(OnceLock::new());
        self
    }

    /// Uses `registry` instead of the process-wide registry.
    pub fn registry(mut self, registry: Arc<LoadedLibraries>) -> Self {
        self.registry = registry;
        self
    }

    #[inline]
    pub fn cache(&self) -> &LibraryCache {
        &self.cache
    }

    #[inline]
    pub fn loaded_libraries(&self) -> &LoadedLibraries {
        &self.registry
    }

    #[inline]
    pub fn is_force(&self) -> bool {
        self.force
    }

    #[inline]
    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// Loads `name`, relinking it from the package archives if the platform
    /// loader cannot find it. Blocks until done.
    pub fn load(&self, name: &str) -> Result<()> {
        self.load_version(name, None)
    }

    /// Like [`load`](Self::load), but installs and loads a specific version of
    /// the library when relinking is needed.
    pub fn load_version(&self, name: &str, version: Option<&str>) -> Result<()> {
        if name.is_empty() {
            return Err(invalid_argument("library name is empty"));
        }
        self.diagnostics
            .emit(format_args!("Beginning load of {name}..."));
        self.run(self.spec(name, version))
    }

    fn spec(&self, name: &str, version: Option<&str>) -> LibrarySpec {
        LibrarySpec::new(name, self.loader.map_library_name(name), version)
    }

    /// Runs the state machine for `root` and every dependency it pulls in.
    ///
    /// Dependencies are handled with an explicit stack rather than recursion;
    /// a name is entered at most once per run, so cyclic `DT_NEEDED` graphs
    /// terminate.
    fn run(&self, root: LibrarySpec) -> Result<()> {
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(root.name.clone());
        let mut stack = vec![Frame::new(root)];

        while let Some(frame) = stack.last_mut() {
            match self.step(frame) {
                Ok(Step::Continue) => {}
                Ok(Step::Descend(dependency)) => {
                    if visited.insert(dependency.clone()) {
                        self.diagnostics
                            .emit(format_args!("Loading dependency {dependency}..."));
                        stack.push(Frame::new(self.spec(&dependency, None)));
                    } else {
                        log::trace!("[Relink] {} already visited", dependency);
                    }
                }
                Ok(Step::Done) => {
                    stack.pop();
                }
                Err(err) => {
                    if let Some(frame) = stack.last_mut() {
                        frame.state = LoadState::Failed;
                        self.diagnostics.emit(format_args!(
                            "Loading {} failed: {err}",
                            frame.spec.name
                        ));
                    }
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    fn step(&self, frame: &mut Frame) -> Result<Step> {
        let name = frame.spec.name.as_str();
        let version = frame.spec.version.as_deref().unwrap_or("none");
        match frame.state {
            LoadState::NotAttempted => {
                if !self.force && self.registry.contains(name) {
                    self.diagnostics
                        .emit(format_args!("{name} already loaded previously!"));
                    frame.state = LoadState::ExplicitLoaded;
                    return Ok(Step::Done);
                }
                match self.loader.load_library(name) {
                    LoadAttempt::Loaded => {
                        self.registry.insert(name);
                        self.diagnostics
                            .emit(format_args!("{name} ({version}) was loaded normally!"));
                        frame.state = LoadState::ExplicitLoaded;
                        Ok(Step::Done)
                    }
                    LoadAttempt::Unsatisfied { reason } => {
                        self.diagnostics
                            .emit(format_args!("Loading the library normally failed: {reason}"));
                        frame.state = LoadState::NormalLoadFailed;
                        Ok(Step::Continue)
                    }
                }
            }
            LoadState::NormalLoadFailed => {
                self.diagnostics.emit(format_args!(
                    "{name} ({version}) was not loaded normally, re-linking..."
                ));
                let path = self.cache.library_path(&frame.spec);
                if self.force || !path.exists() {
                    if self.force {
                        self.diagnostics
                            .emit(format_args!("Forcing a re-link of {name} ({version})..."));
                    }
                    self.install(&frame.spec, &path)?;
                }
                frame.path = Some(path);
                frame.state = LoadState::Installing;
                Ok(Step::Continue)
            }
            LoadState::Installing => {
                if self.recursive {
                    let path = frame.installed_path()?;
                    match parse_needed(path) {
                        Ok(needed) => frame.pending = needed.into(),
                        Err(err) => self.diagnostics.emit(format_args!(
                            "Resolving dependencies of {name} failed, loading it anyway: {err}"
                        )),
                    }
                }
                frame.state = LoadState::DependencyResolution;
                Ok(Step::Continue)
            }
            LoadState::DependencyResolution => {
                if let Some(needed) = frame.pending.pop_front() {
                    return Ok(Step::Descend(self.loader.unmap_library_name(&needed)));
                }
                self.loader.load_path(frame.installed_path()?)?;
                self.registry.insert(name);
                self.diagnostics
                    .emit(format_args!("{name} ({version}) was re-linked!"));
                frame.state = LoadState::ExplicitLoaded;
                Ok(Step::Done)
            }
            LoadState::ExplicitLoaded | LoadState::Failed => Ok(Step::Done),
        }
    }

    /// Clears stale cached copies of `spec` and extracts a fresh one to `path`.
    fn install(&self, spec: &LibrarySpec, path: &Path) -> Result<()> {
        self.cache.ensure_dir()?;
        self.cache.cleanup(spec, self.force, &self.diagnostics);
        let abis = self.loader.supported_abis();
        self.installer
            .install(&abis, &spec.mapped_name, path, &self.diagnostics)
            .inspect_err(|err| {
                if let Error::ExtractionFailed { .. } = err {
                    self.diagnostics.fatal(format_args!(
                        "FATAL! Couldn't extract {} from the package archives: {err}",
                        spec.mapped_name
                    ));
                }
            })
    }
}

/// Reads the `DT_NEEDED` list of an installed library.
fn parse_needed(path: &Path) -> Result<Vec<String>> {
    ElfParser::new(path)?.parse_needed_dependencies()
}

type SharedListener = Arc<Mutex<Option<Box<dyn LoadListener>>>>;

impl<L, I> Relinker<L, I>
where
    L: LibraryLoader + 'static,
    I: LibraryInstaller + 'static,
{
    /// Runs [`load_version`](Self::load_version) on the worker pool and
    /// returns immediately.
    ///
    /// `listener`, if given, is called exactly once with the outcome: on the
    /// worker before the returned handle completes, or on the calling thread
    /// if the load could not be queued.
    pub fn load_async(
        &self,
        name: &str,
        version: Option<&str>,
        listener: Option<Box<dyn LoadListener>>,
    ) -> LoadHandle {
        let listener: SharedListener = Arc::new(Mutex::new(listener));
        let (sender, receiver) = bounded(1);
        let job = {
            let relinker = self.clone();
            let listener = listener.clone();
            let name = name.to_string();
            let version = version.map(str::to_string);
            Box::new(move || {
                let result = relinker.load_version(&name, version.as_deref());
                report(&listener, &result);
                let _ = sender.send(result);
            })
        };

        let Some(pool) = self.pool() else {
            let err = if self.workers == 0 {
                invalid_argument("worker count must be at least 1")
            } else {
                load_failed("no relinker worker could be started")
            };
            return self.reject(&listener, err);
        };
        match pool.submit(job) {
            Ok(()) => LoadHandle { receiver },
            Err(_job) => self.reject(&listener, load_failed("relinker worker pool is shut down")),
        }
    }

    fn pool(&self) -> Option<&WorkerPool> {
        self.pool
            .get_or_init(|| {
                let pool = WorkerPool::new(self.workers);
                if let Some(pool) = &pool {
                    log::debug!("[Relink] started {} workers", pool.size());
                }
                pool
            })
            .as_ref()
    }

    fn reject(&self, listener: &SharedListener, err: Error) -> LoadHandle {
        self.diagnostics
            .emit(format_args!("Asynchronous load rejected: {err}"));
        let result = Err(err);
        report(listener, &result);
        LoadHandle::ready(result)
    }
}

/// Hands `result` to the listener, if it has not been called yet.
fn report(listener: &SharedListener, result: &Result<()>) {
    let listener = listener.lock().ok().and_then(|mut slot| slot.take());
    if let Some(listener) = listener {
        match result {
            Ok(()) => listener.success(),
            Err(err) => listener.failure(err),
        }
    }
}
