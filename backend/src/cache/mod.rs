//! Directory cache - the three tables, loaded once and shared.
//!
//! Loads are single-flight: while one is running, every caller of
//! [`DirectoryCache::ensure_loaded`] awaits the same shared future and sees
//! the same outcome. Tables are swapped in together, only when all three
//! sources fetched and parsed; a failed load is not remembered, so the next
//! call starts over.
//!
//! ```rust,ignore
//! let cache = DirectoryCache::new(Arc::new(source), base_url);
//! cache.ensure_loaded(None).await?;
//! let results = cache.snapshot().search(&filter);
//! ```

use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use crate::api::logs::{log_error, log_info, log_success, log_warning};
use crate::error::{LoadError, LoadResult, SourceResult};
use crate::models::{Assignment, Employee, Project, SourceKind};
use crate::parser::{
    assignments_from_records, employees_from_records, parse_csv, projects_from_records,
    ParseResult,
};
use crate::source::{AuthContext, CsvSource};

/// One consistent view of the three tables.
#[derive(Debug, Clone, Default)]
pub struct DirectorySnapshot {
    pub employees: Vec<Employee>,
    pub projects: Vec<Project>,
    pub assignments: Vec<Assignment>,
}

type SharedLoad = Shared<BoxFuture<'static, LoadResult<()>>>;

/// Source modification times, indexed like [`SourceKind::ALL`].
type Stamps = [Option<SystemTime>; 3];

#[derive(Default)]
struct CacheState {
    snapshot: Arc<DirectorySnapshot>,
    loaded: bool,
    stamps: Stamps,
    /// Bumped on every reset; a load only commits into its own generation.
    generation: u64,
    inflight: Option<SharedLoad>,
}

impl CacheState {
    fn reset(&mut self) {
        self.snapshot = Arc::new(DirectorySnapshot::default());
        self.loaded = false;
        self.stamps = [None; 3];
        self.generation += 1;
        self.inflight = None;
    }
}

struct CacheInner {
    source: Arc<dyn CsvSource>,
    base_url: String,
    state: Mutex<CacheState>,
}

/// Process-wide holder of the directory tables.
///
/// Cheap to clone; clones share the same tables.
#[derive(Clone)]
pub struct DirectoryCache {
    inner: Arc<CacheInner>,
}

impl DirectoryCache {
    /// `base_url` is used to derive project links missing from the CSV.
    pub fn new(source: Arc<dyn CsvSource>, base_url: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                source,
                base_url: base_url.into(),
                state: Mutex::new(CacheState::default()),
            }),
        }
    }

    /// Make sure the tables are populated and fresh.
    ///
    /// Returns immediately when loaded and no local source changed on disk.
    /// Otherwise joins the running load or starts one. `auth` is only used
    /// by the caller that starts the load.
    pub async fn ensure_loaded(&self, auth: Option<&AuthContext>) -> LoadResult<()> {
        let current = self.inner.current_stamps().await;

        let load = {
            let mut state = self.inner.lock();

            if state.loaded {
                if state.stamps == current {
                    return Ok(());
                }
                log_info("Source files changed on disk, reloading directory");
                state.reset();
            }

            match &state.inflight {
                Some(load) => load.clone(),
                None => {
                    let load = CacheInner::load(
                        Arc::clone(&self.inner),
                        state.generation,
                        current,
                        auth.cloned(),
                    )
                    .boxed()
                    .shared();
                    state.inflight = Some(load.clone());
                    load
                }
            }
        };

        load.await
    }

    /// Drop the tables and any in-flight load; the next
    /// [`ensure_loaded`](Self::ensure_loaded) reloads from source.
    ///
    /// A load already running still completes for its waiters, but its
    /// tables are discarded.
    pub fn invalidate(&self) {
        self.inner.lock().reset();
        log_info("Directory cache cleared");
    }

    /// True once a load has succeeded (and nothing invalidated it since).
    pub fn is_loaded(&self) -> bool {
        self.inner.lock().loaded
    }

    /// Current tables. Empty before the first successful load. Never loads.
    pub fn snapshot(&self) -> Arc<DirectorySnapshot> {
        Arc::clone(&self.inner.lock().snapshot)
    }

    /// Copy of the employees table.
    pub fn employees(&self) -> Vec<Employee> {
        self.snapshot().employees.clone()
    }

    /// Copy of the projects table.
    pub fn projects(&self) -> Vec<Project> {
        self.snapshot().projects.clone()
    }

    /// Copy of the project/employee links.
    pub fn assignments(&self) -> Vec<Assignment> {
        self.snapshot().assignments.clone()
    }
}

impl CacheInner {
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn current_stamps(&self) -> Stamps {
        let [employees, projects, assignments] = SourceKind::ALL;
        let (employees, projects, assignments) = futures::join!(
            self.source.modified(employees),
            self.source.modified(projects),
            self.source.modified(assignments),
        );
        [employees, projects, assignments]
    }

    /// Fetch, parse and commit. Stamps are taken before fetching, so an edit
    /// landing mid-load triggers another reload on the next call.
    async fn load(
        inner: Arc<CacheInner>,
        generation: u64,
        stamps: Stamps,
        auth: Option<AuthContext>,
    ) -> LoadResult<()> {
        log_info("Loading directory data...");
        let result = inner.fetch_all(auth.as_ref()).await;

        let mut state = inner.lock();
        if state.generation != generation {
            log_warning("Directory cache was cleared during load, discarding result");
            return result.map(|_| ());
        }
        state.inflight = None;

        match result {
            Ok(snapshot) => {
                log_success(format!(
                    "Loaded {} employees, {} projects, {} relationships",
                    snapshot.employees.len(),
                    snapshot.projects.len(),
                    snapshot.assignments.len()
                ));
                state.snapshot = Arc::new(snapshot);
                state.stamps = stamps;
                state.loaded = true;
                Ok(())
            }
            Err(e) => {
                log_error(format!("Directory load failed: {}", e));
                Err(e)
            }
        }
    }

    async fn fetch_all(&self, auth: Option<&AuthContext>) -> LoadResult<DirectorySnapshot> {
        let (employees, projects, assignments) = futures::try_join!(
            self.fetch_parsed(SourceKind::Employees, auth),
            self.fetch_parsed(SourceKind::Projects, auth),
            self.fetch_parsed(SourceKind::Assignments, auth),
        )?;

        Ok(DirectorySnapshot {
            employees: employees_from_records(&employees.records),
            projects: projects_from_records(&projects.records, &self.base_url),
            assignments: assignments_from_records(&assignments.records),
        })
    }

    async fn fetch_parsed(
        &self,
        kind: SourceKind,
        auth: Option<&AuthContext>,
    ) -> LoadResult<ParseResult> {
        log_info(format!("Reading {} from {}", kind, self.source.describe(kind)));
        let text: SourceResult<String> = self.source.fetch(kind, auth).await;
        parse_csv(&text?).map_err(|source| LoadError::Parse { kind, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Semaphore;

    const EMPLOYEES: &str = "id,first_name,last_name\n1,Jo,Lee\n2,Sam,Johnson\n";
    const PROJECTS: &str = "id,name,region\n10,Clinic,East\n";
    const LINKS: &str = "ProjectID,EmployeeID\n10,1\n";

    /// In-memory source that counts fetches per table.
    #[derive(Default)]
    struct MockSource {
        calls: [AtomicUsize; 3],
        failing: Mutex<Option<SourceError>>,
        bad_csv: Mutex<Option<SourceKind>>,
        stamps: Mutex<Stamps>,
        gate: Option<Arc<Semaphore>>,
    }

    impl MockSource {
        fn calls(&self, kind: SourceKind) -> usize {
            self.calls[kind.index()].load(Ordering::SeqCst)
        }

        fn fail_with(&self, err: Option<SourceError>) {
            *self.failing.lock().unwrap() = err;
        }

        fn touch(&self, kind: SourceKind, secs: u64) {
            self.stamps.lock().unwrap()[kind.index()] =
                Some(SystemTime::UNIX_EPOCH + Duration::from_secs(secs));
        }
    }

    impl CsvSource for MockSource {
        fn fetch<'a>(
            &'a self,
            kind: SourceKind,
            _auth: Option<&'a AuthContext>,
        ) -> BoxFuture<'a, SourceResult<String>> {
            async move {
                self.calls[kind.index()].fetch_add(1, Ordering::SeqCst);
                match &self.gate {
                    Some(gate) => gate.acquire().await.unwrap().forget(),
                    None => tokio::time::sleep(Duration::from_millis(5)).await,
                }

                let failing = self.failing.lock().unwrap().clone();
                if let Some(err) = failing.filter(|e| e.kind() == kind) {
                    return Err(err);
                }
                if *self.bad_csv.lock().unwrap() == Some(kind) {
                    return Ok("a,b\n1,2,3\n".to_string());
                }
                Ok(match kind {
                    SourceKind::Employees => EMPLOYEES,
                    SourceKind::Projects => PROJECTS,
                    SourceKind::Assignments => LINKS,
                }
                .to_string())
            }
            .boxed()
        }

        fn modified<'a>(&'a self, kind: SourceKind) -> BoxFuture<'a, Option<SystemTime>> {
            let stamp = self.stamps.lock().unwrap()[kind.index()];
            async move { stamp }.boxed()
        }
    }

    fn cache_with(source: &Arc<MockSource>) -> DirectoryCache {
        DirectoryCache::new(source.clone(), "https://assets.example.com")
    }

    #[tokio::test]
    async fn test_reads_before_load_are_empty() {
        let source = Arc::new(MockSource::default());
        let cache = cache_with(&source);

        assert!(!cache.is_loaded());
        assert!(cache.employees().is_empty());
        assert!(cache.projects().is_empty());
        assert!(cache.assignments().is_empty());
        assert_eq!(source.calls(SourceKind::Employees), 0);
    }

    #[tokio::test]
    async fn test_second_load_does_not_fetch() {
        let source = Arc::new(MockSource::default());
        let cache = cache_with(&source);

        cache.ensure_loaded(None).await.unwrap();
        cache.ensure_loaded(None).await.unwrap();

        for kind in SourceKind::ALL {
            assert_eq!(source.calls(kind), 1);
        }
        assert_eq!(cache.employees().len(), 2);
        assert_eq!(cache.projects()[0].external_url, "https://assets.example.com/page/project/10/");
        assert_eq!(cache.assignments().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_loads_collapse_into_one() {
        let source = Arc::new(MockSource::default());
        let cache = cache_with(&source);

        let results =
            futures::future::join_all((0..16).map(|_| cache.ensure_loaded(None))).await;

        assert!(results.iter().all(Result::is_ok));
        for kind in SourceKind::ALL {
            assert_eq!(source.calls(kind), 1);
        }
        assert!(cache.is_loaded());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_loads_across_tasks() {
        let source = Arc::new(MockSource::default());
        let cache = cache_with(&source);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.ensure_loaded(None).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        for kind in SourceKind::ALL {
            assert_eq!(source.calls(kind), 1);
        }
    }

    #[tokio::test]
    async fn test_failure_is_shared_and_not_cached() {
        let source = Arc::new(MockSource::default());
        source.fail_with(Some(SourceError::unavailable(SourceKind::Projects, "HTTP 503")));
        let cache = cache_with(&source);

        let results =
            futures::future::join_all((0..4).map(|_| cache.ensure_loaded(None))).await;
        for result in &results {
            let err = result.as_ref().unwrap_err();
            assert!(err.to_string().contains("HTTP 503"));
        }
        assert_eq!(source.calls(SourceKind::Projects), 1);
        assert!(!cache.is_loaded());
        assert!(cache.employees().is_empty());

        source.fail_with(None);
        cache.ensure_loaded(None).await.unwrap();
        assert_eq!(source.calls(SourceKind::Projects), 2);
        assert_eq!(cache.employees().len(), 2);
    }

    #[tokio::test]
    async fn test_auth_required_propagates() {
        let source = Arc::new(MockSource::default());
        source.fail_with(Some(SourceError::auth_required(SourceKind::Employees, "sign-in page")));
        let cache = cache_with(&source);

        let err = cache.ensure_loaded(None).await.unwrap_err();
        assert!(err.requires_auth());
        assert!(cache.snapshot().projects.is_empty());
    }

    #[tokio::test]
    async fn test_parse_error_leaves_cache_empty() {
        let source = Arc::new(MockSource::default());
        *source.bad_csv.lock().unwrap() = Some(SourceKind::Assignments);
        let cache = cache_with(&source);

        let err = cache.ensure_loaded(None).await.unwrap_err();
        assert!(matches!(err, LoadError::Parse { kind: SourceKind::Assignments, .. }));
        assert!(cache.employees().is_empty());
        assert!(!cache.is_loaded());
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let source = Arc::new(MockSource::default());
        let cache = cache_with(&source);

        cache.ensure_loaded(None).await.unwrap();
        cache.invalidate();
        assert!(cache.employees().is_empty());

        cache.ensure_loaded(None).await.unwrap();
        assert_eq!(source.calls(SourceKind::Employees), 2);
        assert_eq!(cache.employees().len(), 2);
    }

    #[tokio::test]
    async fn test_changed_mtime_triggers_reload() {
        let source = Arc::new(MockSource::default());
        source.touch(SourceKind::Employees, 100);
        let cache = cache_with(&source);

        cache.ensure_loaded(None).await.unwrap();
        cache.ensure_loaded(None).await.unwrap();
        assert_eq!(source.calls(SourceKind::Employees), 1);

        source.touch(SourceKind::Employees, 200);
        cache.ensure_loaded(None).await.unwrap();
        assert_eq!(source.calls(SourceKind::Employees), 2);
        assert_eq!(source.calls(SourceKind::Projects), 2);
    }

    #[tokio::test]
    async fn test_invalidate_during_load_discards_result() {
        let gate = Arc::new(Semaphore::new(0));
        let source = Arc::new(MockSource {
            gate: Some(gate.clone()),
            ..Default::default()
        });
        let cache = cache_with(&source);

        let pending = tokio::spawn({
            let cache = cache.clone();
            async move { cache.ensure_loaded(None).await }
        });
        while source.calls(SourceKind::Assignments) == 0 {
            tokio::task::yield_now().await;
        }

        cache.invalidate();
        gate.add_permits(3);
        pending.await.unwrap().unwrap();
        assert!(!cache.is_loaded());
        assert!(cache.employees().is_empty());

        gate.add_permits(3);
        cache.ensure_loaded(None).await.unwrap();
        assert_eq!(source.calls(SourceKind::Employees), 2);
        assert!(cache.is_loaded());
    }
}
