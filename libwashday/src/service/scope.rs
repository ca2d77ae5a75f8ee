//! Request tasks tied to the lifetime of a view
//!
//! A view starts remote reads when it opens and must not apply their results
//! after it closes. `ViewScope` owns the spawned tasks: closing or dropping
//! the scope aborts whatever is still running, and a result that completes
//! after the close is discarded instead of being delivered.
//!
//! ```no_run
//! use libwashday::service::scope::ViewScope;
//!
//! # async fn example(catalog: libwashday::service::catalog::CatalogService) {
//! let scope = ViewScope::new("service selection");
//! scope.spawn(
//!     async move { catalog.active_services().await },
//!     |services| println!("{} services", services.into_vec().len()),
//! );
//! // Leaving the view
//! scope.close();
//! # }
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;

pub struct ViewScope {
    name: String,
    alive: Arc<AtomicBool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ViewScope {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alive: Arc::new(AtomicBool::new(true)),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn is_open(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Run `request` on the runtime and hand its output to `deliver`
    ///
    /// `deliver` is skipped when the scope closed while the request ran.
    /// Must be called from within a tokio runtime.
    pub fn spawn<F, T, C>(&self, request: F, deliver: C)
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
        C: FnOnce(T) + Send + 'static,
    {
        if !self.is_open() {
            tracing::debug!(scope = %self.name, "scope closed; request not started");
            return;
        }

        let alive = Arc::clone(&self.alive);
        let name = self.name.clone();
        let handle = tokio::spawn(async move {
            let output = request.await;
            if alive.load(Ordering::Acquire) {
                deliver(output);
            } else {
                tracing::debug!(scope = %name, "discarding result of closed scope");
            }
        });

        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|t| !t.is_finished());
        tasks.push(handle);
    }

    /// Await `request` in place; `None` if the scope closed meanwhile
    pub async fn run<F, T>(&self, request: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        if !self.is_open() {
            return None;
        }
        let output = request.await;
        self.is_open().then_some(output)
    }

    /// Number of spawned tasks not yet finished
    pub fn pending(&self) -> usize {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|t| !t.is_finished())
            .count()
    }

    /// Abort running requests and drop any result still to come
    pub fn close(&self) {
        if !self.alive.swap(false, Ordering::AcqRel) {
            return;
        }

        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        let running = tasks.iter().filter(|t| !t.is_finished()).count();
        for task in tasks {
            task.abort();
        }
        tracing::debug!(scope = %self.name, aborted = running, "scope closed");
    }
}

impl Drop for ViewScope {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ViewScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewScope")
            .field("name", &self.name)
            .field("open", &self.is_open())
            .finish()
    }
}
