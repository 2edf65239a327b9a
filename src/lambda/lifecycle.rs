use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use futures::FutureExt;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::lambda::handler::panic_message;

/// Capability set shared by every invocation of a deployed handler.
///
/// `release` runs once, when the process is asked to terminate or a scoped
/// run ends.
pub trait Resources: Send + Sync + 'static {
    fn release(&self) -> impl Future<Output = ()> + Send {
        async {}
    }
}

impl Resources for () {}

struct Inner<R> {
    resources: Arc<R>,
    released: OnceCell<()>,
    hook_installed: AtomicBool,
}

/// Owner of the capability set: built once per handler, released once.
pub struct Lifecycle<R> {
    inner: Arc<Inner<R>>,
}

impl<R> Clone for Lifecycle<R> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl Lifecycle<()> {
    /// Lifecycle without extra capabilities.
    pub fn empty() -> Self {
        Lifecycle::new(())
    }
}

impl<R: Resources> Lifecycle<R> {
    pub fn new(resources: R) -> Self {
        Self {
            inner: Arc::new(Inner {
                resources: Arc::new(resources),
                released: OnceCell::new(),
                hook_installed: AtomicBool::new(false),
            }),
        }
    }

    /// Build the capability set with a fallible async constructor.
    pub async fn acquire<F, Fut>(acquire: F) -> Result<Self>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        let resources = acquire().await?;
        info!("[runtime] resources acquired");
        Ok(Self::new(resources))
    }

    pub fn resources(&self) -> Arc<R> {
        self.inner.resources.clone()
    }

    pub fn is_released(&self) -> bool {
        self.inner.released.initialized()
    }

    pub fn has_shutdown_hook(&self) -> bool {
        self.inner.hook_installed.load(Ordering::SeqCst)
    }

    /// Release the capability set. Runs the release once; concurrent callers
    /// wait for it to finish.
    pub async fn release(&self) {
        let resources = self.inner.resources.clone();
        self.inner
            .released
            .get_or_init(|| async move {
                info!("[runtime] cleaning up");
                resources.release().await;
            })
            .await;
    }

    /// Run `work` with the capability set, then release it, whether `work`
    /// returned or panicked. A panic comes back as an error.
    pub async fn scoped<F, Fut, T>(&self, work: F) -> Result<T>
    where
        F: FnOnce(Arc<R>) -> Fut,
        Fut: Future<Output = T>,
    {
        let resources = self.resources();
        let outcome = AssertUnwindSafe(async move { work(resources).await })
            .catch_unwind()
            .await;
        self.release().await;
        outcome.map_err(|panic| anyhow!("scoped work panicked: {}", panic_message(panic.as_ref())))
    }

    /// Log the signal and release the capability set.
    pub async fn shutdown(&self, signal: &str) {
        info!("[runtime] {} received", signal);
        self.release().await;
    }

    /// Register the process-wide termination hook: on SIGTERM or SIGINT the
    /// capability set is released and the process exits with code 0.
    /// Installing it again for the same lifecycle does nothing.
    pub fn install_shutdown_hook(&self) -> Result<Option<JoinHandle<()>>> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|err| anyhow!("shutdown hook needs a tokio runtime: {}", err))?;
        if self.inner.hook_installed.swap(true, Ordering::SeqCst) {
            return Ok(None);
        }

        let lifecycle = self.clone();
        Ok(Some(runtime.spawn(async move {
            let signal = shutdown_signal().await;
            lifecycle.shutdown(signal).await;
            info!("[runtime] exiting");
            std::process::exit(0);
        })))
    }
}

/// Resolves with the name of the first termination signal received.
pub async fn shutdown_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = terminate.recv() => "SIGTERM",
                    _ = tokio::signal::ctrl_c() => "SIGINT",
                }
            }
            Err(err) => {
                warn!("cannot listen for SIGTERM: {}", err);
                let _ = tokio::signal::ctrl_c().await;
                "SIGINT"
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        "SIGINT"
    }
}
