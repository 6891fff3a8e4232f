//! Preview controller
//!
//! Owns the selection over a fixed list of locators and renders the first page of
//! the selected document onto a [`TargetSurface`] sized to its container.
//!
//! Every render captures a generation number. Selection changes, newer renders and
//! [`PreviewController::shutdown`] bump the generation, and a render only commits
//! status or pixels while its generation is still current. Overlapping renders
//! therefore never overwrite the result of a newer one.
//!
//! [`TargetSurface`]: crate::preview::TargetSurface

use crate::error::{Error, LOAD_FAILED_MESSAGE};
use crate::pdf::DocumentService;
use crate::preview::download::{Downloader, SaveAction};
use crate::preview::state::{PreviewSnapshot, RenderStatus};
use crate::preview::surface::{fit_scale, ContainerSize, SharedSurface, DEFAULT_MAX_SCALE};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

/// Only the first page of each document is previewed
const PREVIEW_PAGE: u32 = 1;

/// Tuning for the preview controller
#[derive(Debug, Clone)]
pub struct PreviewConfig {
    /// Upper bound on the fit scale (default: 2.0)
    pub max_scale: f32,
    /// Delay between container measurements while layout is pending (default: 100ms)
    pub layout_retry_interval: Duration,
    /// Measurements before giving up on layout; `None` waits until superseded (default: None)
    pub max_layout_attempts: Option<u32>,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            max_scale: DEFAULT_MAX_SCALE,
            layout_retry_interval: Duration::from_millis(100),
            max_layout_attempts: None,
        }
    }
}

struct State {
    index: usize,
    status: RenderStatus,
    generation: u64,
    surface: Option<SharedSurface>,
    downloader: Option<Arc<dyn Downloader>>,
    shut_down: bool,
}

struct Inner {
    locators: Vec<String>,
    service: Arc<dyn DocumentService>,
    config: PreviewConfig,
    state: Mutex<State>,
    selection: watch::Sender<usize>,
    snapshots: watch::Sender<PreviewSnapshot>,
    layout: Notify,
    /// Live [`SelectionWatch`] handles
    watchers: AtomicUsize,
}

enum LayoutWait {
    Ready(ContainerSize),
    Superseded,
    GaveUp(u32),
}

enum RenderOutcome {
    Painted { width: u32, height: u32, scale: f32 },
    Superseded,
    LayoutGaveUp(u32),
}

/// Preview controller over a fixed list of document locators
#[derive(Clone)]
pub struct PreviewController {
    inner: Arc<Inner>,
}

impl PreviewController {
    pub fn new<I>(locators: I, service: Arc<dyn DocumentService>) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self::with_config(locators, service, PreviewConfig::default())
    }

    pub fn with_config<I>(
        locators: I,
        service: Arc<dyn DocumentService>,
        config: PreviewConfig,
    ) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let locators: Vec<String> = locators.into_iter().map(Into::into).collect();
        let state = State {
            index: 0,
            status: RenderStatus::Idle,
            generation: 0,
            surface: None,
            downloader: None,
            shut_down: false,
        };
        let initial = Self::snapshot_of(&locators, &state);
        let (selection, _) = watch::channel(0);
        let (snapshots, _) = watch::channel(initial);

        Self {
            inner: Arc::new(Inner {
                locators,
                service,
                config,
                state: Mutex::new(state),
                selection,
                snapshots,
                layout: Notify::new(),
                watchers: AtomicUsize::new(0),
            }),
        }
    }

    pub fn config(&self) -> &PreviewConfig {
        &self.inner.config
    }

    pub fn locators(&self) -> &[String] {
        &self.inner.locators
    }

    pub fn len(&self) -> usize {
        self.inner.locators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.locators.is_empty()
    }

    pub fn index(&self) -> usize {
        self.inner.state.lock().index
    }

    /// Locator of the selected document; `None` when the list is empty or the entry is empty
    pub fn current_locator(&self) -> Option<&str> {
        let index = self.index();
        self.locator_at(index)
    }

    pub fn status(&self) -> RenderStatus {
        self.inner.state.lock().status.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.lock().status.is_loading()
    }

    pub fn error_message(&self) -> Option<String> {
        self.inner
            .state
            .lock()
            .status
            .error_message()
            .map(str::to_string)
    }

    pub fn snapshot(&self) -> PreviewSnapshot {
        let state = self.inner.state.lock();
        Self::snapshot_of(&self.inner.locators, &state)
    }

    /// Receive a snapshot after every state change
    pub fn subscribe(&self) -> watch::Receiver<PreviewSnapshot> {
        self.inner.snapshots.subscribe()
    }

    /// Attach the surface renders draw into
    pub fn bind_surface(&self, surface: SharedSurface) {
        self.inner.state.lock().surface = Some(surface);
        self.inner.layout.notify_waiters();
    }

    /// Detach the surface; renders started afterwards return immediately
    pub fn unbind_surface(&self) -> Option<SharedSurface> {
        self.inner.state.lock().surface.take()
    }

    pub fn bind_downloader(&self, downloader: Arc<dyn Downloader>) {
        self.inner.state.lock().downloader = Some(downloader);
    }

    /// Select the next document; no-op on the last one
    pub fn select_next(&self) {
        let index = self.index();
        if index + 1 < self.len() {
            self.set_index(index + 1);
        }
    }

    /// Select the previous document; no-op on the first one
    pub fn select_previous(&self) {
        let index = self.index();
        if index > 0 {
            self.set_index(index - 1);
        }
    }

    /// Select a document by index, clamped into range; no-op for an empty list
    pub fn select(&self, index: usize) {
        if self.is_empty() {
            return;
        }
        self.set_index(index.min(self.len() - 1));
    }

    /// Tell the controller the surface's container changed size.
    /// Wakes renders waiting for layout without waiting out the retry interval.
    pub fn notify_layout(&self) {
        self.inner.layout.notify_waiters();
    }

    /// Tear down: pending renders stop and drop their results, later renders are no-ops
    pub fn shutdown(&self) {
        {
            let mut state = self.inner.state.lock();
            state.shut_down = true;
            state.generation += 1;
            if state.status.is_loading() {
                state.status = RenderStatus::Idle;
            }
            self.publish(&state);
        }
        self.inner.layout.notify_waiters();
        tracing::debug!("preview controller shut down");
    }

    /// Re-render whenever the selected locator changes.
    ///
    /// Each render runs in its own task so a render waiting on layout does not hold
    /// up the next selection. Dropping the returned handle ends the subscription.
    /// Must be called inside a Tokio runtime.
    pub fn watch_selection(&self) -> SelectionWatch {
        let mut selection = self.inner.selection.subscribe();
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        self.inner.watchers.fetch_add(1, Ordering::SeqCst);

        let task = tokio::spawn({
            let weak = weak.clone();
            async move {
                while selection.changed().await.is_ok() {
                    let Some(inner) = weak.upgrade() else {
                        break;
                    };
                    let controller = PreviewController { inner };
                    tokio::spawn(async move { controller.render().await });
                }
            }
        });

        SelectionWatch {
            task,
            controller: weak,
        }
    }

    /// Issue a save action for the selected document; `None` without a locator
    pub fn download(&self) -> Option<SaveAction> {
        let (action, downloader) = {
            let state = self.inner.state.lock();
            let locator = self.locator_at(state.index)?;
            (
                SaveAction::for_document(locator, state.index),
                state.downloader.clone(),
            )
        };

        match downloader {
            Some(downloader) => downloader.activate(&action),
            None => tracing::warn!(filename = %action.filename, "no downloader bound"),
        }
        Some(action)
    }

    /// Render the first page of the selected document onto the bound surface.
    ///
    /// Returns immediately without touching state when there is no locator or no
    /// surface. Failures are logged and reported through [`RenderStatus::Errored`];
    /// this never fails itself.
    pub async fn render(&self) {
        let (generation, index, surface) = {
            let mut state = self.inner.state.lock();
            if state.shut_down || self.locator_at(state.index).is_none() {
                return;
            }
            let Some(surface) = state.surface.clone() else {
                return;
            };
            state.generation += 1;
            state.status = RenderStatus::Loading;
            self.publish(&state);
            (state.generation, state.index, surface)
        };
        let locator = &self.inner.locators[index];

        match self.render_locator(generation, locator, &surface).await {
            Ok(RenderOutcome::Painted {
                width,
                height,
                scale,
            }) => {
                tracing::debug!(locator = %locator, width, height, scale, "preview rendered");
            }
            Ok(RenderOutcome::Superseded) => {
                tracing::debug!(locator = %locator, "stale preview render discarded");
            }
            Ok(RenderOutcome::LayoutGaveUp(attempts)) => {
                tracing::warn!(locator = %locator, attempts, "container never laid out");
                self.finish(generation, RenderStatus::Idle);
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    kind = ?e.kind(),
                    locator = %locator,
                    "preview render failed"
                );
                let status = RenderStatus::Errored(LOAD_FAILED_MESSAGE.to_string());
                self.finish(generation, status);
            }
        }
    }

    async fn render_locator(
        &self,
        generation: u64,
        locator: &str,
        surface: &SharedSurface,
    ) -> Result<RenderOutcome, Error> {
        let document = self.inner.service.open(locator).await?;
        let page = document.page(PREVIEW_PAGE).await?;

        let container = match self.wait_for_layout(generation, surface).await {
            LayoutWait::Ready(size) => size,
            LayoutWait::Superseded => return Ok(RenderOutcome::Superseded),
            LayoutWait::GaveUp(attempts) => return Ok(RenderOutcome::LayoutGaveUp(attempts)),
        };

        let scale = fit_scale(container, page.measure(1.0), self.inner.config.max_scale);
        let (width, height) = page.measure(scale).to_pixels();

        if !self.is_current(generation) {
            return Ok(RenderOutcome::Superseded);
        }
        let painted = page.paint(scale).await?;

        let mut target = surface.lock();
        let mut state = self.inner.state.lock();
        if state.shut_down || state.generation != generation {
            return Ok(RenderOutcome::Superseded);
        }
        target.commit(width, height, painted);
        state.status = RenderStatus::Ready;
        self.publish(&state);

        Ok(RenderOutcome::Painted {
            width,
            height,
            scale,
        })
    }

    /// Poll the container until it has a nonzero size
    async fn wait_for_layout(&self, generation: u64, surface: &SharedSurface) -> LayoutWait {
        let mut attempts = 0u32;
        loop {
            // Register before measuring so a notify in between is not lost
            let notified = self.inner.layout.notified();

            if !self.is_current(generation) {
                return LayoutWait::Superseded;
            }
            let size = surface.lock().container_size();
            if size.is_laid_out() {
                return LayoutWait::Ready(size);
            }

            attempts += 1;
            if let Some(max) = self.inner.config.max_layout_attempts {
                if attempts >= max {
                    return LayoutWait::GaveUp(attempts);
                }
            }
            tracing::trace!(attempts, "container not laid out yet");

            tokio::select! {
                _ = tokio::time::sleep(self.inner.config.layout_retry_interval) => {}
                _ = notified => {}
            }
        }
    }

    fn set_index(&self, index: usize) {
        {
            let mut state = self.inner.state.lock();
            if state.index == index {
                return;
            }
            state.index = index;
            state.generation += 1;
            // Loading only when a live subscription will start the render
            let watched = self.inner.watchers.load(Ordering::SeqCst) > 0;
            let renderable = self.locator_at(index).is_some() && state.surface.is_some();
            state.status = if watched && renderable {
                RenderStatus::Loading
            } else {
                RenderStatus::Idle
            };
            self.publish(&state);
        }

        tracing::debug!(index, "selection changed");
        self.inner.selection.send_replace(index);
        self.inner.layout.notify_waiters();
    }

    /// Commit a terminal status if `generation` is still current
    fn finish(&self, generation: u64, status: RenderStatus) {
        let mut state = self.inner.state.lock();
        if state.shut_down || state.generation != generation {
            return;
        }
        state.status = status;
        self.publish(&state);
    }

    fn is_current(&self, generation: u64) -> bool {
        let state = self.inner.state.lock();
        !state.shut_down && state.generation == generation
    }

    fn locator_at(&self, index: usize) -> Option<&str> {
        self.inner
            .locators
            .get(index)
            .map(String::as_str)
            .filter(|locator| !locator.is_empty())
    }

    fn publish(&self, state: &State) {
        self.inner
            .snapshots
            .send_replace(Self::snapshot_of(&self.inner.locators, state));
    }

    fn snapshot_of(locators: &[String], state: &State) -> PreviewSnapshot {
        PreviewSnapshot {
            index: state.index,
            document_count: locators.len(),
            locator: locators.get(state.index).cloned(),
            loading: state.status.is_loading(),
            error: state.status.error_message().map(str::to_string),
            status: state.status.clone(),
        }
    }
}

/// Subscription created by [`PreviewController::watch_selection`]; ends on drop
pub struct SelectionWatch {
    task: JoinHandle<()>,
    controller: Weak<Inner>,
}

impl SelectionWatch {
    /// End the subscription. Renders it already started keep running.
    pub fn stop(self) {}
}

impl Drop for SelectionWatch {
    fn drop(&mut self) {
        self.task.abort();
        if let Some(inner) = self.controller.upgrade() {
            inner.watchers.fetch_sub(1, Ordering::SeqCst);
        }
    }
}
