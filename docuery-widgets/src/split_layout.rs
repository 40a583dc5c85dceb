//! # SplitLayout - Resizable chat/viewer split
//!
//! Owns the percentage of the workspace given to the chat pane and the
//! drag-to-resize interaction that changes it.
//!
//! ## Drag lifecycle
//! - `begin_resize` on pointer-down over the divider (`Idle -> Resizing`)
//! - `pointer_move` recomputes the ratio immediately, last write wins
//! - `pointer_up` / `pointer_cancel` persist the ratio and publish a new
//!   settle token (`Resizing -> Idle`)
//!
//! Viewers subscribe to the settle token to reflow once the layout is stable.

use std::sync::Arc;

use docuery_data::KeyValueStorage;
use tokio::sync::watch;

/// Storage key of the persisted ratio.
pub const SPLIT_RATIO_STORAGE_KEY: &str = "docuery:workspace-split-ratio";
pub const MIN_SPLIT_RATIO: f64 = 30.0;
pub const MAX_SPLIT_RATIO: f64 = 70.0;
pub const DEFAULT_SPLIT_RATIO: f64 = 50.0;

/// Clamp a ratio into `[MIN_SPLIT_RATIO, MAX_SPLIT_RATIO]`.
pub fn clamp_ratio(value: f64) -> f64 {
    value.clamp(MIN_SPLIT_RATIO, MAX_SPLIT_RATIO)
}

/// Measured bounds of the container holding both panes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContainerRect {
    pub left: f64,
    pub width: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Resizing,
}

pub struct SplitLayout {
    ratio: f64,
    drag: DragState,
    storage: Arc<dyn KeyValueStorage>,
    settled: watch::Sender<u64>,
}

impl SplitLayout {
    /// Restore the ratio from storage, falling back to the default when the
    /// stored value is missing or not a finite number.
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        let ratio = storage
            .get(SPLIT_RATIO_STORAGE_KEY)
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|value| value.is_finite())
            .map(clamp_ratio)
            .unwrap_or(DEFAULT_SPLIT_RATIO);
        log::debug!("Split layout restored at {}%", ratio);

        let (settled, _) = watch::channel(0);
        Self {
            ratio,
            drag: DragState::Idle,
            storage,
            settled,
        }
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Flex basis of the chat pane, in percent.
    pub fn chat_pane_basis(&self) -> f64 {
        self.ratio
    }

    /// Flex basis of the viewer pane, in percent.
    pub fn viewer_pane_basis(&self) -> f64 {
        100.0 - self.ratio
    }

    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    pub fn is_resizing(&self) -> bool {
        self.drag == DragState::Resizing
    }

    /// Number of completed drags so far.
    pub fn settle_token(&self) -> u64 {
        *self.settled.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.settled.subscribe()
    }

    pub fn begin_resize(&mut self) {
        self.drag = DragState::Resizing;
    }

    /// Track the pointer while resizing. Returns whether the ratio was
    /// recomputed.
    pub fn pointer_move(&mut self, pointer_x: f64, container: ContainerRect) -> bool {
        if !self.is_resizing() {
            return false;
        }
        // Nothing measured yet: no meaningful ratio
        if !(container.width.is_finite() && container.width > 0.0) {
            return false;
        }

        let ratio = (pointer_x - container.left) * 100.0 / container.width;
        if !ratio.is_finite() {
            return false;
        }
        self.ratio = clamp_ratio(ratio);
        true
    }

    pub fn pointer_up(&mut self) {
        self.finish_resize();
    }

    pub fn pointer_cancel(&mut self) {
        self.finish_resize();
    }

    /// Programmatic resize, e.g. from a keyboard shortcut.
    pub fn set_ratio(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        self.ratio = clamp_ratio(value);
        self.persist();
    }

    fn finish_resize(&mut self) {
        if !self.is_resizing() {
            return;
        }
        self.drag = DragState::Idle;
        self.persist();
        self.settled.send_modify(|token| *token += 1);
        log::debug!("Resize settled at {}%", self.ratio);
    }

    fn persist(&self) {
        self.storage
            .set(SPLIT_RATIO_STORAGE_KEY, &self.ratio.to_string());
    }
}
