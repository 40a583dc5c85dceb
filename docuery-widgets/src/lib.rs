pub mod document_viewer;
pub mod split_layout;

pub use document_viewer::{DocumentViewer, ReflowTarget, ViewerState};
pub use split_layout::{
    clamp_ratio, ContainerRect, SplitLayout, DEFAULT_SPLIT_RATIO, MAX_SPLIT_RATIO,
    MIN_SPLIT_RATIO, SPLIT_RATIO_STORAGE_KEY,
};
