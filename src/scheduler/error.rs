use thiserror::Error;

use crate::vnode::InvalidSubtree;

/// Error returned by a view callback.
pub type ViewError = Box<dyn std::error::Error>;

/// Why a single render of one instance failed.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("view callback failed: {0}")]
    View(ViewError),
    #[error("view returned an invalid subtree: {0}")]
    InvalidSubtree(#[from] InvalidSubtree),
    #[error("view callback panicked: {0}")]
    Panicked(String),
}

/// The frame host could not schedule a callback.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("frame host rejected the request: {0}")]
    Host(String),
}

#[derive(Error, Debug)]
pub enum RedrawError {
    #[error("instance is currently locked by another redraw")]
    Locked,
    #[error("instance is not mounted")]
    NotMounted,
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

impl RedrawError {
    /// `true` for errors that go away once the in-progress redraw finishes.
    pub fn is_locked(&self) -> bool {
        matches!(self, RedrawError::Locked)
    }
}
