//! Rendering: frame buffer, drawing primitives, the authoritative 2D
//! pipeline, and the terminal diff presenter.

mod buffer;
pub mod diff;
pub mod painter;
pub mod primitives;

pub use buffer::FrameBuffer;
pub use diff::DiffPresenter;
pub use painter::{Painter, PreviewPayload, ViewMode};
