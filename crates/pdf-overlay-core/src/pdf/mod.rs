mod canvas;
mod content;
mod document;
mod page_index;
mod text;
mod render;
pub mod overlay;

pub use canvas::{PdfPageCanvas, encode_win_ansi};
pub use content::{PageContent, PageRect, TextSurface};
pub use document::PdfDocument;
pub use page_index::PageIndex;
pub use text::PageTextReader;
pub use render::{DEFAULT_RENDER_SCALE, PageRenderer};
pub use overlay::{OverlayOptions, OverlayOutcome, OverlayPlacement, OverlayRenderer, wrap_lines};
