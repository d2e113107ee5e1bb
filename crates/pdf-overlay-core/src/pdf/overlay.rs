//! Translation overlay layout.
//!
//! # Coordinate System
//!
//! Layout works in page points with a **top-left origin**:
//! - (0, 0) is at the top-left corner of the page
//! - X increases to the right
//! - Y increases downward
//!
//! The [`TextSurface`] implementation converts to PDF's bottom-left origin
//! when it writes the content stream.
//!
//! # Overlay Strategy
//!
//! The translated text is added next to the original, never over it:
//! 1. Pick an anchor and a width budget from the [`OverlayPosition`]
//! 2. Greedily word-wrap with an average-glyph-width estimate
//! 3. Draw at most [`MAX_OVERLAY_LINES`] lines, stopping near the bottom edge

use tracing::{debug, warn};

use crate::config::{OverlayPosition, TextColor};
use crate::error::Result;
use crate::util::is_blank;
use super::content::{PageRect, TextSurface};

// =============================================================================
// Layout Constants
// =============================================================================

/// Default font size for translations (in points).
pub const DEFAULT_FONT_SIZE: f32 = 8.0;

/// Line height as a multiple of font size.
pub const LINE_HEIGHT_FACTOR: f32 = 1.2;

/// Average character width as a fraction of font size.
pub const CHAR_WIDTH_FACTOR: f32 = 0.6;

/// Lines beyond this are dropped.
pub const MAX_OVERLAY_LINES: usize = 10;

/// No line is drawn with its baseline this close to the bottom edge (in points).
pub const BOTTOM_MARGIN: f32 = 20.0;

// =============================================================================
// Public Types
// =============================================================================

/// Options for overlay rendering
#[derive(Debug, Clone, Copy)]
pub struct OverlayOptions {
    /// Text color for translations
    pub text_color: TextColor,
    /// Font size for translations
    pub font_size: f32,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            text_color: TextColor::default(),
            font_size: DEFAULT_FONT_SIZE,
        }
    }
}

/// Anchor and width budget for an overlay block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayPlacement {
    /// Left edge of every line
    pub x: f32,
    /// Baseline of the first line
    pub y: f32,
    /// Width available to a line
    pub max_width: f32,
}

impl OverlayPlacement {
    pub fn for_position(position: OverlayPosition, page: PageRect) -> Self {
        let (x, y, max_width) = match position {
            OverlayPosition::Right => (0.6, 0.1, 0.35),
            OverlayPosition::Bottom => (0.05, 0.85, 0.9),
            OverlayPosition::Top => (0.05, 0.05, 0.9),
        };
        Self {
            x: page.width * x,
            y: page.height * y,
            max_width: page.width * max_width,
        }
    }
}

/// What happened when an overlay was drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OverlayOutcome {
    /// Lines actually written to the page
    pub lines_written: usize,
    /// Whether a write failed and the remaining lines were abandoned
    pub interrupted: bool,
}

// =============================================================================
// Layout
// =============================================================================

/// Greedy word wrap using an estimated line width of
/// `chars * font_size * CHAR_WIDTH_FACTOR`.
///
/// A line accepts a word only while the estimate stays strictly below
/// `max_width`. A single word wider than the budget still gets its own line.
pub fn wrap_lines(text: &str, max_width: f32, font_size: f32) -> Vec<String> {
    let fits = |line: &str| {
        #[allow(clippy::cast_precision_loss)]
        let chars = line.chars().count() as f32;
        chars * font_size * CHAR_WIDTH_FACTOR < max_width
    };

    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };

        if fits(&candidate) {
            current = candidate;
        } else {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            current = word.to_string();
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

// =============================================================================
// Renderer
// =============================================================================

/// Draws translated text onto a page.
#[derive(Debug, Clone, Default)]
pub struct OverlayRenderer {
    options: OverlayOptions,
}

impl OverlayRenderer {
    pub const fn new(options: OverlayOptions) -> Self {
        Self { options }
    }

    /// Lay out `text` at `position` and draw it.
    ///
    /// Blank text draws nothing. A failing line is logged and stops the
    /// overlay for this page; lines already drawn stay.
    pub fn render(
        &self,
        surface: &mut dyn TextSurface,
        text: &str,
        position: OverlayPosition,
    ) -> OverlayOutcome {
        let mut outcome = OverlayOutcome::default();
        if is_blank(text) {
            return outcome;
        }

        let page = surface.page_size();
        let placement = OverlayPlacement::for_position(position, page);
        let font_size = self.options.font_size;
        let line_height = font_size * LINE_HEIGHT_FACTOR;
        let lines = wrap_lines(text, placement.max_width, font_size);

        for (i, line) in lines.iter().take(MAX_OVERLAY_LINES).enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let line_y = placement.y + i as f32 * line_height;
            if line_y >= page.height - BOTTOM_MARGIN {
                break;
            }

            if let Err(e) = self.draw_line(surface, (placement.x, line_y), line) {
                warn!("Failed to add overlay text: {e}");
                outcome.interrupted = true;
                break;
            }
            outcome.lines_written += 1;
        }

        debug!(
            "Overlay at {position}: {} of {} lines",
            outcome.lines_written,
            lines.len()
        );
        outcome
    }

    fn draw_line(
        &self,
        surface: &mut dyn TextSurface,
        origin: (f32, f32),
        line: &str,
    ) -> Result<()> {
        surface.insert_text(origin, line, self.options.font_size, self.options.text_color)
    }
}

// =============================================================================
// Tests
// =============================================================================
