//! Content that is repeated on every page.
//!
//! Page headers and footers usually contain the current page number and the total
//! number of pages, but the total is only known once the whole document has been
//! laid out. Such content is therefore queued while the document is being drawn
//! and replayed on every page right before the document is written.

use crate::backend::{Backend, LineStyle};
use crate::canvas::{Canvas, TextStyle};
use crate::color::Color;
use crate::error::CanvasResult;

/// The placeholder that is replaced with the number of the page.
pub const PAGE_NUM: &str = "{PAGE_NUM}";
/// The placeholder that is replaced with the total number of pages.
pub const PAGE_COUNT: &str = "{PAGE_COUNT}";

/// A text that is drawn on every page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageTextRequest {
    /// The x coordinate of the top-left corner of the text.
    pub x: f32,
    /// The y coordinate of the top-left corner of the text.
    pub y: f32,
    /// The text, possibly containing [`PAGE_NUM`] and [`PAGE_COUNT`].
    pub text: String,
    /// How the text is drawn.
    pub style: TextStyle,
}

impl PageTextRequest {
    /// The text with all placeholders replaced.
    pub fn substitute(&self, page_num: usize, page_count: usize) -> String {
        self.text
            .replace(PAGE_NUM, &page_num.to_string())
            .replace(PAGE_COUNT, &page_count.to_string())
    }
}

/// A line that is drawn on every page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLineRequest {
    /// The x coordinate of the start point.
    pub x1: f32,
    /// The y coordinate of the start point.
    pub y1: f32,
    /// The x coordinate of the end point.
    pub x2: f32,
    /// The y coordinate of the end point.
    pub y2: f32,
    /// The stroke color.
    pub color: Color,
    /// The line style.
    pub style: LineStyle,
}

/// Something that is drawn on every page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageRequest {
    /// A text.
    Text(PageTextRequest),
    /// A line.
    Line(PageLineRequest),
}

/// The queue of requests that are replayed on every page.
#[derive(Debug, Default)]
pub struct Overlay {
    queue: Vec<PageRequest>,
}

impl Overlay {
    /// Create an empty overlay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a request. Nothing is drawn until the overlay is replayed.
    pub fn push(&mut self, request: PageRequest) {
        self.queue.push(request);
    }

    /// The queued requests, in the order they will be drawn.
    pub fn requests(&self) -> &[PageRequest] {
        &self.queue
    }

    /// Whether nothing has been queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Draw all queued requests on every page of the canvas.
    ///
    /// An empty overlay does not touch the canvas at all.
    pub(crate) fn replay<B: Backend>(self, canvas: &mut Canvas<B>) -> CanvasResult<()> {
        if self.queue.is_empty() {
            return Ok(());
        }

        if canvas.backend().is_finished() {
            log::warn!("not replaying page overlay into a finished document");
            return Ok(());
        }

        let pages = canvas.backend().page_count();
        let page_count = canvas.page_count();

        log::debug!(
            "replaying {} overlay requests on {pages} pages",
            self.queue.len()
        );

        for index in 0..pages {
            let page_num = index + 1;

            canvas.reopen_page(index);
            canvas.save();

            for request in &self.queue {
                match request {
                    PageRequest::Text(text) => {
                        let substituted = text.substitute(page_num, page_count);
                        canvas.text(text.x, text.y, &substituted, &text.style)?;
                    }
                    PageRequest::Line(line) => {
                        canvas.line(
                            line.x1,
                            line.y1,
                            line.x2,
                            line.y2,
                            &line.color,
                            &line.style,
                        );
                    }
                }
            }

            canvas.restore();
        }

        Ok(())
    }
}
