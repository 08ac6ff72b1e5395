//! Links, named destinations and the initial view of the document.

/// Where a link leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// A named destination within the document.
    Internal(String),
    /// An external URI.
    Uri(String),
}

impl LinkTarget {
    /// Parse a link target from a URL as it appears in a document.
    ///
    /// A leading `#` refers to a named destination. Returns `None` for a bare `#`.
    pub fn parse(url: &str) -> Option<Self> {
        match url.strip_prefix('#') {
            Some("") => None,
            Some(name) => Some(LinkTarget::Internal(name.to_string())),
            None => Some(LinkTarget::Uri(url.to_string())),
        }
    }
}

/// How a page is shown when the document is opened.
///
/// Coordinates are in backend space. `None` leaves the respective value unchanged
/// from what the viewer currently uses.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DefaultView {
    /// Fit the whole page into the window.
    #[default]
    Fit,
    /// Fit the width of the page, with the given top edge.
    FitH(Option<f32>),
    /// Fit the height of the page, with the given left edge.
    FitV(Option<f32>),
    /// Fit a rectangle into the window.
    FitR {
        /// The left edge.
        left: f32,
        /// The bottom edge.
        bottom: f32,
        /// The right edge.
        right: f32,
        /// The top edge.
        top: f32,
    },
    /// Fit the bounding box of the page contents.
    FitB,
    /// Fit the width of the bounding box of the page contents.
    FitBH(Option<f32>),
    /// Fit the height of the bounding box of the page contents.
    FitBV(Option<f32>),
    /// Show the page at a position and zoom factor.
    Xyz {
        /// The left edge.
        left: Option<f32>,
        /// The top edge.
        top: Option<f32>,
        /// The zoom factor. `Some(1.0)` means 100%.
        zoom: Option<f32>,
    },
}

impl DefaultView {
    /// Build a view from a view name and its numeric parameters, in the order they
    /// appear in a destination array.
    ///
    /// Missing parameters are treated as unset. Unknown names fall back to
    /// [`DefaultView::Fit`].
    pub fn from_name(name: &str, options: &[f32]) -> Self {
        let opt = |i: usize| options.get(i).copied();
        let req = |i: usize| opt(i).unwrap_or(0.0);

        match name {
            "FitH" => DefaultView::FitH(opt(0)),
            "FitV" => DefaultView::FitV(opt(0)),
            "FitR" => DefaultView::FitR {
                left: req(0),
                bottom: req(1),
                right: req(2),
                top: req(3),
            },
            "FitB" => DefaultView::FitB,
            "FitBH" => DefaultView::FitBH(opt(0)),
            "FitBV" => DefaultView::FitBV(opt(0)),
            "XYZ" => DefaultView::Xyz {
                left: opt(0),
                top: opt(1),
                zoom: opt(2),
            },
            _ => DefaultView::Fit,
        }
    }

    /// The PDF name of the view.
    pub fn name(&self) -> &'static str {
        match self {
            DefaultView::Fit => "Fit",
            DefaultView::FitH(_) => "FitH",
            DefaultView::FitV(_) => "FitV",
            DefaultView::FitR { .. } => "FitR",
            DefaultView::FitB => "FitB",
            DefaultView::FitBH(_) => "FitBH",
            DefaultView::FitBV(_) => "FitBV",
            DefaultView::Xyz { .. } => "XYZ",
        }
    }

    /// The parameters following the name in a destination array.
    pub fn parameters(&self) -> Vec<Option<f32>> {
        match self {
            DefaultView::Fit | DefaultView::FitB => vec![],
            DefaultView::FitH(v)
            | DefaultView::FitV(v)
            | DefaultView::FitBH(v)
            | DefaultView::FitBV(v) => vec![*v],
            DefaultView::FitR {
                left,
                bottom,
                right,
                top,
            } => vec![Some(*left), Some(*bottom), Some(*right), Some(*top)],
            DefaultView::Xyz { left, top, zoom } => vec![*left, *top, *zoom],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_and_external_links() {
        assert_eq!(
            LinkTarget::parse("#chapter-2"),
            Some(LinkTarget::Internal("chapter-2".to_string()))
        );
        assert_eq!(
            LinkTarget::parse("https://example.com/#top"),
            Some(LinkTarget::Uri("https://example.com/#top".to_string()))
        );
        assert_eq!(LinkTarget::parse("#"), None);
    }

    #[test]
    fn view_from_name() {
        assert_eq!(DefaultView::from_name("FitH", &[700.0]), DefaultView::FitH(Some(700.0)));
        assert_eq!(
            DefaultView::from_name("XYZ", &[0.0, 800.0]),
            DefaultView::Xyz {
                left: Some(0.0),
                top: Some(800.0),
                zoom: None
            }
        );
        assert_eq!(DefaultView::from_name("Nonsense", &[]), DefaultView::Fit);
    }

    #[test]
    fn view_parameters() {
        assert!(DefaultView::Fit.parameters().is_empty());
        assert_eq!(
            DefaultView::FitR {
                left: 1.0,
                bottom: 2.0,
                right: 3.0,
                top: 4.0
            }
            .parameters(),
            vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)]
        );
        assert_eq!(DefaultView::FitBV(None).parameters(), vec![None]);
    }
}
