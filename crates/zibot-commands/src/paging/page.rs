//! Page content produced by command handlers.

use super::PagingError;

/// One page of output. The core treats it as opaque content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    /// Optional heading.
    pub title: Option<String>,
    /// Main content.
    pub body: String,
    /// Optional footer line.
    pub footer: Option<String>,
}

impl Page {
    /// Creates a page with the given body.
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }

    /// Sets the title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the footer.
    #[must_use]
    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }
}

/// A non-empty, ordered sequence of pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSet {
    pages: Vec<Page>,
}

impl PageSet {
    /// Builds a page set, rejecting an empty list.
    pub fn new(pages: Vec<Page>) -> Result<Self, PagingError> {
        if pages.is_empty() {
            return Err(PagingError::EmptyPageSet);
        }
        Ok(Self { pages })
    }

    /// A page set holding a single page.
    pub fn single(page: Page) -> Self {
        Self { pages: vec![page] }
    }

    /// Number of pages, always at least 1.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Raw page at `index`.
    pub fn get(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    /// The page at `index` as it is shown to users.
    ///
    /// Multi-page sets get a `Page i/N` indicator prepended to the footer.
    /// Out-of-range indices are clamped to the last page.
    pub fn render(&self, index: usize) -> Page {
        let index = index.min(self.pages.len() - 1);
        let mut page = self.pages[index].clone();
        if self.pages.len() > 1 {
            let position = format!("Page {}/{}", index + 1, self.pages.len());
            page.footer = Some(match page.footer.take() {
                Some(footer) => format!("{position} • {footer}"),
                None => position,
            });
        }
        page
    }
}
