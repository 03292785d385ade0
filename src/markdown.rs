//! Converts article and page bodies from markdown to HTML.
//!
//! A single [`Markdown`] converter is shared by the whole build. Its HTML
//! renderer remembers footnote numbers between events, so every conversion
//! has to start from a clean slate; [`Markdown::convert`] resets and
//! converts in one step and there is no way to do one without the other.

use crate::htmlrenderer::HtmlRenderer;
use pulldown_cmark::{Options, Parser};
use std::fmt;
use std::io;

/// The markdown converter.
pub struct Markdown {
    options: Options,
    renderer: HtmlRenderer,
}

impl Default for Markdown {
    fn default() -> Self {
        Markdown::new()
    }
}

impl Markdown {
    /// Creates a converter with footnotes, smart punctuation (quotes, dashes,
    /// ellipses), strikethrough, tables, and task lists enabled.
    pub fn new() -> Markdown {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_SMART_PUNCTUATION);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_TASKLISTS);
        Markdown {
            options,
            renderer: HtmlRenderer::new(),
        }
    }

    /// Converts `markdown` to HTML. `document_id` identifies the document
    /// (e.g., its source path) and is slugified into the prefix of its
    /// footnote ids, so the same document always gets the same ids.
    pub fn convert(&mut self, document_id: &str, markdown: &str) -> Result<String> {
        self.renderer.reset(&footnote_prefix(document_id));
        let mut html = String::with_capacity(markdown.len() * 3 / 2);
        for event in Parser::new_ext(markdown, self.options) {
            self.renderer.on_event(&mut html, event)?;
        }
        Ok(html)
    }
}

fn footnote_prefix(document_id: &str) -> String {
    let slug = slug::slugify(document_id);
    if slug.is_empty() {
        String::from("fn-")
    } else {
        format!("{}-fn-", slug)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error converting markdown to HTML.
#[derive(Debug)]
pub enum Error {
    /// Returned when the HTML sink fails.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "Rendering markdown: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
        }
    }
}

impl From<io::Error> for Error {
    /// Converts a [`io::Error`] into an [`Error`]. It allows us to use the `?`
    /// operator for the renderer's writes.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}
