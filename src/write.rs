//! Page builders: each function renders one kind of output file (or, for
//! [`tweet`], one announcement string) from already-read [`Article`]s.
//!
//! Every HTML template receives the site context as `.site`, a
//! `page_title`, and a `card` variable which is either `false` or a bundle
//! of social-card fields (`title`, `summary`, `permalink`) for the shared
//! header partial.

use crate::article::Article;
use crate::markdown::{self, Markdown};
use crate::render::{self, Renderer};
use crate::util;
use crate::value::Vars;
use chrono::Datelike;
use log::info;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

pub const ARTICLE_TEMPLATE: &str = "article.html";
pub const TEXT_TEMPLATE: &str = "text.txt";
pub const HOMEPAGE_TEMPLATE: &str = "index.html";
pub const ARCHIVE_TEMPLATE: &str = "archive.html";
pub const PAGE_TEMPLATE: &str = "page.html";
pub const TWEET_TEMPLATE: &str = "tweet.txt";

/// Writes rendered pages beneath an output directory.
pub struct Writer<'a> {
    /// The renderer holding the template set.
    pub renderer: &'a Renderer,

    /// The root of the generated site. Article pages mirror their source
    /// paths beneath it.
    pub output_directory: &'a Path,
}

impl Writer<'_> {
    /// Writes the article's HTML page and its plain-text mirror, e.g.
    /// `articles/foo.text` becomes `{output}/articles/foo.html` and
    /// `{output}/articles/foo.text`.
    pub fn write_article(&self, article: &Article) -> Result<()> {
        let card = Vars::new()
            .text("title", article.title())
            .text("summary", article.summary())
            .text("permalink", &article.full_url);
        let html = self.renderer.render(
            ARTICLE_TEMPLATE,
            Vars::new()
                .text("page_title", article.title())
                .nested("card", card)
                .nested("article", article.vars().clone()),
        )?;
        self.write_file(&article.html_path(), &html)?;

        let text = self.renderer.render(
            TEXT_TEMPLATE,
            Vars::new().nested("article", article.vars().clone()),
        )?;
        self.write_file(&article.text_path(), &text)
    }

    /// Writes `index.html` listing `articles` in full, in the given order.
    pub fn write_homepage(&self, articles: &[Article]) -> Result<()> {
        info!("Homepage");
        let html = self.renderer.render(
            HOMEPAGE_TEMPLATE,
            Vars::new()
                .text("page_title", &self.renderer.site().title)
                .flag("card", false)
                .list(
                    "articles",
                    articles.iter().map(|a| a.vars().clone()).collect(),
                ),
        )?;
        self.write_file(Path::new("index.html"), &html)
    }

    /// Writes `archive.html` listing every article under year and month
    /// headings. See [`archive_entries`].
    pub fn write_archive(&self, articles: &[Article]) -> Result<()> {
        info!("Archive");
        let html = self.renderer.render(
            ARCHIVE_TEMPLATE,
            Vars::new()
                .text("page_title", "Archive")
                .flag("card", false)
                .list(
                    "entries",
                    archive_entries(articles)
                        .into_iter()
                        .map(ArchiveEntry::into_vars)
                        .collect(),
                ),
        )?;
        self.write_file(Path::new("archive.html"), &html)
    }

    /// Renders the static page at `source` (first line: title, remainder:
    /// markdown) into `{output}/{stem}.html`. `document_id` names the page
    /// for footnote ids.
    pub fn write_page(&self, source: &Path, document_id: &str, markdown: &mut Markdown) -> Result<()> {
        let text = std::fs::read_to_string(source).map_err(|err| Error::ReadPage {
            path: source.to_owned(),
            err,
        })?;
        let (title, body) = match text.split_once('\n') {
            Some((title, body)) => (title.trim_end(), body),
            None => (text.trim_end(), ""),
        };
        let content = markdown.convert(document_id, body)?;

        let html = self.renderer.render(
            PAGE_TEMPLATE,
            Vars::new()
                .text("page_title", title)
                .flag("card", false)
                .markup("content", content),
        )?;
        let file_name = match source.file_stem() {
            Some(stem) => PathBuf::from(stem).with_extension("html"),
            None => return Err(Error::InvalidFileName(source.to_owned())),
        };
        self.write_file(&file_name, &html)
    }

    fn write_file(&self, relative: &Path, contents: &str) -> Result<()> {
        let path = self.output_directory.join(relative);
        util::write_file(&path, contents).map_err(|err| Error::WriteFile { path, err })
    }
}

/// Renders the announcement for `article`, trimmed of surrounding
/// whitespace.
pub fn tweet(renderer: &Renderer, article: &Article) -> Result<String> {
    let tweet = renderer.render(
        TWEET_TEMPLATE,
        Vars::new().nested("article", article.vars().clone()),
    )?;
    let tweet = tweet.trim().to_owned();
    info!("Tweet: {}", tweet);
    Ok(tweet)
}

/// One line of the archive. `year` and `month` are set on the first
/// article of each run of articles sharing a year, or a year and month.
#[derive(Clone, Debug, PartialEq)]
pub struct ArchiveEntry {
    pub year: Option<i32>,
    pub month: Option<String>,
    pub title: String,
    pub permalink: String,
}

impl ArchiveEntry {
    fn into_vars(self) -> Vars {
        Vars::new()
            .text("year", self.year.map(|y| y.to_string()).unwrap_or_default())
            .text("month", self.month.unwrap_or_default())
            .text("title", self.title)
            .text("permalink", self.permalink)
    }
}

/// Groups `articles` under headings in a single pass over the list as
/// given: a year heading whenever the creation year differs from the
/// previous article's, and a month heading (full English month name)
/// whenever the month differs, regardless of the year. Nothing is
/// re-sorted.
pub fn archive_entries(articles: &[Article]) -> Vec<ArchiveEntry> {
    let mut entries = Vec::with_capacity(articles.len());
    let mut current: Option<(i32, u32)> = None;
    for article in articles {
        let (year, month) = (article.created.year(), article.created.month());
        let (new_year, new_month) = match current {
            None => (true, true),
            Some((y, m)) => (y != year, m != month),
        };
        current = Some((year, month));
        entries.push(ArchiveEntry {
            year: if new_year { Some(year) } else { None },
            month: if new_month {
                Some(article.created.format("%B").to_string())
            } else {
                None
            },
            title: article.title().to_owned(),
            permalink: article.full_url.clone(),
        });
    }
    entries
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug)]
pub enum Error {
    /// An error during templating.
    Render(render::Error),

    /// An error converting a page body.
    Markdown(markdown::Error),

    /// A static page source couldn't be read.
    ReadPage { path: PathBuf, err: io::Error },

    /// An output file couldn't be written.
    WriteFile { path: PathBuf, err: io::Error },

    /// A page source path has no file name.
    InvalidFileName(PathBuf),
}

impl From<render::Error> for Error {
    fn from(err: render::Error) -> Error {
        Error::Render(err)
    }
}

impl From<markdown::Error> for Error {
    fn from(err: markdown::Error) -> Error {
        Error::Markdown(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Render(err) => err.fmt(f),
            Error::Markdown(err) => err.fmt(f),
            Error::ReadPage { path, err } => {
                write!(f, "Reading page '{}': {}", path.display(), err)
            }
            Error::WriteFile { path, err } => {
                write!(f, "Writing '{}': {}", path.display(), err)
            }
            Error::InvalidFileName(path) => write!(f, "invalid file name: {:?}", path),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Render(err) => Some(err),
            Error::Markdown(err) => Some(err),
            Error::ReadPage { path: _, err } => Some(err),
            Error::WriteFile { path: _, err } => Some(err),
            Error::InvalidFileName(_) => None,
        }
    }
}
