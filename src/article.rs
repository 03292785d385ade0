//! Defines the article model. An article starts life as an
//! [`ArticleSource`] (a path plus the dates derived from version control,
//! see [`crate::history`]) and becomes an [`Article`] once its file has been
//! read, its header parsed, and its template variables computed. Page
//! builders only accept [`Article`]s, so nothing can be rendered before it has
//! been read.
//!
//! An article file looks like this:
//!
//! ```text
//! title Hello, world!
//! summary A first post.
//! link https://example.com/elsewhere
//! end_header
//! # Hello
//!
//! Markdown body.
//! ```

use crate::markdown::{self, Markdown};
use crate::render::{self, SiteContext};
use crate::value::Vars;
use chrono::{DateTime, FixedOffset};
use std::fmt::{self, Write};
use std::path::{Path, PathBuf};

/// The line that ends an article header.
pub const HEADER_SENTINEL: &str = "end_header";

/// The CSS class for titles of articles that point at external content.
pub const LINK_TITLE_CLASS: &str = "link";

/// An article file whose dates are known but whose contents haven't been
/// read yet.
#[derive(Clone, Debug, PartialEq)]
pub struct ArticleSource {
    /// The path of the source file, relative to the source root.
    pub path: PathBuf,

    /// When the file was first committed.
    pub created: DateTime<FixedOffset>,

    /// When the file was last committed.
    pub updated: DateTime<FixedOffset>,

    /// Whether the file was introduced by the `HEAD` commit.
    pub is_new: bool,
}

/// A fully read article.
#[derive(Clone, Debug)]
pub struct Article {
    pub path: PathBuf,
    pub created: DateTime<FixedOffset>,
    pub updated: DateTime<FixedOffset>,
    pub is_new: bool,
    pub header: Header,

    /// The markdown body, verbatim.
    pub body: String,

    /// The absolute URL of the article's HTML page.
    pub full_url: String,

    vars: Vars,
}

/// The recognized header fields.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Header {
    pub title: Option<String>,
    pub summary: Option<String>,

    /// Set when the article points at external content.
    pub link: Option<String>,
}

/// A tolerated header anomaly.
#[derive(Clone, Debug, PartialEq)]
pub struct Warning {
    pub line_number: usize,
    pub line: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Unrecognized metadata: {}", self.line)
    }
}

/// The result of splitting an article file into header and body.
#[derive(Debug, PartialEq)]
pub struct Parsed<'a> {
    pub header: Header,
    pub warnings: Vec<Warning>,
    pub body: &'a str,
}

/// Splits `input` into its header and body. Unknown header keys become
/// [`Warning`]s; a header line without a value, or a missing
/// [`HEADER_SENTINEL`], is an error.
pub fn parse(input: &str) -> std::result::Result<Parsed, ParseError> {
    let mut header = Header::default();
    let mut warnings = Vec::new();
    let mut rest = input;
    let mut line_number = 0;

    loop {
        if rest.is_empty() {
            return Err(ParseError::MissingSentinel);
        }
        let (line, next) = match rest.find('\n') {
            Some(i) => (&rest[..i], &rest[i + 1..]),
            None => (rest, ""),
        };
        rest = next;
        line_number += 1;

        let line = line.trim_end();
        if line == HEADER_SENTINEL {
            break;
        }
        let (key, value) = line
            .split_once(' ')
            .ok_or_else(|| ParseError::MalformedHeader {
                line_number,
                line: line.to_owned(),
            })?;
        match key {
            "title" => header.title = Some(value.to_owned()),
            "summary" => header.summary = Some(value.to_owned()),
            "link" => header.link = Some(value.to_owned()),
            _ => warnings.push(Warning {
                line_number,
                line: line.to_owned(),
            }),
        }
    }

    Ok(Parsed {
        header,
        warnings,
        body: rest,
    })
}

impl ArticleSource {
    /// Reads the article from `source_root`, converting its body with
    /// `markdown` and formatting its display date with `date_format`.
    /// Returns the article along with any header warnings.
    pub fn read(
        self,
        source_root: &Path,
        site: &SiteContext,
        date_format: &str,
        markdown: &mut Markdown,
    ) -> Result<(Article, Vec<Warning>)> {
        let file = source_root.join(&self.path);
        let input = std::fs::read_to_string(&file).map_err(|err| Error::Io {
            path: file.clone(),
            err,
        })?;
        let parsed = parse(&input).map_err(|err| Error::Parse {
            path: self.path.clone(),
            err,
        })?;

        let relative_url = html_path(&self.path);
        let full_url = site.url_for(&relative_url)?.to_string();
        let document_id = self.path.to_string_lossy();
        let content = markdown.convert(&document_id, parsed.body)?;
        let create_date = format_date(&self.created, date_format)?;

        let vars = article_vars(
            &parsed.header,
            parsed.body,
            &full_url,
            content,
            &self.created,
            &self.updated,
            create_date,
        );

        let article = Article {
            header: parsed.header,
            body: parsed.body.to_owned(),
            full_url,
            vars,
            path: self.path,
            created: self.created,
            updated: self.updated,
            is_new: self.is_new,
        };
        Ok((article, parsed.warnings))
    }
}

impl Article {
    /// The title, or the empty string when the header has none.
    pub fn title(&self) -> &str {
        self.header.title.as_deref().unwrap_or_default()
    }

    /// The external URL, if this article points at one.
    pub fn link(&self) -> Option<&str> {
        self.header.link.as_deref()
    }

    /// The template variables computed when the article was read.
    pub fn vars(&self) -> &Vars {
        &self.vars
    }

    /// The rendered HTML body.
    pub fn content(&self) -> &str {
        self.vars.get_str("content").unwrap_or_default()
    }

    /// The summary shown in social cards: a pointer to the link for link
    /// articles, else the header summary, else the title.
    pub fn summary(&self) -> &str {
        self.vars.get_str("summary").unwrap_or_default()
    }

    /// The output path for the HTML page, relative to the output root.
    pub fn html_path(&self) -> PathBuf {
        self.path.with_extension("html")
    }

    /// The output path for the plain-text mirror, relative to the output
    /// root.
    pub fn text_path(&self) -> PathBuf {
        self.path.with_extension("text")
    }
}

/// Swaps the extension of `path` for `.html` and renders it with `/`
/// separators for use in a URL.
fn html_path(path: &Path) -> String {
    path.with_extension("html")
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn format_date(date: &DateTime<FixedOffset>, pattern: &str) -> Result<String> {
    let mut formatted = String::new();
    write!(formatted, "{}", date.format(pattern)).map_err(|_| Error::DateFormat {
        pattern: pattern.to_owned(),
    })?;
    Ok(formatted)
}

fn article_vars(
    header: &Header,
    body: &str,
    full_url: &str,
    content: String,
    created: &DateTime<FixedOffset>,
    updated: &DateTime<FixedOffset>,
    create_date: String,
) -> Vars {
    let title = header.title.as_deref().unwrap_or_default();
    let link = header.link.as_deref().unwrap_or_default();
    let summary = match (&header.link, &header.summary) {
        (Some(link), _) => format!("Link To: {}", link),
        (None, Some(summary)) => summary.clone(),
        (None, None) => title.to_owned(),
    };

    Vars::new()
        .text("title", title)
        .text("title_rule", "=".repeat(title.chars().count()))
        .markup("content", content)
        .text("published", created.to_rfc3339())
        .text("updated", updated.to_rfc3339())
        .text("plain_text", body)
        .text("create_date", create_date)
        .text("link", link)
        .text("permalink", full_url)
        .text(
            "href",
            match &header.link {
                Some(link) => link.as_str(),
                None => full_url,
            },
        )
        .text(
            "title_class",
            match header.link {
                Some(_) => LINK_TITLE_CLASS,
                None => "",
            },
        )
        .text("summary", summary)
}

/// Represents a problem splitting an article into header and body.
#[derive(Debug, PartialEq)]
pub enum ParseError {
    /// A header line didn't have the `key value` shape.
    MalformedHeader { line_number: usize, line: String },

    /// The file ended before the header sentinel.
    MissingSentinel,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseError::MalformedHeader { line_number, line } => write!(
                f,
                "header line {}: expected `key value`, found '{}'",
                line_number, line
            ),
            ParseError::MissingSentinel => {
                write!(f, "header is not terminated by `{}`", HEADER_SENTINEL)
            }
        }
    }
}

impl std::error::Error for ParseError {}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error reading an [`Article`].
#[derive(Debug)]
pub enum Error {
    /// The source file couldn't be read.
    Io { path: PathBuf, err: std::io::Error },

    /// The source file's header is malformed.
    Parse { path: PathBuf, err: ParseError },

    /// The body couldn't be converted to HTML.
    Markdown(markdown::Error),

    /// The permalink couldn't be built.
    Render(render::Error),

    /// The configured date format is invalid.
    DateFormat { pattern: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io { path, err } => {
                write!(f, "Reading article '{}': {}", path.display(), err)
            }
            Error::Parse { path, err } => write!(f, "parsing article '{}': {}", path.display(), err),
            Error::Markdown(err) => err.fmt(f),
            Error::Render(err) => err.fmt(f),
            Error::DateFormat { pattern } => write!(f, "invalid date format '{}'", pattern),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { path: _, err } => Some(err),
            Error::Parse { path: _, err } => Some(err),
            Error::Markdown(err) => Some(err),
            Error::Render(err) => Some(err),
            Error::DateFormat { .. } => None,
        }
    }
}

impl From<markdown::Error> for Error {
    fn from(err: markdown::Error) -> Error {
        Error::Markdown(err)
    }
}

impl From<render::Error> for Error {
    fn from(err: render::Error) -> Error {
        Error::Render(err)
    }
}
