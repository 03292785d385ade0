//! Defines the [`Renderer`], which applies named templates to [`Vars`], and
//! the [`SiteContext`] every template sees as `.site`.
//!
//! Templates live in one directory and are named by file name (e.g.,
//! `article.html`). Files whose names start with `_` are partials: their
//! contents (typically `{{define}}` blocks for a shared header and footer)
//! are prepended to every other template before it is parsed.

use crate::config::{self, Config};
use crate::value::{Escape, Vars};
use gtmpl::{Context, Template};
use log::{debug, info};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// Site-wide template variables. Built once per run and passed to every
/// render.
#[derive(Clone, Debug)]
pub struct SiteContext {
    pub title: String,
    pub author: String,

    /// The canonical site URL, always with a trailing slash.
    pub domain: Url,

    /// The copyright year.
    pub year: i32,
}

impl SiteContext {
    /// Reads `title`, `author`, and `domain` from `config`.
    pub fn from_config(config: &Config, year: i32) -> config::Result<SiteContext> {
        let domain = config.domain()?;
        Ok(SiteContext {
            title: config.title()?.to_owned(),
            author: config.author()?.to_owned(),
            domain: parse_domain(domain).map_err(|e| config::Error::InvalidValue {
                key: "domain".to_owned(),
                value: domain.to_owned(),
                reason: e.to_string(),
            })?,
            year,
        })
    }

    /// Joins a site-relative path (e.g., `articles/hello.html`) onto the
    /// domain.
    pub fn url_for(&self, relative: &str) -> Result<Url> {
        Ok(self.domain.join(relative.trim_start_matches('/'))?)
    }

    /// The domain as configured, without the trailing slash, so templates
    /// can write `{{.site.domain}}/style.css`.
    pub fn domain_str(&self) -> &str {
        self.domain.as_str().trim_end_matches('/')
    }

    pub fn copyright(&self) -> String {
        format!("Copyright \u{a9} {} {}", self.year, self.author)
    }

    pub fn to_vars(&self) -> Vars {
        Vars::new()
            .text("title", &self.title)
            .text("author", &self.author)
            .text("domain", self.domain_str())
            .text("year", self.year.to_string())
            .text("copyright", self.copyright())
    }
}

fn parse_domain(domain: &str) -> std::result::Result<Url, url::ParseError> {
    if domain.ends_with('/') {
        Url::parse(domain)
    } else {
        Url::parse(&format!("{}/", domain))
    }
}

struct NamedTemplate {
    template: Template,
    escape: Escape,
}

/// Applies templates to variables.
pub struct Renderer {
    templates: BTreeMap<String, NamedTemplate>,
    site: SiteContext,
}

impl Renderer {
    /// Loads every template in `dir`.
    pub fn from_directory(dir: &Path, site: SiteContext) -> Result<Renderer> {
        info!("Templates");
        let mut partials = Vec::new();
        let mut sources = Vec::new();
        let mut entries = std::fs::read_dir(dir)
            .map_err(|err| Error::OpenTemplate {
                path: dir.to_owned(),
                err,
            })?
            .collect::<std::io::Result<Vec<_>>>()?;
        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let path = entry.path();
            let contents = std::fs::read_to_string(&path)
                .map_err(|err| Error::OpenTemplate { path, err })?;
            debug!("{}", name);
            if name.starts_with('_') {
                partials.push(contents);
            } else {
                sources.push((name, contents));
            }
        }

        Renderer::from_sources(&partials, sources, site)
    }

    /// Parses templates from memory. Each partial is prepended to each
    /// named source.
    pub fn from_sources<N, S>(
        partials: &[S],
        sources: impl IntoIterator<Item = (N, S)>,
        site: SiteContext,
    ) -> Result<Renderer>
    where
        N: Into<String>,
        S: AsRef<str>,
    {
        let prelude: String = partials
            .iter()
            .map(|partial| partial.as_ref().trim_end())
            .collect();

        let mut templates = BTreeMap::new();
        for (name, source) in sources {
            let name = name.into();
            let mut template = Template::default();
            template
                .parse(format!("{}{}", prelude, source.as_ref()))
                .map_err(|e| Error::Template {
                    name: name.clone(),
                    message: e.to_string(),
                })?;
            let escape = Escape::for_template(&name);
            templates.insert(name, NamedTemplate { template, escape });
        }
        Ok(Renderer { templates, site })
    }

    pub fn site(&self) -> &SiteContext {
        &self.site
    }

    /// Renders the template `name` with `vars` plus the site context under
    /// `site`.
    pub fn render(&self, name: &str, vars: Vars) -> Result<String> {
        let named = self
            .templates
            .get(name)
            .ok_or_else(|| Error::MissingTemplate(name.to_owned()))?;

        let value = vars
            .nested("site", self.site.to_vars())
            .to_value(named.escape);
        let template_error = |e: String| Error::Template {
            name: name.to_owned(),
            message: e,
        };
        let context = Context::from(value).map_err(|e| template_error(e.to_string()))?;

        let mut output: Vec<u8> = Vec::new();
        named
            .template
            .execute(&mut output, &context)
            .map_err(|e| template_error(e.to_string()))?;
        String::from_utf8(output).map_err(|e| template_error(e.to_string()))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failure to load or apply a template.
#[derive(Debug)]
pub enum Error {
    /// A template file or directory couldn't be read.
    OpenTemplate { path: PathBuf, err: std::io::Error },

    /// No template has this name.
    MissingTemplate(String),

    /// A template failed to parse or execute.
    Template { name: String, message: String },

    /// A URL couldn't be built from the domain.
    Url(url::ParseError),

    /// Other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::OpenTemplate { path, err } => {
                write!(f, "Opening template '{}': {}", path.display(), err)
            }
            Error::MissingTemplate(name) => write!(f, "no template named '{}'", name),
            Error::Template { name, message } => {
                write!(f, "template '{}': {}", name, message)
            }
            Error::Url(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::OpenTemplate { path: _, err } => Some(err),
            Error::Url(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::MissingTemplate(_) | Error::Template { .. } => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Error {
        Error::Url(err)
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    pub(crate) fn site() -> SiteContext {
        SiteContext {
            title: String::from("Fire & Ice"),
            author: String::from("Jane Doe"),
            domain: Url::parse("https://example.org/").unwrap(),
            year: 2023,
        }
    }

    /// A renderer over the templates shipped in `demo-site/templates`.
    pub(crate) fn demo_renderer() -> Renderer {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("demo-site/templates");
        Renderer::from_directory(&dir, site()).unwrap()
    }

    #[test]
    fn test_site_globals_available_without_being_passed() -> Result<()> {
        let renderer = Renderer::from_sources(
            &[] as &[&str],
            vec![("footer.txt", "{{.site.author}} {{.site.year}}")],
            site(),
        )?;
        assert_eq!("Jane Doe 2023", renderer.render("footer.txt", Vars::new())?);
        Ok(())
    }

    #[test]
    fn test_html_templates_escape_text() -> Result<()> {
        let renderer = Renderer::from_sources(
            &[] as &[&str],
            vec![
                ("t.html", "{{.site.title}}|{{.name}}|{{.body}}"),
                ("t.txt", "{{.site.title}}|{{.name}}"),
            ],
            site(),
        )?;
        let vars = Vars::new().text("name", "<x>").markup("body", "<p>y</p>");
        assert_eq!(
            "Fire &amp; Ice|&lt;x&gt;|<p>y</p>",
            renderer.render("t.html", vars.clone())?
        );
        assert_eq!("Fire & Ice|<x>", renderer.render("t.txt", vars)?);
        Ok(())
    }

    #[test]
    fn test_partials_are_shared() -> Result<()> {
        let renderer = Renderer::from_sources(
            &[r#"{{define "greeting"}}Hello, {{.who}}{{end}}"#],
            vec![("a.txt", r#"{{template "greeting" .}}!"#)],
            site(),
        )?;
        assert_eq!(
            "Hello, world!",
            renderer.render("a.txt", Vars::new().text("who", "world"))?
        );
        Ok(())
    }

    #[test]
    fn test_missing_template() {
        let renderer =
            Renderer::from_sources(&[] as &[&str], Vec::<(String, &str)>::new(), site())
                .unwrap();
        assert!(matches!(
            renderer.render("nope.html", Vars::new()),
            Err(Error::MissingTemplate(_))
        ));
    }

    #[test]
    fn test_url_for() -> Result<()> {
        let mut site = site();
        site.domain = parse_domain("https://example.org/blog").unwrap();
        assert_eq!(
            "https://example.org/blog/articles/hello.html",
            site.url_for("articles/hello.html")?.as_str()
        );
        assert_eq!("https://example.org/blog", site.domain_str());
        Ok(())
    }

    #[test]
    fn test_demo_templates_load() {
        let renderer = demo_renderer();
        for name in &[
            "article.html",
            "archive.html",
            "index.html",
            "page.html",
            "text.txt",
            "tweet.txt",
        ] {
            assert!(renderer.templates.contains_key(*name), "missing {}", name);
        }
    }
}
