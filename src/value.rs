//! Template variables. Page builders describe what a template should see as
//! [`Vars`]; the renderer converts them into [`gtmpl_value::Value`]s,
//! escaping text for HTML/XML templates on the way. Only values added with
//! [`Vars::markup`] reach an HTML template unescaped.

use gtmpl_value::Value;
use pulldown_cmark::escape::escape_html;
use std::collections::{BTreeMap, HashMap};

/// A single template variable.
#[derive(Clone, Debug, PartialEq)]
pub enum Var {
    /// Plain text, escaped for HTML/XML templates.
    Text(String),

    /// Trusted HTML, never escaped.
    Markup(String),

    /// A boolean, for `{{if}}` blocks.
    Flag(bool),

    /// A nested bundle, accessed as `.name.field`.
    Vars(Vars),

    /// A list of bundles, for `{{range}}` blocks.
    List(Vec<Vars>),
}

/// How text reaches the output of a template.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Escape {
    /// Text is HTML-escaped (HTML and XML templates).
    Html,

    /// Text is inserted verbatim (plain-text templates).
    Verbatim,
}

impl Escape {
    /// Picks the escaping for a template from its file name.
    pub fn for_template(name: &str) -> Escape {
        if name.ends_with(".html") || name.ends_with(".xml") {
            Escape::Html
        } else {
            Escape::Verbatim
        }
    }
}

/// A bundle of named template variables.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Vars(BTreeMap<String, Var>);

impl Vars {
    pub fn new() -> Vars {
        Vars::default()
    }

    pub fn text(self, name: &str, value: impl Into<String>) -> Vars {
        self.with(name, Var::Text(value.into()))
    }

    pub fn markup(self, name: &str, value: impl Into<String>) -> Vars {
        self.with(name, Var::Markup(value.into()))
    }

    pub fn flag(self, name: &str, value: bool) -> Vars {
        self.with(name, Var::Flag(value))
    }

    pub fn nested(self, name: &str, value: Vars) -> Vars {
        self.with(name, Var::Vars(value))
    }

    pub fn list(self, name: &str, value: Vec<Vars>) -> Vars {
        self.with(name, Var::List(value))
    }

    pub fn with(mut self, name: &str, var: Var) -> Vars {
        self.insert(name, var);
        self
    }

    pub fn insert(&mut self, name: &str, var: Var) {
        self.0.insert(name.to_owned(), var);
    }

    pub fn get(&self, name: &str) -> Option<&Var> {
        self.0.get(name)
    }

    /// Returns the raw string held by a text or markup variable.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(Var::Text(s)) | Some(Var::Markup(s)) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn to_value(&self, escape: Escape) -> Value {
        let m: HashMap<String, Value> = self
            .0
            .iter()
            .map(|(name, var)| (name.clone(), var.to_value(escape)))
            .collect();
        Value::Object(m)
    }
}

impl Var {
    fn to_value(&self, escape: Escape) -> Value {
        match self {
            Var::Text(s) => match escape {
                Escape::Html => Value::String(escape_text(s)),
                Escape::Verbatim => Value::String(s.clone()),
            },
            Var::Markup(s) => Value::String(s.clone()),
            Var::Flag(b) => Value::Bool(*b),
            Var::Vars(vars) => vars.to_value(escape),
            Var::List(items) => {
                Value::Array(items.iter().map(|v| v.to_value(escape)).collect())
            }
        }
    }
}

/// HTML-escapes `s` (`&`, `<`, `>`, `"`).
pub fn escape_text(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    // Writing into a `String` can't fail.
    let _ = escape_html(&mut escaped, s);
    escaped
}

#[cfg(test)]
mod test {
    use super::*;

    fn field<'a>(value: &'a Value, name: &str) -> &'a Value {
        match value {
            Value::Object(m) => &m[name],
            _ => panic!("not an object: {:?}", value),
        }
    }

    fn string<'a>(value: &'a Value, name: &str) -> &'a str {
        match field(value, name) {
            Value::String(s) => s,
            other => panic!("not a string: {:?}", other),
        }
    }

    #[test]
    fn test_text_is_escaped_for_html() {
        let vars = Vars::new()
            .text("title", "Fish & <Chips>")
            .markup("content", "<p>ok</p>");
        let value = vars.to_value(Escape::Html);
        assert_eq!("Fish &amp; &lt;Chips&gt;", string(&value, "title"));
        assert_eq!("<p>ok</p>", string(&value, "content"));
    }

    #[test]
    fn test_text_is_verbatim_for_plain_text() {
        let value = Vars::new()
            .text("title", "Fish & Chips")
            .to_value(Escape::Verbatim);
        assert_eq!("Fish & Chips", string(&value, "title"));
    }

    #[test]
    fn test_nested_lists_are_escaped() {
        let value = Vars::new()
            .list("articles", vec![Vars::new().text("title", "<b>")])
            .to_value(Escape::Html);
        match field(&value, "articles") {
            Value::Array(items) => assert_eq!("&lt;b&gt;", string(&items[0], "title")),
            other => panic!("not an array: {:?}", other),
        }
    }

    #[test]
    fn test_escape_for_template() {
        assert_eq!(Escape::Html, Escape::for_template("article.html"));
        assert_eq!(Escape::Html, Escape::for_template("atom.xml"));
        assert_eq!(Escape::Verbatim, Escape::for_template("tweet.txt"));
    }
}
