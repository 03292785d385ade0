//! Renders markdown [`Event`]s into HTML. Unlike
//! [`pulldown_cmark::html::push_html`], footnote element ids carry a
//! per-document prefix so that several articles can share one page (the
//! home page shows many articles, each with its own footnotes), and footnotes
//! are numbered in order of first reference.

use pulldown_cmark::escape::{escape_href, escape_html, StrWrite};
use pulldown_cmark::{Alignment, CodeBlockKind, CowStr, Event, LinkType, Tag};
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::io;

struct Adaptor<'a, T> {
    formatter: &'a mut T,
    result: fmt::Result,
}

impl<T> Adaptor<'_, T> {
    fn handle_result(&mut self, result: fmt::Result) -> io::Result<()> {
        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                self.result = result;
                Err(io::Error::new(io::ErrorKind::Other, e))
            }
        }
    }
}

impl<T: fmt::Write> StrWrite for Adaptor<'_, T> {
    fn write_str(&mut self, s: &str) -> io::Result<()> {
        let result = self.formatter.write_str(s);
        self.handle_result(result)
    }

    fn write_fmt(&mut self, args: fmt::Arguments) -> io::Result<()> {
        let result = self.formatter.write_fmt(args);
        self.handle_result(result)
    }
}

struct EscapeHref<'a>(&'a str);

impl Display for EscapeHref<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut adaptor = Adaptor {
            formatter: f,
            result: Ok(()),
        };
        let _ = escape_href(&mut adaptor, self.0);
        adaptor.result
    }
}

struct EscapeHtml<'a>(&'a str);

impl Display for EscapeHtml<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut adaptor = Adaptor {
            formatter: f,
            result: Ok(()),
        };
        let _ = escape_html(&mut adaptor, self.0);
        adaptor.result
    }
}

enum TableState {
    Head,
    Body,
}

/// Renders markdown [`Event`]s into HTML. This is largely modeled after
/// [`pulldown_cmark`]'s private `HtmlWriter`. The numbering state persists
/// across events of one document and must be cleared with
/// [`HtmlRenderer::reset`] before the next.
pub(crate) struct HtmlRenderer {
    table_alignments: Vec<Alignment>,
    table_state: TableState,
    table_cell_index: usize,

    /// Footnote label -> display number, assigned on first sight.
    footnote_numbers: HashMap<String, usize>,

    /// The prefix for footnote element ids.
    footnote_prefix: String,

    /// Nesting depth of images whose alt text is being written.
    image_depth: usize,

    /// The title of the outermost open image.
    image_title: String,
}

impl HtmlRenderer {
    pub(crate) fn new() -> Self {
        HtmlRenderer {
            table_alignments: Vec::default(),
            table_state: TableState::Head,
            table_cell_index: usize::default(),
            footnote_numbers: HashMap::default(),
            footnote_prefix: String::default(),
            image_depth: 0,
            image_title: String::default(),
        }
    }

    /// Forgets everything learned from the previous document and sets the
    /// footnote id prefix for the next one.
    pub(crate) fn reset(&mut self, footnote_prefix: &str) {
        self.table_alignments.clear();
        self.table_state = TableState::Head;
        self.table_cell_index = 0;
        self.footnote_numbers.clear();
        self.footnote_prefix = footnote_prefix.to_owned();
        self.image_depth = 0;
        self.image_title.clear();
    }

    fn footnote_number(&mut self, name: &str) -> usize {
        let next = self.footnote_numbers.len() + 1;
        *self
            .footnote_numbers
            .entry(name.to_owned())
            .or_insert(next)
    }

    pub(crate) fn on_event<W: StrWrite>(&mut self, w: &mut W, event: Event) -> io::Result<()> {
        if self.image_depth > 0 {
            return self.on_alt_text_event(w, event);
        }
        match event {
            Event::Start(tag) => self.on_start(w, tag),
            Event::End(tag) => self.on_end(w, tag),
            Event::Code(code) => self.on_code(w, code),
            Event::FootnoteReference(name) => {
                let number = self.footnote_number(&name);
                write!(
                    w,
                    r##"<sup class="footnote-reference"><a href="#{}{}">{}</a></sup>"##,
                    EscapeHtml(&self.footnote_prefix),
                    EscapeHtml(&name),
                    number,
                )
            }
            Event::HardBreak => w.write_str("<br />\n"),
            Event::Html(html) => w.write_str(&html),
            Event::Rule => w.write_str("<hr />\n"),
            Event::SoftBreak => w.write_str("\n"),
            Event::TaskListMarker(checked) => write!(
                w,
                r#"<input disabled="" type="checkbox"{}/>"#,
                match checked {
                    true => r#" checked="""#,
                    false => "",
                }
            ),
            Event::Text(text) => escape_html(w, &text),
        }
    }

    // Inside an image only text survives, as the `alt` attribute.
    fn on_alt_text_event<W: StrWrite>(&mut self, w: &mut W, event: Event) -> io::Result<()> {
        match event {
            Event::Start(Tag::Image(..)) => {
                self.image_depth += 1;
                Ok(())
            }
            Event::End(Tag::Image(..)) => {
                self.image_depth -= 1;
                if self.image_depth > 0 {
                    return Ok(());
                }
                if self.image_title.is_empty() {
                    w.write_str(r#"" />"#)
                } else {
                    write!(w, r#"" title="{}" />"#, EscapeHtml(&self.image_title))
                }
            }
            Event::Text(text) | Event::Code(text) => escape_html(w, &text),
            Event::SoftBreak | Event::HardBreak => w.write_str(" "),
            _ => Ok(()),
        }
    }

    fn on_start<W: StrWrite>(&mut self, w: &mut W, tag: Tag) -> io::Result<()> {
        match tag {
            Tag::BlockQuote => w.write_str("<blockquote>\n"),
            Tag::CodeBlock(CodeBlockKind::Fenced(info)) => {
                match info.split(' ').next().unwrap_or_default() {
                    "" => w.write_str("<pre><code>"),
                    lang => write!(w, r#"<pre><code class="language-{}">"#, EscapeHtml(lang)),
                }
            }
            Tag::CodeBlock(CodeBlockKind::Indented) => w.write_str("<pre><code>"),
            Tag::Emphasis => w.write_str("<em>"),
            Tag::FootnoteDefinition(name) => {
                let number = self.footnote_number(&name);
                write!(
                    w,
                    r#"<div class="footnote-definition" id="{}{}"><sup class="footnote-definition-label">{}</sup>"#,
                    EscapeHtml(&self.footnote_prefix),
                    EscapeHtml(&name),
                    number,
                )
            }
            Tag::Heading(level) => write!(w, "<h{}>", level),
            Tag::Image(_link_type, dest, title) => {
                self.image_depth = 1;
                self.image_title = title.to_string();
                write!(w, r#"<img src="{}" alt=""#, EscapeHref(&dest))
            }
            Tag::Item => w.write_str("<li>"),
            Tag::Link(link_type, dest, title) => {
                let scheme = match link_type {
                    LinkType::Email => "mailto:",
                    _ => "",
                };
                if title.is_empty() {
                    write!(w, r#"<a href="{}{}">"#, scheme, EscapeHref(&dest))
                } else {
                    write!(
                        w,
                        r#"<a href="{}{}" title="{}">"#,
                        scheme,
                        EscapeHref(&dest),
                        EscapeHtml(&title),
                    )
                }
            }
            Tag::List(None) => w.write_str("<ul>\n"),
            Tag::List(Some(1)) => w.write_str("<ol>\n"),
            Tag::List(Some(start)) => write!(w, "<ol start=\"{}\">\n", start),
            Tag::Paragraph => w.write_str("<p>"),
            Tag::Strikethrough => w.write_str("<del>"),
            Tag::Strong => w.write_str("<strong>"),
            Tag::Table(alignments) => {
                self.table_alignments = alignments;
                w.write_str("<table>")
            }
            Tag::TableHead => {
                self.table_state = TableState::Head;
                self.table_cell_index = 0;
                w.write_str("<thead><tr>")
            }
            Tag::TableRow => {
                self.table_cell_index = 0;
                w.write_str("<tr>")
            }
            Tag::TableCell => write!(
                w,
                "<{}{}>",
                match self.table_state {
                    TableState::Head => "th",
                    TableState::Body => "td",
                },
                match self.table_alignments.get(self.table_cell_index) {
                    Some(Alignment::Left) => r#" align="left""#,
                    Some(Alignment::Right) => r#" align="right""#,
                    Some(Alignment::Center) => r#" align="center""#,
                    _ => "",
                }
            ),
        }
    }

    fn on_end<W: StrWrite>(&mut self, w: &mut W, tag: Tag) -> io::Result<()> {
        match tag {
            Tag::BlockQuote => w.write_str("</blockquote>\n"),
            Tag::CodeBlock(_) => w.write_str("</code></pre>\n"),
            Tag::Emphasis => w.write_str("</em>"),
            Tag::FootnoteDefinition(_) => w.write_str("</div>\n"),
            Tag::Heading(level) => write!(w, "</h{}>\n", level),
            Tag::Image(..) => Ok(()), // closed in `on_alt_text_event`
            Tag::Item => w.write_str("</li>\n"),
            Tag::Link(..) => w.write_str("</a>"),
            Tag::List(Some(_)) => w.write_str("</ol>\n"),
            Tag::List(None) => w.write_str("</ul>\n"),
            Tag::Paragraph => w.write_str("</p>\n"),
            Tag::Strikethrough => w.write_str("</del>"),
            Tag::Strong => w.write_str("</strong>"),
            Tag::Table(_) => w.write_str("</tbody></table>\n"),
            Tag::TableHead => {
                self.table_state = TableState::Body;
                w.write_str("</tr></thead><tbody>")
            }
            Tag::TableRow => w.write_str("</tr>"),
            Tag::TableCell => {
                self.table_cell_index += 1;
                w.write_str(match self.table_state {
                    TableState::Head => "</th>",
                    TableState::Body => "</td>",
                })
            }
        }
    }

    fn on_code<W: StrWrite>(&mut self, w: &mut W, s: CowStr) -> io::Result<()> {
        write!(w, "<code>{}</code>", EscapeHtml(&s))
    }
}
