use std::error::Error as StdError;
use std::fmt;
use std::io;

use markdown_callout_config::MarkdownSettings;
use pulldown_cmark::escape::escape_html;
use pulldown_cmark::{html, CowStr, Event, HeadingLevel, Options, Parser, Tag};
use thiserror::Error;

use crate::anchor::AnchorSet;

/// Lightweight markup to HTML. Implementations must be deterministic and
/// leave embedded HTML untouched.
pub trait MarkupConverter: fmt::Debug + Send + Sync {
    fn convert(&self, text: &str) -> Result<String, ConvertError>;
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("failed to write html: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Converter(#[from] Box<dyn StdError + Send + Sync>),
}

impl ConvertError {
    /// Short label for the failure class, used when the error crosses into liquid.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Converter(_) => "converter",
        }
    }
}

/// CommonMark converter backed by `pulldown-cmark`.
#[derive(Debug, Clone, Copy)]
pub struct CmarkConverter {
    options: Options,
    heading_ids: bool,
}

impl Default for CmarkConverter {
    fn default() -> Self {
        CmarkConverter::new(&MarkdownSettings::default())
    }
}

impl CmarkConverter {
    pub fn new(settings: &MarkdownSettings) -> Self {
        let mut options = Options::ENABLE_HEADING_ATTRIBUTES;
        options.set(Options::ENABLE_TABLES, settings.tables);
        options.set(Options::ENABLE_FOOTNOTES, settings.footnotes);
        options.set(Options::ENABLE_STRIKETHROUGH, settings.strikethrough);
        options.set(Options::ENABLE_TASKLISTS, settings.tasklists);
        options.set(Options::ENABLE_SMART_PUNCTUATION, settings.smart_punctuation);

        CmarkConverter {
            options,
            heading_ids: settings.heading_ids,
        }
    }

    fn with_heading_ids<'a>(&self, events: Vec<Event<'a>>) -> Result<Vec<Event<'a>>, ConvertError> {
        let mut anchors = AnchorSet::default();
        for event in &events {
            if let Event::Start(Tag::Heading(_, Some(id), _)) = event {
                anchors.reserve(id);
            }
        }

        let mut rewritten = Vec::with_capacity(events.len());
        let mut iter = events.into_iter();

        while let Some(event) = iter.next() {
            let (level, explicit_id, classes) = match event {
                Event::Start(Tag::Heading(level, id, classes)) => (level, id, classes),
                other => {
                    rewritten.push(other);
                    continue;
                }
            };

            // Headings only hold inline content, so the next matching End closes this one.
            let mut inner = Vec::new();
            for event in iter.by_ref() {
                if matches!(event, Event::End(Tag::Heading(..))) {
                    break;
                }
                inner.push(event);
            }

            let id = match explicit_id {
                Some(id) => Some(id.to_string()),
                None => anchors.claim(&heading_text(&inner)),
            };

            let open = heading_open_tag(level, id.as_deref(), &classes)?;
            rewritten.push(Event::Html(CowStr::from(open)));
            rewritten.extend(inner);
            rewritten.push(Event::Html(CowStr::from(format!("</{level}>\n"))));
        }

        Ok(rewritten)
    }
}

impl MarkupConverter for CmarkConverter {
    fn convert(&self, text: &str) -> Result<String, ConvertError> {
        let parser = Parser::new_ext(text, self.options);
        let mut output = String::with_capacity(text.len() * 3 / 2);

        if self.heading_ids {
            let events = self.with_heading_ids(parser.collect())?;
            html::push_html(&mut output, events.into_iter());
        } else {
            html::push_html(&mut output, parser);
        }

        Ok(output)
    }
}

fn heading_text(events: &[Event<'_>]) -> String {
    let mut text = String::new();
    for event in events {
        match event {
            Event::Text(cow) | Event::Code(cow) => text.push_str(cow),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            _ => {}
        }
    }
    text
}

fn heading_open_tag(
    level: HeadingLevel,
    id: Option<&str>,
    classes: &[&str],
) -> Result<String, ConvertError> {
    let mut open = format!("<{level}");
    if let Some(id) = id {
        open.push_str(" id=\"");
        escape_html(&mut open, id)?;
        open.push('"');
    }
    if !classes.is_empty() {
        open.push_str(" class=\"");
        escape_html(&mut open, &classes.join(" "))?;
        open.push('"');
    }
    open.push('>');
    Ok(open)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn plain() -> CmarkConverter {
        CmarkConverter::new(&MarkdownSettings {
            smart_punctuation: false,
            heading_ids: false,
            ..MarkdownSettings::default()
        })
    }

    #[test]
    fn wraps_text_in_paragraph() {
        assert_eq!(plain().convert("hello").unwrap(), "<p>hello</p>\n");
    }

    #[test]
    fn empty_input_renders_nothing() {
        assert_eq!(CmarkConverter::default().convert("").unwrap(), "");
    }

    #[test]
    fn passes_inline_html_through() {
        assert_eq!(
            plain().convert("a <span class=\"x\">b</span>").unwrap(),
            "<p>a <span class=\"x\">b</span></p>\n"
        );
    }

    #[test]
    fn generates_unique_heading_ids() {
        let html = CmarkConverter::default()
            .convert("# Getting Started\n\n## Setup\n\n## Setup\n")
            .unwrap();
        assert_eq!(
            html,
            "<h1 id=\"getting-started\">Getting Started</h1>\n\
             <h2 id=\"setup\">Setup</h2>\n\
             <h2 id=\"setup-1\">Setup</h2>\n"
        );
    }

    #[test]
    fn explicit_heading_id_wins() {
        let html = CmarkConverter::default()
            .convert("## Install {#setup}\n\n## Setup\n")
            .unwrap();
        assert_eq!(
            html,
            "<h2 id=\"setup\">Install</h2>\n<h2 id=\"setup-1\">Setup</h2>\n"
        );
    }

    #[test]
    fn heading_ids_can_be_disabled() {
        assert_eq!(plain().convert("# Title").unwrap(), "<h1>Title</h1>\n");
    }

    #[test]
    fn tables_follow_settings() {
        let source = "| a |\n|---|\n| b |\n";
        assert!(plain().convert(source).unwrap().contains("<table>"));

        let no_tables = CmarkConverter::new(&MarkdownSettings {
            tables: false,
            ..MarkdownSettings::default()
        });
        assert!(!no_tables.convert(source).unwrap().contains("<table>"));
    }

    #[test]
    fn smart_punctuation_curls_quotes() {
        let html = CmarkConverter::default().convert("\"quoted\"").unwrap();
        assert_eq!(html, "<p>\u{201c}quoted\u{201d}</p>\n");
    }
}
