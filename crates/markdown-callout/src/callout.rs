use tracing::debug;

use crate::markup::{ConvertError, MarkupConverter};
use crate::tag::BlockTag;

/// Name the callout registers under; the closing tag is `endvbar`.
pub const TAG_NAME: &str = "vbar";

pub const OPEN_WRAPPER: &str = "<div class=\"bs-callout bs-callout-success\">";
pub const CLOSE_WRAPPER: &str = "</div>";

const ARGUMENT_SEPARATOR: char = '|';
const TITLE_KEY: &str = "title";
const TITLE_PREFIX: &str = "title=";
const ICON_KEY: &str = "icon";

/// Arguments of a single callout occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalloutConfig {
    /// Cleared by any `icon` argument. Nothing reads it when rendering, so
    /// the output never contains an icon either way.
    pub show_icon: bool,
    pub title: String,
}

impl Default for CalloutConfig {
    fn default() -> Self {
        CalloutConfig {
            show_icon: true,
            title: String::new(),
        }
    }
}

impl CalloutConfig {
    /// Parses the pipe-delimited argument string, e.g. `title=Note|icon`.
    ///
    /// Tokens are matched by substring and never trimmed. The first token
    /// mentioning `title` supplies the title, minus the first `title=` it
    /// contains; any token mentioning `icon` clears `show_icon`. Unmatched or
    /// malformed input leaves the defaults in place.
    pub fn parse(markup: Option<&str>) -> Self {
        let mut config = CalloutConfig::default();

        let markup = match markup {
            Some(markup) if !markup.is_empty() => markup,
            _ => return config,
        };

        let tokens: Vec<&str> = markup.split(ARGUMENT_SEPARATOR).collect();

        if let Some(token) = tokens.iter().find(|token| token.contains(TITLE_KEY)) {
            config.title = token.replacen(TITLE_PREFIX, "", 1);
        }

        if tokens.iter().any(|token| token.contains(ICON_KEY)) {
            config.show_icon = false;
        }

        debug!(
            markup,
            title = %config.title,
            show_icon = config.show_icon,
            "parsed callout arguments"
        );
        config
    }
}

/// Renders the callout wrapper around `content`.
///
/// Missing content renders as an empty body. Converter errors are returned
/// as they are.
pub fn render_callout(
    config: &CalloutConfig,
    content: Option<&str>,
    converter: &dyn MarkupConverter,
) -> Result<String, ConvertError> {
    let content = content.unwrap_or_default();

    let mut output = String::from(OPEN_WRAPPER);
    if !config.title.is_empty() {
        output.push_str("<strong>");
        output.push_str(&converter.convert(&config.title)?);
        output.push_str("</strong>");
    }
    output.push_str(&converter.convert(content)?);
    output.push_str(CLOSE_WRAPPER);

    debug!(
        title = %config.title,
        content_len = content.len(),
        output_len = output.len(),
        "rendered callout"
    );
    Ok(output)
}

/// The `vbar` block tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalloutTag {
    config: CalloutConfig,
}

impl CalloutTag {
    pub fn new(config: CalloutConfig) -> Self {
        CalloutTag { config }
    }

    pub fn config(&self) -> &CalloutConfig {
        &self.config
    }
}

impl BlockTag for CalloutTag {
    fn parse(markup: Option<&str>) -> Self {
        CalloutTag::new(CalloutConfig::parse(markup))
    }

    fn render(
        &self,
        content: &str,
        converter: &dyn MarkupConverter,
    ) -> Result<String, ConvertError> {
        render_callout(&self.config, Some(content), converter)
    }
}
