use std::fmt;
use std::io::Write;
use std::sync::Arc;

use liquid_core::error::ResultLiquidReplaceExt;
use liquid_core::{
    BlockReflection, Error, Language, ParseBlock, Renderable, Result, Runtime, TagBlock,
    TagTokenIter, Template,
};
use tracing::trace;

use crate::markup::{ConvertError, MarkupConverter};
use crate::tag::{BlockTag, TagFactory};
use crate::tag_args::decode_block_arguments;

/// Exposes one registered [`BlockTag`] to the liquid parser.
#[derive(Clone)]
pub(crate) struct LiquidBlock {
    name: String,
    end_tag: String,
    factory: TagFactory,
    converter: Arc<dyn MarkupConverter>,
}

impl LiquidBlock {
    pub(crate) fn new(name: &str, factory: TagFactory, converter: Arc<dyn MarkupConverter>) -> Self {
        LiquidBlock {
            name: name.to_string(),
            end_tag: format!("end{name}"),
            factory,
            converter,
        }
    }
}

impl BlockReflection for LiquidBlock {
    fn start_tag(&self) -> &str {
        &self.name
    }

    fn end_tag(&self) -> &str {
        &self.end_tag
    }

    fn description(&self) -> &str {
        "Block tag rendered through the markup converter"
    }
}

impl ParseBlock for LiquidBlock {
    fn parse(
        &self,
        mut arguments: TagTokenIter<'_>,
        mut tokens: TagBlock<'_, '_>,
        options: &Language,
    ) -> Result<Box<dyn Renderable>> {
        // The engine hands every argument string over as one encoded literal.
        let markup = match arguments.next() {
            None => None,
            Some(token) => {
                let literal = token.as_str().to_string();
                match decode_block_arguments(&literal) {
                    Some(markup) => Some(markup),
                    None => {
                        return Err(Error::with_msg("unexpected block tag arguments")
                            .context("tag", self.name.clone())
                            .context("arguments", literal))
                    }
                }
            }
        };
        arguments.expect_nothing()?;
        trace!(tag = %self.name, markup = ?markup, "parsing block tag");

        let tag = (self.factory)(markup.as_deref());
        let body = Template::new(tokens.parse_all(options)?);
        tokens.assert_empty();

        Ok(Box::new(RenderedBlock {
            name: self.name.clone(),
            tag,
            body,
            converter: Arc::clone(&self.converter),
        }))
    }

    fn reflection(&self) -> &dyn BlockReflection {
        self
    }
}

struct RenderedBlock {
    name: String,
    tag: Box<dyn BlockTag>,
    body: Template,
    converter: Arc<dyn MarkupConverter>,
}

impl fmt::Debug for RenderedBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderedBlock")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("converter", &self.converter)
            .finish_non_exhaustive()
    }
}

impl Renderable for RenderedBlock {
    fn render_to(&self, writer: &mut dyn Write, runtime: &dyn Runtime) -> Result<()> {
        let mut captured = Vec::new();
        self.body.render_to(&mut captured, runtime)?;
        let content = String::from_utf8_lossy(&captured);

        let html = self
            .tag
            .render(&content, self.converter.as_ref())
            .map_err(|err| conversion_failure(&self.name, err))?;

        write!(writer, "{html}").replace("Failed to render")?;
        Ok(())
    }
}

/// Liquid error for a failed conversion, keeping the converter error as its cause.
fn conversion_failure(tag: &str, err: ConvertError) -> Error {
    Error::with_msg(err.to_string())
        .context("tag", tag.to_string())
        .context("kind", err.kind())
        .cause(std::sync::Arc::new(err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_failure_keeps_message_and_kind() {
        let err = conversion_failure("vbar", ConvertError::Converter("backend down".into()));
        let rendered = err.to_string();

        assert!(rendered.contains("backend down"));
        assert!(rendered.contains("vbar"));
        assert!(rendered.contains("converter"));
    }

    #[test]
    fn io_failures_report_their_kind() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "sink closed");
        let rendered = conversion_failure("vbar", ConvertError::Io(io)).to_string();

        assert!(rendered.contains("sink closed"));
        assert!(rendered.contains("io"));
    }
}
