use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use liquid::model::Value;
use markdown_callout_config::MarkdownSettings;
use thiserror::Error;
use tracing::debug;

use crate::liquid_block::LiquidBlock;
use crate::markup::{CmarkConverter, MarkupConverter};
use crate::registry::{register_tags, RegistryError, TagRegistry};
use crate::tag_args::encode_block_arguments;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("failed to build template parser: {0}")]
    Build(#[source] liquid::Error),

    #[error("failed to parse template: {0}")]
    Parse(#[source] liquid::Error),

    #[error("failed to render template: {0}")]
    Render(#[source] liquid::Error),
}

/// A liquid template engine with the registered block tags installed.
///
/// The registry and the converter live exactly as long as the engine.
pub struct Engine {
    registry: TagRegistry,
    converter: Arc<dyn MarkupConverter>,
    parser: liquid::Parser,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("registry", &self.registry)
            .field("converter", &self.converter)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Engine with this crate's tags and a `pulldown-cmark` converter.
    pub fn new(settings: &MarkdownSettings) -> Result<Self, EngineError> {
        let mut registry = TagRegistry::new();
        register_tags(&mut registry)?;
        Engine::with_registry(registry, Arc::new(CmarkConverter::new(settings)))
    }

    pub fn with_registry(
        registry: TagRegistry,
        converter: Arc<dyn MarkupConverter>,
    ) -> Result<Self, EngineError> {
        let mut builder = liquid::ParserBuilder::with_stdlib();
        for (name, factory) in registry.iter() {
            builder = builder.block(LiquidBlock::new(name, factory, Arc::clone(&converter)));
        }
        let parser = builder.build().map_err(EngineError::Build)?;

        debug!(tags = registry.len(), "template engine ready");
        Ok(Engine {
            registry,
            converter,
            parser,
        })
    }

    pub fn registry(&self) -> &TagRegistry {
        &self.registry
    }

    pub fn converter(&self) -> &dyn MarkupConverter {
        self.converter.as_ref()
    }

    /// Parses and renders a liquid document with string globals in scope.
    ///
    /// Registered block tags receive their argument text verbatim, even
    /// where it is not valid liquid syntax.
    pub fn render(
        &self,
        source: &str,
        globals: &BTreeMap<String, String>,
    ) -> Result<String, EngineError> {
        let names: Vec<&str> = self.registry.names().collect();
        let prepared = encode_block_arguments(source, &names);
        let template = self.parser.parse(&prepared).map_err(EngineError::Parse)?;

        let mut object = liquid::Object::new();
        for (name, value) in globals {
            object.insert(name.clone().into(), Value::scalar(value.clone()));
        }

        let output = template.render(&object).map_err(EngineError::Render)?;
        debug!(
            source_len = source.len(),
            output_len = output.len(),
            "rendered document"
        );
        Ok(output)
    }
}
