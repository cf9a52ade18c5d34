//! Callout box block tag for Liquid-templated Markdown sites.
//!
//! `{% vbar title=Note %}...{% endvbar %}` wraps the enclosed Markdown in a
//! `bs-callout` container, optionally prefixed by a bold title. The tag is
//! exposed three ways: as plain functions ([`CalloutConfig::parse`],
//! [`render_callout`]), as a [`BlockTag`] implementation that can be stored
//! in a [`TagRegistry`], and through [`Engine`], which wires every registered
//! tag into a `liquid` parser.

mod anchor;
mod callout;
mod engine;
mod front_matter;
mod liquid_block;
mod markup;
mod registry;
mod tag;
mod tag_args;

pub use anchor::{generate_anchor, AnchorSet};
pub use callout::{render_callout, CalloutConfig, CalloutTag, CLOSE_WRAPPER, OPEN_WRAPPER, TAG_NAME};
pub use engine::{Engine, EngineError};
pub use front_matter::{split_front_matter, FrontMatterSplit};
pub use markup::{CmarkConverter, ConvertError, MarkupConverter};
pub use registry::{register_tags, RegistryError, TagRegistry};
pub use tag::{factory, BlockTag, TagFactory};

pub use markdown_callout_config::MarkdownSettings;
