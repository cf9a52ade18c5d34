use std::fmt;

use crate::markup::{ConvertError, MarkupConverter};

/// A block tag: built from the raw argument text of its opening tag, then
/// asked to render the content enclosed between the open and close tags.
pub trait BlockTag: fmt::Debug + Send + Sync {
    /// Builds an instance from the text following the tag name. `None` and
    /// `Some("")` both mean the tag was opened without arguments.
    fn parse(markup: Option<&str>) -> Self
    where
        Self: Sized;

    /// Renders the enclosed content. Template constructs inside `content`
    /// have already been expanded by the host engine; markup conversion has not.
    fn render(
        &self,
        content: &str,
        converter: &dyn MarkupConverter,
    ) -> Result<String, ConvertError>;
}

/// Constructor stored in the registry for each tag name.
pub type TagFactory = fn(Option<&str>) -> Box<dyn BlockTag>;

/// Type-erased constructor for `T`, suitable for [`TagRegistry::register`](crate::TagRegistry::register).
pub fn factory<T: BlockTag + 'static>(markup: Option<&str>) -> Box<dyn BlockTag> {
    Box::new(T::parse(markup))
}
