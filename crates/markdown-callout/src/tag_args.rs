use std::borrow::Cow;

use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};

/// Blocks whose bodies liquid leaves unparsed; tags inside them are copied as is.
const OPAQUE_BLOCKS: &[&str] = &["raw", "comment"];

/// Rewrites the opening tags of the named blocks so their argument text
/// survives liquid's tokenizer.
///
/// `{% vbar title=What's new? %}` becomes `{% vbar "title%3DWhat%27s..." %}`:
/// a single string literal holding the percent-encoded markup, which
/// [`decode_block_arguments`] turns back into the exact text. The markup
/// starts after the whitespace following the tag name and runs up to the
/// closing delimiter, trailing whitespace included. Tags without arguments
/// are left untouched.
pub(crate) fn encode_block_arguments<'a>(source: &'a str, names: &[&str]) -> Cow<'a, str> {
    let mut output = String::new();
    let mut copied = 0usize;
    let mut cursor = 0usize;
    let mut opaque: Option<String> = None;

    while let Some(tag) = next_tag(source, cursor) {
        cursor = tag.end;

        if let Some(end_name) = &opaque {
            if tag.name == end_name.as_str() {
                opaque = None;
            }
            continue;
        }

        if OPAQUE_BLOCKS.contains(&tag.name) {
            opaque = Some(format!("end{}", tag.name));
            continue;
        }

        if !names.contains(&tag.name) || tag.markup.is_empty() {
            continue;
        }

        output.push_str(&source[copied..tag.start]);
        output.push_str(if tag.trim_left { "{%- " } else { "{% " });
        output.push_str(tag.name);
        output.push_str(" \"");
        output.extend(utf8_percent_encode(tag.markup, NON_ALPHANUMERIC));
        output.push_str(if tag.trim_right { "\" -%}" } else { "\" %}" });
        copied = tag.end;
    }

    if copied == 0 {
        return Cow::Borrowed(source);
    }
    output.push_str(&source[copied..]);
    Cow::Owned(output)
}

/// Recovers the markup from the literal written by [`encode_block_arguments`].
pub(crate) fn decode_block_arguments(token: &str) -> Option<String> {
    let inner = token.strip_prefix('"')?.strip_suffix('"')?;
    percent_decode_str(inner)
        .decode_utf8()
        .ok()
        .map(Cow::into_owned)
}

struct TagSpan<'a> {
    start: usize,
    end: usize,
    name: &'a str,
    markup: &'a str,
    trim_left: bool,
    trim_right: bool,
}

fn next_tag(source: &str, from: usize) -> Option<TagSpan<'_>> {
    let mut search = from;
    loop {
        let start = search + source[search..].find("{%")?;
        let close = start + 2 + source[start + 2..].find("%}")?;
        let end = close + 2;

        let mut inner = &source[start + 2..close];
        let trim_left = inner.starts_with('-');
        if trim_left {
            inner = &inner[1..];
        }
        let trim_right = inner.ends_with('-');
        if trim_right {
            inner = &inner[..inner.len() - 1];
        }

        let inner = inner.trim_start();
        let name_len = inner
            .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_' || ch == '-'))
            .unwrap_or(inner.len());
        if name_len == 0 {
            search = end;
            continue;
        }

        return Some(TagSpan {
            start,
            end,
            name: &inner[..name_len],
            markup: inner[name_len..].trim_start(),
            trim_left,
            trim_right,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(source: &str) -> String {
        encode_block_arguments(source, &["vbar"]).into_owned()
    }

    fn markup_of(rewritten: &str) -> Option<String> {
        let tag = next_tag(rewritten, 0)?;
        decode_block_arguments(tag.markup.trim_end())
    }

    #[test]
    fn leaves_tags_without_arguments_alone() {
        let source = "{% vbar %}x{% endvbar %}";
        assert!(matches!(
            encode_block_arguments(source, &["vbar"]),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn round_trips_punctuation_and_spacing() {
        for markup in [
            "title=What's new? ",
            "title=Hello, world ",
            "title=Note: read this ",
            "title = X ",
            "title=Two  spaces|icon ",
            "title=C++ \"API\" ",
        ] {
            let rewritten = encode(&format!("{{% vbar {markup}%}}body{{% endvbar %}}"));
            assert_eq!(markup_of(&rewritten).as_deref(), Some(markup));
            assert!(rewritten.ends_with("%}body{% endvbar %}"));
        }
    }

    #[test]
    fn keeps_whitespace_control_markers() {
        let rewritten = encode("a {%- vbar title=Trim -%} b");
        assert!(rewritten.starts_with("a {%- vbar \""));
        assert!(rewritten.ends_with("\" -%} b"));
        assert_eq!(markup_of(&rewritten[2..]).as_deref(), Some("title=Trim "));
    }

    #[test]
    fn ignores_other_tags_and_raw_blocks() {
        let source = "{% if x %}{% endif %}{% raw %}{% vbar title=Literal %}{% endraw %}";
        assert_eq!(encode(source), source);
    }

    #[test]
    fn does_not_touch_end_tags_or_prefixed_names() {
        let source = "{% vbarx title=A %}{% endvbar %}";
        assert_eq!(encode(source), source);
    }

    #[test]
    fn rejects_tokens_that_are_not_encoded_literals() {
        assert_eq!(decode_block_arguments("title"), None);
        assert_eq!(decode_block_arguments("\"%FF\""), None);
        assert_eq!(
            decode_block_arguments("\"title%3DA\"").as_deref(),
            Some("title=A")
        );
    }
}
