use std::collections::BTreeMap;
use std::sync::Arc;

use markdown_callout::{
    register_tags, render_callout, CalloutConfig, ConvertError, Engine, EngineError,
    MarkdownSettings, MarkupConverter, TagRegistry,
};
use pretty_assertions::assert_eq;

fn engine() -> Engine {
    Engine::new(&MarkdownSettings::default()).expect("engine")
}

fn no_globals() -> BTreeMap<String, String> {
    BTreeMap::new()
}

#[derive(Debug)]
struct Failing;

impl MarkupConverter for Failing {
    fn convert(&self, _text: &str) -> Result<String, ConvertError> {
        Err(ConvertError::Converter("markdown backend unavailable".into()))
    }
}

#[test]
fn registers_vbar_with_the_engine() {
    let engine = engine();
    assert_eq!(engine.registry().names().collect::<Vec<_>>(), vec!["vbar"]);
}

#[test]
fn renders_callout_without_arguments() {
    let html = engine()
        .render("{% vbar %}hello{% endvbar %}", &no_globals())
        .unwrap();

    assert_eq!(
        html,
        "<div class=\"bs-callout bs-callout-success\"><p>hello</p>\n</div>"
    );
}

#[test]
fn renders_callout_with_title() {
    let html = engine()
        .render("{% vbar title=Note %}hello{% endvbar %}", &no_globals())
        .unwrap();

    assert_eq!(
        html,
        "<div class=\"bs-callout bs-callout-success\"><strong><p>Note</p>\n</strong>\
         <p>hello</p>\n</div>"
    );
}

#[test]
fn multi_word_title_and_icon_flag() {
    let html = engine()
        .render(
            "{% vbar title=Before you start|icon %}Read this.{% endvbar %}",
            &no_globals(),
        )
        .unwrap();

    assert!(html.contains("<strong><p>Before you start</p>\n</strong>"));
    assert!(!html.contains("icon"));
}

#[test]
fn arguments_reach_the_tag_verbatim() {
    let engine = engine();

    for args in [
        "title=What's new? ",
        "title=Important! ",
        "title=C++ API|icon ",
        "title=Hello, world ",
        "title=Note: read this ",
        "title=Two  spaces ",
        "title = X ",
    ] {
        let source = format!("{{% vbar {args}%}}body{{% endvbar %}}");
        let html = engine.render(&source, &no_globals()).unwrap();
        let expected = render_callout(
            &CalloutConfig::parse(Some(args)),
            Some("body"),
            engine.converter(),
        )
        .unwrap();

        assert_eq!(html, expected, "arguments: {args:?}");
    }
}

#[test]
fn punctuation_in_titles_is_preserved() {
    let engine = engine();
    let render = |args: &str| {
        engine
            .render(&format!("{{% vbar {args} %}}x{{% endvbar %}}"), &no_globals())
            .unwrap()
    };

    assert!(render("title=Hello, world").contains("<strong><p>Hello, world</p>\n</strong>"));
    assert!(render("title=Note: read this").contains("<strong><p>Note: read this</p>\n</strong>"));
    assert!(render("title=Two  spaces").contains("<strong><p>Two  spaces</p>\n</strong>"));
    // Without the literal `title=` the whole token is the title.
    assert!(render("title = X").contains("<strong><p>title = X</p>\n</strong>"));
}

#[test]
fn raw_blocks_keep_tag_text() {
    let html = engine()
        .render(
            "{% raw %}{% vbar title=What's new? %}{% endraw %}",
            &no_globals(),
        )
        .unwrap();

    assert_eq!(html, "{% vbar title=What's new? %}");
}

#[test]
fn expands_template_variables_before_conversion() {
    let mut globals = BTreeMap::new();
    globals.insert("product".to_string(), "Widget".to_string());

    let html = engine()
        .render("{% vbar %}Install **{{ product }}** first.{% endvbar %}", &globals)
        .unwrap();

    assert_eq!(
        html,
        "<div class=\"bs-callout bs-callout-success\"><p>Install <strong>Widget</strong> first.</p>\n</div>"
    );
}

#[test]
fn leaves_surrounding_document_alone() {
    let source = "before\n{% vbar %}\n## Notes\n{% endvbar %}\nafter\n";
    let html = engine().render(source, &no_globals()).unwrap();

    assert_eq!(
        html,
        "before\n<div class=\"bs-callout bs-callout-success\"><h2 id=\"notes\">Notes</h2>\n</div>\nafter\n"
    );
}

#[test]
fn converter_failure_fails_the_render() {
    let mut registry = TagRegistry::new();
    register_tags(&mut registry).unwrap();
    let engine = Engine::with_registry(registry, Arc::new(Failing)).unwrap();

    let err = engine
        .render("{% vbar %}hello{% endvbar %}", &no_globals())
        .unwrap_err();

    assert!(matches!(err, EngineError::Render(_)));
    assert!(err.to_string().contains("markdown backend unavailable"));
}

#[test]
fn unclosed_block_is_a_parse_error() {
    let err = engine()
        .render("{% vbar %}never closed", &no_globals())
        .unwrap_err();

    assert!(matches!(err, EngineError::Parse(_)));
}

#[test]
fn engine_without_registered_tags_rejects_vbar() {
    let engine = Engine::with_registry(
        TagRegistry::new(),
        Arc::new(markdown_callout::CmarkConverter::default()),
    )
    .unwrap();

    let err = engine
        .render("{% vbar %}hello{% endvbar %}", &no_globals())
        .unwrap_err();
    assert!(matches!(err, EngineError::Parse(_)));
}
