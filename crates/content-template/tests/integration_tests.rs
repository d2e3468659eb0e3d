/*
 * integration_tests.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Integration tests for content-template rendering.
 */

use std::path::{Path, PathBuf};

use content_template::{
    CompilerOptions, DiagnosticKind, Helper, HelperCall, SectionType, TemplateCompiler,
    TemplateError, TemplateResult, Value,
};
use pretty_assertions::assert_eq;
use serde_json::json;

/// Helper to get the path to test fixtures
fn fixture_path(name: &str) -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir).join("test-fixtures").join(name)
}

fn fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name))
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", name, e))
}

/// Parse and render a template with default settings.
fn render(source: &str, context: serde_json::Value) -> String {
    render_with(&TemplateCompiler::new(), source, context)
}

fn render_with(compiler: &TemplateCompiler, source: &str, context: serde_json::Value) -> String {
    compiler
        .render(
            "test",
            SectionType::Page,
            source,
            &Value::from(context),
            &Value::Null,
        )
        .unwrap_or_else(|e| panic!("Failed to render {:?}: {}", source, e))
}

// ============================================================================
// Paths and escaping
// ============================================================================

#[test]
fn test_bare_fixture_renders_placeholders() {
    let html = render(&fixture("bare.html"), json!({"general": {"title": "Hi"}}));
    assert_eq!(html, "<h1>Hi</h1>\n<p>{{general:subtitle}}</p>\n");
}

#[test]
fn test_placeholders_disabled() {
    let compiler =
        TemplateCompiler::with_options(CompilerOptions::default().with_placeholders(false));
    let html = render_with(&compiler, "<p>{{general.subtitle}}</p>", json!({}));
    assert_eq!(html, "<p></p>");
}

#[test]
fn test_strict_mode_fails_on_missing_data() {
    let compiler = TemplateCompiler::with_options(CompilerOptions::default().with_strict_mode(true));
    let err = compiler
        .render(
            "test",
            SectionType::Page,
            "<p>{{general.subtitle}}</p>",
            &Value::from(json!({"general": {}})),
            &Value::Null,
        )
        .unwrap_err();
    match err {
        TemplateError::MissingData { placeholder } => {
            assert_eq!(placeholder, "{{general:subtitle}}")
        }
        other => panic!("expected missing data error, got {:?}", other),
    }
}

#[test]
fn test_default_keyword() {
    let html = render(r#"{{general.author default="Anonymous"}}"#, json!({}));
    assert_eq!(html, "Anonymous");
}

#[test]
fn test_escaping() {
    let context = json!({"general": {"html": "<b>bold</b>"}});
    assert_eq!(
        render("{{general.html}}", context.clone()),
        "&lt;b&gt;bold&lt;/b&gt;"
    );
    assert_eq!(render("{{{general.html}}}", context), "<b>bold</b>");
}

#[test]
fn test_side_data_and_lazy_values() {
    let compiler = TemplateCompiler::new();
    let general = Value::from_iter([("year", Value::lazy(|| Value::from(2025_i64)))]);
    let context = Value::from_iter([("general", general)]);
    let html = compiler
        .render(
            "test",
            SectionType::Page,
            "{{@permalink}} {{general.year}}",
            &context,
            &Value::from(json!({"permalink": "/about"})),
        )
        .unwrap();
    assert_eq!(html, "/about 2025");
}

#[test]
fn test_diagnostics_are_reported() {
    let compiler = TemplateCompiler::new();
    let rendered = compiler
        .render_with_diagnostics(
            "test",
            SectionType::Page,
            "{{title}}",
            &Value::from(json!({})),
            &Value::Null,
        )
        .unwrap();
    assert_eq!(rendered.html, "{{general:title}}");
    let kinds: Vec<_> = rendered.diagnostics.iter().map(|d| d.kind).collect();
    assert_eq!(
        kinds,
        vec![DiagnosticKind::Deprecation, DiagnosticKind::MissingData]
    );
}

// ============================================================================
// Sections and collections
// ============================================================================

#[test]
fn test_section_forms_render_alike() {
    let context = json!({"about": {"name": "Ada"}});
    assert_eq!(
        render("{{#section about}}{{name}}{{/section}}", context.clone()),
        "Ada"
    );
    assert_eq!(render("{{#about}}{{name}}{{/about}}", context), "Ada");
}

#[test]
fn test_missing_section_renders_once() {
    let html = render(
        r#"{{#section about}}[{{name default="?"}}]{{/section}}"#,
        json!({}),
    );
    assert_eq!(html, "[?]");
}

#[test]
fn test_section_does_not_read_outer_content() {
    let compiler = TemplateCompiler::new();
    let source = "{{#section about}}{{title}}{{/section}}";
    let context = Value::from(json!({"title": "Page title", "about": {}}));

    let rendered = compiler
        .render_with_diagnostics("test", SectionType::Page, source, &context, &Value::Null)
        .unwrap();
    assert_eq!(rendered.html, "{{about:title}}");
    assert_eq!(rendered.diagnostics.len(), 1);
    assert_eq!(rendered.diagnostics[0].kind, DiagnosticKind::MissingData);

    let parsed = compiler.parse("test", SectionType::Page, source).unwrap();
    let about = parsed.schema.get_key("setting:about").unwrap();
    assert!(about.fields.contains_key("title"));
    assert!(parsed.schema.get_key("setting:general").is_none());
}

#[test]
fn test_multiple_section_repeats() {
    let html = render(
        "{{#section team multiple=true}}<li>{{name}}</li>{{/section}}",
        json!({"team": [{"name": "Ada"}, {"name": "Grace"}]}),
    );
    assert_eq!(html, "<li>Ada</li><li>Grace</li>");
}

#[test]
fn test_gallery_fixture() {
    let source = fixture("gallery.html");
    let html = render(
        &source,
        json!({"photos": [
            {"src": "a.jpg", "caption": "A"},
            null,
            {"src": "b.jpg", "caption": "B"}
        ]}),
    );
    assert_eq!(
        html,
        "<figure><img src=\"a.jpg\" alt=\"A\"><span>latest</span></figure>\
         <figure><img src=\"b.jpg\" alt=\"B\"></figure>\n"
    );

    assert_eq!(render(&source, json!({"photos": []})), "<p>Empty</p>\n");
    assert_eq!(render(&source, json!({})), "<p>Empty</p>\n");
}

#[test]
fn test_single_item_metadata() {
    let html = render(
        "{{#collection items as |i|}}{{@index}}/{{@length}} {{@first}} {{@last}} [{{@prev}}] [{{@next}}] {{i}}{{/collection}}",
        json!({"items": ["only"]}),
    );
    insta::assert_snapshot!(html, @"0/1 true true [] [] only");
}

#[test]
fn test_collection_limit() {
    let html = render(
        "{{#collection posts limit=2 as |post|}}{{post.title}};{{/collection}}",
        json!({"posts": [{"title": "a"}, {"title": "b"}, {"title": "c"}]}),
    );
    assert_eq!(html, "a;b;");
}

#[test]
fn test_collection_limit_zero_keeps_every_item() {
    let html = render(
        "{{#collection posts limit=0 as |post|}}{{post.title}};{{else}}empty{{/collection}}",
        json!({"posts": [{"title": "a"}, {"title": "b"}]}),
    );
    assert_eq!(html, "a;b;");
}

#[test]
fn test_each_over_map() {
    let html = render(
        "{{#each general.social as |url key|}}{{key}}:{{url}};{{/each}}",
        json!({"general": {"social": {"twitter": "t", "github": "g"}}}),
    );
    assert_eq!(html, "twitter:t;github:g;");
}

// ============================================================================
// Helpers
// ============================================================================

#[test]
fn test_collate_fixture() {
    let html = render(
        &fixture("categories.html"),
        json!({"posts": [
            {"category": "News"},
            {"category": "Tips"},
            {"category": "News"},
            {"category": null},
            {"category": ["Tips", "How To"]}
        ]}),
    );
    assert_eq!(
        html,
        "<ul><li><a href=\"/c/news\">News</a></li>\
         <li><a href=\"/c/tips\">Tips</a></li>\
         <li><a href=\"/c/uncategorized\">Uncategorized</a></li>\
         <li><a href=\"/c/how-to\">How To</a></li></ul>\n"
    );
}

#[test]
fn test_collate_renders_once_per_distinct_value() {
    let compiler = TemplateCompiler::new();
    let html = compiler
        .render(
            "test",
            SectionType::Page,
            r#"{{#collate key="category"}}{{category.value}}{{/collate}}"#,
            &Value::from(json!([
                {"category": "a"},
                {"category": "b"},
                {"category": "a"}
            ])),
            &Value::Null,
        )
        .unwrap();
    assert_eq!(html, "ab");
}

#[test]
fn test_collate_and_collection_share_their_source() {
    let html = render(
        r#"{{#collection posts as |p|}}[{{p.title}}]{{/collection}}|{{#collate posts key="category" as |g|}}<{{g.value}}>{{/collate}}"#,
        json!({"posts": [
            {"title": "A", "category": "x"},
            {"title": "B", "category": "y"}
        ]}),
    );
    assert_eq!(html, "[A][B]|<x><y>");
}

#[test]
fn test_conditionals() {
    let source = "{{#if general.show}}yes{{else}}no{{/if}}|{{#unless general.show}}hidden{{/unless}}";
    assert_eq!(render(source, json!({"general": {"show": true}})), "yes|");
    assert_eq!(render(source, json!({"general": {"show": []}})), "no|hidden");

    assert_eq!(
        render(
            r#"{{if general.dark "dark" "light"}}"#,
            json!({"general": {"dark": false}})
        ),
        "light"
    );
}

#[test]
fn test_unresolved_marker_is_falsy() {
    let html = render(
        "{{#if general.image}}<img>{{else}}none{{/if}}",
        json!({"general": {"image": "data:general.image"}}),
    );
    assert_eq!(html, "none");
}

#[test]
fn test_eq() {
    let source = r#"{{#eq general.kind "news"}}N{{else}}O{{/eq}}{{#if (eq general.kind "news")}}Y{{/if}}"#;
    assert_eq!(render(source, json!({"general": {"kind": "news"}})), "NY");
    assert_eq!(render(source, json!({"general": {"kind": "blog"}})), "O");
}

#[test]
fn test_link() {
    let source = r#"{{#link general.cta as |l|}}<a href="{{l.url}}">{{l.name}}</a>{{else}}none{{/link}}"#;
    assert_eq!(
        render(source, json!({"general": {"cta": {"url": "/about"}}})),
        "<a href=\"/about\">/about</a>"
    );
    assert_eq!(render(source, json!({"general": {"cta": ""}})), "none");

    assert_eq!(
        render("{{link general.cta}}", json!({"general": {"cta": "/x?a=1"}})),
        "/x?a&#x3D;1"
    );
}

#[test]
fn test_date() {
    let context = json!({"general": {"published": "2024-01-01", "empty": ""}});
    assert_eq!(
        render("{{date general.published}}", context.clone()),
        "Monday, Jan 1, 2024"
    );
    assert_eq!(
        render(r#"{{date general.published format="%Y"}}"#, context.clone()),
        "2024"
    );
    assert_eq!(render("[{{date general.empty}}]", context), "[]");
}

#[test]
fn test_date_format_option() {
    let compiler =
        TemplateCompiler::with_options(CompilerOptions::default().with_date_format("%d/%m/%Y"));
    let html = render_with(
        &compiler,
        "{{date general.published}}",
        json!({"general": {"published": "2024-03-09"}}),
    );
    assert_eq!(html, "09/03/2024");
}

#[test]
fn test_math() {
    let context = json!({"general": {"a": 3}});
    assert_eq!(render(r#"{{math "sum" general.a 2}}"#, context.clone()), "5");
    assert_eq!(render(r#"{{math "div" 1 4}}"#, context), "0.25");
}

struct Shout;

impl Helper for Shout {
    fn run(&self, call: &mut HelperCall<'_, '_>) -> TemplateResult<Value> {
        Ok(Value::from(call.arg(0).to_text().to_uppercase()))
    }
}

#[test]
fn test_custom_helper() {
    let mut compiler = TemplateCompiler::new();
    compiler.register_helper("shout", Shout);
    assert!(compiler.registry().contains("shout"));

    let html = render_with(
        &compiler,
        "{{shout general.title}}",
        json!({"general": {"title": "hello"}}),
    );
    assert_eq!(html, "HELLO");
}

// ============================================================================
// Partials
// ============================================================================

#[test]
fn test_partial_context_and_hash() {
    let mut compiler = TemplateCompiler::new();
    compiler.register_partial("card", "<b>{{this.name}}</b>");
    compiler.register_partial("badge", "<i>{{this.label}}</i>");

    let html = render_with(
        &compiler,
        r#"{{#collection team as |m|}}{{> card m}}{{/collection}}{{> badge label="New"}}"#,
        json!({"team": [{"name": "Ada"}, {"name": "Grace"}]}),
    );
    assert_eq!(html, "<b>Ada</b><b>Grace</b><i>New</i>");
}

#[test]
fn test_missing_partial_fallback() {
    let html = render("{{#> missing}}fallback{{/missing}}", json!({}));
    assert_eq!(html, "fallback");
}

#[test]
fn test_recursive_partial() {
    let mut compiler = TemplateCompiler::new();
    compiler.register_partial("loop", "<div>{{> loop}}</div>");
    let err = compiler
        .render(
            "test",
            SectionType::Page,
            "{{> loop}}",
            &Value::Null,
            &Value::Null,
        )
        .unwrap_err();
    assert!(matches!(err, TemplateError::RecursivePartial { .. }));
}

#[test]
fn test_site_fixture_renders() {
    let site = fixture_path("site");
    let mut compiler = TemplateCompiler::new();
    compiler.register_partials_from_dir(&site).unwrap();

    let context = Value::from(json!({
        "general": {"site_name": "Acme", "tagline": "Hi"},
        "links": [{"url": "/", "label": "Home"}],
        "about": {"bio": "<em>bio</em>"},
        "posts": [
            {"title": "One", "published": "2024-01-01"},
            {"title": "Two", "published": "2024-01-02"},
            {"title": "Three", "published": "2024-01-03"}
        ]
    }));
    let html = compiler
        .render_file(&site.join("index.html"), &context, &Value::Null)
        .unwrap();

    assert!(html.contains("<h1>Acme</h1>"), "{}", html);
    assert!(html.contains("<nav><a href=\"/\">Home</a></nav>"), "{}", html);
    assert!(html.contains("<h2>Hi</h2>"), "{}", html);
    assert!(html.contains("<p><em>bio</em></p>"), "{}", html);
    assert!(html.contains("<article>One (Monday, Jan 1, 2024)</article>"), "{}", html);
    assert!(html.contains("<article>Two (Tuesday, Jan 2, 2024)</article>"), "{}", html);
    assert!(!html.contains("Three"), "{}", html);
    assert!(!html.contains("No posts"), "{}", html);
}

#[test]
fn test_parsed_tree_is_reusable() {
    let compiler = TemplateCompiler::new();
    let parsed = compiler
        .parse("test", SectionType::Page, "<p>{{general.title}}</p>")
        .unwrap();

    let first = compiler
        .render(
            "test",
            SectionType::Page,
            &parsed,
            &Value::from(json!({"general": {"title": "A"}})),
            &Value::Null,
        )
        .unwrap();
    let second = compiler
        .render(
            "test",
            SectionType::Page,
            &parsed,
            &Value::from(json!({"general": {"title": "B"}})),
            &Value::Null,
        )
        .unwrap();
    assert_eq!(first, "<p>A</p>");
    assert_eq!(second, "<p>B</p>");
}
