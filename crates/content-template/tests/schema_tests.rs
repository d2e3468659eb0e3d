/*
 * schema_tests.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Schema inference tests, inline and against test fixtures.
 */

use std::path::{Path, PathBuf};

use content_template::{
    DiagnosticKind, Schema, SectionType, TemplateCompiler, TemplateError, scan_site,
};
use pretty_assertions::assert_eq;
use serde_json::json;

/// Helper to get the path to test fixtures
fn fixture_path(name: &str) -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir).join("test-fixtures").join(name)
}

fn schema_of(source: &str) -> Schema {
    TemplateCompiler::new()
        .parse("test", SectionType::Partial, source)
        .unwrap_or_else(|e| panic!("Failed to parse {:?}: {}", source, e))
        .schema
}

fn keys(schema: &Schema) -> Vec<&str> {
    schema.keys().collect()
}

fn field_keys(schema: &Schema, key: &str) -> Vec<String> {
    schema
        .get_key(key)
        .unwrap_or_else(|| panic!("Missing section {}", key))
        .fields
        .keys()
        .cloned()
        .collect()
}

#[test]
fn test_bare_references_land_in_general() {
    let source = std::fs::read_to_string(fixture_path("bare.html")).unwrap();
    let compiler = TemplateCompiler::new();
    let parsed = compiler.parse("bare", SectionType::Partial, &source).unwrap();

    assert_eq!(keys(&parsed.schema), vec!["setting:general"]);
    assert_eq!(
        parsed.schema.to_json(),
        json!({
            "setting:general": {
                "name": "general",
                "type": "setting",
                "options": {},
                "fields": {
                    "title": {"key": "title", "type": "text", "isPrivate": false},
                    "subtitle": {
                        "key": "subtitle",
                        "type": "text",
                        "placeholder": "Say something",
                        "isPrivate": false
                    }
                }
            }
        })
    );
    assert_eq!(parsed.diagnostics.len(), 2);
    assert!(
        parsed
            .diagnostics
            .iter()
            .all(|d| d.kind == DiagnosticKind::Deprecation)
    );
}

#[test]
fn test_page_templates_are_seeded() {
    let compiler = TemplateCompiler::new();
    let parsed = compiler
        .parse("home", SectionType::Page, "{{title}}")
        .unwrap();
    assert_eq!(keys(&parsed.schema), vec!["page:home", "setting:general"]);
    assert!(parsed.schema.get(SectionType::Page, "home").unwrap().fields.is_empty());
}

#[test]
fn test_implicit_section_matches_explicit_section() {
    let explicit = schema_of("{{#section about}}{{name}}{{/section}}");
    let implicit = schema_of("{{#about}}{{name}}{{/about}}");

    assert_eq!(explicit, implicit);
    assert_eq!(keys(&explicit), vec!["setting:about"]);
    assert_eq!(field_keys(&explicit, "setting:about"), vec!["name"]);
}

#[test]
fn test_field_options_merge_later_wins() {
    let schema = schema_of(
        r#"{{general.title label="A" required=true}}{{general.title label="B"}}
           {{general.cta type="link"}}{{general.cta}}"#,
    );
    let general = schema.get(SectionType::Setting, "general").unwrap();

    let title = &general.fields["title"];
    assert_eq!(title.field_type, "text");
    assert_eq!(title.options["label"], json!("B"));
    assert_eq!(title.options["required"], json!(true));

    assert_eq!(general.fields["cta"].field_type, "link");
}

#[test]
fn test_private_references_never_reach_the_schema() {
    let schema = schema_of(
        "{{@secret}}{{_legacy}}\
         {{#each general.tags as |tag|}}{{tag.name}}{{/each}}\
         {{#collection @hidden as |h|}}{{h.x}}{{/collection}}",
    );

    assert_eq!(keys(&schema), vec!["setting:general"]);
    assert_eq!(field_keys(&schema, "setting:general"), vec!["tags"]);
}

#[test]
fn test_legacy_private_prefix_is_deprecated() {
    let parsed = TemplateCompiler::new()
        .parse("test", SectionType::Partial, "{{_legacy}}")
        .unwrap();
    assert!(parsed.schema.is_empty());
    assert_eq!(parsed.diagnostics.len(), 1);
    assert!(parsed.diagnostics[0].message.contains("{{_legacy}}"));
}

#[test]
fn test_collection_fields_and_options() {
    let schema = schema_of(
        "{{#collection posts limit=3 as |post|}}{{post.title}} {{post.author.name}}{{/collection}}",
    );
    let posts = schema.get(SectionType::Collection, "posts").unwrap();
    assert_eq!(posts.options["limit"], json!(3));
    assert_eq!(field_keys(&schema, "collection:posts"), vec!["title", "author.name"]);
}

#[test]
fn test_collection_inverse_is_walked_in_block_scope() {
    let schema = schema_of(
        "{{#collection posts as |post|}}{{post.title}}{{else}}{{general.empty_text}}{{/collection}}",
    );
    assert_eq!(keys(&schema), vec!["collection:posts", "setting:general"]);
}

#[test]
fn test_multiple_section_is_a_collection() {
    let schema = schema_of("{{#section team multiple=true}}{{name}}{{/section}}");
    assert_eq!(keys(&schema), vec!["collection:team"]);
    assert_eq!(field_keys(&schema, "collection:team"), vec!["name"]);
    assert_eq!(
        schema.get_key("collection:team").unwrap().options["multiple"],
        json!(true)
    );
}

#[test]
fn test_section_block_param_uses_section_type() {
    let schema =
        schema_of("{{#section team multiple=true as |member|}}{{member.role}}{{/section}}");
    assert_eq!(field_keys(&schema, "collection:team"), vec!["role"]);
}

#[test]
fn test_field_helpers_set_types() {
    let schema = schema_of(
        "{{#link general.cta as |l|}}{{l.url}}{{/link}}{{date general.published}}",
    );
    let general = schema.get(SectionType::Setting, "general").unwrap();
    assert_eq!(general.fields["cta"].field_type, "link");
    assert_eq!(general.fields["published"].field_type, "date");
    assert_eq!(general.fields.len(), 2);
}

#[test]
fn test_conditionals_register_their_arguments() {
    let schema = schema_of(
        r#"{{#if (eq general.kind "news")}}{{general.headline}}{{/if}}{{#unless hide}}x{{/unless}}"#,
    );
    assert_eq!(
        field_keys(&schema, "setting:general"),
        vec!["kind", "headline", "hide"]
    );
}

#[test]
fn test_collate_binds_its_key() {
    let schema = schema_of(
        r#"{{#collate posts key="category" as |group|}}{{category.name}}{{group.slug}}{{/collate}}"#,
    );
    assert!(schema.is_empty(), "{:?}", keys(&schema));
}

#[test]
fn test_collate_reads_the_collection_it_names() {
    let schema = schema_of(
        r#"{{#collection posts as |post|}}{{post.title}}{{/collection}}{{#collate posts key="category" as |group|}}{{group.name}}{{/collate}}"#,
    );
    assert_eq!(keys(&schema), vec!["collection:posts"]);
    assert_eq!(field_keys(&schema, "collection:posts"), vec!["title"]);
}

#[test]
fn test_collate_requires_key() {
    let err = TemplateCompiler::new()
        .parse("test", SectionType::Page, "{{#collate posts}}x{{/collate}}")
        .unwrap_err();
    assert!(matches!(err, TemplateError::Configuration { .. }));
}

#[test]
fn test_decorators_are_unsupported() {
    let err = TemplateCompiler::new()
        .parse("test", SectionType::Page, "{{* activate}}")
        .unwrap_err();
    assert!(matches!(err, TemplateError::UnsupportedConstruct { .. }));
}

#[test]
fn test_unbalanced_blocks_are_syntax_errors() {
    let compiler = TemplateCompiler::new();
    for source in ["{{#if x}}open", "{{#if x}}{{/each}}", "{{/if}}"] {
        let err = compiler.parse("test", SectionType::Page, source).unwrap_err();
        assert!(
            matches!(err, TemplateError::Syntax(_)),
            "expected syntax error for {:?}, got {:?}",
            source,
            err
        );
    }
}

#[test]
fn test_partials_are_walked_with_general_ambient() {
    let mut compiler = TemplateCompiler::new();
    compiler.register_partial("card", "<p>{{title}}</p>");
    compiler.register_partial("meta", "<meta content=\"{{this.description}}\">");

    let parsed = compiler
        .parse(
            "home",
            SectionType::Page,
            "{{#section about}}{{> card}}{{/section}}{{> meta}}",
        )
        .unwrap();

    assert_eq!(
        keys(&parsed.schema),
        vec!["page:home", "setting:about", "setting:general"]
    );
    assert_eq!(field_keys(&parsed.schema, "setting:general"), vec!["title"]);
    assert_eq!(field_keys(&parsed.schema, "page:home"), vec!["description"]);
    assert!(parsed.schema.get_key("setting:about").unwrap().fields.is_empty());
}

#[test]
fn test_unregistered_partials_are_ignored() {
    let schema = schema_of("{{> nowhere}}{{#> nowhere}}{{general.fallback}}{{/nowhere}}");
    assert_eq!(field_keys(&schema, "setting:general"), vec!["fallback"]);
}

#[test]
fn test_recursive_partials_fail() {
    let mut compiler = TemplateCompiler::new();
    compiler.register_partial("loop", "<div>{{> loop}}</div>");
    let err = compiler
        .parse("home", SectionType::Page, "{{> loop}}")
        .unwrap_err();
    assert!(matches!(
        err,
        TemplateError::RecursivePartial { ref name, max_depth: 50 } if name == "loop"
    ));
}

#[test]
fn test_parse_file_identity() {
    let compiler = TemplateCompiler::new();
    let parsed = compiler
        .parse_file(&fixture_path("site/collections/posts.html"))
        .unwrap();
    assert_eq!(parsed.name, "posts");
    assert_eq!(parsed.section_type, SectionType::Collection);
    assert_eq!(field_keys(&parsed.schema, "collection:posts"), vec!["title", "cta"]);
    assert_eq!(
        parsed.schema.get_key("collection:posts").unwrap().fields["cta"].field_type,
        "link"
    );
}

#[test]
fn test_scan_site() {
    let site = fixture_path("site");
    let mut compiler = TemplateCompiler::new();
    assert_eq!(compiler.register_partials_from_dir(&site).unwrap(), 2);

    let schema = scan_site(&compiler, &site).unwrap();

    assert_eq!(
        keys(&schema),
        vec![
            "page:about",
            "setting:general",
            "collection:links",
            "setting:about",
            "collection:posts",
            "page:index",
        ]
    );
    assert_eq!(
        schema.to_json(),
        json!({
            "page:about": {
                "name": "about",
                "type": "page",
                "options": {},
                "fields": {
                    "intro": {"key": "intro", "type": "text", "isPrivate": false}
                }
            },
            "setting:general": {
                "name": "general",
                "type": "setting",
                "options": {},
                "fields": {
                    "site_name": {"key": "site_name", "type": "text", "isPrivate": false},
                    "tagline": {"key": "tagline", "type": "text", "label": "Tagline", "isPrivate": false}
                }
            },
            "collection:links": {
                "name": "links",
                "type": "collection",
                "options": {},
                "fields": {
                    "url": {"key": "url", "type": "text", "isPrivate": false},
                    "label": {"key": "label", "type": "text", "isPrivate": false}
                }
            },
            "setting:about": {
                "name": "about",
                "type": "setting",
                "options": {},
                "fields": {
                    "bio": {"key": "bio", "type": "html", "isPrivate": false},
                    "name": {"key": "name", "type": "text", "isPrivate": false}
                }
            },
            "collection:posts": {
                "name": "posts",
                "type": "collection",
                "options": {"limit": 2},
                "fields": {
                    "title": {"key": "title", "type": "text", "required": true, "isPrivate": false},
                    "cta": {"key": "cta", "type": "link", "isPrivate": false},
                    "published": {"key": "published", "type": "date", "isPrivate": false}
                }
            },
            "page:index": {
                "name": "index",
                "type": "page",
                "options": {},
                "fields": {}
            }
        })
    );
}

#[test]
fn test_scan_is_stable_for_dirty_checks() {
    let site = fixture_path("site");
    let mut compiler = TemplateCompiler::new();
    compiler.register_partials_from_dir(&site).unwrap();

    let first = scan_site(&compiler, &site).unwrap();
    let second = scan_site(&compiler, &site).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_schema_serde_round_trip() {
    let schema = schema_of("{{#collection posts as |p|}}{{p.title label=\"Title\"}}{{/collection}}");
    let text = serde_json::to_string(&schema).unwrap();
    let back: Schema = serde_json::from_str(&text).unwrap();
    assert_eq!(back, schema);
}
