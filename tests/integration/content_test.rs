//! Integration tests for shortcodes and slots.

use async_trait::async_trait;
use serde_json::{Value, json};

use themekit_content::{ShortcodeAttrs, ShortcodeHandler, SlotContent};
use themekit_core::error::AppError;
use themekit_core::result::AppResult;

use crate::helpers::TestPage;

/// Looks up a post title from the render context.
struct PostLink;

#[async_trait]
impl ShortcodeHandler for PostLink {
    async fn render(
        &self,
        inner: &str,
        attrs: &ShortcodeAttrs,
        context: &Value,
    ) -> AppResult<String> {
        tokio::task::yield_now().await;
        let id = attrs
            .get("id")
            .ok_or_else(|| AppError::shortcode("post id missing"))?;
        let title = context["posts"][id.as_str()]
            .as_str()
            .ok_or_else(|| AppError::shortcode(format!("unknown post {id}")))?;
        let label = if inner.is_empty() { title } else { inner };
        Ok(format!(r#"<a href="/posts/{id}">{label}</a>"#))
    }
}

#[tokio::test]
async fn test_shortcodes_expand_through_runtime() {
    let page = TestPage::quiet();
    page.runtime
        .shortcodes
        .register_fn("bold", |inner, _, _| Ok(format!("<strong>{inner}</strong>")));
    page.runtime.shortcodes.register("post", PostLink);

    let context = json!({"posts": {"7": "Hello Rust"}});
    let html = page
        .runtime
        .render_content(
            r#"[bold]Read[/bold] [post id="7"/], [post id="9"/] or [post id="7"]this[/post]. [spoiler]x[/spoiler]"#,
            &context,
        )
        .await
        .unwrap();

    assert_eq!(
        html,
        r#"<strong>Read</strong> <a href="/posts/7">Hello Rust</a>, [post id="9"/] or <a href="/posts/7">this</a>. [spoiler]x[/spoiler]"#
    );
}

#[tokio::test]
async fn test_live_slot_registration_appends_once() {
    let page = TestPage::quiet();
    page.runtime.slots.add("sidebar", "<p>About me</p>").unwrap();
    page.runtime.boot(json!({})).await.unwrap();

    page.runtime
        .slots
        .register(
            "sidebar",
            SlotContent::dynamic(|| r#"<p>Tags</p><script src="/tags.js"></script>"#.to_string()),
            5,
        )
        .unwrap();

    let html = page.doc.html();
    assert_eq!(html.matches("<p>About me</p>").count(), 1);
    assert!(html.contains(
        r#"<div class="slot-sidebar" data-slot-rendered="sidebar"><p>About me</p><p>Tags</p><script src="/tags.js"></script></div>"#
    ));

    let executed = page.doc.executed_scripts();
    assert_eq!(executed.len(), 1);
    assert_eq!(
        executed[0].attributes,
        vec![("src".to_string(), "/tags.js".to_string())]
    );

    // Content order follows priority even though the DOM is append-only.
    assert_eq!(
        page.runtime.slots.get_content("sidebar"),
        "<p>Tags</p><script src=\"/tags.js\"></script>\n<p>About me</p>"
    );
}

#[tokio::test]
async fn test_slot_into_missing_container_is_skipped() {
    let page = TestPage::quiet();
    page.runtime.slots.add("toolbar", "<button>x</button>").unwrap();
    let rendered = page.runtime.slots.render("toolbar", "#does-not-exist").await.unwrap();
    assert!(rendered.is_none());
    assert!(!page.doc.html().contains("<button>"));
}
