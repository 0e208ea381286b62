//! Integration tests for navigation-completion scheduling.

use std::time::Duration;

use serde_json::json;
use tokio::time::sleep;

use themekit_core::names::{EventName, HookPoint};

use crate::helpers::{self, TestPage};

#[tokio::test(start_paused = true)]
async fn test_navigation_with_content_mutation_renders_once() {
    let page = TestPage::quiet();
    let renders = page.record_hook(HookPoint::ContentRender.as_str());
    page.runtime.boot(json!({})).await.unwrap();

    page.runtime.navigate("/posts/hello?ref=home").await.unwrap();
    page.render_article("<h1>Hello</h1><p>First post</p>");
    sleep(Duration::from_millis(200)).await;

    let recorded = renders.lock().unwrap().clone();
    assert_eq!(
        recorded,
        vec![json!({"path": "/posts/hello?ref=home", "query": {"ref": "home"}})]
    );

    // The fallback for this navigation was cancelled.
    sleep(Duration::from_millis(2000)).await;
    assert_eq!(renders.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_navigation_without_mutation_renders_after_fallback() {
    let page = TestPage::quiet();
    let renders = page.record_hook(HookPoint::ContentRender.as_str());
    page.runtime.boot(json!({})).await.unwrap();

    page.runtime.navigate("/archive").await.unwrap();
    sleep(Duration::from_millis(790)).await;
    assert!(renders.lock().unwrap().is_empty());

    sleep(Duration::from_millis(20)).await;
    assert_eq!(helpers::paths(&renders), vec!["/archive"]);
}

#[tokio::test(start_paused = true)]
async fn test_rapid_navigations_render_only_the_last() {
    let page = TestPage::quiet();
    let renders = page.record_hook(HookPoint::ContentRender.as_str());
    let routes = page.record_event(EventName::RouteChange.as_str());
    page.runtime.boot(json!({})).await.unwrap();

    page.runtime.navigate("/a").await.unwrap();
    page.render_article("<p>a</p>");
    sleep(Duration::from_millis(50)).await;
    page.runtime.navigate("/b").await.unwrap();
    sleep(Duration::from_millis(2000)).await;

    assert_eq!(helpers::paths(&renders), vec!["/b"]);
    let routes = routes.lock().unwrap();
    assert_eq!(routes.len(), 2);
    assert_eq!(routes[1], json!({"from": "/a", "to": "/b", "query": {}}));
}

#[tokio::test(start_paused = true)]
async fn test_back_navigation_renders_previous_page() {
    let page = TestPage::quiet();
    let renders = page.record_hook(HookPoint::ContentRender.as_str());
    page.runtime.boot(json!({})).await.unwrap();

    page.runtime.navigate("/tags/rust").await.unwrap();
    sleep(Duration::from_millis(1000)).await;
    assert!(page.runtime.history.back().await.unwrap());
    page.render_article("<p>home</p>");
    sleep(Duration::from_millis(1000)).await;

    assert_eq!(helpers::paths(&renders), vec!["/tags/rust", "/"]);
    let stats = page.runtime.scheduler.stats();
    assert_eq!(stats.navigations, 2);
    assert_eq!(stats.renders, 2);
}
