//! Integration tests for the boot sequence.

use std::time::Duration;

use serde_json::json;

use themekit_core::names::{EventName, HookPoint};
use themekit_plugin::hooks::definitions::HookAction;

use crate::helpers::{self, TestPage};

#[tokio::test(start_paused = true)]
async fn test_boot_paints_declared_slots_and_announces_ready() {
    let page = TestPage::new();
    page.runtime
        .slots
        .register("sidebar", r#"<ul class="recent"></ul>"#, 10)
        .unwrap();
    page.runtime
        .hooks
        .filter(HookPoint::SystemInit.as_str(), 10, |site, _| {
            let mut site = site.clone();
            site["theme"] = json!("paper");
            Ok(HookAction::replace(site))
        });
    let sidebar = page.record_hook("sidebar");
    let ready = page.record_event(EventName::ThemeReady.as_str());

    let site = page.runtime.boot(json!({"name": "My Blog"})).await.unwrap();

    assert_eq!(site, json!({"name": "My Blog", "theme": "paper"}));
    assert_eq!(sidebar.lock().unwrap().len(), 1);
    assert_eq!(
        *ready.lock().unwrap(),
        vec![json!({"site": {"name": "My Blog", "theme": "paper"}, "slots": 1})]
    );
    assert!(page.doc.html().contains(
        r#"<aside data-slot="sidebar"><div class="slot-sidebar" data-slot-rendered="sidebar"><ul class="recent"></ul></div></aside>"#
    ));
    assert!(page.runtime.is_booted());
}

#[tokio::test(start_paused = true)]
async fn test_first_page_view_gets_content_render() {
    let page = TestPage::new();
    let renders = page.record_hook(HookPoint::ContentRender.as_str());
    let routes = page.record_hook(HookPoint::RouteChange.as_str());

    page.runtime.boot(json!({})).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1000)).await;

    assert_eq!(helpers::paths(&renders), vec!["/"]);
    assert!(routes.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_system_init_failure_aborts_boot() {
    let page = TestPage::new();
    let failing = page
        .runtime
        .hooks
        .filter(HookPoint::SystemInit.as_str(), 10, |_, _| {
            Err(themekit_core::error::AppError::hook("bad site"))
        });
    let ready = page.record_event(EventName::ThemeReady.as_str());

    let err = page.runtime.boot(json!({})).await.unwrap_err();
    assert_eq!(err.kind, themekit_core::error::ErrorKind::Hook);
    assert!(ready.lock().unwrap().is_empty());
    assert!(!page.runtime.is_booted());

    page.runtime
        .hooks
        .off(HookPoint::SystemInit.as_str(), &failing);
    page.runtime.boot(json!({"title": "Retry"})).await.unwrap();
    assert!(page.runtime.is_booted());
    assert_eq!(ready.lock().unwrap().len(), 1);
}
