//! Integration tests for hook pipelines and the event bus.

use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use themekit_core::error::AppError;
use themekit_plugin::events::bus::listener;
use themekit_plugin::hooks::definitions::HookAction;
use themekit_plugin::traits::ClosureFilter;

use crate::helpers::TestPage;

fn push(log: &Arc<Mutex<Vec<String>>>, entry: &str) {
    log.lock().unwrap().push(entry.to_string());
}

#[tokio::test]
async fn test_priority_then_insertion_order_in_both_modes() {
    let page = TestPage::quiet();
    let hooks = &page.runtime.hooks;
    let log = Arc::new(Mutex::new(Vec::new()));

    for (label, priority) in [("late", 20), ("first", 5), ("tie-a", 10), ("tie-b", 10)] {
        let l = log.clone();
        hooks.filter("order", priority, move |_, _| {
            push(&l, label);
            Ok(HookAction::Continue)
        });
    }

    page.runtime.dispatcher.trigger("order", Value::Null, &[]).unwrap();
    page.runtime
        .dispatcher
        .trigger_async("order", Value::Null, &[])
        .await
        .unwrap();

    let expected = ["first", "tie-a", "tie-b", "late"];
    let log = log.lock().unwrap();
    assert_eq!(log[..4], expected);
    assert_eq!(log[4..], expected);
}

#[tokio::test]
async fn test_async_filters_run_sequentially_with_sync_ones() {
    let page = TestPage::quiet();
    let hooks = &page.runtime.hooks;

    hooks.on_async(
        "title",
        ClosureFilter::new("suffix", |value, _| async move {
            tokio::task::yield_now().await;
            Ok(HookAction::replace(format!("{} | Blog", value.as_str().unwrap_or_default())))
        }),
        20,
    );
    hooks.filter("title", 10, |value, args| {
        let lang = args.first().and_then(Value::as_str).unwrap_or("en");
        Ok(HookAction::replace(format!("[{lang}] {}", value.as_str().unwrap_or_default())))
    });

    let out = page
        .runtime
        .dispatcher
        .trigger_async("title", json!("Hello"), &[json!("fr")])
        .await
        .unwrap();
    assert_eq!(out, json!("[fr] Hello | Blog"));

    let err = page
        .runtime
        .dispatcher
        .trigger("title", json!("Hello"), &[])
        .unwrap_err();
    assert_eq!(err.kind, themekit_core::error::ErrorKind::Hook);
}

#[tokio::test]
async fn test_identity_pass_through_and_off() {
    let page = TestPage::quiet();
    let dispatcher = &page.runtime.dispatcher;
    let seed = json!({"views": 3});

    assert_eq!(dispatcher.trigger("none", seed.clone(), &[]).unwrap(), seed);

    let handle = page
        .runtime
        .hooks
        .filter("stats", 10, |_, _| Ok(HookAction::Continue));
    assert_eq!(dispatcher.trigger("stats", seed.clone(), &[]).unwrap(), seed);

    let bump = page.runtime.hooks.filter("stats", 10, |v, _| {
        Ok(HookAction::replace(json!({"views": v["views"].as_i64().unwrap_or(0) + 1})))
    });
    assert_eq!(
        dispatcher.trigger("stats", seed.clone(), &[]).unwrap(),
        json!({"views": 4})
    );

    page.runtime.hooks.off("stats", &bump);
    page.runtime.hooks.off("stats", &handle);
    assert!(!page.runtime.hooks.has_hooks("stats"));
    assert_eq!(dispatcher.trigger("stats", seed.clone(), &[]).unwrap(), seed);
}

#[tokio::test]
async fn test_failing_listener_does_not_stop_others() {
    let page = TestPage::quiet();
    let events = &page.runtime.events;
    let log = Arc::new(Mutex::new(Vec::new()));

    let l = log.clone();
    events.on("comment:posted", listener(move |_| {
        push(&l, "a");
        Ok(())
    }));
    events.on(
        "comment:posted",
        listener(|_| Err(AppError::event("spam filter offline"))),
    );
    let l = log.clone();
    events.once("comment:posted", listener(move |_| {
        push(&l, "c");
        Ok(())
    }));

    assert_eq!(events.emit("comment:posted", &json!({"id": 1})), 2);
    assert_eq!(events.emit("comment:posted", &json!({"id": 2})), 1);
    assert_eq!(*log.lock().unwrap(), vec!["a", "c", "a"]);
    assert_eq!(events.listener_count("comment:posted"), 2);
}
