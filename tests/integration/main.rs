//! Integration tests driving the runtime the way a page would.

mod helpers;

mod boot_test;
mod content_test;
mod extension_test;
mod navigation_test;
