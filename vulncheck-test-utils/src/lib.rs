//! Shared test utilities for the VulnCheck client workspace.
//!
//! Provides canned API payload builders and an instrumented HTTP test
//! server that records request ordering and concurrency, for tests that
//! need more than static mocks.

pub mod builders;
pub mod mocks;

pub use builders::{
    auth_token, device_item, placeholder_items, search_page, search_page_with_cursor, token_body,
    token_body_with, user_item, vuln_item, vuln_item_with_cpes,
};
pub use mocks::{RecordingServer, RecordingServerBuilder, RequestRecord};
