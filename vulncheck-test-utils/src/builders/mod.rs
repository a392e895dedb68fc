//! Builders for canned VulnCheck API payloads.

mod test_data;

pub use test_data::{
    auth_token, device_item, placeholder_items, search_page, search_page_with_cursor, token_body,
    token_body_with, user_item, vuln_item, vuln_item_with_cpes,
};
