//! Summary tags for one entity's correlated results
//!
//! Tags are short strings a presentation layer can show next to an entity:
//! a result count, averaged scores, the known-exploited flag, and distinct
//! vendor/product labels pulled from CPE identifiers.

use serde_json::Value;

use crate::cpe;
use crate::entity::{Entity, EntityType};
use crate::error::Result;

/// Tag emitted when the lookup limit cut a result short
pub const LIMIT_REACHED_TAG: &str = "Lookup limit reached";

/// Numeric fields summarized into score tags, with their display labels
const SCORE_FIELDS: &[(&str, &str)] = &[
    ("baseScore", "CVSS"),
    ("cvssScore", "CVSS Score"),
    ("riskLevel", "Risk Score"),
];

/// Boolean field marking a vulnerability as known-exploited
const KNOWN_EXPLOITED_FIELD: &str = "knownExploited";

/// Field carrying the affected-platform CPE identifiers
const CPE_FIELD: &str = "vcVulnerableCPEs";

/// Build the summary tags for an entity from its correlated items
///
/// Rules apply in order: count label, one score label per populated score
/// field, the known-exploited flag, then vendor and product labels. A
/// rate-limited lookup yields only the limit tag. When no rule produces a
/// label the entity's own identifier stands in.
pub fn build_tags(entity: &Entity, items: &[Value], limit_hit: bool) -> Result<Vec<String>> {
    if limit_hit {
        return Ok(vec![LIMIT_REACHED_TAG.to_string()]);
    }

    let mut tags = Vec::new();
    if !items.is_empty() {
        tags.push(format!("{}: {}", count_noun(entity), items.len()));
    }
    for &(field, label) in SCORE_FIELDS {
        if let Some(tag) = score_tag(items, field, label) {
            tags.push(tag);
        }
    }
    if items
        .iter()
        .any(|item| item.get(KNOWN_EXPLOITED_FIELD).and_then(Value::as_bool) == Some(true))
    {
        tags.push("Known Exploited".to_string());
    }

    let cpes = collect_cpes(items);
    if !cpes.is_empty() {
        if let Some(tag) = categorical_tag("Vendor", &cpe::unique_vendors(&cpes)?) {
            tags.push(tag);
        }
        if let Some(tag) = categorical_tag("Product", &cpe::unique_products(&cpes)?) {
            tags.push(tag);
        }
    }

    if tags.is_empty() {
        // The aggregated row's identifier is its correlation id, which is
        // the entity value.
        tags.push(entity.value.clone());
    }
    Ok(tags)
}

fn count_noun(entity: &Entity) -> &'static str {
    if entity.is_type(EntityType::Email) {
        "Users"
    } else if entity.is_type(EntityType::Cve) {
        "Vulns"
    } else {
        "Devices"
    }
}

fn score_tag(items: &[Value], field: &str, label: &str) -> Option<String> {
    let values: Vec<f64> = items
        .iter()
        .filter_map(|item| item.get(field))
        .filter_map(Value::as_f64)
        .collect();
    match values.as_slice() {
        [] => None,
        [single] => Some(format!("{label}: {single}")),
        many => {
            let mean = many.iter().sum::<f64>() / many.len() as f64;
            Some(format!("Avg {label}: {}", mean.round()))
        }
    }
}

fn categorical_tag(label: &str, values: &[String]) -> Option<String> {
    match values {
        [] => None,
        [only] => Some(format!("{label}: {only}")),
        [first, rest @ ..] => Some(format!("{label}: {first} + {} more", rest.len())),
    }
}

/// All CPE identifier strings across the items, in encounter order
pub fn collect_cpes(items: &[Value]) -> Vec<String> {
    let mut cpes = Vec::new();
    for item in items {
        match item.get(CPE_FIELD) {
            Some(Value::Array(values)) => {
                cpes.extend(values.iter().filter_map(Value::as_str).map(str::to_string));
            }
            Some(Value::String(value)) => cpes.push(value.clone()),
            _ => {}
        }
    }
    cpes
}
