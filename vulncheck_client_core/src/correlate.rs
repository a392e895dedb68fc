//! Matching aggregated results back to the entities that prompted them
//!
//! A result belongs to an entity when its correlation id equals the entity's
//! value. Array payloads are flattened so callers always see individual
//! items.

use serde_json::Value;

use crate::batch::AggregatedResult;
use crate::entity::Entity;

/// All items correlated to the entity, in result order
///
/// `only_unique` drops deep-equal duplicates, keeping first occurrences.
pub fn matching_results(
    entity: &Entity,
    results: &[AggregatedResult],
    only_unique: bool,
) -> Vec<Value> {
    let mut items: Vec<Value> = Vec::new();
    let matching = results
        .iter()
        .filter(|r| r.correlation_id.as_deref() == Some(entity.value.as_str()));
    for result in matching {
        match &result.value {
            Value::Array(values) => {
                for value in values {
                    push_item(&mut items, value.clone(), only_unique);
                }
            }
            Value::Null => {}
            value => push_item(&mut items, value.clone(), only_unique),
        }
    }
    items
}

/// The first item correlated to the entity, or `None`
pub fn first_matching_result(
    entity: &Entity,
    results: &[AggregatedResult],
    only_unique: bool,
) -> Option<Value> {
    matching_results(entity, results, only_unique)
        .into_iter()
        .next()
}

/// Whether any of the entity's results carries the rate-limit marker
pub fn limit_hit_for_entity(entity: &Entity, results: &[AggregatedResult]) -> bool {
    results
        .iter()
        .any(|r| r.limit_hit && r.correlation_id.as_deref() == Some(entity.value.as_str()))
}

fn push_item(items: &mut Vec<Value>, value: Value, only_unique: bool) {
    if !only_unique || !items.contains(&value) {
        items.push(value);
    }
}
