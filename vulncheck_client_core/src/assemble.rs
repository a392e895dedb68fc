//! Per-entity lookup assembly
//!
//! Turns a pile of aggregated batch results into one row per entity:
//! summary tags, the correlated items, and the distinct vendors/products
//! affected. Entities with no data get an explicit miss row.

use serde::Serialize;
use serde_json::Value;

use crate::batch::AggregatedResult;
use crate::correlate;
use crate::cpe;
use crate::entity::Entity;
use crate::error::Result;
use crate::summary;

/// The outcome of looking up one entity
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LookupResult {
    pub entity: Entity,
    /// `None` when the API had nothing for this entity
    pub data: Option<LookupData>,
}

impl LookupResult {
    /// Check whether the lookup produced any data
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }
}

/// Summary tags plus full details for one entity
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LookupData {
    pub summary: Vec<String>,
    pub details: LookupDetails,
}

/// The correlated items and the platform coverage extracted from them
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LookupDetails {
    pub results: Vec<Value>,
    pub vendors: Vec<String>,
    pub products: Vec<String>,
}

/// Assemble one `LookupResult` per entity, in entity order
pub fn assemble_lookup_results(
    entities: &[Entity],
    results: &[AggregatedResult],
) -> Result<Vec<LookupResult>> {
    entities
        .iter()
        .map(|entity| assemble_one(entity, results))
        .collect()
}

fn assemble_one(entity: &Entity, results: &[AggregatedResult]) -> Result<LookupResult> {
    let limit_hit = correlate::limit_hit_for_entity(entity, results);
    let items = correlate::matching_results(entity, results, false);
    if items.is_empty() && !limit_hit {
        return Ok(LookupResult {
            entity: entity.clone(),
            data: None,
        });
    }

    let tags = summary::build_tags(entity, &items, limit_hit)?;
    let cpes = summary::collect_cpes(&items);
    let details = LookupDetails {
        vendors: cpe::unique_vendors(&cpes)?,
        products: cpe::unique_products(&cpes)?,
        results: items,
    };
    Ok(LookupResult {
        entity: entity.clone(),
        data: Some(LookupData {
            summary: tags,
            details,
        }),
    })
}

/// Typed view of one NVD vulnerability record
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CveDetails {
    pub cve: Option<String>,
    pub description: Option<String>,
    pub source_identifier: Option<String>,
    pub vuln_status: Option<String>,
    pub published: Option<String>,
    pub last_modified: Option<String>,
    pub vendors: Vec<String>,
    pub products: Vec<String>,
}

impl CveDetails {
    /// Extract the fields this crate surfaces from a raw NVD record
    ///
    /// The premium index lists affected platforms directly in
    /// `vcVulnerableCPEs`; community records bury them in configuration
    /// nodes. Both shapes are handled.
    pub fn from_record(record: &Value) -> Result<Self> {
        let cpes = record_cpes(record);
        Ok(Self {
            cve: string_at(record, "id"),
            description: english_description(record),
            source_identifier: string_at(record, "sourceIdentifier"),
            vuln_status: string_at(record, "vulnStatus"),
            published: string_at(record, "published"),
            last_modified: string_at(record, "lastModified"),
            vendors: cpe::unique_vendors(&cpes)?,
            products: cpe::unique_products(&cpes)?,
        })
    }
}

fn string_at(record: &Value, key: &str) -> Option<String> {
    record.get(key).and_then(Value::as_str).map(str::to_string)
}

fn english_description(record: &Value) -> Option<String> {
    let descriptions = record.get("descriptions")?.as_array()?;
    descriptions
        .iter()
        .find(|d| d.get("lang").and_then(Value::as_str) == Some("en"))
        .or_else(|| descriptions.first())
        .and_then(|d| d.get("value"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn record_cpes(record: &Value) -> Vec<String> {
    if let Some(direct) = record.get("vcVulnerableCPEs").and_then(Value::as_array) {
        return direct
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
    }

    let mut cpes = Vec::new();
    let Some(configurations) = record.get("configurations").and_then(Value::as_array) else {
        return cpes;
    };
    for configuration in configurations {
        let Some(nodes) = configuration.get("nodes").and_then(Value::as_array) else {
            continue;
        };
        for node in nodes {
            let Some(matches) = node.get("cpeMatch").and_then(Value::as_array) else {
                continue;
            };
            for cpe_match in matches {
                if let Some(criteria) = cpe_match.get("criteria").and_then(Value::as_str) {
                    cpes.push(criteria.to_string());
                }
            }
        }
    }
    cpes
}
