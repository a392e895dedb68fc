//! Descriptor builders for the API's lookup routes

use crate::entity::{Entity, EntityType};
use crate::request::RequestDescriptor;

/// Cross-index search route
pub const SEARCH_ROUTE: &str = "search";

/// Community NVD index route
pub const NVD_COMMUNITY_INDEX: &str = "index/nist-nvd2";

/// Premium NVD index route
pub const NVD_PREMIUM_INDEX: &str = "index/vulncheck-nvd2";

/// Known-exploited-vulnerabilities index route
pub const KEV_INDEX: &str = "index/vulncheck-kev";

/// Threat-actor index route
pub const THREAT_ACTORS_INDEX: &str = "index/threat-actors";

/// The aql search expression for an entity
///
/// Email lookups search the users index, CVE lookups the vulnerabilities
/// index; anything else searches on the raw value.
pub fn aql_for_entity(entity: &Entity) -> String {
    if entity.is_type(EntityType::Email) {
        format!("in:users {}", entity.value)
    } else if entity.is_type(EntityType::Cve) {
        format!("in:vulnerabilities {}", entity.value)
    } else {
        entity.value.clone()
    }
}

/// Search descriptor for one entity, correlated by its value
pub fn search_descriptor(entity: &Entity) -> RequestDescriptor {
    RequestDescriptor::get(SEARCH_ROUTE)
        .with_correlation_id(entity.value.clone())
        .with_query("aql", aql_for_entity(entity))
        .with_query("includeSample", "true")
        .with_query("includeTotal", "true")
}

/// Search descriptors for a batch of entities
pub fn search_descriptors(entities: &[Entity]) -> Vec<RequestDescriptor> {
    entities.iter().map(search_descriptor).collect()
}

/// NVD record descriptor for a CVE entity, index chosen by subscription
pub fn nvd_descriptor(entity: &Entity, premium: bool) -> RequestDescriptor {
    let route = if premium {
        NVD_PREMIUM_INDEX
    } else {
        NVD_COMMUNITY_INDEX
    };
    RequestDescriptor::get(route)
        .with_correlation_id(entity.value.clone())
        .with_query("cve", entity.value.clone())
}

/// Known-exploited-vulnerabilities descriptor for a CVE entity
pub fn kev_descriptor(entity: &Entity) -> RequestDescriptor {
    RequestDescriptor::get(KEV_INDEX)
        .with_correlation_id(entity.value.clone())
        .with_query("cve", entity.value.clone())
}

/// Threat-actor descriptor for a CVE entity
pub fn threat_actor_descriptor(entity: &Entity) -> RequestDescriptor {
    RequestDescriptor::get(THREAT_ACTORS_INDEX)
        .with_correlation_id(entity.value.clone())
        .with_query("cve", entity.value.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aql_by_entity_type() {
        assert_eq!(
            aql_for_entity(&Entity::email("user@example.com")),
            "in:users user@example.com"
        );
        assert_eq!(
            aql_for_entity(&Entity::cve("CVE-2023-0001")),
            "in:vulnerabilities CVE-2023-0001"
        );
        assert_eq!(aql_for_entity(&Entity::ipv4("8.8.8.8")), "8.8.8.8");
    }

    #[test]
    fn test_search_descriptor_shape() {
        let descriptor = search_descriptor(&Entity::cve("CVE-2023-0001"));
        assert_eq!(descriptor.route(), SEARCH_ROUTE);
        assert_eq!(descriptor.correlation_id(), Some("CVE-2023-0001"));
        let query = descriptor.query();
        assert!(query.contains(&(
            "aql".to_string(),
            "in:vulnerabilities CVE-2023-0001".to_string()
        )));
        assert!(query.contains(&("includeSample".to_string(), "true".to_string())));
        assert!(query.contains(&("includeTotal".to_string(), "true".to_string())));
    }

    #[test]
    fn test_search_descriptors_one_per_entity() {
        let entities = vec![Entity::ipv4("8.8.8.8"), Entity::cve("CVE-2023-0001")];
        let descriptors = search_descriptors(&entities);
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].correlation_id(), Some("8.8.8.8"));
    }

    #[test]
    fn test_nvd_descriptor_honors_premium_toggle() {
        let entity = Entity::cve("CVE-2023-0001");
        assert_eq!(nvd_descriptor(&entity, false).route(), NVD_COMMUNITY_INDEX);
        assert_eq!(nvd_descriptor(&entity, true).route(), NVD_PREMIUM_INDEX);
    }

    #[test]
    fn test_supplemental_index_routes() {
        let entity = Entity::cve("CVE-2023-0001");
        assert_eq!(kev_descriptor(&entity).route(), KEV_INDEX);
        assert_eq!(
            threat_actor_descriptor(&entity).route(),
            THREAT_ACTORS_INDEX
        );
        assert!(
            kev_descriptor(&entity)
                .query()
                .contains(&("cve".to_string(), "CVE-2023-0001".to_string()))
        );
    }
}
