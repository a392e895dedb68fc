//! Entities submitted for lookup
//!
//! An entity is a value the caller wants enriched (an IPv4 address, email
//! address, or CVE identifier) plus its semantic type tags and address
//! classification. Private, loopback, and link-local addresses are never
//! sent to the API.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Semantic type tag attached to an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityType {
    #[serde(rename = "IPv4")]
    Ipv4,
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "cve")]
    Cve,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ipv4 => "IPv4",
            Self::Email => "email",
            Self::Cve => "cve",
        };
        write!(f, "{name}")
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ipv4" | "ip" => Ok(Self::Ipv4),
            "email" => Ok(Self::Email),
            "cve" => Ok(Self::Cve),
            other => Err(format!("Unknown entity type: {other}")),
        }
    }
}

/// A value submitted for lookup, with its type tags and address flags
///
/// The `private_ip` flag is provider input; `is_routable` additionally
/// classifies the literal address so a mis-flagged RFC 1918 value still
/// stays on-box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// The raw value; also the natural correlation key
    pub value: String,
    /// Semantic type tags
    pub types: Vec<EntityType>,
    /// Whether the provider classified this as a private address
    #[serde(default)]
    pub private_ip: bool,
}

impl Entity {
    /// Create an entity, computing the private-address flag for IPv4 values
    pub fn new(value: impl Into<String>, types: Vec<EntityType>) -> Self {
        let value = value.into();
        let private_ip = types.contains(&EntityType::Ipv4)
            && value
                .parse::<Ipv4Addr>()
                .map(|addr| addr.is_private())
                .unwrap_or(false);
        Self {
            value,
            types,
            private_ip,
        }
    }

    /// Create an IPv4 entity
    pub fn ipv4(value: impl Into<String>) -> Self {
        Self::new(value, vec![EntityType::Ipv4])
    }

    /// Create an email entity
    pub fn email(value: impl Into<String>) -> Self {
        Self::new(value, vec![EntityType::Email])
    }

    /// Create a CVE entity
    pub fn cve(value: impl Into<String>) -> Self {
        Self::new(value, vec![EntityType::Cve])
    }

    /// Check whether this entity carries the given type tag
    pub fn is_type(&self, entity_type: EntityType) -> bool {
        self.types.contains(&entity_type)
    }

    /// Check whether this entity is an IP address
    pub fn is_ip(&self) -> bool {
        self.is_type(EntityType::Ipv4)
    }

    /// Check whether this entity may be sent to the API
    ///
    /// Non-IP entities are always routable. IP entities are rejected when
    /// flagged private or when the literal address is private, loopback,
    /// or link-local. An IP-tagged value that does not parse is rejected.
    pub fn is_routable(&self) -> bool {
        if !self.is_ip() {
            return true;
        }
        if self.private_ip {
            return false;
        }
        match self.value.parse::<Ipv4Addr>() {
            Ok(addr) => !addr.is_private() && !addr.is_loopback() && !addr.is_link_local(),
            Err(_) => false,
        }
    }
}

/// Drop entities that must not leave the local network
pub fn remove_non_routable(entities: &[Entity]) -> Vec<Entity> {
    entities
        .iter()
        .filter(|e| e.is_routable())
        .cloned()
        .collect()
}

/// Keep only entities carrying at least one of the given type tags
pub fn entities_of_types(types: &[EntityType], entities: &[Entity]) -> Vec<Entity> {
    entities
        .iter()
        .filter(|e| types.iter().any(|t| e.is_type(*t)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_parsing() {
        assert_eq!("IPv4".parse::<EntityType>().unwrap(), EntityType::Ipv4);
        assert_eq!("ip".parse::<EntityType>().unwrap(), EntityType::Ipv4);
        assert_eq!("EMAIL".parse::<EntityType>().unwrap(), EntityType::Email);
        assert_eq!("cve".parse::<EntityType>().unwrap(), EntityType::Cve);
        assert!("domain".parse::<EntityType>().is_err());
    }

    #[test]
    fn test_entity_type_display() {
        assert_eq!(EntityType::Ipv4.to_string(), "IPv4");
        assert_eq!(EntityType::Email.to_string(), "email");
        assert_eq!(EntityType::Cve.to_string(), "cve");
    }

    #[test]
    fn test_private_flag_computed_for_rfc1918() {
        assert!(Entity::ipv4("10.0.0.5").private_ip);
        assert!(Entity::ipv4("172.16.1.1").private_ip);
        assert!(Entity::ipv4("192.168.0.1").private_ip);
        assert!(!Entity::ipv4("8.8.8.8").private_ip);
    }

    #[test]
    fn test_public_ip_is_routable() {
        assert!(Entity::ipv4("8.8.8.8").is_routable());
    }

    #[test]
    fn test_special_ranges_are_not_routable() {
        assert!(!Entity::ipv4("10.1.2.3").is_routable());
        assert!(!Entity::ipv4("127.0.0.1").is_routable());
        assert!(!Entity::ipv4("169.254.0.9").is_routable());
    }

    #[test]
    fn test_provider_flag_wins_over_literal() {
        let mut entity = Entity::ipv4("8.8.4.4");
        entity.private_ip = true;
        assert!(!entity.is_routable());
    }

    #[test]
    fn test_unparseable_ip_is_not_routable() {
        let entity = Entity::new("not-an-ip", vec![EntityType::Ipv4]);
        assert!(!entity.is_routable());
    }

    #[test]
    fn test_non_ip_entities_are_routable() {
        assert!(Entity::cve("CVE-2023-0001").is_routable());
        assert!(Entity::email("user@example.com").is_routable());
    }

    #[test]
    fn test_remove_non_routable() {
        let entities = vec![
            Entity::ipv4("8.8.8.8"),
            Entity::ipv4("192.168.1.1"),
            Entity::cve("CVE-2023-0001"),
        ];
        let kept = remove_non_routable(&entities);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].value, "8.8.8.8");
        assert_eq!(kept[1].value, "CVE-2023-0001");
    }

    #[test]
    fn test_entities_of_types() {
        let entities = vec![
            Entity::ipv4("8.8.8.8"),
            Entity::email("user@example.com"),
            Entity::cve("CVE-2023-0001"),
        ];
        let cves = entities_of_types(&[EntityType::Cve], &entities);
        assert_eq!(cves.len(), 1);
        assert_eq!(cves[0].value, "CVE-2023-0001");

        let mixed = entities_of_types(&[EntityType::Ipv4, EntityType::Email], &entities);
        assert_eq!(mixed.len(), 2);
    }
}
