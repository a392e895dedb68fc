//! Indicator classification for raw command-line values
//!
//! Turns user-supplied strings into typed entities: CVE identifiers,
//! IPv4 addresses, and email addresses. Anything else is reported back
//! as unrecognized rather than guessed at.

use std::net::Ipv4Addr;

use vulncheck_client_core::Entity;

/// Classify one raw value into an entity, or `None` if it matches no
/// supported indicator type.
pub fn classify_value(raw: &str) -> Option<Entity> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }
    if let Some(cve) = normalize_cve(value) {
        return Some(Entity::cve(cve));
    }
    if value.parse::<Ipv4Addr>().is_ok() {
        return Some(Entity::ipv4(value));
    }
    if looks_like_email(value) {
        return Some(Entity::email(value));
    }
    None
}

/// Classify a list of values, splitting out the ones nothing matched.
pub fn classify_values(raws: &[String]) -> (Vec<Entity>, Vec<String>) {
    let mut entities = Vec::new();
    let mut unrecognized = Vec::new();
    for raw in raws {
        match classify_value(raw) {
            Some(entity) => entities.push(entity),
            None => unrecognized.push(raw.clone()),
        }
    }
    (entities, unrecognized)
}

/// Check whether a value is a CVE identifier.
pub fn is_cve(value: &str) -> bool {
    normalize_cve(value.trim()).is_some()
}

/// Validate `CVE-<year>-<number>` and uppercase the prefix.
fn normalize_cve(value: &str) -> Option<String> {
    let mut parts = value.splitn(3, '-');
    let prefix = parts.next()?;
    let year = parts.next()?;
    let number = parts.next()?;
    if !prefix.eq_ignore_ascii_case("cve") {
        return None;
    }
    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if number.len() < 4 || !number.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("CVE-{year}-{number}"))
}

fn looks_like_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    // Require a dot-separated domain so bare hostnames are not treated
    // as addresses.
    domain.split('.').count() >= 2 && !domain.starts_with('.') && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use vulncheck_client_core::EntityType;

    #[test]
    fn test_classifies_cve_case_insensitively() {
        let entity = classify_value("cve-2023-0001").unwrap();
        assert!(entity.is_type(EntityType::Cve));
        assert_eq!(entity.value, "CVE-2023-0001");
    }

    #[test]
    fn test_rejects_malformed_cve() {
        assert!(classify_value("CVE-23-0001").is_none());
        assert!(classify_value("CVE-2023-1").is_none());
        assert!(classify_value("CVE-2023-").is_none());
    }

    #[test]
    fn test_classifies_ipv4() {
        let entity = classify_value("8.8.8.8").unwrap();
        assert!(entity.is_type(EntityType::Ipv4));
        assert!(entity.is_routable());
    }

    #[test]
    fn test_private_ipv4_is_flagged() {
        let entity = classify_value("192.168.1.10").unwrap();
        assert!(entity.is_type(EntityType::Ipv4));
        assert!(!entity.is_routable());
    }

    #[test]
    fn test_classifies_email() {
        let entity = classify_value("user@example.com").unwrap();
        assert!(entity.is_type(EntityType::Email));
    }

    #[test]
    fn test_rejects_bare_hostname_as_email() {
        assert!(classify_value("user@localhost").is_none());
        assert!(classify_value("not an email").is_none());
        assert!(classify_value("@example.com").is_none());
    }

    #[test]
    fn test_classify_values_splits_unrecognized() {
        let raws = vec![
            "8.8.8.8".to_string(),
            "garbage".to_string(),
            "CVE-2023-0001".to_string(),
        ];
        let (entities, unrecognized) = classify_values(&raws);
        assert_eq!(entities.len(), 2);
        assert_eq!(unrecognized, vec!["garbage".to_string()]);
    }

    #[test]
    fn test_is_cve_helper() {
        assert!(is_cve(" CVE-2024-12345 "));
        assert!(!is_cve("8.8.8.8"));
    }
}
