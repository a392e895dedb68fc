//! CPE 2.3 identifier parsing
//!
//! VulnCheck records carry affected platforms as `cpe:2.3:` URIs. Only the
//! vendor and product segments matter to the lookup pipeline; malformed
//! identifiers are reported as errors rather than silently skipped.

use thiserror::Error;

/// Errors raised while parsing a CPE identifier
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CpeError {
    /// Value does not start with the `cpe` scheme
    #[error("Not a CPE identifier: {value}")]
    NotACpe { value: String },

    /// Value has too few colon-separated segments to carry vendor/product
    #[error("Truncated CPE identifier ({segments} segments): {value}")]
    Truncated { value: String, segments: usize },
}

impl CpeError {
    /// Create a not-a-CPE error
    pub fn not_a_cpe(value: impl Into<String>) -> Self {
        Self::NotACpe {
            value: value.into(),
        }
    }

    /// Create a truncated identifier error
    pub fn truncated(value: impl Into<String>, segments: usize) -> Self {
        Self::Truncated {
            value: value.into(),
            segments,
        }
    }
}

/// The segments of a CPE 2.3 URI this crate cares about
///
/// A full URI looks like
/// `cpe:2.3:a:vendor:product:version:update:edition:...`; the part, vendor,
/// and product occupy segments 2 through 4.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cpe {
    /// Part designator (`a` application, `o` operating system, `h` hardware)
    pub part: String,
    /// Vendor segment
    pub vendor: String,
    /// Product segment
    pub product: String,
}

impl Cpe {
    /// Parse a CPE 2.3 URI
    ///
    /// # Examples
    ///
    /// ```
    /// use vulncheck_client_core::cpe::Cpe;
    ///
    /// let cpe = Cpe::parse("cpe:2.3:a:vendorx:producty:1.0:*:*:*:*:*:*:*").unwrap();
    /// assert_eq!(cpe.vendor, "vendorx");
    /// assert_eq!(cpe.product, "producty");
    /// ```
    pub fn parse(value: &str) -> Result<Self, CpeError> {
        let segments: Vec<&str> = value.split(':').collect();
        if segments.first().copied() != Some("cpe") {
            return Err(CpeError::not_a_cpe(value));
        }
        if segments.len() < 5 {
            return Err(CpeError::truncated(value, segments.len()));
        }
        Ok(Self {
            part: segments[2].to_string(),
            vendor: segments[3].to_string(),
            product: segments[4].to_string(),
        })
    }
}

/// Distinct vendors across a set of CPE URIs, preserving first-seen order
pub fn unique_vendors(cpes: &[String]) -> Result<Vec<String>, CpeError> {
    unique_segment(cpes, |cpe| cpe.vendor)
}

/// Distinct products across a set of CPE URIs, preserving first-seen order
pub fn unique_products(cpes: &[String]) -> Result<Vec<String>, CpeError> {
    unique_segment(cpes, |cpe| cpe.product)
}

fn unique_segment(
    cpes: &[String],
    pick: impl Fn(Cpe) -> String,
) -> Result<Vec<String>, CpeError> {
    let mut seen = Vec::new();
    for raw in cpes {
        let segment = pick(Cpe::parse(raw)?);
        if !seen.contains(&segment) {
            seen.push(segment);
        }
    }
    Ok(seen)
}
