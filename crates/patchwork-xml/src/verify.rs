//! Round-trip verification.
//!
//! A document passes when parsing it into the value model and serializing it
//! back reproduces the original text after [`normalize_input`]. Cross
//! validation runs several backends over the same text and additionally
//! requires every pair to agree on both the value and the regenerated XML.

use tracing::{debug, trace};

use crate::backend::Backend;
use crate::policy::{normalize_input, SerializationPolicy};
use crate::{Document, Error, Result};

/// The outcome of one backend's round trip.
#[derive(Debug, Clone)]
pub struct RoundTrip {
    /// Backend name.
    pub backend: &'static str,
    /// The parsed document.
    pub document: Document,
    /// The regenerated XML text.
    pub xml: String,
}

/// Parse with one backend and serialize again.
pub fn round_trip(original: &str, backend: &dyn Backend, policy: &SerializationPolicy) -> Result<RoundTrip> {
    let document = backend.parse_document(original)?;
    let xml = document.to_xml_string(policy)?;
    trace!(backend = backend.name(), input = original.len(), output = xml.len(), "round trip");

    Ok(RoundTrip {
        backend: backend.name(),
        document,
        xml,
    })
}

/// Verify that one backend reproduces the normalized original.
pub fn verify(original: &str, backend: &dyn Backend, policy: &SerializationPolicy) -> Result<Document> {
    let trip = round_trip(original, backend, policy)?;
    check_expected(original, &trip)?;
    Ok(trip.document)
}

/// Verify across several backends.
///
/// Every pair of backends must produce equal values and identical XML, and
/// each one must reproduce the normalized original. An empty backend list
/// is an error.
pub fn cross_validate(
    original: &str,
    backends: &[&dyn Backend],
    policy: &SerializationPolicy,
) -> Result<Vec<RoundTrip>> {
    if backends.is_empty() {
        return Err(Error::Structure("no backends to validate with".to_string()));
    }

    let trips = backends
        .iter()
        .map(|backend| round_trip(original, *backend, policy))
        .collect::<Result<Vec<_>>>()?;

    for (i, first) in trips.iter().enumerate() {
        for second in &trips[i + 1..] {
            if first.document != second.document {
                return Err(Error::mismatch(
                    format!("value from {} vs {}", first.backend, second.backend),
                    format!("{:#?}", first.document),
                    format!("{:#?}", second.document),
                ));
            }
            if first.xml != second.xml {
                return Err(Error::mismatch(
                    format!("XML from {} vs {}", first.backend, second.backend),
                    first.xml.as_str(),
                    second.xml.as_str(),
                ));
            }
        }
    }

    for trip in &trips {
        check_expected(original, trip)?;
    }

    debug!(backends = trips.len(), bytes = original.len(), "cross validation passed");
    Ok(trips)
}

fn check_expected(original: &str, trip: &RoundTrip) -> Result<()> {
    let expected = normalize_input(original);
    if trip.xml == expected {
        Ok(())
    } else {
        Err(Error::mismatch(format!("{} backend", trip.backend), expected, trip.xml.as_str()))
    }
}

/// Byte offset of the first difference between two strings, if any.
pub fn first_difference(a: &str, b: &str) -> Option<usize> {
    match a.bytes().zip(b.bytes()).position(|(x, y)| x != y) {
        Some(offset) => Some(offset),
        None if a.len() != b.len() => Some(a.len().min(b.len())),
        None => None,
    }
}
