//! Cache key derivation.
//! Fingerprint: blake3 over a domain tag plus the filter parameters in
//! canonical form (sorted by name, empty values skipped, fields
//! length-prefixed so boundaries stay unambiguous). Equivalent parameter
//! sets always land on the same key regardless of supplied order.

use crate::store::ListFilter;

/// A 256-bit cache key.
pub type Fingerprint = [u8; 32];

const LISTING_DOMAIN: &[u8] = b"listing";
const EXPORT_DOMAIN: &[u8] = b"export";

/// Fingerprint for a filtered listing page.
pub fn listing(filter: &ListFilter, page: u32) -> Fingerprint {
    let page_str = page.to_string();
    let mut params: Vec<(&str, &str)> = vec![("page", page_str.as_str())];
    if let Some(ref tag) = filter.tag {
        params.push(("tag", tag));
    }
    if let Some(ref key) = filter.key {
        params.push(("key", key));
    }
    if let Some(ref content) = filter.content {
        params.push(("content", content));
    }
    canonical(LISTING_DOMAIN, &params)
}

/// The single fingerprint of the parameterless full export.
pub fn export() -> Fingerprint {
    canonical(EXPORT_DOMAIN, &[])
}

/// Hash a parameter set in canonical order. Empty values fingerprint
/// identically to absent parameters.
fn canonical(domain: &[u8], params: &[(&str, &str)]) -> Fingerprint {
    let mut sorted: Vec<(&str, &str)> = params
        .iter()
        .copied()
        .filter(|(_, value)| !value.is_empty())
        .collect();
    sorted.sort_unstable_by_key(|(name, _)| *name);

    let mut hasher = blake3::Hasher::new();
    hasher.update(&(domain.len() as u64).to_le_bytes());
    hasher.update(domain);
    for (name, value) in sorted {
        hasher.update(&(name.len() as u64).to_le_bytes());
        hasher.update(name.as_bytes());
        hasher.update(&(value.len() as u64).to_le_bytes());
        hasher.update(value.as_bytes());
    }
    *hasher.finalize().as_bytes()
}

/// Short hex prefix for log lines.
pub fn short_hex(fp: &Fingerprint) -> String {
    fp[..8].iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_order_does_not_change_the_fingerprint() {
        let a = canonical(b"listing", &[("tag", "ui"), ("key", "greet"), ("page", "1")]);
        let b = canonical(b"listing", &[("page", "1"), ("key", "greet"), ("tag", "ui")]);
        let c = canonical(b"listing", &[("key", "greet"), ("page", "1"), ("tag", "ui")]);
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn empty_values_fingerprint_like_absent_parameters() {
        let explicit_empty = canonical(b"listing", &[("tag", ""), ("page", "1")]);
        let absent = canonical(b"listing", &[("page", "1")]);
        assert_eq!(explicit_empty, absent);
    }

    #[test]
    fn any_value_change_flips_the_fingerprint() {
        let base = canonical(b"listing", &[("tag", "ui"), ("page", "1")]);
        assert_ne!(base, canonical(b"listing", &[("tag", "mail"), ("page", "1")]));
        assert_ne!(base, canonical(b"listing", &[("tag", "ui"), ("page", "2")]));
        assert_ne!(base, canonical(b"listing", &[("page", "1")]));
    }

    #[test]
    fn field_boundaries_are_unambiguous() {
        // Without length prefixes these would concatenate identically.
        let a = canonical(b"listing", &[("key", "ab"), ("tag", "c")]);
        let b = canonical(b"listing", &[("key", "a"), ("tag", "bc")]);
        assert_ne!(a, b);
    }

    #[test]
    fn listing_and_export_domains_never_collide() {
        let unfiltered = listing(&ListFilter::default(), 1);
        assert_ne!(unfiltered, export());
    }

    #[test]
    fn normalized_filters_share_a_fingerprint() {
        let explicit = ListFilter {
            tag: Some(String::new()),
            key: Some("greet".into()),
            content: None,
        }
        .normalize();
        let plain = ListFilter {
            tag: None,
            key: Some("greet".into()),
            content: None,
        };
        assert_eq!(listing(&explicit, 1), listing(&plain, 1));
    }
}
