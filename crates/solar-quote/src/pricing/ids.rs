use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Identifier carried by every catalog option.
///
/// Older catalog files used composite slugs such as
/// `solar-single_phase-jinko-6.6`; those are kept as [`VariantId::Legacy`]
/// until the normalization pass rewrites them to UUIDs. A missing `id`
/// field parses as an empty legacy identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VariantId {
    Uuid(Uuid),
    Legacy(String),
}

impl VariantId {
    pub fn parse(raw: &str) -> Self {
        match Uuid::parse_str(raw.trim()) {
            Ok(uuid) => Self::Uuid(uuid),
            Err(_) => Self::Legacy(raw.trim().to_string()),
        }
    }

    pub fn generate() -> Self {
        Self::Uuid(Uuid::new_v4())
    }

    pub fn is_uuid(&self) -> bool {
        matches!(self, Self::Uuid(_))
    }

    /// Compare against an identifier supplied by a client.
    pub fn matches(&self, raw: &str) -> bool {
        match (self, Self::parse(raw)) {
            (Self::Uuid(ours), Self::Uuid(theirs)) => *ours == theirs,
            (Self::Legacy(ours), Self::Legacy(theirs)) => !ours.is_empty() && *ours == theirs,
            _ => false,
        }
    }
}

impl Default for VariantId {
    fn default() -> Self {
        Self::Legacy(String::new())
    }
}

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantId::Uuid(uuid) => write!(f, "{}", uuid.hyphenated()),
            VariantId::Legacy(slug) => f.write_str(slug),
        }
    }
}

impl Serialize for VariantId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VariantId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map(|value| Self::parse(&value)).unwrap_or_default())
    }
}

/// Composite slug older catalog files used as an option identifier.
pub fn legacy_slug(product_type: &str, phase: &str, brand_key: &str, size: f64) -> String {
    format!("{product_type}-{phase}-{brand_key}-{size}")
}

/// Normalize a brand display name into the key used by the catalog maps.
pub fn brand_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }

    slug
}
