use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use uuid::Uuid;

/// Interner for hand-written, non-UUID names (fixtures, tool calls). Generated
/// ids never pass through it, so it only grows with the set of such names.
static NAMES: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// An opaque identifier for a diagram in the canvas forest.
///
/// Ids are strings on the wire. A string in canonical UUID form is held as
/// the UUID itself; anything else is an interned name. Either way the handle
/// is `Copy` and compares in O(1).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagramId {
    Uuid(Uuid),
    Named(Spur),
}

impl DiagramId {
    /// Id for a string as it appears in documents and events.
    pub fn parse(s: &str) -> Self {
        match Uuid::try_parse(s) {
            Ok(uuid) if is_canonical(&uuid, s) => DiagramId::Uuid(uuid),
            _ => DiagramId::Named(NAMES.get_or_intern(s)),
        }
    }

    /// A fresh random id (UUID v4).
    ///
    /// Random rather than counter-based so ids stay unique against content
    /// that was saved by an earlier session and pasted back in.
    pub fn fresh() -> Self {
        DiagramId::Uuid(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            DiagramId::Uuid(uuid) => Some(*uuid),
            DiagramId::Named(_) => None,
        }
    }
}

/// Only the lowercase hyphenated form maps to `Uuid`, so every id
/// serializes back to exactly the string it was read from.
fn is_canonical(uuid: &Uuid, s: &str) -> bool {
    let mut buf = Uuid::encode_buffer();
    uuid.hyphenated().encode_lower(&mut buf) == s
}

impl From<Uuid> for DiagramId {
    fn from(uuid: Uuid) -> Self {
        DiagramId::Uuid(uuid)
    }
}

impl fmt::Debug for DiagramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{self}")
    }
}

impl fmt::Display for DiagramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagramId::Uuid(uuid) => fmt::Display::fmt(&uuid.hyphenated(), f),
            DiagramId::Named(spur) => f.write_str(NAMES.resolve(spur)),
        }
    }
}

impl Serialize for DiagramId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DiagramId::Uuid(uuid) => {
                let mut buf = Uuid::encode_buffer();
                serializer.serialize_str(uuid.hyphenated().encode_lower(&mut buf))
            }
            DiagramId::Named(spur) => serializer.serialize_str(NAMES.resolve(spur)),
        }
    }
}

impl<'de> Deserialize<'de> for DiagramId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(DiagramId::parse(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn names_resolve_to_the_same_handle() {
        let a = DiagramId::parse("rect-1");
        let b = DiagramId::parse("rect-1");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "rect-1");
        assert!(a.as_uuid().is_none());
    }

    #[test]
    fn fresh_ids_are_unique_uuids() {
        let a = DiagramId::fresh();
        let b = DiagramId::fresh();
        assert_ne!(a, b);
        assert_eq!(a.to_string().len(), 36);
        assert!(matches!(a, DiagramId::Uuid(_)));
    }

    #[test]
    fn uuid_strings_are_not_interned() {
        let id = DiagramId::fresh();
        let parsed = DiagramId::parse(&id.to_string());
        assert_eq!(parsed, id);
        assert!(matches!(parsed, DiagramId::Uuid(_)));
    }

    #[test]
    fn non_canonical_uuid_text_round_trips_verbatim() {
        let upper = "67E55044-10B1-426F-9247-BB680E5FE0C8";
        let id = DiagramId::parse(upper);
        assert!(id.as_uuid().is_none());
        assert_eq!(serde_json::to_string(&id).unwrap(), format!("\"{upper}\""));
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = DiagramId::parse("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
        let back: DiagramId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(back, id);

        let fresh = DiagramId::fresh();
        let text = serde_json::to_string(&fresh).unwrap();
        assert_eq!(serde_json::from_str::<DiagramId>(&text).unwrap(), fresh);
    }
}
