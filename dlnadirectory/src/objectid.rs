//! Resolution of a Browse request's `ObjectID` string into the thing it
//! names, per §4.3's "ObjectID resolution" rules.

use uuid::Uuid;

/// A resolved `ObjectID`: the root, one of the catalog's top-level
/// libraries, or an arbitrary catalog item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectId {
    Root,
    Library(Uuid),
    Item(Uuid),
}

impl ObjectId {
    /// Parses a Browse `ObjectID` argument. Unparseable ids resolve to
    /// `None`, which the caller treats as an empty result set.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw == "0" {
            return Some(ObjectId::Root);
        }
        if let Some(rest) = raw.strip_prefix("library:") {
            return Uuid::parse_str(rest).ok().map(ObjectId::Library);
        }
        Uuid::parse_str(raw).ok().map(ObjectId::Item)
    }

    /// The catalog item id this object resolves to, if any (the root has
    /// none).
    pub fn catalog_id(&self) -> Option<Uuid> {
        match self {
            ObjectId::Root => None,
            ObjectId::Library(id) | ObjectId::Item(id) => Some(*id),
        }
    }

    /// Renders back to the string form used as DIDL `id`/`parentID`.
    pub fn render(&self) -> String {
        match self {
            ObjectId::Root => "0".to_string(),
            ObjectId::Library(id) => format!("library:{id}"),
            ObjectId::Item(id) => id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_is_the_literal_zero() {
        assert_eq!(ObjectId::parse("0"), Some(ObjectId::Root));
    }

    #[test]
    fn library_prefix_carries_the_uuid() {
        let uuid = Uuid::nil();
        let parsed = ObjectId::parse(&format!("library:{uuid}")).unwrap();
        assert_eq!(parsed, ObjectId::Library(uuid));
    }

    #[test]
    fn bare_uuid_is_an_item() {
        let uuid = Uuid::nil();
        assert_eq!(ObjectId::parse(&uuid.to_string()), Some(ObjectId::Item(uuid)));
    }

    #[test]
    fn garbage_does_not_parse() {
        assert_eq!(ObjectId::parse("not-an-id"), None);
    }

    #[test]
    fn render_round_trips_each_variant() {
        let uuid = Uuid::nil();
        assert_eq!(ObjectId::Root.render(), "0");
        assert_eq!(ObjectId::parse(&ObjectId::Library(uuid).render()), Some(ObjectId::Library(uuid)));
        assert_eq!(ObjectId::parse(&ObjectId::Item(uuid).render()), Some(ObjectId::Item(uuid)));
    }
}
