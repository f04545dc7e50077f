//! Browse child ordering, per §4.3's "Sorting" rules.

use dlnacatalog::{CatalogItem, ItemType};
use dlnautil::Vendor;
use std::cmp::Ordering;

/// Sorts `items` in place: containers first, then by the effective
/// criteria (default `(sort_index, title)`, an explicit `dc:title`/`dc:date`
/// override, or Samsung's forced `(title, sort_index)`).
pub fn sort_children(items: &mut [CatalogItem], sort_criteria: &str, vendor: Vendor) {
    items.sort_by(|a, b| {
        match (a.is_container(), b.is_container()) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }

        if vendor == Vendor::Samsung {
            return title_key(a).cmp(&title_key(b)).then_with(|| sort_index_key(a).cmp(&sort_index_key(b)));
        }
        if sort_criteria.contains("dc:date") {
            return date_key(a).cmp(&date_key(b));
        }
        if sort_criteria.contains("dc:title") {
            return title_key(a).cmp(&title_key(b));
        }
        sort_index_key(a).cmp(&sort_index_key(b)).then_with(|| title_key(a).cmp(&title_key(b)))
    });
}

/// `item.index_number` for Episode/Season items, `+∞` (sorted last)
/// otherwise or when absent.
fn sort_index_key(item: &CatalogItem) -> i64 {
    match item.item_type {
        ItemType::Episode | ItemType::Season => item.index_number.map(i64::from).unwrap_or(i64::MAX),
        _ => i64::MAX,
    }
}

fn title_key(item: &CatalogItem) -> String {
    item.name.to_ascii_lowercase()
}

fn date_key(item: &CatalogItem) -> i32 {
    item.production_year.unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn episode(name: &str, index_number: i32) -> CatalogItem {
        CatalogItem {
            id: Uuid::nil(),
            name: name.to_string(),
            item_type: ItemType::Episode,
            collection_type: None,
            parent_id: None,
            child_count: None,
            run_time_ticks: None,
            index_number: Some(index_number),
            parent_index_number: None,
            production_year: None,
            overview: None,
            genres: vec![],
            series_name: None,
            album: None,
            artists: vec![],
            media_sources: vec![],
        }
    }

    fn folder(name: &str) -> CatalogItem {
        CatalogItem {
            id: Uuid::nil(),
            name: name.to_string(),
            item_type: ItemType::Folder,
            collection_type: None,
            parent_id: None,
            child_count: None,
            run_time_ticks: None,
            index_number: None,
            parent_index_number: None,
            production_year: None,
            overview: None,
            genres: vec![],
            series_name: None,
            album: None,
            artists: vec![],
            media_sources: vec![],
        }
    }

    #[test]
    fn episodes_sort_by_index_number_not_arrival_order() {
        let mut items = vec![episode("Finale", 3), episode("Pilot", 1), episode("Middle", 2)];
        sort_children(&mut items, "", Vendor::Other);
        let titles: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(titles, ["Pilot", "Middle", "Finale"]);
    }

    #[test]
    fn containers_always_precede_items() {
        let mut items = vec![episode("Z Episode", 1), folder("A Folder")];
        sort_children(&mut items, "", Vendor::Other);
        assert_eq!(items[0].name, "A Folder");
    }

    #[test]
    fn explicit_title_criteria_overrides_index_number() {
        let mut items = vec![episode("Zebra", 1), episode("Apple", 2)];
        sort_children(&mut items, "dc:title", Vendor::Other);
        let titles: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(titles, ["Apple", "Zebra"]);
    }

    #[test]
    fn samsung_forces_title_before_index_number() {
        let mut items = vec![episode("Zebra", 1), episode("Apple", 2)];
        sort_children(&mut items, "", Vendor::Samsung);
        let titles: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(titles, ["Apple", "Zebra"]);
    }
}
