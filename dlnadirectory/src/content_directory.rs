//! SOAP dispatch for `/ContentDirectory/control`, per §4.3.

use std::collections::HashMap;
use std::sync::Arc;

use dlnacatalog::{CatalogClient, CatalogItem};
use dlnadidl::DidlLite;
use dlnaupnp::description::CONTENT_DIRECTORY_SERVICE_TYPE;
use dlnaupnp::soap::{SoapAction, build_soap_fault, build_soap_response, parse_soap_action};
use dlnautil::Vendor;
use tracing::warn;
use uuid::Uuid;

use crate::classmap;
use crate::didl;
use crate::error::{DirectoryError, Result};
use crate::objectid::ObjectId;
use crate::sort;

/// Translates Browse/search-capability SOAP actions into upstream catalog
/// queries and DIDL-Lite responses.
pub struct ContentDirectory {
    catalog: Arc<dyn CatalogClient>,
}

impl ContentDirectory {
    pub fn new(catalog: Arc<dyn CatalogClient>) -> Self {
        Self { catalog }
    }

    /// Handles a posted SOAP body, always returning XML — failures render as
    /// a SOAP fault rather than propagating, since the HTTP layer has no
    /// other body to send back.
    pub async fn handle_control(&self, body: &[u8], vendor: Vendor, stream_base_url: &str) -> String {
        match self.dispatch(body, vendor, stream_base_url).await {
            Ok(xml) => xml,
            Err(err) => {
                let (code, desc) = err.upnp_error();
                build_soap_fault("s:Client", "UPnPError", Some(code), Some(desc)).unwrap_or_default()
            }
        }
    }

    async fn dispatch(&self, body: &[u8], vendor: Vendor, stream_base_url: &str) -> Result<String> {
        let action = parse_soap_action(body)?;
        match action.name.as_str() {
            "Browse" => self.browse(&action, vendor, stream_base_url).await,
            "GetSearchCapabilities" => Self::search_capabilities(),
            "GetSortCapabilities" => Self::sort_capabilities(),
            "GetSystemUpdateID" => Self::system_update_id(),
            other => Err(DirectoryError::UnknownAction(other.to_string())),
        }
    }

    async fn browse(&self, action: &SoapAction, vendor: Vendor, stream_base_url: &str) -> Result<String> {
        let object_id = required_arg(action, "ObjectID")?;
        let flag = required_arg(action, "BrowseFlag")?;
        let sort_criteria = action.args.get("SortCriteria").map(String::as_str).unwrap_or("");
        let starting_index: u32 = action.args.get("StartingIndex").and_then(|v| v.parse().ok()).unwrap_or(0);
        let requested_count: u32 = action.args.get("RequestedCount").and_then(|v| v.parse().ok()).unwrap_or(0);

        let Some(resolved) = ObjectId::parse(object_id) else {
            return Self::browse_response(DidlLite::new(), 0, 0);
        };

        if flag == "BrowseMetadata" {
            self.browse_metadata(resolved, vendor, stream_base_url).await
        } else {
            self.browse_children(resolved, sort_criteria, starting_index, requested_count, vendor, stream_base_url)
                .await
        }
    }

    async fn browse_metadata(&self, resolved: ObjectId, vendor: Vendor, stream_base_url: &str) -> Result<String> {
        match resolved {
            ObjectId::Root => {
                let child_count = self.fetch_libraries().await.len() as u32;
                let container = dlnadidl::Container::new("0", "-1", "Root", "object.container.storageFolder", child_count);
                Self::browse_response(with_single_container(container), 1, 1)
            }
            ObjectId::Library(id) => {
                let Some(item) = self.fetch_item(id).await else {
                    return Self::browse_response(DidlLite::new(), 0, 0);
                };
                let child_count = self.included_child_count(id).await;
                let container = didl::build_container(&item, &resolved.render(), "0", child_count, self.catalog.as_ref(), vendor, true);
                Self::browse_response(with_single_container(container), 1, 1)
            }
            ObjectId::Item(id) => {
                let Some(item) = self.fetch_item(id).await else {
                    return Self::browse_response(DidlLite::new(), 0, 0);
                };
                let parent = item.parent_id.map(|p| p.to_string()).unwrap_or_else(|| "0".to_string());
                if item.is_container() {
                    let child_count = self.included_child_count(id).await;
                    let container = didl::build_container(&item, &resolved.render(), &parent, child_count, self.catalog.as_ref(), vendor, false);
                    Self::browse_response(with_single_container(container), 1, 1)
                } else {
                    let didl_item = didl::build_item(&item, &resolved.render(), &parent, self.catalog.as_ref(), vendor, stream_base_url);
                    Self::browse_response(with_single_item(didl_item), 1, 1)
                }
            }
        }
    }

    async fn browse_children(
        &self,
        resolved: ObjectId,
        sort_criteria: &str,
        starting_index: u32,
        requested_count: u32,
        vendor: Vendor,
        stream_base_url: &str,
    ) -> Result<String> {
        let (mut children, parent_object_id, is_library_root) = match resolved {
            ObjectId::Root => (self.fetch_libraries().await, "0".to_string(), true),
            ObjectId::Library(id) => (self.fetch_children(id).await, resolved.render(), false),
            ObjectId::Item(id) => (self.fetch_children(id).await, resolved.render(), false),
        };

        children.retain(classmap::is_included);
        sort::sort_children(&mut children, sort_criteria, vendor);
        let total_matches = children.len() as u32;

        let page: Vec<CatalogItem> = {
            let skipped = children.into_iter().skip(starting_index as usize);
            if requested_count == 0 {
                skipped.collect()
            } else {
                skipped.take(requested_count as usize).collect()
            }
        };

        let mut containers = Vec::new();
        let mut items = Vec::new();
        for child in &page {
            let object_id = if is_library_root { format!("library:{}", child.id) } else { child.id.to_string() };
            if child.is_container() {
                let child_count = self.included_child_count(child.id).await;
                containers.push(didl::build_container(
                    child,
                    &object_id,
                    &parent_object_id,
                    child_count,
                    self.catalog.as_ref(),
                    vendor,
                    is_library_root,
                ));
            } else {
                items.push(didl::build_item(child, &object_id, &parent_object_id, self.catalog.as_ref(), vendor, stream_base_url));
            }
        }

        let number_returned = (containers.len() + items.len()) as u32;
        let didl = DidlLite {
            containers,
            items,
            ..DidlLite::new()
        };
        Self::browse_response(didl, number_returned, total_matches)
    }

    fn browse_response(didl: DidlLite, number_returned: u32, total_matches: u32) -> Result<String> {
        let result_xml = didl.render()?;
        let mut values = HashMap::new();
        values.insert("Result".to_string(), result_xml);
        values.insert("NumberReturned".to_string(), number_returned.to_string());
        values.insert("TotalMatches".to_string(), total_matches.to_string());
        values.insert("UpdateID".to_string(), "0".to_string());
        build_soap_response(CONTENT_DIRECTORY_SERVICE_TYPE, "Browse", values).map_err(DirectoryError::Render)
    }

    fn search_capabilities() -> Result<String> {
        let mut values = HashMap::new();
        values.insert("SearchCaps".to_string(), String::new());
        build_soap_response(CONTENT_DIRECTORY_SERVICE_TYPE, "GetSearchCapabilities", values).map_err(DirectoryError::Render)
    }

    fn sort_capabilities() -> Result<String> {
        let mut values = HashMap::new();
        values.insert("SortCaps".to_string(), "dc:title,dc:date,upnp:class".to_string());
        build_soap_response(CONTENT_DIRECTORY_SERVICE_TYPE, "GetSortCapabilities", values).map_err(DirectoryError::Render)
    }

    fn system_update_id() -> Result<String> {
        let mut values = HashMap::new();
        values.insert("Id".to_string(), "0".to_string());
        build_soap_response(CONTENT_DIRECTORY_SERVICE_TYPE, "GetSystemUpdateID", values).map_err(DirectoryError::Render)
    }

    /// Upstream failures degrade to an empty Browse result rather than a
    /// fault, per §7's UpstreamError policy.
    async fn fetch_libraries(&self) -> Vec<CatalogItem> {
        self.catalog.list_libraries().await.unwrap_or_else(|err| {
            warn!(%err, "list_libraries failed; returning empty Browse result");
            Vec::new()
        })
    }

    async fn fetch_children(&self, parent_id: Uuid) -> Vec<CatalogItem> {
        self.catalog.list_children(&parent_id.to_string()).await.unwrap_or_else(|err| {
            warn!(%err, %parent_id, "list_children failed; returning empty Browse result");
            Vec::new()
        })
    }

    async fn fetch_item(&self, id: Uuid) -> Option<CatalogItem> {
        match self.catalog.get_item(&id.to_string()).await {
            Ok(item) => Some(item),
            Err(err) => {
                warn!(%err, %id, "get_item failed; returning empty Browse result");
                None
            }
        }
    }

    async fn included_child_count(&self, parent_id: Uuid) -> u32 {
        self.fetch_children(parent_id).await.into_iter().filter(classmap::is_included).count() as u32
    }
}

fn required_arg<'a>(action: &'a SoapAction, name: &'static str) -> Result<&'a str> {
    action.args.get(name).map(String::as_str).ok_or(DirectoryError::MissingArgument(name))
}

fn with_single_container(container: dlnadidl::Container) -> DidlLite {
    DidlLite {
        containers: vec![container],
        ..DidlLite::new()
    }
}

fn with_single_item(item: dlnadidl::Item) -> DidlLite {
    DidlLite {
        items: vec![item],
        ..DidlLite::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dlnacatalog::{CatalogError, ItemType, MediaSource, PlaybackProgressPayload, PlaybackStartPayload, PlaybackStoppedPayload, UserData};
    use async_trait::async_trait;

    struct FakeCatalog {
        libraries: Vec<CatalogItem>,
        children: HashMap<Uuid, Vec<CatalogItem>>,
    }

    #[async_trait]
    impl CatalogClient for FakeCatalog {
        async fn list_libraries(&self) -> dlnacatalog::Result<Vec<CatalogItem>> {
            Ok(self.libraries.clone())
        }
        async fn list_children(&self, parent_id: &str) -> dlnacatalog::Result<Vec<CatalogItem>> {
            let parent_id = Uuid::parse_str(parent_id).unwrap();
            Ok(self.children.get(&parent_id).cloned().unwrap_or_default())
        }
        async fn get_item(&self, _item_id: &str) -> dlnacatalog::Result<CatalogItem> {
            Err(CatalogError::NotFound("x".into()))
        }
        async fn get_user_data(&self, _item_id: &str) -> dlnacatalog::Result<UserData> {
            Ok(UserData::default())
        }
        fn stream_url(&self, item_id: &str, _extra_params: &[(&str, &str)]) -> String {
            format!("http://catalog.local/Videos/{item_id}/stream")
        }
        fn image_url(&self, item_id: &str, image_type: &str) -> String {
            format!("http://catalog.local/Items/{item_id}/Images/{image_type}")
        }
        fn subtitle_urls(&self, item_id: &str, stream_index: u32) -> Vec<String> {
            vec![format!("http://catalog.local/Subtitles/{item_id}/{stream_index}/Stream.srt")]
        }
        async fn report_playback_start(&self, _payload: &PlaybackStartPayload) -> dlnacatalog::Result<()> {
            Ok(())
        }
        async fn report_playback_progress(&self, _payload: &PlaybackProgressPayload) -> dlnacatalog::Result<()> {
            Ok(())
        }
        async fn report_playback_stopped(&self, _payload: &PlaybackStoppedPayload) -> dlnacatalog::Result<()> {
            Ok(())
        }
        async fn mark_played(&self, _user_id: Uuid, _item_id: Uuid) -> dlnacatalog::Result<()> {
            Ok(())
        }
    }

    fn library(id: Uuid, name: &str) -> CatalogItem {
        CatalogItem {
            id,
            name: name.to_string(),
            item_type: ItemType::CollectionFolder,
            collection_type: Some("movies".to_string()),
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

    fn movie(id: Uuid, name: &str) -> CatalogItem {
        CatalogItem {
            id,
            name: name.to_string(),
            item_type: ItemType::Movie,
            collection_type: None,
            parent_id: None,
            child_count: None,
            run_time_ticks: Some(0),
            index_number: None,
            parent_index_number: None,
            production_year: None,
            overview: None,
            genres: vec![],
            series_name: None,
            album: None,
            artists: vec![],
            media_sources: vec![MediaSource {
                container: Some("mp4".to_string()),
                size: None,
                bitrate: None,
                run_time_ticks: None,
                media_streams: vec![],
            }],
        }
    }

    fn browse_soap(object_id: &str, flag: &str) -> Vec<u8> {
        format!(
            r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <u:Browse xmlns:u="urn:schemas-upnp-org:service:ContentDirectory:1">
      <ObjectID>{object_id}</ObjectID>
      <BrowseFlag>{flag}</BrowseFlag>
      <Filter>*</Filter>
      <StartingIndex>0</StartingIndex>
      <RequestedCount>10</RequestedCount>
      <SortCriteria></SortCriteria>
    </u:Browse>
  </s:Body>
</s:Envelope>"#
        )
        .into_bytes()
    }

    #[tokio::test]
    async fn root_browse_lists_libraries_as_wrapped_ids() {
        let movies_id = Uuid::new_v4();
        let music_id = Uuid::new_v4();
        let catalog = FakeCatalog {
            libraries: vec![library(movies_id, "Movies"), library(music_id, "Music")],
            children: HashMap::new(),
        };
        let cd = ContentDirectory::new(Arc::new(catalog));
        let xml = cd.handle_control(&browse_soap("0", "BrowseDirectChildren"), Vendor::Other, "http://server:8200").await;

        assert!(xml.contains("NumberReturned&gt;2&lt;") || xml.contains("NumberReturned>2<"));
        assert!(xml.contains(&format!("library:{movies_id}")));
        assert!(xml.contains(&format!("library:{music_id}")));
    }

    #[tokio::test]
    async fn unparseable_object_id_yields_empty_result_not_a_fault() {
        let catalog = FakeCatalog {
            libraries: vec![],
            children: HashMap::new(),
        };
        let cd = ContentDirectory::new(Arc::new(catalog));
        let xml = cd.handle_control(&browse_soap("not-an-id", "BrowseDirectChildren"), Vendor::Other, "http://server:8200").await;
        assert!(xml.contains("NumberReturned>0<"));
        assert!(xml.contains("TotalMatches>0<"));
        assert!(!xml.contains("Fault"));
    }

    #[tokio::test]
    async fn browsing_an_item_returns_its_included_children_sorted() {
        let library_id = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let catalog = FakeCatalog {
            libraries: vec![library(library_id, "Movies")],
            children: HashMap::from([(library_id, vec![movie(b, "Zebra"), movie(a, "Apple")])]),
        };
        let cd = ContentDirectory::new(Arc::new(catalog));
        let xml = cd
            .handle_control(&browse_soap(&format!("library:{library_id}"), "BrowseDirectChildren"), Vendor::Other, "http://server:8200")
            .await;
        let apple_pos = xml.find("Apple").unwrap();
        let zebra_pos = xml.find("Zebra").unwrap();
        assert!(apple_pos < zebra_pos);
    }

    #[tokio::test]
    async fn unknown_action_renders_invalid_action_fault() {
        let catalog = FakeCatalog {
            libraries: vec![],
            children: HashMap::new(),
        };
        let cd = ContentDirectory::new(Arc::new(catalog));
        let body = br#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <u:DeleteResource xmlns:u="urn:schemas-upnp-org:service:ContentDirectory:1">
      <ObjectID>0</ObjectID>
    </u:DeleteResource>
  </s:Body>
</s:Envelope>"#;
        let xml = cd.handle_control(body, Vendor::Other, "http://server:8200").await;
        assert!(xml.contains("<errorCode>401</errorCode>"));
    }

    #[test]
    fn search_and_sort_capabilities_match_the_static_strings() {
        assert!(ContentDirectory::search_capabilities().unwrap().contains("<SearchCaps></SearchCaps>"));
        assert!(ContentDirectory::sort_capabilities().unwrap().contains("dc:title,dc:date,upnp:class"));
    }
}
