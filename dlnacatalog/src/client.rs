//! `CatalogClient`: the trait the rest of the workspace programs against,
//! and an HTTP implementation talking to a Jellyfin/Emby-shaped catalog API
//! per §6's "Upstream catalog HTTP" contract.

use crate::error::{CatalogError, Result};
use crate::models::{CatalogItem, ItemsResponse, UserData};
use crate::telemetry::{PlaybackProgressPayload, PlaybackStartPayload, PlaybackStoppedPayload};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;
use url::Url;
use uuid::Uuid;

const EMBY_TOKEN_HEADER: &str = "X-Emby-Token";

/// The opaque interface the rest of the workspace programs against; lets
/// ContentDirectory/StreamProxy be tested against a fake without a real
/// upstream.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Top-level libraries (`GET /Items` with no `ParentId`).
    async fn list_libraries(&self) -> Result<Vec<CatalogItem>>;

    /// Direct children of `parent_id` (`Recursive=false`, per the spec's
    /// chosen Browse semantics).
    async fn list_children(&self, parent_id: &str) -> Result<Vec<CatalogItem>>;

    /// A single item by id.
    async fn get_item(&self, item_id: &str) -> Result<CatalogItem>;

    /// Per-user playback state (resume position, watched flag).
    async fn get_user_data(&self, item_id: &str) -> Result<UserData>;

    /// Upstream media URL for direct byte-range proxying.
    fn stream_url(&self, item_id: &str, extra_params: &[(&str, &str)]) -> String;

    /// Upstream image URL for a given image type (`Primary`, `Backdrop`, …).
    fn image_url(&self, item_id: &str, image_type: &str) -> String;

    /// Candidate upstream URLs for an embedded subtitle stream, in priority
    /// order. The caller tries each until one returns non-HTML content.
    fn subtitle_urls(&self, item_id: &str, stream_index: u32) -> Vec<String>;

    async fn report_playback_start(&self, payload: &PlaybackStartPayload) -> Result<()>;
    async fn report_playback_progress(&self, payload: &PlaybackProgressPayload) -> Result<()>;
    async fn report_playback_stopped(&self, payload: &PlaybackStoppedPayload) -> Result<()>;
    async fn mark_played(&self, user_id: Uuid, item_id: Uuid) -> Result<()>;
}

/// HTTP-backed [`CatalogClient`] carrying the server URL, access token, and
/// default user id out of configuration.
pub struct HttpCatalogClient {
    http: Client,
    base_url: Url,
    access_token: String,
    user_id: Uuid,
}

impl HttpCatalogClient {
    pub fn new(server_url: &str, access_token: &str, user_id: Uuid) -> Result<Self> {
        let base_url = Url::parse(server_url)?;
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(CatalogError::Http)?;
        Ok(Self {
            http,
            base_url,
            access_token: access_token.to_string(),
            user_id,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    async fn get_items(&self, path: &str, query: &[(&str, &str)]) -> Result<Vec<CatalogItem>> {
        let url = self.url(path);
        debug!(%url, "catalog GET");
        let response = self
            .http
            .get(&url)
            .header(EMBY_TOKEN_HEADER, &self.access_token)
            .query(query)
            .send()
            .await?;
        let body: ItemsResponse = Self::deserialize(response, path).await?;
        Ok(body.items)
    }

    async fn deserialize<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        endpoint: &str,
    ) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Upstream {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
                body,
            });
        }
        let value = response.json::<T>().await?;
        Ok(value)
    }

    async fn post_telemetry(&self, path: &str, payload: &(impl serde::Serialize + Sync)) -> Result<()> {
        let url = self.url(path);
        let response = self
            .http
            .post(&url)
            .header(EMBY_TOKEN_HEADER, &self.access_token)
            .json(payload)
            .send()
            .await?;
        if !response.status().is_success() && response.status() != StatusCode::NO_CONTENT {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Upstream {
                status,
                endpoint: path.to_string(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn list_libraries(&self) -> Result<Vec<CatalogItem>> {
        let user_id = self.user_id.to_string();
        self.get_items("/Items", &[("UserId", &user_id)]).await
    }

    async fn list_children(&self, parent_id: &str) -> Result<Vec<CatalogItem>> {
        let user_id = self.user_id.to_string();
        self.get_items(
            "/Items",
            &[
                ("UserId", &user_id),
                ("ParentId", parent_id),
                ("Recursive", "false"),
                (
                    "Fields",
                    "Overview,Genres,ParentIndexNumber,MediaSources,ProductionYear",
                ),
            ],
        )
        .await
    }

    async fn get_item(&self, item_id: &str) -> Result<CatalogItem> {
        let user_id = self.user_id.to_string();
        let url = self.url(&format!("/Items/{item_id}"));
        let response = self
            .http
            .get(&url)
            .header(EMBY_TOKEN_HEADER, &self.access_token)
            .query(&[("UserId", &user_id)])
            .send()
            .await?;
        Self::deserialize(response, "/Items/{id}").await
    }

    async fn get_user_data(&self, item_id: &str) -> Result<UserData> {
        let url = self.url(&format!("/Users/{}/Items/{item_id}/UserData", self.user_id));
        let response = self
            .http
            .get(&url)
            .header(EMBY_TOKEN_HEADER, &self.access_token)
            .send()
            .await?;
        Self::deserialize(response, "/Users/{uid}/Items/{id}/UserData").await
    }

    fn stream_url(&self, item_id: &str, extra_params: &[(&str, &str)]) -> String {
        let mut url = self.url(&format!("/Videos/{item_id}/stream"));
        url.push('?');
        url.push_str(&format!("api_key={}", self.access_token));
        for (key, value) in extra_params {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(value);
        }
        url
    }

    fn image_url(&self, item_id: &str, image_type: &str) -> String {
        format!(
            "{}?api_key={}",
            self.url(&format!("/Items/{item_id}/Images/{image_type}")),
            self.access_token
        )
    }

    fn subtitle_urls(&self, item_id: &str, stream_index: u32) -> Vec<String> {
        vec![
            format!(
                "{}?api_key={}",
                self.url(&format!("/Videos/{item_id}/{item_id}/Subtitles/{stream_index}/Stream.srt")),
                self.access_token
            ),
            format!(
                "{}?api_key={}",
                self.url(&format!("/Videos/{item_id}/{item_id}/Subtitles/{stream_index}/0/Stream.srt")),
                self.access_token
            ),
            format!(
                "{}?api_key={}",
                self.url(&format!("/Subtitles/{item_id}/{stream_index}/Stream.srt")),
                self.access_token
            ),
        ]
    }

    async fn report_playback_start(&self, payload: &PlaybackStartPayload) -> Result<()> {
        self.post_telemetry("/Sessions/Playing", payload).await
    }

    async fn report_playback_progress(&self, payload: &PlaybackProgressPayload) -> Result<()> {
        self.post_telemetry("/Sessions/Playing/Progress", payload).await
    }

    async fn report_playback_stopped(&self, payload: &PlaybackStoppedPayload) -> Result<()> {
        self.post_telemetry("/Sessions/Playing/Stopped", payload).await
    }

    async fn mark_played(&self, user_id: Uuid, item_id: Uuid) -> Result<()> {
        let url = self.url(&format!("/Users/{user_id}/PlayedItems/{item_id}"));
        let response = self
            .http
            .post(&url)
            .header(EMBY_TOKEN_HEADER, &self.access_token)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Upstream {
                status,
                endpoint: "/Users/{uid}/PlayedItems/{id}".to_string(),
                body,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_url_carries_api_key_and_extra_params() {
        let client = HttpCatalogClient::new("http://catalog.local:8096", "tok123", Uuid::nil()).unwrap();
        let url = client.stream_url("abc", &[("Static", "true")]);
        assert!(url.starts_with("http://catalog.local:8096/Videos/abc/stream?api_key=tok123"));
        assert!(url.contains("&Static=true"));
    }

    #[test]
    fn image_url_is_well_formed() {
        let client = HttpCatalogClient::new("http://catalog.local:8096", "tok123", Uuid::nil()).unwrap();
        let url = client.image_url("abc", "Primary");
        assert_eq!(
            url,
            "http://catalog.local:8096/Items/abc/Images/Primary?api_key=tok123"
        );
    }

    #[test]
    fn base_url_trailing_slash_is_tolerated() {
        let client = HttpCatalogClient::new("http://catalog.local:8096/", "tok", Uuid::nil()).unwrap();
        assert_eq!(client.url("/Items"), "http://catalog.local:8096/Items");
    }
}
