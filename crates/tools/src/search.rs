//! External content-search collaborator for `find_content` (spec.md C3.1).
//!
//! `find_content` never touches the Roku device itself — it calls a
//! configured web-search provider and distills its response into
//! structured matches the LLM can reason about (a candidate `channel_id`/
//! `content_id`/`media_type` for a subsequent `launch_content` call).

use cueso_domain::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub struct SearchClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchMatch {
    pub title: String,
    pub media_type: String,
    pub channel_id: i64,
    pub content_id: String,
    #[serde(default)]
    pub season: Option<i64>,
    #[serde(default)]
    pub episode: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    matches: Vec<SearchMatch>,
}

impl SearchClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// `GET /search?title=...&media_type=...&season=...&episode=...`
    pub async fn find_content(
        &self,
        title: &str,
        media_type: Option<&str>,
        season: Option<i64>,
        episode: Option<i64>,
    ) -> Result<Vec<SearchMatch>> {
        let mut query: Vec<(&str, String)> = vec![("title", title.to_string())];
        if let Some(mt) = media_type {
            query.push(("media_type", mt.to_string()));
        }
        if let Some(s) = season {
            query.push(("season", s.to_string()));
        }
        if let Some(e) = episode {
            query.push(("episode", e.to_string()));
        }

        let url = format!("{}/search", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Tool {
                tool: "find_content".into(),
                message: format!("search provider returned HTTP {}", status.as_u16()),
            });
        }

        let parsed = resp.json::<SearchResponse>().await.map_err(|e| Error::Tool {
            tool: "find_content".into(),
            message: format!("search provider returned an unparseable response: {e}"),
        })?;

        Ok(parsed.matches)
    }
}
