//! Direct Roku External Control Protocol (ECP) client.
//!
//! Talks HTTP to a single Roku device on port 8060. ECP is a simple
//! REST-over-HTTP protocol: most operations are bare `POST`s with no body,
//! and device/app queries return XML that we scrape with string matching
//! rather than pulling in a full XML parser for a handful of fields.

use cueso_domain::error::{Error, Result};
use std::time::Duration;

pub struct RokuClient {
    base_url: String,
    client: reqwest::Client,
}

impl RokuClient {
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

    async fn post(&self, path: &str) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(Error::Tool {
                tool: "roku".into(),
                message: format!("HTTP {} from {url}: {body}", status.as_u16()),
            });
        }
        Ok(body)
    }

    async fn get(&self, path: &str) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(Error::Tool {
                tool: "roku".into(),
                message: format!("HTTP {} from {url}: {body}", status.as_u16()),
            });
        }
        Ok(body)
    }

    /// `POST /launch/{channel_id}?contentId=...&mediaType=...`
    pub async fn launch_content(&self, channel_id: i64, content_id: &str, media_type: &str) -> Result<()> {
        let path = format!(
            "/launch/{channel_id}?contentId={}&mediaType={}",
            urlencode(content_id),
            urlencode(media_type)
        );
        self.post(&path).await?;
        Ok(())
    }

    /// `GET /query/device-info` — raw XML device descriptor.
    pub async fn get_device_info(&self) -> Result<String> {
        self.get("/query/device-info").await
    }

    /// `GET /query/active-app` — raw XML describing the foreground app.
    pub async fn get_active_app(&self) -> Result<String> {
        self.get("/query/active-app").await
    }

    /// `POST /keypress/{key}` — remote-control key injection.
    pub async fn send_key(&self, key: &str) -> Result<()> {
        self.post(&format!("/keypress/{key}")).await?;
        Ok(())
    }
}

fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urlencode_passes_through_unreserved_chars() {
        assert_eq!(urlencode("abcXYZ019-_.~"), "abcXYZ019-_.~");
    }

    #[test]
    fn urlencode_escapes_space_and_special_chars() {
        assert_eq!(urlencode("the office"), "the%20office");
        assert_eq!(urlencode("a/b"), "a%2Fb");
    }
}
