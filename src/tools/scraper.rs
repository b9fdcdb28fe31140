//! `web_scraper`: fetches a URL into the `raw_document` artifact.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::core::workspace::WorkspaceUpdate;
use crate::tools::{Tool, ToolCall};

/// Some sites reject requests without a browser user agent.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                          AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36";

pub struct WebScraper {
    timeout: Duration,
}

impl WebScraper {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Tool for WebScraper {
    fn name(&self) -> &'static str {
        "web_scraper"
    }

    fn accepted_args(&self) -> &'static [&'static str] {
        &["url"]
    }

    fn invoke(&self, call: &ToolCall<'_>) -> Result<WorkspaceUpdate> {
        let Some(url) = call.str_arg("url") else {
            return Ok(WorkspaceUpdate::failure(
                "web_scraper requires a 'url' argument",
            ));
        };

        info!(%url, "fetching document");
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("build http client")?;

        let fetched = client
            .get(url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .and_then(reqwest::blocking::Response::text);

        match fetched {
            Ok(text) => Ok(WorkspaceUpdate::success().with_raw_document(text)),
            Err(err) => {
                warn!(%url, err = %err, "scrape failed");
                Ok(WorkspaceUpdate::failure(format!("Error scraping URL: {err}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::workspace::Workspace;
    use std::collections::BTreeMap;

    #[test]
    fn missing_url_is_a_tool_failure_not_a_fault() {
        let scraper = WebScraper::new(Duration::from_secs(1));
        let workspace = Workspace::new();
        let call = ToolCall {
            request: "request",
            workspace: &workspace,
            args: BTreeMap::new(),
        };

        let update = scraper.invoke(&call).expect("invoke");
        assert!(!update.is_success());
        assert!(update.failure_text().contains("'url'"));
    }
}
