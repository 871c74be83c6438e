use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

use crate::models::Category;

/// Errors that can occur when fetching the official board feed
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Board feed returned error: {0}")]
    ApiError(String),
}

/// One unclassified board record
#[derive(Debug, Clone, PartialEq)]
pub struct BoardItem {
    pub id: String,
    /// Position in the published feed, which the public detail page is addressed by
    pub index: usize,
    pub title: String,
    /// Topic the board itself assigned ("okruh")
    pub topic: String,
    pub url: String,
    pub publication_date: Option<String>,
}

impl BoardItem {
    /// Category implied by the board's own topic label
    pub fn topic_category(&self) -> Category {
        Category::from_label(&self.topic).unwrap_or(Category::Unclassified)
    }
}

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(default)]
    informace: Vec<FeedItem>,
}

#[derive(Debug, Deserialize)]
struct FeedItem {
    #[serde(default)]
    iri: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(rename = "název", default)]
    nazev: Option<LocalizedText>,
    #[serde(rename = "vyvěšení", default)]
    vyveseni: Option<DateValue>,
    #[serde(default)]
    okruh: Option<LocalizedText>,
}

#[derive(Debug, Deserialize)]
struct LocalizedText {
    #[serde(default)]
    cs: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DateValue {
    #[serde(default)]
    datum: Option<String>,
}

/// Client for the official board open-data feed (JSON-LD)
pub struct BoardClient {
    feed_url: String,
    client: Client,
}

impl BoardClient {
    pub fn new(feed_url: String, timeout: Duration) -> Result<Self, BoardError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { feed_url, client })
    }

    /// Fetch and flatten all published records
    pub async fn fetch(&self) -> Result<Vec<BoardItem>, BoardError> {
        tracing::debug!("Fetching board feed from: {}", self.feed_url);

        let response = self.client.get(&self.feed_url).send().await?;
        if !response.status().is_success() {
            return Err(BoardError::ApiError(format!(
                "Failed to fetch board feed: {}",
                response.status()
            )));
        }

        let feed: Feed = response.json().await?;
        let items = parse_feed(feed);

        tracing::info!("Fetched {} board items", items.len());
        Ok(items)
    }
}

/// Flatten the feed, keeping only the first record for each id
fn parse_feed(feed: Feed) -> Vec<BoardItem> {
    let mut seen = HashSet::new();

    feed.informace
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let url = item.url.unwrap_or_default();
            // Records without an IRI fall back to their position in the feed
            let id = item
                .iri
                .filter(|iri| !iri.is_empty())
                .unwrap_or_else(|| index.to_string());

            if !seen.insert(id.clone()) {
                tracing::warn!("Skipping repeated board record {} at position {}", id, index);
                return None;
            }

            Some(BoardItem {
                id,
                index,
                title: item
                    .nazev
                    .and_then(|t| t.cs)
                    .unwrap_or_else(|| "Bez názvu".to_string()),
                topic: item
                    .okruh
                    .and_then(|t| t.cs)
                    .unwrap_or_else(|| Category::Unclassified.label().to_string()),
                url,
                publication_date: item.vyveseni.and_then(|d| d.datum),
            })
        })
        .collect()
}
