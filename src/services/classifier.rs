use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::models::{Category, Coordinates, Notice};
use crate::services::board::BoardItem;
use crate::services::geocoder::Geocoder;

/// Region center used when the model gives no usable location
pub const DEFAULT_REGION_CENTER: Coordinates = Coordinates {
    latitude: 50.2,
    longitude: 15.8,
};

/// Errors that can occur when calling the language model
///
/// These never leave the classifier: a failing chunk falls back to default records.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Model API returned error: {0}")]
    ApiError(String),

    #[error("Empty model response")]
    EmptyResponse,
}

/// Category and approximate location assigned to one board item
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub id: String,
    pub category: Category,
    pub relevance_score: Option<f64>,
    pub coordinates: Coordinates,
    pub place_name: Option<String>,
}

impl Classification {
    /// Deterministic record used when classification is impossible
    pub fn fallback(id: impl Into<String>, center: Coordinates) -> Self {
        Self {
            id: id.into(),
            category: Category::Unclassified,
            relevance_score: None,
            coordinates: center,
            place_name: None,
        }
    }
}

/// Assigns categories and coordinates to raw board items
///
/// Implementations never fail; every input item gets exactly one classification.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NoticeClassifier: Send + Sync {
    async fn classify(&self, items: &[BoardItem]) -> Vec<Classification>;
}

/// Merge board items with their classifications into matchable notices
pub fn into_notices(items: Vec<BoardItem>, classifications: Vec<Classification>) -> Vec<Notice> {
    let mut by_id: HashMap<String, Classification> = classifications
        .into_iter()
        .map(|c| (c.id.clone(), c))
        .collect();

    items
        .into_iter()
        .map(|item| {
            let classification = by_id.remove(&item.id);
            Notice {
                category: classification
                    .as_ref()
                    .map(|c| c.category)
                    .unwrap_or_else(|| item.topic_category()),
                coordinates: classification.as_ref().map(|c| c.coordinates),
                place: classification.as_ref().and_then(|c| c.place_name.clone()),
                relevance_score: classification.as_ref().and_then(|c| c.relevance_score),
                board_index: Some(item.index),
                id: item.id,
                publication_date: item.publication_date,
                title: item.title,
                url: item.url,
            }
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    #[serde(alias = "iri")]
    id: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(rename = "cityName", default)]
    city_name: Option<String>,
    #[serde(rename = "guessedLatitude", alias = "latitude", default)]
    latitude: Option<f64>,
    #[serde(rename = "guessedLongitude", alias = "longitude", default)]
    longitude: Option<f64>,
    #[serde(rename = "relevanceScore", default)]
    relevance_score: Option<f64>,
}

impl RawClassification {
    fn into_classification(self, fallback: Coordinates) -> Classification {
        let coordinates = match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) if Coordinates::new(lat, lon).is_valid() => Coordinates::new(lat, lon),
            _ => fallback,
        };

        Classification {
            category: self
                .category
                .as_deref()
                .and_then(Category::from_label)
                .unwrap_or(Category::Unclassified),
            relevance_score: self
                .relevance_score
                .filter(|s| s.is_finite())
                .map(|s| s.clamp(0.0, 1.0)),
            place_name: self
                .city_name
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            coordinates,
            id: self.id,
        }
    }
}

/// Parse model output for one chunk, never failing
///
/// 1. Take the span from the first `[` to the last `]` (or to the end if the answer was cut off)
/// 2. Strict JSON parse
/// 3. Close unbalanced strings, objects and arrays, then parse again
/// 4. Drop the trailing incomplete object and parse again
/// 5. Give up: every item of the chunk gets the fallback record
///
/// Items the model did not mention also get the fallback record. The output
/// follows the chunk order.
pub fn parse_classifications(
    text: &str,
    chunk: &[BoardItem],
    fallback: Coordinates,
) -> Vec<Classification> {
    let parsed = extract_array(text).and_then(|span| {
        parse_array(span)
            .or_else(|| close_unbalanced(span).and_then(|fixed| parse_array(&fixed)))
            .or_else(|| drop_incomplete_tail(span).and_then(|fixed| parse_array(&fixed)))
    });

    let mut by_id: HashMap<String, Classification> = match parsed {
        Some(records) => records
            .into_iter()
            .map(|r| (r.id.clone(), r.into_classification(fallback)))
            .collect(),
        None => {
            tracing::warn!(
                items = chunk.len(),
                "Unparsable classifier output, using fallback records"
            );
            HashMap::new()
        }
    };

    chunk
        .iter()
        .map(|item| {
            by_id
                .remove(&item.id)
                .unwrap_or_else(|| Classification::fallback(&item.id, fallback))
        })
        .collect()
}

fn extract_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    match text.rfind(']') {
        Some(end) if end > start => Some(&text[start..=end]),
        _ => Some(&text[start..]),
    }
}

/// Parse an array of records, skipping elements that are not valid records
fn parse_array(s: &str) -> Option<Vec<RawClassification>> {
    let values: Vec<Value> = serde_json::from_str(s).ok()?;
    Some(
        values
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect(),
    )
}

/// Append whatever closers are missing for strings, objects and arrays
fn close_unbalanced(s: &str) -> Option<String> {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for ch in s.chars() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.pop() != Some(ch) {
                    return None;
                }
            }
            _ => {}
        }
    }

    if stack.is_empty() && !in_string {
        return None;
    }

    let mut fixed = s.trim_end().to_string();
    if in_string {
        fixed.push('"');
    }
    while fixed.ends_with(',') {
        fixed.pop();
    }
    fixed.extend(stack.iter().rev());
    Some(fixed)
}

/// Cut after the last object that closed at array level and close the array
fn drop_incomplete_tail(s: &str) -> Option<String> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut last_complete = None;

    for (i, ch) in s.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.checked_sub(1)?;
                if ch == '}' && depth == 1 {
                    last_complete = Some(i);
                }
            }
            _ => {}
        }
    }

    let end = last_complete?;
    Some(format!("{}]", &s[..=end]))
}

/// Classifier backed by a Gemini-style `generateContent` API
pub struct LlmClassifier {
    endpoint: String,
    api_key: String,
    model: String,
    chunk_size: usize,
    temperature: f64,
    max_output_tokens: u32,
    fallback: Coordinates,
    client: Client,
    geocoder: Option<Arc<dyn Geocoder>>,
}

impl LlmClassifier {
    pub fn new(
        endpoint: String,
        api_key: String,
        model: String,
        chunk_size: usize,
        timeout: Duration,
    ) -> Result<Self, ClassifierError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            endpoint,
            api_key,
            model,
            chunk_size: chunk_size.max(1),
            temperature: 0.1,
            max_output_tokens: 8192,
            fallback: DEFAULT_REGION_CENTER,
            client,
            geocoder: None,
        })
    }

    pub fn with_fallback_center(mut self, center: Coordinates) -> Self {
        self.fallback = center;
        self
    }

    /// Re-resolve place names the model extracted through a real geocoder
    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    fn build_prompt(&self, chunk: &[BoardItem]) -> String {
        let categories = Category::ALL
            .iter()
            .map(|c| c.label())
            .collect::<Vec<_>>()
            .join(", ");

        let items = chunk
            .iter()
            .map(|item| format!("IRI: {}\nNázev: {}\nOkruh: {}", item.id, item.title, item.topic))
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(
            "Kategorizuj položky z úřední desky a odhadni jejich polohu.\n\n\
             Každé položce přiřaď jednu z kategorií: {categories}.\n\
             Pokud se žádná nehodí, použij \"{unclassified}\".\n\n\
             Pro každou položku:\n\
             1. Uveď název města nebo obce, pokud je zmíněno, jinak prázdný řetězec.\n\
             2. Odhadni zeměpisnou šířku a délku. Bez konkrétní lokality použij střed kraje \
             (latitude {lat}, longitude {lon}).\n\
             3. Ohodnoť relevanci pro obyvatele kraje číslem od 0.0 (nezajímavé) do 1.0 (velmi důležité).\n\n\
             Položky:\n{items}\n\n\
             Vrať POUZE validní JSON pole ve formátu:\n\
             [{{\"iri\":\"...\",\"category\":\"Název Kategorie\",\"cityName\":\"Hradec Králové\",\"guessedLatitude\":{lat},\"guessedLongitude\":{lon},\"relevanceScore\":0.5}}]",
            categories = categories,
            unclassified = Category::Unclassified.label(),
            lat = self.fallback.latitude,
            lon = self.fallback.longitude,
            items = items,
        )
    }

    async fn generate(&self, prompt: &str) -> Result<String, ClassifierError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        );

        let body = json!({
            "contents": [{"parts": [{"text": prompt}]}],
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_output_tokens,
            }
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClassifierError::ApiError(format!(
                "Model call failed: {}",
                response.status()
            )));
        }

        let json: Value = response.json().await?;
        let text = json
            .pointer("/candidates/0/content/parts")
            .and_then(|parts| parts.as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                    .collect::<String>()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ClassifierError::EmptyResponse);
        }
        Ok(text)
    }

    async fn classify_chunk(&self, chunk: &[BoardItem]) -> Vec<Classification> {
        match self.generate(&self.build_prompt(chunk)).await {
            Ok(text) => parse_classifications(&text, chunk, self.fallback),
            Err(e) => {
                tracing::warn!(items = chunk.len(), "Classifier call failed, using fallback records: {}", e);
                chunk
                    .iter()
                    .map(|item| Classification::fallback(&item.id, self.fallback))
                    .collect()
            }
        }
    }

    async fn refine_locations(&self, classifications: &mut [Classification]) {
        let Some(geocoder) = &self.geocoder else {
            return;
        };

        for classification in classifications.iter_mut() {
            let Some(place) = classification.place_name.as_deref() else {
                continue;
            };
            match geocoder.resolve(place).await {
                Ok(Some(coords)) => classification.coordinates = coords,
                Ok(None) => tracing::debug!("No geocoding result for {}, keeping model guess", place),
                Err(e) => tracing::warn!("Geocoding {} failed, keeping model guess: {}", place, e),
            }
        }
    }
}

#[async_trait]
impl NoticeClassifier for LlmClassifier {
    async fn classify(&self, items: &[BoardItem]) -> Vec<Classification> {
        let mut classifications = Vec::with_capacity(items.len());

        for (index, chunk) in items.chunks(self.chunk_size).enumerate() {
            tracing::debug!(chunk = index, items = chunk.len(), "Classifying chunk");
            classifications.extend(self.classify_chunk(chunk).await);
        }

        self.refine_locations(&mut classifications).await;

        tracing::info!("Classified {} board items", classifications.len());
        classifications
    }
}
