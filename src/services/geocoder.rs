use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;

use crate::models::Coordinates;

/// Errors that can occur when resolving place names
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Geocoding API returned error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Place name to coordinate resolver
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// `Ok(None)` when the place is unknown
    async fn resolve(&self, place: &str) -> Result<Option<Coordinates>, GeocodeError>;
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    lat: String,
    lon: String,
}

/// OpenStreetMap Nominatim search client
///
/// Nominatim's usage policy allows about one request per second and requires an
/// identifying User-Agent. Requests are throttled through a shared rate limiter and
/// answers (including "not found") are cached per normalized place name.
pub struct NominatimGeocoder {
    base_url: String,
    user_agent: String,
    country_codes: Option<String>,
    region_suffix: Option<String>,
    client: Client,
    limiter: DefaultDirectRateLimiter,
    cache: moka::future::Cache<String, Option<Coordinates>>,
}

impl NominatimGeocoder {
    pub fn new(
        base_url: String,
        user_agent: String,
        requests_per_second: u32,
        cache_size: u64,
        timeout: Duration,
    ) -> Result<Self, GeocodeError> {
        let client = Client::builder().timeout(timeout).build()?;
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            base_url,
            user_agent,
            country_codes: None,
            region_suffix: None,
            client,
            limiter: RateLimiter::direct(Quota::per_second(rps)),
            cache: moka::future::CacheBuilder::new(cache_size).build(),
        })
    }

    /// Restrict results to the given ISO country codes, e.g. `"cz"`
    pub fn with_country_codes(mut self, codes: impl Into<String>) -> Self {
        self.country_codes = Some(codes.into());
        self
    }

    /// Appended to every query, e.g. `"Královéhradecký kraj, Czech Republic"`
    pub fn with_region_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.region_suffix = Some(suffix.into());
        self
    }

    fn query_for(&self, place: &str) -> String {
        match &self.region_suffix {
            Some(suffix) => format!("{}, {}", place, suffix),
            None => place.to_string(),
        }
    }

    async fn search(&self, place: &str) -> Result<Option<Coordinates>, GeocodeError> {
        let mut url = format!(
            "{}/search?q={}&format=json&limit=1",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(&self.query_for(place))
        );
        if let Some(codes) = &self.country_codes {
            url.push_str("&countrycodes=");
            url.push_str(&urlencoding::encode(codes));
        }

        self.limiter.until_ready().await;

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeocodeError::ApiError(format!(
                "Geocoding failed: {}",
                response.status()
            )));
        }

        let results: Vec<SearchResult> = response.json().await?;
        let Some(first) = results.first() else {
            tracing::debug!("No geocoding results for {}", place);
            return Ok(None);
        };

        let latitude: f64 = first
            .lat
            .parse()
            .map_err(|_| GeocodeError::InvalidResponse(format!("bad latitude {:?}", first.lat)))?;
        let longitude: f64 = first
            .lon
            .parse()
            .map_err(|_| GeocodeError::InvalidResponse(format!("bad longitude {:?}", first.lon)))?;

        let coords = Coordinates::new(latitude, longitude);
        if !coords.is_valid() {
            return Err(GeocodeError::InvalidResponse(format!(
                "coordinates out of range: {}, {}",
                first.lat, first.lon
            )));
        }

        Ok(Some(coords))
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn resolve(&self, place: &str) -> Result<Option<Coordinates>, GeocodeError> {
        let key = place.trim().to_lowercase();
        if key.is_empty() {
            return Ok(None);
        }

        if let Some(cached) = self.cache.get(&key).await {
            tracing::trace!("Geocoder cache hit: {}", key);
            return Ok(cached);
        }

        let result = self.search(place.trim()).await?;
        self.cache.insert(key, result).await;
        Ok(result)
    }
}
