//! Truck category suggestions from a goods description.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};

use crate::{
    catalog::{CategoryCatalog, TruckCategory},
    config::{SuggestionConfig, SuggestionProvider},
    error::{BookingError, Result},
};

/// Something that can map free text to a truck category.
#[async_trait]
pub trait CategorySuggester: Send + Sync {
    /// Raw capability. May fail for any reason.
    async fn try_suggest(&self, goods: &str) -> Result<TruckCategory>;

    /// Never fails: any error falls back to `general_cargo`.
    async fn suggest(&self, goods: &str) -> TruckCategory {
        match self.try_suggest(goods).await {
            Ok(category) => {
                tracing::info!("suggested {category} for {goods:?}");
                category
            }
            Err(e) => {
                tracing::warn!("suggestion failed, using general_cargo: {e}");
                TruckCategory::GeneralCargo
            }
        }
    }
}

/// Pick the suggester the config asks for. Gemini without a key degrades to
/// keyword matching.
pub fn from_config(cfg: &SuggestionConfig) -> Arc<dyn CategorySuggester> {
    match cfg.provider {
        SuggestionProvider::Gemini => match cfg.resolved_api_key() {
            Some(key) => match GeminiSuggester::new(
                &cfg.endpoint,
                &cfg.model,
                key,
                Duration::from_secs(cfg.timeout_secs),
            ) {
                Ok(s) => return Arc::new(s),
                Err(e) => tracing::warn!("gemini client unavailable: {e}"),
            },
            None => tracing::warn!("no Gemini API key configured, using keyword suggester"),
        },
        SuggestionProvider::Keywords => {}
    }
    Arc::new(KeywordSuggester)
}

fn ensure_described(goods: &str) -> Result<&str> {
    let goods = goods.trim();
    if goods.is_empty() {
        return Err(BookingError::SuggestionServiceUnavailable(
            "goods description is empty".into(),
        ));
    }
    Ok(goods)
}

/// Gemini `generateContent` client.
pub struct GeminiSuggester {
    http: Client,
    url: String,
    api_key: String,
    /// Categories offered to the model and accepted back.
    catalog: CategoryCatalog,
}

impl GeminiSuggester {
    pub fn new(endpoint: &str, model: &str, api_key: String, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(unavailable)?;
        Ok(Self {
            http,
            url: format!(
                "{}/models/{}:generateContent",
                endpoint.trim_end_matches('/'),
                model
            ),
            api_key,
            catalog: CategoryCatalog::standard(),
        })
    }
}

fn unavailable(e: impl std::fmt::Display) -> BookingError {
    BookingError::SuggestionServiceUnavailable(e.to_string())
}

/// Instruction sent to the model.
pub fn build_prompt(catalog: &CategoryCatalog, goods: &str) -> String {
    let ids: Vec<&str> = catalog.ids().iter().map(|c| c.as_str()).collect();
    format!(
        "Given the following goods description, suggest the most suitable truck category \
         from this list: {}. The goods are: \"{}\". Respond with ONLY the category name \
         from the list provided, in lowercase. For example: 'flatbed'.",
        ids.join(", "),
        goods
    )
}

/// Turn a model answer such as `'Reefer'\n` into a category.
pub fn parse_answer(catalog: &CategoryCatalog, answer: &str) -> Result<TruckCategory> {
    let cleaned = answer
        .trim()
        .trim_matches(|c| c == '\'' || c == '"' || c == '`' || c == '.');
    catalog.resolve(cleaned).map(|details| details.id).map_err(|_| {
        BookingError::SuggestionServiceUnavailable(format!("unrecognised answer {answer:?}"))
    })
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

impl GenerateResponse {
    fn text(&self) -> Option<&str> {
        let part = self.candidates.first()?.content.parts.first()?;
        Some(part.text.as_str())
    }
}

#[async_trait]
impl CategorySuggester for GeminiSuggester {
    async fn try_suggest(&self, goods: &str) -> Result<TruckCategory> {
        let goods = ensure_described(goods)?;
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: build_prompt(&self.catalog, goods),
                }],
            }],
        };

        let resp = self
            .http
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(unavailable)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(unavailable(format!("HTTP status {status} error: {body}")));
        }
        let resp = resp.json::<GenerateResponse>().await.map_err(unavailable)?;
        let text = resp.text().ok_or_else(|| unavailable("empty response"))?;
        parse_answer(&self.catalog, text)
    }
}

/// Offline keyword matching.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeywordSuggester;

const KEYWORDS: &[(&[&str], TruckCategory)] = &[
    (
        &["chilled", "frozen", "refrigerated", "vaccine", "ice cream"],
        TruckCategory::Reefer,
    ),
    (&["fuel", "oil", "milk", "diesel", "chemical"], TruckCategory::Tanker),
    (
        &["sand", "gravel", "debris", "rubble"],
        TruckCategory::DumpTruck,
    ),
    (
        &["steel", "lumber", "machinery", "pipes", "girders"],
        TruckCategory::Flatbed,
    ),
    (&["container"], TruckCategory::ArticulatedTrailer),
];

#[async_trait]
impl CategorySuggester for KeywordSuggester {
    async fn try_suggest(&self, goods: &str) -> Result<TruckCategory> {
        let goods = ensure_described(goods)?.to_lowercase();
        KEYWORDS
            .iter()
            .find(|(words, _)| words.iter().any(|w| goods.contains(w)))
            .map(|(_, category)| *category)
            .ok_or_else(|| unavailable("no keyword matched"))
    }
}
