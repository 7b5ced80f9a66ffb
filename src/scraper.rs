//! Question-bank listing scraper.
//!
//! Requests go out one at a time with a randomized pause between listing
//! pages. There is no retry: a failed request ends the walk and whatever
//! was collected so far is returned.

use std::time::Duration;

use rand::Rng;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::lenient;
use crate::settings::ScrapeSettings;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected listing payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// One row of the listing endpoint. Difficulty is 1 (easy) to 3 (hard).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListedQuestion {
    pub id: String,
    pub difficulty: u8,
    pub domain: String,
    pub skill: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListingPage {
    #[serde(deserialize_with = "lenient::values")]
    items: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListingItem {
    #[serde(deserialize_with = "lenient::opt_string")]
    id: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    difficulty: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    domain: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    skill: Option<String>,
}

pub fn difficulty_level(label: Option<&str>) -> u8 {
    match label.unwrap_or("medium") {
        "easy" => 1,
        "hard" => 3,
        _ => 2,
    }
}

/// Parse one listing response body. Rows without an id are skipped; a body
/// that is not JSON at all is an error.
pub fn parse_listing(body: &str) -> Result<Vec<ListedQuestion>, ScrapeError> {
    let page: ListingPage = serde_json::from_str(body)?;
    Ok(page
        .items
        .into_iter()
        .filter_map(|row| {
            let item: ListingItem = serde_json::from_value(row).ok()?;
            let Some(id) = item.id.filter(|id| !id.is_empty()) else {
                debug!("skipping listing row without an id");
                return None;
            };
            Some(ListedQuestion {
                difficulty: difficulty_level(item.difficulty.as_deref()),
                id,
                domain: item.domain.unwrap_or_default(),
                skill: item.skill.unwrap_or_default(),
            })
        })
        .collect())
}

/// Random pause in `[min_delay_ms, max_delay_ms]`.
pub fn politeness_delay(settings: &ScrapeSettings) -> Duration {
    let (lo, hi) = if settings.min_delay_ms <= settings.max_delay_ms {
        (settings.min_delay_ms, settings.max_delay_ms)
    } else {
        (settings.max_delay_ms, settings.min_delay_ms)
    };
    Duration::from_millis(rand::thread_rng().gen_range(lo..=hi))
}

pub struct QuestionBankScraper {
    client: reqwest::Client,
    settings: ScrapeSettings,
}

impl QuestionBankScraper {
    pub fn new(settings: ScrapeSettings) -> Result<Self, ScrapeError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .cookie_store(true)
            .build()?;
        Ok(QuestionBankScraper { client, settings })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    /// Visit the landing page so the session picks up its cookies.
    async fn init_session(&self) -> Result<(), ScrapeError> {
        let url = self.url("/questionbank");
        info!("Initializing session: {}", url);
        let response = self.client.get(&url).send().await?.error_for_status()?;
        debug!(status = %response.status(), "session initialized");
        Ok(())
    }

    /// Headers the landing page's own XHR calls send.
    fn api_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        if let Ok(referer) = HeaderValue::from_str(&self.url("/questionbank")) {
            headers.insert(header::REFERER, referer);
        }
        headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
        headers
    }

    pub async fn fetch_page(&self, page: u32) -> Result<Vec<ListedQuestion>, ScrapeError> {
        tokio::time::sleep(politeness_delay(&self.settings)).await;

        let url = self.url("/api/questionbank/questions");
        let per_page = self.settings.per_page.to_string();
        let page_param = page.to_string();
        debug!(page, url = %url, "requesting listing page");
        let body = self
            .client
            .get(&url)
            .headers(self.api_headers())
            .query(&[
                ("page", page_param.as_str()),
                ("limit", per_page.as_str()),
                ("subject", self.settings.subject.as_str()),
                ("type", self.settings.question_type.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_listing(&body)
    }

    pub async fn fetch_details(&self, question_id: &str) -> Result<Value, ScrapeError> {
        tokio::time::sleep(politeness_delay(&self.settings)).await;
        let url = self.url(&format!("/api/questionbank/questions/{}", question_id));
        let details = self
            .client
            .get(&url)
            .headers(self.api_headers())
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;
        Ok(details)
    }

    /// Walk listing pages until one comes back empty, a request fails, or
    /// `max_pages` is reached.
    pub async fn scrape_all(&self, max_pages: Option<u32>) -> Vec<ListedQuestion> {
        if let Err(e) = self.init_session().await {
            warn!("Session init failed: {}", e);
            return Vec::new();
        }

        let mut all = Vec::new();
        let mut page = 1;
        loop {
            info!("Fetching page {}...", page);
            let questions = match self.fetch_page(page).await {
                Ok(q) => q,
                Err(e) => {
                    warn!("Listing page {} failed: {}", page, e);
                    break;
                }
            };
            if questions.is_empty() {
                break;
            }
            all.extend(questions);
            if max_pages.is_some_and(|max| page >= max) {
                break;
            }
            page += 1;
        }
        info!("Scraped {} questions", all.len());
        all
    }
}
