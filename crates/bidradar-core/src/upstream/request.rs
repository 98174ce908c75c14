//! Query construction for one upstream page.

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::config::UpstreamConfig;
use crate::normalize::RecordKind;

const SERVICE_KEY: &str = "serviceKey";
const REDACTED: &str = "***";

/// Base URL and operation name of one upstream listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub base_url: String,
    pub operation: String,
}

impl Endpoint {
    pub fn for_kind(kind: RecordKind, cfg: &UpstreamConfig) -> Self {
        let (base_url, operation) = match kind {
            RecordKind::Bid => (&cfg.bids_base_url, &cfg.bids_operation),
            RecordKind::Award => (&cfg.awards_base_url, &cfg.awards_operation),
        };
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            operation: operation.clone(),
        }
    }
}

/// `[today - days_back, today]`. Saturates at the earliest representable date.
pub fn inquiry_window(today: NaiveDate, days_back: i64) -> (NaiveDate, NaiveDate) {
    let days = Days::new(days_back.max(0).unsigned_abs());
    let begin = today.checked_sub_days(days).unwrap_or(NaiveDate::MIN);
    (begin, today)
}

/// Mask the `serviceKey` query value of `url`. Unparsable input is masked whole.
pub fn redact_service_key(url: &str) -> String {
    let Ok(mut parsed) = url::Url::parse(url) else {
        return REDACTED.to_string();
    };
    if !parsed.query_pairs().any(|(k, _)| k == SERVICE_KEY) {
        return url.to_string();
    }
    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == SERVICE_KEY { REDACTED.into() } else { v };
            (k.into_owned(), v.into_owned())
        })
        .collect();
    parsed.query_pairs_mut().clear().extend_pairs(pairs);
    parsed.into()
}

/// One fully parameterized page request.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub endpoint: Endpoint,
    pub page_no: u32,
    params: BTreeMap<String, String>,
}

impl PageRequest {
    pub fn new(
        endpoint: Endpoint,
        api_key: &str,
        page_no: u32,
        page_size: u32,
        inquiry_division: &str,
        window: (NaiveDate, NaiveDate),
    ) -> Self {
        let mut params = BTreeMap::new();
        params.insert(SERVICE_KEY.to_string(), api_key.to_string());
        params.insert("numOfRows".to_string(), page_size.to_string());
        params.insert("pageNo".to_string(), page_no.to_string());
        params.insert("inqryDiv".to_string(), inquiry_division.to_string());
        params.insert("inqryBgnDt".to_string(), window.0.format("%Y%m%d").to_string());
        params.insert("inqryEndDt".to_string(), window.1.format("%Y%m%d").to_string());
        params.insert("type".to_string(), "json".to_string());
        Self {
            endpoint,
            page_no,
            params,
        }
    }

    pub fn operation(&self) -> &str {
        &self.endpoint.operation
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Full request URL with the query string percent-encoded.
    pub fn url(&self) -> Result<String> {
        let base = format!("{}/{}", self.endpoint.base_url, self.endpoint.operation);
        let url = url::Url::parse_with_params(&base, self.params.iter())
            .with_context(|| format!("invalid upstream URL: {base}"))?;
        Ok(url.into())
    }

    /// Parameters safe to persist: the service key is masked.
    pub fn redacted_params(&self) -> BTreeMap<String, Value> {
        self.params
            .iter()
            .map(|(k, v)| {
                let v = if k == SERVICE_KEY { REDACTED } else { v.as_str() };
                (k.clone(), Value::String(v.to_string()))
            })
            .collect()
    }
}
