// src/services/parser/api.rs

//! JSON API extraction.

use scraper::Html;
use serde_json::{Map, Value};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{RawJob, RowOrigin, SourceConfig};
use crate::utils::dates::{epoch_to_iso, normalize_timestamp};
use crate::utils::url::compose_detail_url;
use crate::utils::{clean_text, resolve_url};

/// Keys that only appear on the leading notice element of the feed.
const METADATA_KEYS: &[&str] = &["legal", "last_updated", "terms"];

type Object = Map<String, Value>;

/// Extracts raw job rows from the JSON feed.
#[derive(Debug)]
pub struct ApiParser {
    base: Url,
    detail_path: String,
}

impl ApiParser {
    pub fn new(source: &SourceConfig) -> Result<Self> {
        Ok(Self {
            base: Url::parse(&source.base_url)?,
            detail_path: source.detail_path.clone(),
        })
    }

    /// Parse a feed body.
    ///
    /// A body that is not JSON, or JSON without a job array, is an error.
    /// Individual malformed items are skipped.
    pub fn parse(&self, body: &str) -> Result<Vec<RawJob>> {
        let value: Value = serde_json::from_str(body)?;
        let items = job_array(&value)?;

        let mut jobs = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            if index == 0 && is_metadata(item) {
                log::debug!("Skipping feed metadata element");
                continue;
            }
            match item.as_object() {
                Some(object) => jobs.push(self.extract_item(object)),
                None => log::warn!("Skipping non-object feed item at index {index}"),
            }
        }
        Ok(jobs)
    }

    fn extract_item(&self, item: &Object) -> RawJob {
        RawJob {
            title: string_field(item, &["position", "title"]),
            company: string_field(item, &["company", "company_name"]),
            url: self.item_url(item),
            location: string_field(item, &["location"]),
            tags: tags_field(item.get("tags")),
            logo: string_field(item, &["company_logo", "logo"])
                .and_then(|logo| resolve_url(&self.base, &logo)),
            date_posted: date_field(item),
            salary_min: salary_field(item.get("salary_min")),
            salary_max: salary_field(item.get("salary_max")),
            description_html: None,
            description_text: string_field(item, &["description"]).and_then(|d| html_to_text(&d)),
            ..RawJob::new(RowOrigin::Api)
        }
    }

    /// Explicit URL first, then a detail path composed from slug or id.
    fn item_url(&self, item: &Object) -> Option<String> {
        string_field(item, &["url", "apply_url"])
            .and_then(|url| resolve_url(&self.base, &url))
            .or_else(|| {
                ["slug", "id"]
                    .iter()
                    .filter_map(|key| item.get(*key).and_then(scalar_text))
                    .find_map(|id| compose_detail_url(&self.base, &self.detail_path, &id))
            })
    }
}

fn job_array(value: &Value) -> Result<&Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(object) => ["jobs", "data"]
            .iter()
            .find_map(|key| object.get(*key).and_then(Value::as_array))
            .ok_or_else(|| AppError::payload("JSON object carries no job array")),
        other => Err(AppError::payload(format!(
            "expected a JSON array of jobs, got {}",
            kind_name(other)
        ))),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Leading element describing the feed rather than a job.
fn is_metadata(item: &Value) -> bool {
    let Some(object) = item.as_object() else {
        return true;
    };
    if METADATA_KEYS.iter().any(|key| object.contains_key(*key)) {
        return true;
    }
    let has_title = string_field(object, &["position", "title"]).is_some();
    let has_company = string_field(object, &["company", "company_name"]).is_some();
    !has_title && !has_company
}

/// First non-empty string (or number) among the keys.
fn string_field(item: &Object, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| item.get(*key).and_then(scalar_text))
        .find(|v| !v.is_empty())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Tags arrive as an array or a comma-separated string.
fn tags_field(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(scalar_text)
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn date_field(item: &Object) -> Option<String> {
    if let Some(date) = item.get("date").and_then(scalar_text) {
        return normalize_timestamp(&date);
    }
    match item.get("epoch")? {
        Value::Number(n) => n.as_i64().and_then(epoch_to_iso),
        Value::String(s) => normalize_timestamp(s),
        _ => None,
    }
}

/// Salary bound; zero and negatives mean unknown.
fn salary_field(value: Option<&Value>) -> Option<u64> {
    let amount = match value? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
        Value::String(s) => s.trim().replace(',', "").parse::<u64>().ok(),
        _ => None,
    }?;
    (amount > 0).then_some(amount)
}

/// Strip markup from a description fragment.
fn html_to_text(html: &str) -> Option<String> {
    let fragment = Html::parse_fragment(html);
    let text = clean_text(&fragment.root_element().text().collect::<String>());
    Some(text).filter(|t| !t.is_empty())
}
