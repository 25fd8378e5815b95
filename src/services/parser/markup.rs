// src/services/parser/markup.rs

//! Listing markup extraction.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{RawJob, RowOrigin, RowSelectors, SourceConfig};
use crate::utils::dates::normalize_timestamp;
use crate::utils::url::{compose_detail_url, extract_script_url};
use crate::utils::{clean_text, resolve_url};

/// One way of pulling a value out of a row.
#[derive(Debug)]
enum Extract {
    /// Text of the first matching descendant
    Text(Selector),
    /// Attribute of the first matching descendant that carries it
    Attr(Selector, String),
    /// Attribute of the row itself
    RowAttr(String),
}

impl Extract {
    fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        if let Some(attr) = spec.strip_prefix('@') {
            return Ok(Extract::RowAttr(attr.to_string()));
        }
        match spec.rsplit_once('@') {
            Some((css, attr)) if is_attr_name(attr) => {
                Ok(Extract::Attr(parse_selector(css)?, attr.to_string()))
            }
            _ => Ok(Extract::Text(parse_selector(spec)?)),
        }
    }

    fn apply(&self, row: &ElementRef) -> Option<String> {
        let value = match self {
            Extract::Text(sel) => row
                .select(sel)
                .map(|el| clean_text(&el.text().collect::<String>()))
                .find(|text| !text.is_empty()),
            Extract::Attr(sel, attr) => row
                .select(sel)
                .filter_map(|el| el.value().attr(attr))
                .map(str::trim)
                .find(|v| !v.is_empty())
                .map(str::to_string),
            Extract::RowAttr(attr) => row.value().attr(attr).map(|v| v.trim().to_string()),
        };
        value.filter(|v| !v.is_empty())
    }
}

fn is_attr_name(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Ordered extraction strategies for one field; the first non-empty result wins.
#[derive(Debug)]
struct FieldChain {
    strategies: Vec<Extract>,
}

impl FieldChain {
    fn compile(specs: &[String]) -> Result<Self> {
        let strategies = specs
            .iter()
            .map(|s| Extract::parse(s))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { strategies })
    }

    fn first(&self, row: &ElementRef) -> Option<String> {
        self.first_map(row, |v| Some(v.to_string()))
    }

    /// First strategy whose value survives `map`.
    fn first_map<T>(&self, row: &ElementRef, map: impl Fn(&str) -> Option<T>) -> Option<T> {
        self.strategies
            .iter()
            .filter_map(|s| s.apply(row))
            .find_map(|v| map(&v))
    }
}

/// Extracts raw job rows from a listing document.
#[derive(Debug)]
pub struct MarkupParser {
    rows: Vec<Selector>,
    fallback_rows: Vec<Selector>,
    header_cell: Selector,
    ad_classes: Vec<String>,
    header_classes: Vec<String>,
    title: FieldChain,
    company: FieldChain,
    location: FieldChain,
    tags: Vec<Selector>,
    logo: FieldChain,
    date: FieldChain,
    description: Vec<Selector>,
    link: FieldChain,
    id_attrs: Vec<String>,
    script_attrs: Vec<String>,
    base: Url,
    detail_path: String,
}

impl MarkupParser {
    /// Compile the configured selector chains.
    pub fn new(selectors: &RowSelectors, source: &SourceConfig) -> Result<Self> {
        Ok(Self {
            rows: parse_selectors(&selectors.rows)?,
            fallback_rows: parse_selectors(&selectors.fallback_rows)?,
            header_cell: parse_selector("th")?,
            ad_classes: lowercase(&selectors.ad_classes),
            header_classes: lowercase(&selectors.header_classes),
            title: FieldChain::compile(&selectors.title)?,
            company: FieldChain::compile(&selectors.company)?,
            location: FieldChain::compile(&selectors.location)?,
            tags: parse_selectors(&selectors.tags)?,
            logo: FieldChain::compile(&selectors.logo)?,
            date: FieldChain::compile(&selectors.date)?,
            description: parse_selectors(&selectors.description)?,
            link: FieldChain::compile(&selectors.link)?,
            id_attrs: selectors.id_attrs.clone(),
            script_attrs: selectors.script_attrs.clone(),
            base: Url::parse(&source.base_url)?,
            detail_path: source.detail_path.clone(),
        })
    }

    /// Parse one document into raw rows.
    ///
    /// Falls back to the looser row selectors when the strict pass finds no
    /// row with both a title and a URL.
    pub fn parse(&self, html: &str) -> Vec<RawJob> {
        let document = Html::parse_document(html);

        let rows = self.extract_rows(&document, &self.rows);
        if rows.iter().any(is_usable) {
            return rows;
        }

        let fallback = self.extract_rows(&document, &self.fallback_rows);
        if fallback.iter().any(is_usable) {
            log::info!(
                "Strict row selectors found nothing usable; lowered-confidence pass recovered {} row(s)",
                fallback.len()
            );
            return fallback;
        }
        rows
    }

    fn extract_rows(&self, document: &Html, selectors: &[Selector]) -> Vec<RawJob> {
        let mut visited = HashSet::new();
        let mut jobs = Vec::new();

        for selector in selectors {
            for row in document.select(selector) {
                if !visited.insert(row.id()) {
                    continue;
                }
                if self.is_skipped(&row) {
                    continue;
                }
                match self.extract_row(&row) {
                    Some(job) => jobs.push(job),
                    None => log::debug!("Dropping row without title or link"),
                }
            }
        }
        jobs
    }

    /// Advertisement and header rows never become jobs.
    fn is_skipped(&self, row: &ElementRef) -> bool {
        let marked = row.value().classes().any(|class| {
            let class = class.to_lowercase();
            let matches = |known: &String| {
                class == *known
                    || class.starts_with(&format!("{known}-"))
                    || class.starts_with(&format!("{known}_"))
            };
            self.ad_classes.iter().any(matches) || self.header_classes.iter().any(matches)
        });
        marked || row.select(&self.header_cell).next().is_some()
    }

    fn extract_row(&self, row: &ElementRef) -> Option<RawJob> {
        let title = self.title.first(row);
        let url = self.resolve_link(row);
        if title.is_none() && url.is_none() {
            return None;
        }

        let (description_html, description_text) = self.description(row);

        Some(RawJob {
            title,
            company: self.company.first(row),
            url,
            location: self.location.first(row),
            tags: self.tags(row),
            logo: self.logo.first_map(row, |v| resolve_url(&self.base, v)),
            date_posted: self.date.first_map(row, normalize_timestamp),
            description_html,
            description_text,
            ..RawJob::new(RowOrigin::Markup)
        })
    }

    /// Direct anchor, then composed id/slug path, then scripted navigation.
    fn resolve_link(&self, row: &ElementRef) -> Option<String> {
        self.link
            .first_map(row, |href| resolve_url(&self.base, href))
            .or_else(|| {
                self.id_attrs
                    .iter()
                    .filter_map(|attr| row.value().attr(attr))
                    .find_map(|id| compose_detail_url(&self.base, &self.detail_path, id))
            })
            .or_else(|| {
                self.script_attrs
                    .iter()
                    .filter_map(|attr| row.value().attr(attr))
                    .filter_map(extract_script_url)
                    .find_map(|target| resolve_url(&self.base, &target))
            })
    }

    fn tags(&self, row: &ElementRef) -> Vec<String> {
        self.tags
            .iter()
            .map(|sel| {
                row.select(sel)
                    .map(|el| clean_text(&el.text().collect::<String>()))
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
            })
            .find(|tags| !tags.is_empty())
            .unwrap_or_default()
    }

    fn description(&self, row: &ElementRef) -> (Option<String>, Option<String>) {
        let Some(element) = self
            .description
            .iter()
            .find_map(|sel| row.select(sel).next())
        else {
            return (None, None);
        };

        let html = element.inner_html().trim().to_string();
        let text = clean_text(&element.text().collect::<String>());
        (
            Some(html).filter(|h| !h.is_empty()),
            Some(text).filter(|t| !t.is_empty()),
        )
    }
}

fn is_usable(job: &RawJob) -> bool {
    job.title.is_some() && job.url.is_some()
}

fn lowercase(items: &[String]) -> Vec<String> {
    items.iter().map(|s| s.trim().to_lowercase()).collect()
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

fn parse_selectors(specs: &[String]) -> Result<Vec<Selector>> {
    specs.iter().map(|s| parse_selector(s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> MarkupParser {
        MarkupParser::new(&RowSelectors::default(), &SourceConfig::default()).unwrap()
    }

    fn job_row(id: &str, title: &str, company: &str) -> String {
        format!(
            r#"<tr class="job" data-id="{id}">
                <td class="company position company_and_position">
                    <a class="preventLink" href="/remote-jobs/{id}">
                        <h2 itemprop="title">{title}</h2>
                    </a>
                    <span itemprop="hiringOrganization"><h3 itemprop="name">{company}</h3></span>
                    <div class="location">Europe</div>
                </td>
                <td class="tags"><div class="tags">
                    <a class="tag"><h3>Rust</h3></a>
                    <a class="tag"><h3>Full Time</h3></a>
                </div></td>
                <td><img class="logo" data-src="/assets/{id}.png" src="/blank.gif"></td>
                <td class="time"><time datetime="2024-05-01T10:00:00+00:00">2d</time></td>
                <td><div class="description"><p>Build <b>fast</b> things</p></div></td>
            </tr>"#
        )
    }

    fn document(rows: &[String]) -> String {
        format!("<html><body><table id=\"jobsboard\">{}</table></body></html>", rows.join("\n"))
    }

    #[test]
    fn test_parse_selector_valid() {
        assert!(parse_selector("tr.job").is_ok());
        assert!(parse_selector("tr:has(h2)").is_ok());
    }

    #[test]
    fn test_parse_selector_invalid() {
        assert!(parse_selector("[[invalid").is_err());
    }

    #[test]
    fn test_extract_spec_forms() {
        assert!(matches!(Extract::parse("@data-id").unwrap(), Extract::RowAttr(a) if a == "data-id"));
        assert!(matches!(Extract::parse("img.logo@data-src").unwrap(), Extract::Attr(_, a) if a == "data-src"));
        assert!(matches!(Extract::parse("h2[itemprop=\"title\"]").unwrap(), Extract::Text(_)));
    }

    #[test]
    fn test_parse_full_row() {
        let html = document(&[job_row("101", "Senior Rust Engineer", "Acme")]);
        let rows = parser().parse(&html);
        assert_eq!(rows.len(), 1);

        let row = &rows[0];
        assert_eq!(row.origin, RowOrigin::Markup);
        assert_eq!(row.title.as_deref(), Some("Senior Rust Engineer"));
        assert_eq!(row.company.as_deref(), Some("Acme"));
        assert_eq!(row.url.as_deref(), Some("https://remoteok.com/remote-jobs/101"));
        assert_eq!(row.location.as_deref(), Some("Europe"));
        assert_eq!(row.tags, vec!["Rust", "Full Time"]);
        assert_eq!(row.logo.as_deref(), Some("https://remoteok.com/assets/101.png"));
        assert_eq!(row.date_posted.as_deref(), Some("2024-05-01T10:00:00+00:00"));
        assert_eq!(row.description_text.as_deref(), Some("Build fast things"));
        assert!(row.description_html.as_deref().unwrap().contains("<b>fast</b>"));
    }

    #[test]
    fn test_skips_ad_and_header_rows() {
        let html = document(&[
            "<tr class=\"header\"><th>Jobs</th></tr>".to_string(),
            job_row("1", "Backend Developer", "Acme"),
            r#"<tr class="job ad"><td><a class="preventLink" href="/ad"><h2 itemprop="title">Sponsored</h2></a><h3 itemprop="name">AdCo</h3></td></tr>"#.to_string(),
            job_row("2", "Frontend Developer", "Globex"),
        ]);
        let rows = parser().parse(&html);
        let titles: Vec<_> = rows.iter().filter_map(|r| r.title.as_deref()).collect();
        assert_eq!(titles, vec!["Backend Developer", "Frontend Developer"]);
    }

    #[test]
    fn test_class_substring_is_not_an_ad() {
        let html = document(&[job_row("7", "Head of Data", "Shadow Inc")
            .replace("class=\"job\"", "class=\"job shadowed\"")]);
        assert_eq!(parser().parse(&html).len(), 1);
    }

    #[test]
    fn test_title_fallback_chain() {
        let html = document(&[r#"<tr class="job" data-id="5">
            <td class="company"><h2> Data   Engineer </h2><h3>Initech</h3></td>
        </tr>"#
            .to_string()]);
        let rows = parser().parse(&html);
        assert_eq!(rows[0].title.as_deref(), Some("Data Engineer"));
        assert_eq!(rows[0].company.as_deref(), Some("Initech"));
        assert_eq!(rows[0].url.as_deref(), Some("https://remoteok.com/remote-jobs/5"));
        assert!(rows[0].tags.is_empty());
        assert_eq!(rows[0].location, None);
    }

    #[test]
    fn test_link_from_script_navigation() {
        let html = document(&[r##"<tr class="job" onclick="window.location='/remote-jobs/ops-77'">
            <td><h2 itemprop="title">SRE</h2><h3 itemprop="name">Hooli</h3>
            <a class="preventLink" href="#">x</a></td>
        </tr>"##
            .to_string()]);
        let rows = parser().parse(&html);
        assert_eq!(rows[0].url.as_deref(), Some("https://remoteok.com/remote-jobs/ops-77"));
    }

    #[test]
    fn test_epoch_timestamp_is_normalized() {
        let html = document(&[r#"<tr class="job" data-id="9" data-epoch="1704067200">
            <td><h2 itemprop="title">QA</h2><h3 itemprop="name">Vandelay</h3></td>
        </tr>"#
            .to_string()]);
        let rows = parser().parse(&html);
        assert_eq!(rows[0].date_posted.as_deref(), Some("2024-01-01T00:00:00Z"));
    }

    #[test]
    fn test_rows_without_title_or_link_are_dropped() {
        let html = document(&[
            "<tr class=\"job\"><td>decoration</td></tr>".to_string(),
            job_row("3", "Designer", "Umbrella"),
        ]);
        assert_eq!(parser().parse(&html).len(), 1);
    }

    #[test]
    fn test_lowered_confidence_pass() {
        let html = document(&[r#"<tr data-id="88" class="posting">
            <td><h2 itemprop="title">Platform Engineer</h2><h3 itemprop="name">Stark</h3></td>
        </tr>"#
            .to_string()]);
        let rows = parser().parse(&html);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].url.as_deref(), Some("https://remoteok.com/remote-jobs/88"));
    }

    #[test]
    fn test_empty_document_yields_nothing() {
        assert!(parser().parse("<html><body><p>No jobs</p></body></html>").is_empty());
    }
}
