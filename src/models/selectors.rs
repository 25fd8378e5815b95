// src/models/selectors.rs

//! CSS selector chains for scraping the job listing markup.
//!
//! Every field is an ordered list of strategies, most specific first.
//! A strategy is written as one of:
//!
//! - `css`: trimmed text of the first element matching `css`
//! - `css@attr`: attribute `attr` of the first element matching `css`
//! - `@attr`: attribute `attr` of the row element itself

use serde::{Deserialize, Serialize};

/// Selectors for the job listing table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowSelectors {
    /// Selectors for job rows (strict pass)
    #[serde(default = "defaults::rows")]
    pub rows: Vec<String>,

    /// Looser row selectors used when the strict pass yields nothing
    #[serde(default = "defaults::fallback_rows")]
    pub fallback_rows: Vec<String>,

    /// Row class tokens that mark advertisement rows
    #[serde(default = "defaults::ad_classes")]
    pub ad_classes: Vec<String>,

    /// Row class tokens that mark header rows
    #[serde(default = "defaults::header_classes")]
    pub header_classes: Vec<String>,

    #[serde(default = "defaults::title")]
    pub title: Vec<String>,

    #[serde(default = "defaults::company")]
    pub company: Vec<String>,

    #[serde(default = "defaults::location")]
    pub location: Vec<String>,

    /// Each selector matches every tag element of the row
    #[serde(default = "defaults::tags")]
    pub tags: Vec<String>,

    #[serde(default = "defaults::logo")]
    pub logo: Vec<String>,

    #[serde(default = "defaults::date")]
    pub date: Vec<String>,

    /// Selectors for the description element (inner HTML and text are both kept)
    #[serde(default = "defaults::description")]
    pub description: Vec<String>,

    /// Direct link strategies, tried before id-based composition
    #[serde(default = "defaults::link")]
    pub link: Vec<String>,

    /// Row attributes holding a job id or slug
    #[serde(default = "defaults::id_attrs")]
    pub id_attrs: Vec<String>,

    /// Row attributes holding scripted navigation
    #[serde(default = "defaults::script_attrs")]
    pub script_attrs: Vec<String>,
}

impl Default for RowSelectors {
    fn default() -> Self {
        Self {
            rows: defaults::rows(),
            fallback_rows: defaults::fallback_rows(),
            ad_classes: defaults::ad_classes(),
            header_classes: defaults::header_classes(),
            title: defaults::title(),
            company: defaults::company(),
            location: defaults::location(),
            tags: defaults::tags(),
            logo: defaults::logo(),
            date: defaults::date(),
            description: defaults::description(),
            link: defaults::link(),
            id_attrs: defaults::id_attrs(),
            script_attrs: defaults::script_attrs(),
        }
    }
}

mod defaults {
    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    pub fn rows() -> Vec<String> {
        list(&["tr.job"])
    }
    pub fn fallback_rows() -> Vec<String> {
        list(&[
            "tr[data-id]",
            "tr:has([itemprop=\"title\"])",
            "tr:has(h2)",
        ])
    }
    pub fn ad_classes() -> Vec<String> {
        list(&["ad", "advertisement", "sponsored"])
    }
    pub fn header_classes() -> Vec<String> {
        list(&["header", "heading"])
    }
    pub fn title() -> Vec<String> {
        list(&[
            "h2[itemprop=\"title\"]",
            "[itemprop=\"title\"]",
            "td.company h2",
            "a.preventLink h2",
            "h2",
            "@data-position",
        ])
    }
    pub fn company() -> Vec<String> {
        list(&[
            "h3[itemprop=\"name\"]",
            "[itemprop=\"hiringOrganization\"] [itemprop=\"name\"]",
            "td.company h3",
            "h3",
            "@data-company",
        ])
    }
    pub fn location() -> Vec<String> {
        list(&[
            ".location",
            "[itemprop=\"jobLocation\"]",
            "[itemprop=\"addressLocality\"]",
            "@data-location",
        ])
    }
    pub fn tags() -> Vec<String> {
        list(&[".tags .tag", "td.tags h3", ".tag"])
    }
    pub fn logo() -> Vec<String> {
        list(&[
            "img.logo@data-src",
            "img.logo@src",
            "img[itemprop=\"image\"]@src",
            "@data-logo",
        ])
    }
    pub fn date() -> Vec<String> {
        list(&[
            "time@datetime",
            "td.time time@datetime",
            "[itemprop=\"datePosted\"]@content",
            "@data-epoch",
        ])
    }
    pub fn description() -> Vec<String> {
        list(&[".description", ".expandContents", ".markdown"])
    }
    pub fn link() -> Vec<String> {
        list(&[
            "a.preventLink@href",
            "a[itemprop=\"url\"]@href",
            "td.company a@href",
            "@data-url",
            "@data-href",
        ])
    }
    pub fn id_attrs() -> Vec<String> {
        list(&["data-slug", "data-id"])
    }
    pub fn script_attrs() -> Vec<String> {
        list(&["onclick", "data-onclick"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chains_are_populated() {
        let selectors = RowSelectors::default();
        assert_eq!(selectors.rows, vec!["tr.job"]);
        assert_eq!(selectors.title[0], "h2[itemprop=\"title\"]");
        assert!(!selectors.link.is_empty());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let selectors: RowSelectors = toml::from_str("rows = [\"tr.posting\"]").unwrap();
        assert_eq!(selectors.rows, vec!["tr.posting"]);
        assert_eq!(selectors.company, RowSelectors::default().company);
    }
}
