// src/services/parser/mod.rs

//! Dual-format row extraction.

pub mod api;
pub mod markup;

pub use api::ApiParser;
pub use markup::MarkupParser;

use crate::error::Result;
use crate::models::{Config, RawJob};
use crate::services::transport::PayloadKind;

/// A fetched body tagged with the format it was requested as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Markup(String),
    Api(String),
}

impl Payload {
    pub fn new(kind: PayloadKind, body: String) -> Self {
        match kind {
            PayloadKind::Markup => Payload::Markup(body),
            PayloadKind::Api => Payload::Api(body),
        }
    }
}

/// Routes payloads to the matching extractor.
#[derive(Debug)]
pub struct Parser {
    markup: MarkupParser,
    api: ApiParser,
}

impl Parser {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            markup: MarkupParser::new(&config.selectors, &config.source)?,
            api: ApiParser::new(&config.source)?,
        })
    }

    /// Extract raw rows. Markup never fails; an undecodable API body does.
    pub fn parse(&self, payload: &Payload) -> Result<Vec<RawJob>> {
        match payload {
            Payload::Markup(html) => Ok(self.markup.parse(html)),
            Payload::Api(body) => self.api.parse(body),
        }
    }
}
