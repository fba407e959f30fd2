//! Typed view over the loosely structured block documents a page carries.

use cmsfront_types::Block;
use serde_json::{Map, Value};

pub const HERO_V1: &str = "hero/v1";
pub const FEATURES_V1: &str = "features/v1";
pub const STATS_V1: &str = "stats/v1";
pub const CTA_V1: &str = "cta/v1";
pub const RICH_TEXT_V1: &str = "rich-text/v1";

#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Hero(HeroBlock),
    Features(FeaturesBlock),
    Stats(StatsBlock),
    CallToAction(CallToActionBlock),
    RichText(RichTextBlock),
    Unknown {
        type_tag: String,
        data: Map<String, Value>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeroBlock {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeaturesBlock {
    pub title: Option<String>,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feature {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsBlock {
    pub stats: Vec<Stat>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stat {
    pub value: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallToActionBlock {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RichTextBlock {
    pub html: Option<String>,
    pub content: Option<String>,
}

impl ContentBlock {
    pub fn type_tag(&self) -> &str {
        match self {
            ContentBlock::Hero(_) => HERO_V1,
            ContentBlock::Features(_) => FEATURES_V1,
            ContentBlock::Stats(_) => STATS_V1,
            ContentBlock::CallToAction(_) => CTA_V1,
            ContentBlock::RichText(_) => RICH_TEXT_V1,
            ContentBlock::Unknown { type_tag, .. } => type_tag,
        }
    }
}

impl From<&Block> for ContentBlock {
    fn from(block: &Block) -> Self {
        let data = &block.data;
        match block.type_tag.as_str() {
            HERO_V1 => ContentBlock::Hero(HeroBlock {
                title: text(data, "title"),
                subtitle: text(data, "subtitle"),
                description: text(data, "description"),
            }),
            FEATURES_V1 => ContentBlock::Features(FeaturesBlock {
                title: text(data, "title"),
                features: entries(data, "features")
                    .map(|entry| Feature {
                        title: text(entry, "title"),
                        description: text(entry, "description"),
                    })
                    .collect(),
            }),
            STATS_V1 => ContentBlock::Stats(StatsBlock {
                stats: entries(data, "stats")
                    .map(|entry| Stat {
                        value: text(entry, "value"),
                        label: text(entry, "label"),
                    })
                    .collect(),
            }),
            CTA_V1 => ContentBlock::CallToAction(CallToActionBlock {
                title: text(data, "title"),
                description: text(data, "description"),
            }),
            RICH_TEXT_V1 => ContentBlock::RichText(RichTextBlock {
                html: text(data, "html"),
                content: text(data, "content"),
            }),
            other => ContentBlock::Unknown {
                type_tag: other.to_string(),
                data: data.clone(),
            },
        }
    }
}

/// Textual field value. Numbers and booleans are stringified; empty strings
/// and other shapes count as absent.
fn text(data: &Map<String, Value>, key: &str) -> Option<String> {
    match data.get(key)? {
        Value::String(value) if !value.is_empty() => Some(value.clone()),
        Value::Number(value) => Some(value.to_string()),
        Value::Bool(value) => Some(value.to_string()),
        _ => None,
    }
}

fn entries<'a>(
    data: &'a Map<String, Value>,
    key: &str,
) -> impl Iterator<Item = &'a Map<String, Value>> {
    data.get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}
