//! HTML for CMS block content.
//!
//! Pre-rendered HTML from the CMS always wins and is emitted as-is. Without
//! it, each block is rendered from its typed shape; unknown block types are
//! dropped in production and dumped for inspection in development.

use askama::Template;
use cmsfront_types::Block;
use tracing::warn;

use crate::config::SiteEnvironment;
use crate::domain::blocks::{
    CallToActionBlock, ContentBlock, FeaturesBlock, HeroBlock, RichTextBlock, StatsBlock,
};

#[derive(Template)]
#[template(path = "blocks/content.html")]
struct BlockContentTemplate<'a> {
    inner: &'a str,
}

#[derive(Template)]
#[template(path = "blocks/hero.html")]
struct HeroTemplate<'a> {
    block: &'a HeroBlock,
}

#[derive(Template)]
#[template(path = "blocks/features.html")]
struct FeaturesTemplate<'a> {
    block: &'a FeaturesBlock,
}

#[derive(Template)]
#[template(path = "blocks/stats.html")]
struct StatsTemplate<'a> {
    block: &'a StatsBlock,
}

#[derive(Template)]
#[template(path = "blocks/cta.html")]
struct CallToActionTemplate<'a> {
    block: &'a CallToActionBlock,
}

#[derive(Template)]
#[template(path = "blocks/rich_text.html")]
struct RichTextTemplate<'a> {
    /// Already passed through the sanitizer.
    html: Option<String>,
    content: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "blocks/unknown.html")]
struct UnknownTemplate<'a> {
    type_tag: &'a str,
    dump: String,
}

#[derive(Debug, Clone, Copy)]
pub struct BlockRenderer {
    mode: SiteEnvironment,
}

impl BlockRenderer {
    pub fn new(mode: SiteEnvironment) -> Self {
        Self { mode }
    }

    /// `None` means there is nothing to render.
    pub fn render(&self, rendered_html: Option<&str>, blocks: &[Block]) -> Option<String> {
        if let Some(html) = rendered_html.filter(|html| !html.is_empty()) {
            return wrap(html);
        }
        if blocks.is_empty() {
            return None;
        }

        let inner: String = blocks
            .iter()
            .filter_map(|block| self.render_block(&ContentBlock::from(block)))
            .collect();
        if inner.is_empty() {
            return None;
        }
        wrap(&inner)
    }

    fn render_block(&self, block: &ContentBlock) -> Option<String> {
        let rendered = match block {
            ContentBlock::Hero(block) => HeroTemplate { block }.render(),
            ContentBlock::Features(block) => FeaturesTemplate { block }.render(),
            ContentBlock::Stats(block) => StatsTemplate { block }.render(),
            ContentBlock::CallToAction(block) => CallToActionTemplate { block }.render(),
            ContentBlock::RichText(RichTextBlock { html, content }) => RichTextTemplate {
                html: html.as_deref().map(ammonia::clean),
                content: content.as_deref(),
            }
            .render(),
            ContentBlock::Unknown { type_tag, data } => {
                if !self.mode.is_development() {
                    return None;
                }
                UnknownTemplate {
                    type_tag,
                    dump: serde_json::to_string_pretty(data).unwrap_or_default(),
                }
                .render()
            }
        };

        rendered
            .map_err(|err| warn!(block = block.type_tag(), error = %err, "block render failed"))
            .ok()
    }
}

fn wrap(inner: &str) -> Option<String> {
    BlockContentTemplate { inner }
        .render()
        .map_err(|err| warn!(error = %err, "block wrapper render failed"))
        .ok()
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    fn block(type_tag: &str, data: Value) -> Block {
        Block {
            id: format!("{type_tag}-1"),
            type_tag: type_tag.to_string(),
            data: data.as_object().cloned().unwrap_or_default(),
        }
    }

    fn production() -> BlockRenderer {
        BlockRenderer::new(SiteEnvironment::Production)
    }

    #[test]
    fn rendered_html_wins_over_blocks() {
        let html = production()
            .render(
                Some("<p>from cms</p>"),
                &[block("hero/v1", json!({"title": "Ignored"}))],
            )
            .expect("html");
        assert!(html.contains("<p>from cms</p>"));
        assert!(!html.contains("Ignored"));
        assert!(html.starts_with("<div class=\"block-content\">"));
    }

    #[test]
    fn nothing_to_render() {
        assert!(production().render(None, &[]).is_none());
        assert!(production().render(Some(""), &[]).is_none());
    }

    #[test]
    fn block_text_is_escaped() {
        let html = production()
            .render(None, &[block("hero/v1", json!({"title": "<script>x</script>"}))])
            .expect("html");
        assert!(html.contains("&#60;script&#62;x&#60;/script&#62;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn rich_text_html_is_sanitized() {
        let html = production()
            .render(
                None,
                &[block(
                    "rich-text/v1",
                    json!({"html": "<p onclick=\"steal()\">Hi</p><script>bad()</script>"}),
                )],
            )
            .expect("html");
        assert!(html.contains("<p>Hi</p>"));
        assert!(!html.contains("onclick"));
        assert!(!html.contains("bad()"));
    }

    #[test]
    fn unknown_blocks_depend_on_mode() {
        let blocks = [
            block("gallery/v2", json!({"caption": "<b>"})),
            block("cta/v1", json!({"title": "Talk to us"})),
        ];

        let html = production().render(None, &blocks).expect("html");
        assert!(!html.contains("gallery/v2"));
        assert!(html.contains("Talk to us"));

        let html = BlockRenderer::new(SiteEnvironment::Development)
            .render(None, &blocks)
            .expect("html");
        assert!(html.contains("Unknown block type: gallery/v2"));
        assert!(html.contains("&#60;b&#62;"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn only_unknown_blocks_render_nothing_in_production() {
        let blocks = [block("gallery/v2", json!({"caption": "x"}))];
        assert!(production().render(None, &blocks).is_none());
        assert!(
            BlockRenderer::new(SiteEnvironment::Development)
                .render(None, &blocks)
                .is_some()
        );
    }
}
