//! Bundled content served when neither the KV snapshot nor the CMS answers.

use async_trait::async_trait;
use cmsfront_types::{
    Block, Collection, CollectionItem, CollectionItemSummary, ContentStatus, NavigationItem, Page,
    PageSummary, Seo,
};
use serde_json::{Map, Value, json};
use time::{OffsetDateTime, macros::datetime};

use crate::application::sources::{ContentOrigin, ContentSource};
use crate::domain::blocks::{CTA_V1, FEATURES_V1, HERO_V1, RICH_TEXT_V1, STATS_V1};
use crate::domain::routes::{HOME_SLUG, PERSPECTIVES, SOLUTIONS, page_path};

const PUBLISHED: OffsetDateTime = datetime!(2024-01-01 00:00 UTC);

pub struct StaticSource {
    pages: Vec<Page>,
    collections: Vec<(Collection, Vec<CollectionItem>)>,
    navigation: Vec<NavigationItem>,
}

impl StaticSource {
    pub fn new(site_name: &str, locale: &str) -> Self {
        Self {
            pages: vec![
                home_page(locale),
                about_page(site_name, locale),
                capabilities_page(locale),
                docs_page(site_name, locale),
                contact_page(locale),
            ],
            collections: vec![perspectives(locale), solutions(locale)],
            navigation: default_navigation(),
        }
    }

    fn find_collection(&self, slug: &str) -> Option<&(Collection, Vec<CollectionItem>)> {
        self.collections
            .iter()
            .find(|(collection, _)| collection.slug == slug)
    }
}

#[async_trait]
impl ContentSource for StaticSource {
    fn origin(&self) -> ContentOrigin {
        ContentOrigin::Static
    }

    async fn page(&self, slug: &str, _locale: &str) -> Option<Page> {
        self.pages.iter().find(|page| page.slug == slug).cloned()
    }

    async fn pages(&self) -> Vec<PageSummary> {
        self.pages.iter().cloned().map(PageSummary::from).collect()
    }

    async fn navigation(&self) -> Vec<NavigationItem> {
        self.navigation.clone()
    }

    async fn collection(&self, slug: &str) -> Option<Collection> {
        self.find_collection(slug)
            .map(|(collection, _)| collection.clone())
    }

    async fn collection_items(&self, collection: &str) -> Vec<CollectionItemSummary> {
        self.find_collection(collection)
            .map(|(_, items)| {
                items
                    .iter()
                    .cloned()
                    .map(CollectionItemSummary::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn collection_item(&self, collection: &str, item: &str) -> Option<CollectionItem> {
        self.find_collection(collection)
            .and_then(|(_, items)| items.iter().find(|entry| entry.slug == item))
            .cloned()
    }
}

pub fn default_navigation() -> Vec<NavigationItem> {
    [
        (HOME_SLUG, "Home"),
        ("capabilities", "Features"),
        ("docs", "Docs"),
        ("contact", "Contact"),
    ]
    .into_iter()
    .map(|(slug, title)| NavigationItem {
        id: format!("static-nav-{slug}"),
        slug: slug.to_string(),
        title: title.to_string(),
        path: page_path(slug),
        depth: 0,
        children: Vec::new(),
    })
    .collect()
}

fn page(slug: &str, title: &str, description: &str, locale: &str, blocks: Vec<Block>) -> Page {
    Page {
        id: format!("static-page-{slug}"),
        slug: slug.to_string(),
        title: title.to_string(),
        status: ContentStatus::Published,
        locale: locale.to_string(),
        path: Some(page_path(slug)),
        parent_id: None,
        depth: Some(0),
        content: None,
        html: None,
        blocks,
        rendered_html: None,
        seo: Some(Seo {
            title: Some(title.to_string()),
            description: Some(description.to_string()),
            image: None,
        }),
        metadata: Map::new(),
        sort_index: None,
        created_at: Some(PUBLISHED),
        updated_at: Some(PUBLISHED),
        published_at: Some(PUBLISHED),
    }
}

fn block(id: &str, type_tag: &str, data: Value) -> Block {
    Block {
        id: id.to_string(),
        type_tag: type_tag.to_string(),
        data: match data {
            Value::Object(map) => map,
            _ => Map::new(),
        },
    }
}

fn home_page(locale: &str) -> Page {
    page(
        HOME_SLUG,
        "Content Management, Simplified",
        "A powerful headless CMS built for modern teams.",
        locale,
        vec![
            block(
                "home-hero",
                HERO_V1,
                json!({
                    "subtitle": "Modern Headless CMS",
                    "title": "Content Management, Simplified",
                    "description": "A powerful headless CMS built for modern teams. Manage content across multiple sites with AI-powered editing, real-time collaboration, and seamless API delivery."
                }),
            ),
            block(
                "home-features",
                FEATURES_V1,
                json!({
                    "title": "Everything You Need",
                    "features": [
                        {"title": "AI-Powered Editor", "description": "Write faster with AI assistance. Generate content, improve copy, and translate text with built-in AI tools."},
                        {"title": "Multi-Site Management", "description": "Manage content for multiple websites from a single dashboard. Share collections across sites or keep them separate."},
                        {"title": "Headless API", "description": "Deliver content anywhere via our REST API. Built for any frontend framework."},
                        {"title": "Real-Time Preview", "description": "See changes instantly with live preview. Edit content and watch it update on your site in real-time."},
                        {"title": "Flexible Collections", "description": "Create custom content types with flexible schemas. Blog posts, products, team members: define any structure."},
                        {"title": "Media Management", "description": "Upload, organize, and optimize images and files. Automatic resizing and CDN delivery included."}
                    ]
                }),
            ),
            block(
                "home-stats",
                STATS_V1,
                json!({
                    "stats": [
                        {"value": "<50ms", "label": "API Response Time"},
                        {"value": "99.9%", "label": "Uptime SLA"},
                        {"value": "10+", "label": "Supported Locales"},
                        {"value": "Unlimited", "label": "API Requests"}
                    ]
                }),
            ),
            block(
                "home-cta",
                CTA_V1,
                json!({
                    "title": "Ready to Transform Your Content?",
                    "description": "Join teams who are already managing their content smarter."
                }),
            ),
        ],
    )
}

fn about_page(site_name: &str, locale: &str) -> Page {
    page(
        "about",
        "About",
        &format!("Learn more about {site_name} and our mission."),
        locale,
        vec![block(
            "about-body",
            RICH_TEXT_V1,
            json!({
                "html": format!(
                    "<h2>About {site_name}</h2>\
                     <p>We build tools that let content teams publish everywhere without waiting on developers.</p>\
                     <h3>Developer Experience</h3><p>Clean APIs, typed SDKs, and comprehensive docs.</p>\
                     <h3>Content Freedom</h3><p>Define any content structure. No rigid templates.</p>\
                     <h3>Performance First</h3><p>Edge-cached API responses under 50ms.</p>"
                )
            }),
        )],
    )
}

fn capabilities_page(locale: &str) -> Page {
    page(
        "capabilities",
        "Capabilities",
        "Explore the capabilities of the platform.",
        locale,
        vec![
            block(
                "capabilities-features",
                FEATURES_V1,
                json!({
                    "title": "Capabilities",
                    "features": [
                        {"title": "AI-Powered Editor", "description": "Write better content faster with built-in AI assistance."},
                        {"title": "Multi-Site Management", "description": "Manage content for unlimited websites from a single dashboard."},
                        {"title": "Headless API", "description": "Deliver content to any frontend via a RESTful API."},
                        {"title": "Instant Publishing", "description": "Publish instantly with automatic cache invalidation and real-time preview."},
                        {"title": "Flexible Content Models", "description": "Define custom content types with rich field types, no code required."},
                        {"title": "Analytics & Insights", "description": "Track content performance and team productivity."}
                    ]
                }),
            ),
            block(
                "capabilities-cta",
                CTA_V1,
                json!({
                    "title": "See it in action",
                    "description": "Get in touch for a walkthrough of the editor and the delivery API."
                }),
            ),
        ],
    )
}

fn docs_page(site_name: &str, locale: &str) -> Page {
    page(
        "docs",
        "Documentation",
        &format!("Learn how to use {site_name}: guides, API reference, and tutorials."),
        locale,
        vec![block(
            "docs-body",
            RICH_TEXT_V1,
            json!({
                "html": "<h2>Getting Started</h2><p>Create a site, add content, and publish.</p>\
                         <h2>Content Management</h2><p>Pages, collections, the media library and the rich text editor.</p>\
                         <h2>API Reference</h2><p>Authentication, pages, collections and media endpoints.</p>"
            }),
        )],
    )
}

fn contact_page(locale: &str) -> Page {
    page(
        "contact",
        "Contact",
        "Get in touch with our team.",
        locale,
        vec![block(
            "contact-body",
            RICH_TEXT_V1,
            json!({
                "html": "<h2>Talk to us</h2><p>Tell us about your project and we will get back to you within 24 hours.</p>"
            }),
        )],
    )
}

fn collection(slug: &str, name: &str, description: &str) -> Collection {
    Collection {
        id: format!("static-collection-{slug}"),
        slug: slug.to_string(),
        name: name.to_string(),
        description: Some(description.to_string()),
        icon: None,
        item_schema: None,
        created_at: Some(PUBLISHED),
        updated_at: Some(PUBLISHED),
    }
}

fn item(
    collection: &str,
    slug: &str,
    title: &str,
    locale: &str,
    html: Option<String>,
    metadata: Value,
    published_at: OffsetDateTime,
) -> CollectionItem {
    CollectionItem {
        id: format!("static-{collection}-{slug}"),
        collection_id: format!("static-collection-{collection}"),
        slug: slug.to_string(),
        title: title.to_string(),
        status: ContentStatus::Published,
        locale: locale.to_string(),
        content: None,
        html,
        metadata: match metadata {
            Value::Object(map) => map,
            _ => Map::new(),
        },
        seo: None,
        created_at: Some(published_at),
        updated_at: Some(published_at),
        published_at: Some(published_at),
    }
}

fn article_html(ordinal: &str, extra: &str) -> String {
    format!(
        "<h2>Introduction</h2>\
         <p>This is placeholder content for your {ordinal} article. Replace this with your actual content.</p>\
         {extra}"
    )
}

fn perspectives(locale: &str) -> (Collection, Vec<CollectionItem>) {
    let items = vec![
        item(
            PERSPECTIVES,
            "article-1",
            "Article One",
            locale,
            Some(article_html(
                "first",
                "<p>You can write rich content here that will be displayed on the article page.</p>\
                 <h2>Key Points</h2>\
                 <ul><li>Point one about the topic</li><li>Point two with more details</li>\
                 <li>Point three with actionable insights</li></ul>\
                 <h2>Conclusion</h2><p>Wrap up your article with key takeaways and next steps.</p>",
            )),
            json!({
                "description": "A brief summary of your first article or thought leadership piece.",
                "category": "Insights",
                "date": "2024-01-15"
            }),
            datetime!(2024-01-15 00:00 UTC),
        ),
        item(
            PERSPECTIVES,
            "article-2",
            "Article Two",
            locale,
            Some(article_html("second", "")),
            json!({
                "description": "A brief summary of your second article discussing industry trends.",
                "category": "Trends",
                "date": "2024-01-10"
            }),
            datetime!(2024-01-10 00:00 UTC),
        ),
        item(
            PERSPECTIVES,
            "article-3",
            "Article Three",
            locale,
            Some(article_html("third", "")),
            json!({
                "description": "A brief summary of your third article sharing best practices.",
                "category": "Best Practices",
                "date": "2024-01-05"
            }),
            datetime!(2024-01-05 00:00 UTC),
        ),
    ];
    (
        collection(
            PERSPECTIVES,
            "Perspectives",
            "Insights, ideas, and expert perspectives from our team.",
        ),
        items,
    )
}

fn solutions(locale: &str) -> (Collection, Vec<CollectionItem>) {
    let entries = [
        (
            "solution-1",
            "Solution One",
            "Description of your first solution and the problems it solves.",
            "Category A",
        ),
        (
            "solution-2",
            "Solution Two",
            "Description of your second solution and its key benefits.",
            "Category B",
        ),
        (
            "solution-3",
            "Solution Three",
            "Description of your third solution and the outcomes it delivers.",
            "Category A",
        ),
    ];
    let items = entries
        .into_iter()
        .map(|(slug, title, description, category)| {
            item(
                SOLUTIONS,
                slug,
                title,
                locale,
                None,
                json!({"description": description, "category": category}),
                PUBLISHED,
            )
        })
        .collect();
    (
        collection(
            SOLUTIONS,
            "Solutions",
            "Proven solutions that deliver measurable results for our clients.",
        ),
        items,
    )
}
