use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::application::error::{ErrorReport, HttpError};

const SOURCE: &str = "presentation::views";

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        HttpError::from_error(
            SOURCE,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Template rendering failed",
            &err,
        )
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let chrome = chrome.titled("Page Not Found", None);
    let view = LayoutContext::new(chrome, ErrorPageView::not_found());
    let mut response = render_template_response(NotFoundTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(SOURCE, StatusCode::NOT_FOUND, "no content for path")
        .attach(&mut response);
    response
}

#[derive(Clone)]
pub struct BrandView {
    pub name: String,
    pub tagline: Option<String>,
}

#[derive(Clone)]
pub struct NavigationLinkView {
    pub label: String,
    pub href: String,
    pub active: bool,
}

#[derive(Clone)]
pub struct PageMetaView {
    pub title: String,
    pub description: Option<String>,
    pub locale: String,
}

/// Everything around the main content: brand, navigation, footer, head.
#[derive(Clone)]
pub struct LayoutChrome {
    pub brand: BrandView,
    pub navigation: Vec<NavigationLinkView>,
    pub footer: String,
    pub meta: PageMetaView,
}

impl LayoutChrome {
    /// Sets the document title as `{title} | {site}` and the description.
    pub fn titled(self, title: &str, description: Option<String>) -> Self {
        let full_title = if title.is_empty() || title == self.brand.name {
            self.brand.name.clone()
        } else {
            format!("{title} | {}", self.brand.name)
        };
        Self {
            meta: PageMetaView {
                title: full_title,
                description: description.or_else(|| self.brand.tagline.clone()),
                locale: self.meta.locale.clone(),
            },
            ..self
        }
    }

    /// Marks the navigation entry for `path`, or the section it belongs to.
    pub fn at_path(mut self, path: &str) -> Self {
        for link in &mut self.navigation {
            link.active = link.href == path
                || (link.href != "/" && path.starts_with(&format!("{}/", link.href)));
        }
        self
    }
}

pub struct LayoutContext<T> {
    pub chrome: LayoutChrome,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self { chrome, content }
    }
}

pub struct PageView {
    pub slug: String,
    pub title: String,
    /// Block content usually opens with its own hero heading.
    pub show_title: bool,
    pub body_html: Option<String>,
}

#[derive(Template)]
#[template(path = "page.html")]
pub struct PageTemplate {
    pub view: LayoutContext<PageView>,
}

pub struct ListingEntryView {
    pub title: String,
    pub href: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub date: Option<String>,
}

pub struct ListingView {
    pub title: String,
    pub intro: Option<String>,
    pub entries: Vec<ListingEntryView>,
    pub empty_message: String,
}

#[derive(Template)]
#[template(path = "listing.html")]
pub struct ListingTemplate {
    pub view: LayoutContext<ListingView>,
}

pub struct ArticleView {
    pub title: String,
    pub category: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
    pub body_html: Option<String>,
    pub back_href: String,
    pub back_label: String,
}

#[derive(Template)]
#[template(path = "article.html")]
pub struct ArticleTemplate {
    pub view: LayoutContext<ArticleView>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
    pub action_href: String,
    pub action_label: String,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page Not Found".to_string(),
            message: "The page you requested does not exist.".to_string(),
            action_href: "/".to_string(),
            action_label: "Back to home".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chrome() -> LayoutChrome {
        LayoutChrome {
            brand: BrandView {
                name: "IV-CMS".into(),
                tagline: Some("Content, delivered".into()),
            },
            navigation: ["/", "/perspectives", "/contact"]
                .into_iter()
                .map(|href| NavigationLinkView {
                    label: href.into(),
                    href: href.into(),
                    active: false,
                })
                .collect(),
            footer: "© IV-CMS".into(),
            meta: PageMetaView {
                title: "IV-CMS".into(),
                description: None,
                locale: "en".into(),
            },
        }
    }

    #[test]
    fn titles_include_site_name() {
        let chrome = chrome().titled("About", None);
        assert_eq!(chrome.meta.title, "About | IV-CMS");
        assert_eq!(chrome.meta.description.as_deref(), Some("Content, delivered"));
        assert_eq!(chrome.titled("IV-CMS", None).meta.title, "IV-CMS");
    }

    #[test]
    fn section_links_are_marked_active() {
        let chrome = chrome().at_path("/perspectives/article-1");
        let active: Vec<&str> = chrome
            .navigation
            .iter()
            .filter(|link| link.active)
            .map(|link| link.href.as_str())
            .collect();
        assert_eq!(active, vec!["/perspectives"]);
    }

    #[test]
    fn not_found_page_renders_layout() {
        let response = render_not_found_response(chrome());
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.extensions().get::<ErrorReport>().is_some());
    }
}
