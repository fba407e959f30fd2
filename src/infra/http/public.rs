use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use cmsfront_types::{CollectionItemSummary, NavigationItem, Page};

use crate::{
    application::{
        contact::ContactService,
        fallback::{StaticSource, default_navigation},
        resolver::ContentResolver,
        revalidation::RevalidationService,
        sources::{ContentOrigin, ContentSource},
    },
    cache::{ResponseCache, response_cache_layer},
    domain::routes::{HOME_SLUG, PERSPECTIVES, SOLUTIONS, collection_path, item_path, page_path},
    infra::clients::SourceClients,
    presentation::{
        blocks::BlockRenderer,
        views::{
            ArticleTemplate, ArticleView, BrandView, LayoutChrome, LayoutContext,
            ListingEntryView, ListingTemplate, ListingView, NavigationLinkView, PageMetaView,
            PageTemplate, PageView, render_not_found_response, render_template_response,
        },
    },
};

use super::{
    api,
    middleware::{log_responses, set_request_context},
    with_origin,
};

/// Site identity rendered into every layout.
#[derive(Clone, Debug)]
pub struct SiteContext {
    pub name: String,
    pub tagline: Option<String>,
    pub locale: String,
}

#[derive(Clone)]
pub struct HttpState {
    pub site: Arc<SiteContext>,
    pub resolver: Arc<ContentResolver>,
    pub fallback: Arc<StaticSource>,
    pub blocks: BlockRenderer,
    pub clients: Arc<SourceClients>,
    pub revalidation: Arc<RevalidationService>,
    pub contact: Arc<ContactService>,
    pub cache: Option<ResponseCache>,
}

pub fn build_router(state: HttpState) -> Router {
    let content_routes = Router::new()
        .route("/", get(home))
        .route("/perspectives", get(perspectives_index))
        .route("/perspectives/{slug}", get(perspective_detail))
        .route("/solutions", get(solutions_index))
        .route("/{slug}", get(page_by_slug));

    // Rendered pages only; the API and health routes always run.
    let content_routes = match state.cache.clone() {
        Some(cache) if cache.is_enabled() => content_routes.layer(
            middleware::from_fn_with_state(cache, response_cache_layer),
        ),
        _ => content_routes,
    };

    content_routes
        .merge(api::routes())
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn home(State(state): State<HttpState>) -> Response {
    render_page(&state, HOME_SLUG).await
}

async fn page_by_slug(State(state): State<HttpState>, Path(slug): Path<String>) -> Response {
    // The home page lives at "/" only, which is the path its revalidation drops.
    if slug == HOME_SLUG {
        return Redirect::permanent(&page_path(HOME_SLUG)).into_response();
    }
    render_page(&state, &slug).await
}

async fn render_page(state: &HttpState, slug: &str) -> Response {
    let path = page_path(slug);
    let chrome = state.chrome(&path).await;

    let Some(resolved) = state.resolver.page(slug, None).await else {
        return render_not_found_response(chrome);
    };
    let origin = resolved.origin;
    let page = resolved.value;

    let mut body_html = page_body(&state.blocks, &page);
    if body_html.is_none() && slug == HOME_SLUG && origin != ContentOrigin::Static {
        // A CMS home page without body content keeps the bundled landing sections.
        body_html = state
            .fallback
            .page(HOME_SLUG, &state.site.locale)
            .await
            .and_then(|fallback| page_body(&state.blocks, &fallback));
    }

    let seo = page.seo.clone().unwrap_or_default();
    let chrome = chrome.titled(
        seo.title.as_deref().unwrap_or(&page.title),
        seo.description.clone(),
    );
    let view = LayoutContext::new(
        chrome,
        PageView {
            slug: page.slug.clone(),
            title: page.title.clone(),
            show_title: page.blocks.is_empty() && slug != HOME_SLUG,
            body_html,
        },
    );
    with_origin(
        render_template_response(PageTemplate { view }, StatusCode::OK),
        origin,
    )
}

fn page_body(blocks: &BlockRenderer, page: &Page) -> Option<String> {
    blocks
        .render(page.rendered_html.as_deref(), &page.blocks)
        .or_else(|| {
            page.html
                .as_deref()
                .filter(|html| !html.trim().is_empty())
                .map(ammonia::clean)
        })
}

async fn perspectives_index(State(state): State<HttpState>) -> Response {
    render_listing(
        &state,
        PERSPECTIVES,
        ListingDefaults {
            title: "Perspectives",
            intro: "Insights, announcements, and deep dives from our team.",
            empty: "No perspectives have been published yet.",
            linked: true,
        },
    )
    .await
}

async fn solutions_index(State(state): State<HttpState>) -> Response {
    render_listing(
        &state,
        SOLUTIONS,
        ListingDefaults {
            title: "Solutions",
            intro: "How teams put the platform to work.",
            empty: "No solutions have been published yet.",
            linked: false,
        },
    )
    .await
}

struct ListingDefaults {
    title: &'static str,
    intro: &'static str,
    empty: &'static str,
    /// Whether entries have their own detail pages.
    linked: bool,
}

async fn render_listing(
    state: &HttpState,
    collection: &str,
    defaults: ListingDefaults,
) -> Response {
    let path = collection_path(collection);
    let (chrome, meta, items) = futures::join!(
        state.chrome(&path),
        state.resolver.collection(collection),
        state.resolver.collection_items(collection),
    );

    let meta = meta.map(|resolved| resolved.value);
    let title = meta
        .as_ref()
        .map_or(defaults.title.to_string(), |meta| meta.name.clone());
    let intro = meta
        .and_then(|meta| meta.description)
        .unwrap_or_else(|| defaults.intro.to_string());

    let (entries, origin) = match items {
        Some(resolved) => (resolved.value, resolved.origin),
        None => (Vec::new(), ContentOrigin::Static),
    };
    let entries = entries
        .iter()
        .map(|item| listing_entry(collection, item, defaults.linked))
        .collect();

    let chrome = chrome.titled(&title, Some(intro.clone()));
    let view = LayoutContext::new(
        chrome,
        ListingView {
            title,
            intro: Some(intro),
            entries,
            empty_message: defaults.empty.to_string(),
        },
    );
    with_origin(
        render_template_response(ListingTemplate { view }, StatusCode::OK),
        origin,
    )
}

fn listing_entry(collection: &str, item: &CollectionItemSummary, linked: bool) -> ListingEntryView {
    ListingEntryView {
        title: item.title.clone(),
        href: linked.then(|| item_path(collection, &item.slug)),
        description: item.meta_str("description").map(str::to_string),
        category: item.meta_str("category").map(str::to_string),
        date: item.meta_str("date").map(str::to_string),
    }
}

async fn perspective_detail(State(state): State<HttpState>, Path(slug): Path<String>) -> Response {
    let path = item_path(PERSPECTIVES, &slug);
    let chrome = state.chrome(&path).await;

    let Some(resolved) = state.resolver.collection_item(PERSPECTIVES, &slug).await else {
        return render_not_found_response(chrome);
    };
    let origin = resolved.origin;
    let item = resolved.value;

    let description = item
        .seo
        .as_ref()
        .and_then(|seo| seo.description.clone())
        .or_else(|| item.meta_str("description").map(str::to_string));
    let chrome = chrome.titled(&item.title, description.clone());
    let view = LayoutContext::new(
        chrome,
        ArticleView {
            category: Some(item.meta_str("category").unwrap_or("Article").to_string()),
            date: item.meta_str("date").map(str::to_string),
            description,
            body_html: item.html.clone().filter(|html| !html.trim().is_empty()),
            title: item.title,
            back_href: collection_path(PERSPECTIVES),
            back_label: "All perspectives".to_string(),
        },
    );
    with_origin(
        render_template_response(ArticleTemplate { view }, StatusCode::OK),
        origin,
    )
}

impl HttpState {
    /// Layout chrome with the resolved navigation, or the bundled one when no
    /// source has navigation.
    async fn chrome(&self, path: &str) -> LayoutChrome {
        let navigation = self
            .resolver
            .navigation()
            .await
            .map(|resolved| resolved.value)
            .unwrap_or_else(default_navigation);

        LayoutChrome {
            brand: BrandView {
                name: self.site.name.clone(),
                tagline: self.site.tagline.clone(),
            },
            navigation: navigation_links(&navigation),
            footer: format!("© {}", self.site.name),
            meta: PageMetaView {
                title: self.site.name.clone(),
                description: self.site.tagline.clone(),
                locale: self.site.locale.clone(),
            },
        }
        .at_path(path)
    }
}

fn navigation_links(items: &[NavigationItem]) -> Vec<NavigationLinkView> {
    items
        .iter()
        .filter(|item| item.depth == 0)
        .map(|item| NavigationLinkView {
            label: item.title.clone(),
            href: item.path.clone(),
            active: false,
        })
        .collect()
}
