//! Public paths of the site and the collections behind them.

pub const HOME_SLUG: &str = "home";
pub const PERSPECTIVES: &str = "perspectives";
pub const SOLUTIONS: &str = "solutions";

/// Public path of a page; the home page lives at `/`.
pub fn page_path(slug: &str) -> String {
    if slug == HOME_SLUG {
        "/".to_string()
    } else {
        format!("/{slug}")
    }
}

pub fn collection_path(collection: &str) -> String {
    format!("/{collection}")
}

pub fn item_path(collection: &str, item: &str) -> String {
    format!("/{collection}/{item}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_maps_to_root() {
        assert_eq!(page_path("home"), "/");
        assert_eq!(page_path("pricing"), "/pricing");
    }

    #[test]
    fn collection_paths() {
        assert_eq!(collection_path(PERSPECTIVES), "/perspectives");
        assert_eq!(item_path(PERSPECTIVES, "article-1"), "/perspectives/article-1");
    }
}
