//! Change notifications the CMS posts to `/api/revalidate`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WebhookEvent {
    #[serde(rename = "page.created")]
    PageCreated,
    #[serde(rename = "page.updated")]
    PageUpdated,
    #[serde(rename = "page.published")]
    PagePublished,
    #[serde(rename = "page.deleted")]
    PageDeleted,
    #[serde(rename = "collection.created")]
    CollectionCreated,
    #[serde(rename = "collection.updated")]
    CollectionUpdated,
    #[serde(rename = "collection.deleted")]
    CollectionDeleted,
    #[serde(rename = "item.created")]
    ItemCreated,
    #[serde(rename = "item.updated")]
    ItemUpdated,
    #[serde(rename = "item.published")]
    ItemPublished,
    #[serde(rename = "item.deleted")]
    ItemDeleted,
    #[serde(rename = "settings.updated")]
    SettingsUpdated,
}

impl WebhookEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            WebhookEvent::PageCreated => "page.created",
            WebhookEvent::PageUpdated => "page.updated",
            WebhookEvent::PagePublished => "page.published",
            WebhookEvent::PageDeleted => "page.deleted",
            WebhookEvent::CollectionCreated => "collection.created",
            WebhookEvent::CollectionUpdated => "collection.updated",
            WebhookEvent::CollectionDeleted => "collection.deleted",
            WebhookEvent::ItemCreated => "item.created",
            WebhookEvent::ItemUpdated => "item.updated",
            WebhookEvent::ItemPublished => "item.published",
            WebhookEvent::ItemDeleted => "item.deleted",
            WebhookEvent::SettingsUpdated => "settings.updated",
        }
    }
}

/// Kind of entity the change refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookSubject {
    Page,
    Collection,
    Item,
    Settings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookData {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub subject: WebhookSubject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub event: WebhookEvent,
    #[serde(default)]
    pub site_id: String,
    #[serde(default)]
    pub timestamp: String,
    pub data: WebhookData,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_item_event() {
        let payload: WebhookPayload = serde_json::from_value(json!({
            "event": "item.published",
            "siteId": "site-1",
            "timestamp": "2024-01-15T10:00:00Z",
            "data": {
                "id": "i1",
                "type": "item",
                "slug": "foo",
                "collectionSlug": "perspectives"
            }
        }))
        .expect("payload");

        assert_eq!(payload.event, WebhookEvent::ItemPublished);
        assert_eq!(payload.data.subject, WebhookSubject::Item);
        assert_eq!(payload.data.collection_slug.as_deref(), Some("perspectives"));
    }

    #[test]
    fn rejects_unknown_event() {
        let result = serde_json::from_value::<WebhookPayload>(json!({
            "event": "page.exploded",
            "data": {"type": "page"}
        }));
        assert!(result.is_err());
    }

    #[test]
    fn event_names_round_trip_through_as_str() {
        let event: WebhookEvent = serde_json::from_value(json!("settings.updated")).expect("event");
        assert_eq!(event.as_str(), "settings.updated");
    }
}
