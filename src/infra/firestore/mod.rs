//! Firestore REST adapter for the blog post collection.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    application::{
        pagination::{CursorPage, PageRequest, PostCursor},
        repos::{PostsRepo, RepoError},
    },
    config::StoreSettings,
    domain::posts::{PostRecord, Timestamp},
    infra::error::InfraError,
};

const FIELD_TITLE: &str = "title";
const FIELD_DESCRIPTION: &str = "description";
const FIELD_CONTENT: &str = "content";
const FIELD_COVER_IMAGE_URL: &str = "coverImageUrl";
const FIELD_PUBLISH_DATE: &str = "publishDate";

static STORE: OnceCell<Arc<FirestoreRepo>> = OnceCell::new();

/// Process-wide store handle, created on first use and shared read-only afterwards.
pub fn initialize(settings: &StoreSettings) -> Result<Arc<FirestoreRepo>, InfraError> {
    STORE
        .get_or_try_init(|| FirestoreRepo::new(settings).map(Arc::new))
        .cloned()
}

#[derive(Debug)]
pub struct FirestoreRepo {
    client: Client,
    collection_url: Url,
    api_key: Option<String>,
    access_token: Option<String>,
}

impl FirestoreRepo {
    pub fn new(settings: &StoreSettings) -> Result<Self, InfraError> {
        let project_id = settings.project_id.as_deref().ok_or_else(|| {
            InfraError::configuration("store.project_id is required to reach the document store")
        })?;
        let collection_url = collection_url(
            &settings.base_url,
            project_id,
            &settings.database,
            &settings.collection,
        )?;
        let client = Client::builder()
            .user_agent(concat!("prerender/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| InfraError::store(format!("failed to build http client: {err}")))?;

        info!(
            target = "prerender::infra::firestore",
            collection = %collection_url,
            "document store client initialised"
        );

        Ok(Self {
            client,
            collection_url,
            api_key: settings.api_key.clone(),
            access_token: settings.access_token.clone(),
        })
    }

    fn document_url(&self, id: &str) -> Url {
        let mut url = self.collection_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(id);
        }
        self.with_key(url)
    }

    fn list_url(&self, page: &PageRequest<PostCursor>) -> Url {
        let mut url = self.collection_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("pageSize", &page.limit.to_string());
            if let Some(cursor) = page.cursor.as_ref() {
                query.append_pair("pageToken", cursor.as_str());
            }
        }
        self.with_key(url)
    }

    fn with_key(&self, mut url: Url) -> Url {
        if let Some(key) = self.api_key.as_deref() {
            url.query_pairs_mut().append_pair("key", key);
        }
        url
    }

    fn get(&self, url: Url) -> RequestBuilder {
        let request = self.client.get(url);
        match self.access_token.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl PostsRepo for FirestoreRepo {
    async fn find_post(&self, id: &str) -> Result<Option<PostRecord>, RepoError> {
        let response = self
            .get(self.document_url(id))
            .send()
            .await
            .map_err(RepoError::from_persistence)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(target = "prerender::infra::firestore", post_id = id, "document missing");
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RepoError::Persistence(format!(
                "get `{id}` answered {status}: {body}"
            )));
        }

        let document: Document = response.json().await.map_err(RepoError::from_persistence)?;
        decode_document(document).map(Some)
    }

    async fn list_posts(
        &self,
        page: PageRequest<PostCursor>,
    ) -> Result<CursorPage<PostRecord>, RepoError> {
        let response = self
            .get(self.list_url(&page))
            .send()
            .await
            .map_err(RepoError::from_persistence)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RepoError::Persistence(format!(
                "list answered {status}: {body}"
            )));
        }

        let listing: ListDocumentsResponse =
            response.json().await.map_err(RepoError::from_persistence)?;
        decode_listing(listing)
    }
}

fn collection_url(
    base_url: &Url,
    project_id: &str,
    database: &str,
    collection: &str,
) -> Result<Url, InfraError> {
    let mut url = base_url.clone();
    url.set_query(None);
    url.path_segments_mut()
        .map_err(|_| InfraError::configuration(format!("`{base_url}` cannot be a base url")))?
        .pop_if_empty()
        .extend([
            "projects",
            project_id,
            "databases",
            database,
            "documents",
            collection,
        ]);
    Ok(url)
}

#[derive(Debug, Deserialize)]
struct Document {
    name: String,
    #[serde(default)]
    fields: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<Document>,
    next_page_token: Option<String>,
}

fn decode_listing(listing: ListDocumentsResponse) -> Result<CursorPage<PostRecord>, RepoError> {
    let items = listing
        .documents
        .into_iter()
        .map(decode_listed_document)
        .collect::<Result<Vec<_>, _>>()?;
    let next_cursor = listing
        .next_page_token
        .filter(|token| !token.trim().is_empty());
    Ok(CursorPage::new(items, next_cursor))
}

fn decode_document(document: Document) -> Result<PostRecord, RepoError> {
    let id = document_id(&document.name)?;
    let fields = &document.fields;

    Ok(PostRecord {
        title: string_field(&id, fields, FIELD_TITLE)?,
        description: string_field(&id, fields, FIELD_DESCRIPTION)?,
        content: string_field(&id, fields, FIELD_CONTENT)?,
        cover_image_url: string_field(&id, fields, FIELD_COVER_IMAGE_URL)?,
        publish_date: timestamp_field(fields, FIELD_PUBLISH_DATE),
        id,
    })
}

/// Listing entries only feed the sitemap, which needs the id and publish date.
/// A text field of the wrong type is dropped instead of failing the whole page.
fn decode_listed_document(document: Document) -> Result<PostRecord, RepoError> {
    let id = document_id(&document.name)?;
    let fields = &document.fields;
    let text = |name: &str| {
        string_field(&id, fields, name).unwrap_or_else(|err| {
            debug!(
                target = "prerender::infra::firestore",
                post_id = %id,
                error = %err,
                "ignoring unreadable field in listing"
            );
            None
        })
    };

    Ok(PostRecord {
        title: text(FIELD_TITLE),
        description: text(FIELD_DESCRIPTION),
        content: text(FIELD_CONTENT),
        cover_image_url: text(FIELD_COVER_IMAGE_URL),
        publish_date: timestamp_field(fields, FIELD_PUBLISH_DATE),
        id,
    })
}

fn document_id(name: &str) -> Result<String, RepoError> {
    name.rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| RepoError::malformed(name, "document name has no identifier"))
}

fn string_field(
    id: &str,
    fields: &HashMap<String, Value>,
    name: &str,
) -> Result<Option<String>, RepoError> {
    let Some(value) = fields.get(name) else {
        return Ok(None);
    };
    if let Some(text) = value.get("stringValue") {
        return text
            .as_str()
            .map(|text| Some(text.to_string()))
            .ok_or_else(|| RepoError::malformed(id, format!("`{name}` stringValue is not text")));
    }
    if value.get("nullValue").is_some() {
        return Ok(None);
    }
    Err(RepoError::malformed(
        id,
        format!("`{name}` holds a non-string value"),
    ))
}

/// Anything other than a parseable `timestampValue` is an unknown date.
fn timestamp_field(fields: &HashMap<String, Value>, name: &str) -> Timestamp {
    fields
        .get(name)
        .and_then(|value| value.get("timestampValue"))
        .and_then(Value::as_str)
        .map(Timestamp::parse_rfc3339)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use serde_json::json;
    use time::macros::datetime;

    use super::*;

    fn settings() -> StoreSettings {
        StoreSettings {
            base_url: Url::parse("https://firestore.googleapis.com/v1/").expect("url"),
            project_id: Some("demo-blog".to_string()),
            database: "(default)".to_string(),
            collection: "blog post".to_string(),
            api_key: Some("k&ey".to_string()),
            access_token: None,
            page_size: NonZeroU32::new(200).expect("non-zero"),
        }
    }

    fn document(value: Value) -> Document {
        serde_json::from_value(value).expect("document")
    }

    #[test]
    fn builds_document_urls_with_encoded_segments() {
        let repo = FirestoreRepo::new(&settings()).expect("repo");
        assert_eq!(
            repo.document_url("a b/c").as_str(),
            "https://firestore.googleapis.com/v1/projects/demo-blog/databases/(default)/documents/blog%20post/a%20b%2Fc?key=k%26ey"
        );
    }

    #[test]
    fn builds_list_urls_with_page_token() {
        let repo = FirestoreRepo::new(&settings()).expect("repo");
        let cursor = PostCursor::decode("tok/1").expect("cursor");
        let url = repo.list_url(&PageRequest::new(50, Some(cursor)));
        assert_eq!(
            url.as_str(),
            "https://firestore.googleapis.com/v1/projects/demo-blog/databases/(default)/documents/blog%20post?pageSize=50&pageToken=tok%2F1&key=k%26ey"
        );
    }

    #[test]
    fn missing_project_is_a_configuration_error() {
        let mut settings = settings();
        settings.project_id = None;
        let err = FirestoreRepo::new(&settings).expect_err("project required");
        assert!(matches!(err, InfraError::Configuration { .. }));
    }

    #[test]
    fn decodes_a_complete_document() {
        let record = decode_document(document(json!({
            "name": "projects/p/databases/(default)/documents/blog post/hello",
            "fields": {
                "title": {"stringValue": "Hello"},
                "description": {"nullValue": null},
                "content": {"stringValue": "Body"},
                "coverImageUrl": {"stringValue": "gs://bucket/img.png"},
                "publishDate": {"timestampValue": "2024-03-01T10:00:00.123456Z"}
            }
        })))
        .expect("decoded");

        assert_eq!(record.id, "hello");
        assert_eq!(record.title.as_deref(), Some("Hello"));
        assert_eq!(record.description, None);
        assert_eq!(record.content.as_deref(), Some("Body"));
        assert_eq!(record.cover_image_url.as_deref(), Some("gs://bucket/img.png"));
        assert_eq!(
            record.publish_date,
            Timestamp::Known(datetime!(2024-03-01 10:00:00.123456 UTC))
        );
    }

    #[test]
    fn odd_publish_dates_become_unknown() {
        for publish_date in [
            json!({"stringValue": "2024-03-01"}),
            json!({"timestampValue": "not a time"}),
            json!({"nullValue": null}),
        ] {
            let record = decode_document(document(json!({
                "name": "projects/p/databases/d/documents/blog post/x",
                "fields": {"publishDate": publish_date}
            })))
            .expect("decoded");
            assert_eq!(record.publish_date, Timestamp::Unknown);
        }
    }

    #[test]
    fn non_string_text_fields_are_malformed() {
        let err = decode_document(document(json!({
            "name": "projects/p/databases/d/documents/blog post/x",
            "fields": {"title": {"integerValue": "42"}}
        })))
        .expect_err("malformed");
        assert!(matches!(err, RepoError::Malformed { id, .. } if id == "x"));
    }

    #[test]
    fn listing_keeps_documents_with_unreadable_text_fields() {
        let listing: ListDocumentsResponse = serde_json::from_value(json!({
            "documents": [
                {"name": "projects/p/databases/d/documents/blog post/ok",
                 "fields": {"title": {"stringValue": "Fine"}}},
                {"name": "projects/p/databases/d/documents/blog post/bad",
                 "fields": {
                     "title": {"integerValue": "42"},
                     "publishDate": {"timestampValue": "2024-03-01T10:00:00Z"}
                 }}
            ]
        }))
        .expect("listing");
        let page = decode_listing(listing).expect("page");

        let ids: Vec<_> = page.items.iter().map(|post| post.id.as_str()).collect();
        assert_eq!(ids, vec!["ok", "bad"]);
        assert_eq!(page.items[0].title.as_deref(), Some("Fine"));
        assert_eq!(page.items[1].title, None);
        assert_eq!(
            page.items[1].publish_date,
            Timestamp::Known(datetime!(2024-03-01 10:00:00 UTC))
        );
    }

    #[test]
    fn listing_still_rejects_nameless_documents() {
        let listing: ListDocumentsResponse = serde_json::from_value(json!({
            "documents": [{"name": "projects/p/databases/d/documents/blog post/"}]
        }))
        .expect("listing");
        assert!(matches!(
            decode_listing(listing),
            Err(RepoError::Malformed { .. })
        ));
    }

    #[test]
    fn decodes_listing_pages() {
        let listing: ListDocumentsResponse = serde_json::from_value(json!({
            "documents": [
                {"name": "projects/p/databases/d/documents/blog post/one"},
                {"name": "projects/p/databases/d/documents/blog post/two", "fields": {}}
            ],
            "nextPageToken": "abc"
        }))
        .expect("listing");
        let page = decode_listing(listing).expect("page");
        let ids: Vec<_> = page.items.iter().map(|post| post.id.as_str()).collect();
        assert_eq!(ids, vec!["one", "two"]);
        assert_eq!(page.next_cursor.as_deref(), Some("abc"));

        let empty: ListDocumentsResponse = serde_json::from_value(json!({})).expect("listing");
        let page = decode_listing(empty).expect("page");
        assert!(page.items.is_empty());
        assert!(page.next_cursor.is_none());
    }
}
