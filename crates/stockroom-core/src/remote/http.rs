//! JSON-over-HTTP remote client.

use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::RemoteClient;
use crate::config::RemoteSettings;
use crate::error::{Error, Result};
use crate::models::{Record, RecordId, SyncEntity};
use crate::util::compact_text;

/// Shared HTTP client for the stock API
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    auth_token: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Build a client from validated remote settings
    pub fn new(settings: &RemoteSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|error| Error::Config(format!("failed to build HTTP client: {error}")))?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            auth_token: settings.auth_token.clone(),
            client,
        })
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Typed client for one entity collection
    pub fn collection<E: SyncEntity>(&self) -> HttpRemote<E> {
        HttpRemote {
            api: self.clone(),
            _entity: PhantomData,
        }
    }

    /// Whether the API answers at all. Any HTTP status counts as reachable.
    pub async fn ping(&self) -> bool {
        match self.request(Method::GET, "/").send().await {
            Ok(_) => true,
            Err(error) => {
                tracing::debug!("API unreachable at {}: {}", self.base_url, error);
                false
            }
        }
    }

    pub(super) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self
            .client
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json");
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub(super) async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(Error::RemoteRejected {
            status: status.as_u16(),
            message: parse_api_error(status, &body),
        })
    }

    /// Decode the `data` of a successful response, descending into `key`
    /// when the payload nests the wanted value under it.
    ///
    /// The request has already been applied at this point, so a body that
    /// cannot be decoded is `Error::UnreadableResponse`, never a rejection.
    pub(super) async fn read_data<T: DeserializeOwned>(
        response: Response,
        key: Option<&str>,
    ) -> Result<T> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|error| Error::UnreadableResponse {
                status,
                message: error.to_string(),
            })?;
        let unreadable = move |error: serde_json::Error| Error::UnreadableResponse {
            status,
            message: format!("unexpected response payload: {error}"),
        };

        let envelope: Envelope<Value> = serde_json::from_str(&body).map_err(unreadable)?;
        serde_json::from_value(select_key(envelope.data, key)).map_err(unreadable)
    }
}

/// `data.<key>` when present, otherwise `data` itself
fn select_key(data: Value, key: Option<&str>) -> Value {
    let Some(key) = key else {
        return data;
    };
    match data {
        Value::Object(mut object) => match object.remove(key) {
            Some(inner) => inner,
            None => Value::Object(object),
        },
        other => other,
    }
}

/// Response wrapper used by every endpoint: `{ "data": ... }`
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return message.trim().to_string();
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        trimmed
    }
}

/// `RemoteClient` for one entity collection over HTTP
pub struct HttpRemote<E> {
    api: ApiClient,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for HttpRemote<E> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: SyncEntity> HttpRemote<E> {
    fn item_path(id: &RecordId) -> String {
        format!("/{}/{}", E::COLLECTION, id)
    }

    fn confirmed(mut record: Record<E>) -> Record<E> {
        record.unsynced = false;
        record.deleted = false;
        record
    }
}

#[async_trait]
impl<E: SyncEntity> RemoteClient<E> for HttpRemote<E> {
    async fn create(&self, fields: &E) -> Result<Record<E>> {
        let request = self
            .api
            .request(Method::POST, &fields.create_path())
            .json(fields);
        let response = self.api.send(request).await?;
        let record = ApiClient::read_data::<Record<E>>(response, E::CREATED_KEY).await?;
        tracing::debug!("Created {} {} remotely", E::KIND, record.id);
        Ok(Self::confirmed(record))
    }

    async fn update(&self, id: &RecordId, fields: &E) -> Result<Record<E>> {
        let request = self
            .api
            .request(Method::PUT, &Self::item_path(id))
            .json(fields);
        let response = self.api.send(request).await?;
        let record = ApiClient::read_data::<Record<E>>(response, None).await?;
        Ok(Self::confirmed(record))
    }

    async fn delete(&self, id: &RecordId) -> Result<()> {
        let request = self.api.request(Method::DELETE, &Self::item_path(id));
        self.api.send(request).await?;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Record<E>>> {
        let request = self
            .api
            .request(Method::GET, &format!("/{}", E::COLLECTION));
        let response = self.api.send(request).await?;
        let records = ApiClient::read_data::<Vec<Record<E>>>(response, E::LISTING_KEY).await?;
        Ok(records.into_iter().map(Self::confirmed).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::Connectivity;
    use crate::db::LocalStore;
    use crate::models::{Category, Customer, Product};
    use crate::remote::stub::StubApi;
    use crate::sync::{EntitySynchronizer, SweepReport};
    use serde_json::json;

    const CREATED_PEPPER: &str = r#"{"data":{
        "product":{"id":7,"name":"Pepper","category_id":1,"price":2.5,"quantity":0},
        "supply":{"id":3,"product_id":7,"quantity":0}}}"#;

    fn settings() -> RemoteSettings {
        RemoteSettings {
            base_url: "https://api.example.com/api/".to_string(),
            auth_token: Some("secret".to_string()),
            request_timeout_secs: 5,
        }
    }

    #[test]
    fn parse_api_error_prefers_message_field() {
        let message = parse_api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"message":"The name has already been taken.","errors":{}}"#,
        );
        assert_eq!(message, "The name has already been taken.");
    }

    #[test]
    fn parse_api_error_falls_back_to_status() {
        assert_eq!(parse_api_error(StatusCode::BAD_GATEWAY, "  "), "HTTP 502");
        assert_eq!(
            parse_api_error(StatusCode::BAD_GATEWAY, "upstream down"),
            "upstream down"
        );
    }

    #[test]
    fn envelope_unwraps_authoritative_records() {
        let body = r#"{"data":[{"id":1,"name":"Spices"},{"id":"2","name":"Tea"}]}"#;
        let envelope: Envelope<Vec<Record<Category>>> = serde_json::from_str(body).unwrap();
        let ids: Vec<&str> = envelope.data.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn client_trims_base_url_and_redacts_token() {
        let api = ApiClient::new(&settings()).unwrap();
        assert_eq!(api.base_url(), "https://api.example.com/api");
        let debug = format!("{api:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn item_paths_use_collection_segment() {
        assert_eq!(
            HttpRemote::<Product>::item_path(&RecordId::from(9)),
            "/products/9"
        );
    }

    #[tokio::test]
    async fn unreachable_api_is_a_remote_error() {
        let api = ApiClient::new(&RemoteSettings {
            base_url: "http://127.0.0.1:9".to_string(),
            auth_token: None,
            request_timeout_secs: 1,
        })
        .unwrap();

        assert!(!api.ping().await);
        let error = api
            .collection::<Category>()
            .list_all()
            .await
            .unwrap_err();
        assert!(error.is_remote());
    }

    #[test]
    fn select_key_descends_only_when_present() {
        let nested = json!({"product": {"id": 1}, "supply": {"id": 2}});
        assert_eq!(select_key(nested, Some("product")), json!({"id": 1}));

        let flat = json!({"id": 1, "name": "Pepper"});
        assert_eq!(select_key(flat.clone(), Some("product")), flat);
        assert_eq!(select_key(json!([1, 2]), Some("customers")), json!([1, 2]));
        assert_eq!(select_key(flat.clone(), None), flat);
    }

    #[tokio::test]
    async fn product_create_reads_nested_product() {
        let api = StubApi::start(&[("POST /products", CREATED_PEPPER)]).await;
        let client = ApiClient::new(&api.settings(Some("abc"))).unwrap();

        let record = client
            .collection::<Product>()
            .create(&Product::new("Pepper", RecordId::from(1), 2.5))
            .await
            .unwrap();

        assert_eq!(record.id, RecordId::from(7));
        assert_eq!(record.fields.name, "Pepper");
        assert!(!record.unsynced);
        assert_eq!(api.requests(), vec!["POST /products bearer=abc".to_string()]);
    }

    #[tokio::test]
    async fn customer_listing_reads_nested_customers() {
        let api = StubApi::start(&[(
            "GET /customers",
            r#"{"data":{
                "customers":[{"id":1,"name":"Ada"},{"id":"2","name":"Grace","phone":"555"}],
                "products":[{"id":9,"name":"Pepper","category_id":1,"price":2.5}]}}"#,
        )])
        .await;
        let client = ApiClient::new(&api.settings(None)).unwrap();

        let customers = client.collection::<Customer>().list_all().await.unwrap();

        let names: Vec<&str> = customers.iter().map(|r| r.fields.name.as_str()).collect();
        assert_eq!(names, vec!["Ada", "Grace"]);
        assert_eq!(customers[1].fields.phone.as_deref(), Some("555"));
    }

    #[tokio::test]
    async fn undecodable_success_body_is_unreadable_not_rejected() {
        let api = StubApi::start(&[("POST /categories", r#"{"data":{"message":"Created"}}"#)])
            .await;
        let client = ApiClient::new(&api.settings(None)).unwrap();

        let error = client
            .collection::<Category>()
            .create(&Category::new("Spices"))
            .await
            .unwrap_err();

        assert!(error.is_unreadable_response());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn nested_product_create_is_posted_once() {
        let api = StubApi::start(&[("POST /products", CREATED_PEPPER)]).await;
        let client = ApiClient::new(&api.settings(None)).unwrap();
        let store = LocalStore::open_in_memory().await.unwrap();
        let sync = EntitySynchronizer::new(
            store.table::<Product>(),
            Some(client.collection::<Product>()),
            Connectivity::new(true),
        );

        let record = sync
            .create(Product::new("Pepper", RecordId::from(1), 2.5))
            .await
            .unwrap();
        assert_eq!(record.id, RecordId::from(7));
        assert!(!record.unsynced);

        for _ in 0..3 {
            assert_eq!(sync.sweep().await.unwrap(), SweepReport::default());
        }
        assert_eq!(api.hits("POST /products"), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unreadable_create_reply_is_never_posted_again() {
        let api = StubApi::start(&[
            ("POST /categories", r#"{"data":{"message":"Created"}}"#),
            ("GET /categories", r#"{"data":[{"id":11,"name":"Spices"}]}"#),
        ])
        .await;
        let client = ApiClient::new(&api.settings(None)).unwrap();
        let store = LocalStore::open_in_memory().await.unwrap();
        let sync = EntitySynchronizer::new(
            store.table::<Category>(),
            Some(client.collection::<Category>()),
            Connectivity::new(true),
        );

        let record = sync.create(Category::new("Spices")).await.unwrap();
        assert!(!record.id.is_provisional());
        assert!(!record.unsynced);

        for _ in 0..3 {
            assert_eq!(sync.sweep().await.unwrap(), SweepReport::default());
        }

        assert_eq!(api.hits("POST /categories"), 1);
        assert_eq!(api.hits("GET /categories"), 1);
        assert_eq!(
            sync.items(),
            vec![Record::confirmed(RecordId::from(11), Category::new("Spices"))]
        );
    }
}
