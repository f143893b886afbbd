use crate::config::AcquisitionSettings;
use crate::core::sources::{AcquisitionError, AcquisitionQuery, JobAcquirer, PostingStream};
use crate::models::JobProfile;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// HTTP client for the posting acquisition service
///
/// Issues one `GET {endpoint}/postings` per keyword with bounded
/// concurrency and flattens the responses into a single posting stream.
pub struct HttpAcquisitionClient {
    endpoint: Option<String>,
    api_key: Option<String>,
    source: String,
    concurrency: usize,
    client: Client,
}

impl HttpAcquisitionClient {
    pub fn new(
        endpoint: Option<String>,
        api_key: Option<String>,
        source: String,
        timeout: Duration,
        concurrency: usize,
    ) -> Result<Self, AcquisitionError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AcquisitionError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.filter(|e| !e.trim().is_empty()),
            api_key,
            source,
            concurrency: concurrency.max(1),
            client,
        })
    }

    pub fn from_settings(settings: &AcquisitionSettings) -> Result<Self, AcquisitionError> {
        Self::new(
            settings.endpoint.clone(),
            settings.api_key.clone(),
            settings.source.clone(),
            Duration::from_secs(settings.timeout_secs),
            settings.concurrency,
        )
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }
}

#[async_trait]
impl JobAcquirer for HttpAcquisitionClient {
    async fn acquire(&self, query: &AcquisitionQuery) -> Result<PostingStream, AcquisitionError> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or_else(|| AcquisitionError::Unavailable("no acquisition endpoint configured".into()))?;

        tracing::info!(
            "Acquiring postings: city={}, keywords={:?}, per_keyword={}",
            query.city,
            query.keywords,
            query.per_keyword_hint
        );

        let fetcher = Arc::new(KeywordFetcher {
            client: self.client.clone(),
            url: format!("{}/postings", endpoint.trim_end_matches('/')),
            api_key: self.api_key.clone(),
            source: self.source.clone(),
            city: query.city.clone(),
            limit: query.per_keyword_hint.to_string(),
        });

        let postings = stream::iter(query.keywords.clone())
            .map(move |keyword| {
                let fetcher = Arc::clone(&fetcher);
                async move { fetcher.fetch(&keyword).await }
            })
            .buffered(self.concurrency)
            .flat_map(|batch| {
                stream::iter(match batch {
                    Ok(items) => items,
                    Err(err) => vec![Err(err)],
                })
            })
            .boxed();

        Ok(postings)
    }
}

struct KeywordFetcher {
    client: Client,
    url: String,
    api_key: Option<String>,
    source: String,
    city: String,
    limit: String,
}

impl KeywordFetcher {
    async fn fetch(&self, keyword: &str) -> Result<Vec<Result<JobProfile, AcquisitionError>>, AcquisitionError> {
        tracing::debug!("Fetching postings for keyword {}", keyword);

        let mut request = self.client.get(&self.url).query(&[
            ("city", self.city.as_str()),
            ("keyword", keyword),
            ("limit", self.limit.as_str()),
            ("source", self.source.as_str()),
        ]);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                AcquisitionError::Unavailable(e.to_string())
            } else {
                AcquisitionError::Request(e.to_string())
            }
        })?;

        match response.status() {
            StatusCode::SERVICE_UNAVAILABLE => {
                return Err(AcquisitionError::Unavailable(format!(
                    "acquisition service returned {}",
                    StatusCode::SERVICE_UNAVAILABLE
                )))
            }
            status if !status.is_success() => {
                return Err(AcquisitionError::Request(format!(
                    "Failed to acquire postings for {}: {}",
                    keyword, status
                )))
            }
            _ => {}
        }

        let items: Vec<Value> = response
            .json()
            .await
            .map_err(|e| AcquisitionError::Malformed(format!("response body: {}", e)))?;

        Ok(items
            .into_iter()
            .map(|item| {
                serde_json::from_value::<JobProfile>(item)
                    .map(|mut job| {
                        if job.source.is_empty() {
                            job.source = self.source.clone();
                        }
                        job
                    })
                    .map_err(|e| AcquisitionError::Malformed(e.to_string()))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn create_test_query(keywords: &[&str]) -> AcquisitionQuery {
        AcquisitionQuery {
            city: "深圳".to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            per_keyword_hint: 5,
        }
    }

    fn client_for(url: String) -> HttpAcquisitionClient {
        HttpAcquisitionClient::new(Some(url), None, "boss".to_string(), Duration::from_secs(5), 2)
            .unwrap()
    }

    #[tokio::test]
    async fn test_acquire_flattens_keywords() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/postings")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"external_id": "a", "title": "Rust Engineer"}, {"external_id": "b"}]"#)
            .expect(2)
            .create_async()
            .await;

        let client = client_for(server.url());
        let stream = client.acquire(&create_test_query(&["Rust", "Go"])).await.unwrap();
        let items: Vec<_> = stream.collect().await;

        assert_eq!(items.len(), 4);
        assert!(items.iter().all(|item| item.is_ok()));
        assert_eq!(items[0].as_ref().unwrap().source, "boss");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_service_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/postings")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let client = client_for(server.url());
        let stream = client.acquire(&create_test_query(&["Rust"])).await.unwrap();
        let items: Vec<_> = stream.collect().await;

        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(AcquisitionError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_malformed_item_is_isolated() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/postings")
            .match_query(Matcher::UrlEncoded("keyword".into(), "Rust".into()))
            .with_status(200)
            .with_body(r#"[{"external_id": "a"}, {"title": "no id"}]"#)
            .create_async()
            .await;

        let client = client_for(server.url());
        let stream = client.acquire(&create_test_query(&["Rust"])).await.unwrap();
        let items: Vec<_> = stream.collect().await;

        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(AcquisitionError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_unconfigured_endpoint() {
        let client =
            HttpAcquisitionClient::new(None, None, "boss".to_string(), Duration::from_secs(1), 1)
                .unwrap();
        assert!(!client.is_configured());
        assert!(matches!(
            client.acquire(&create_test_query(&["Rust"])).await,
            Err(AcquisitionError::Unavailable(_))
        ));
    }
}
