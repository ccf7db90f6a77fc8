use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderValue};
use reqwest::{Method, Request, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::{CompareError, Result};
use crate::fetch::auth::{AccessToken, BearerToken, Credentials};
use crate::fetch::{HttpClient, fetch_json};
use crate::services::traffic_api::{SeriesQuery, TrafficApi};

#[derive(Serialize)]
struct TokenRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// ClearGuide route API over any [`HttpClient`].
pub struct ClearGuideClient<C> {
    http: C,
    api_base_url: Url,
    auth_url: Url,
    customer_key: String,
}

impl<C: HttpClient> ClearGuideClient<C> {
    pub fn new(http: C, config: &Config) -> Self {
        Self {
            http,
            api_base_url: config.api_base_url.clone(),
            auth_url: config.auth_url.clone(),
            customer_key: config.customer_key.clone(),
        }
    }

    /// Full request URL for a series query.
    pub fn series_url(&self, query: &SeriesQuery) -> Result<Url> {
        let mut url = self
            .api_base_url
            .join(query.metric.endpoint())
            .map_err(|e| CompareError::Config(format!("bad endpoint URL: {e}")))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in query.query_pairs(&self.customer_key) {
                pairs.append_pair(name, &value);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl<C: HttpClient> TrafficApi for ClearGuideClient<C> {
    #[tracing::instrument(skip_all, fields(username = %credentials.username))]
    async fn authenticate(&self, credentials: &Credentials) -> Result<AccessToken> {
        let body = serde_json::to_vec(&TokenRequest {
            username: &credentials.username,
            password: &credentials.password,
        })?;

        let mut req = Request::new(Method::POST, self.auth_url.clone());
        req.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        req.headers_mut()
            .insert(ACCEPT, HeaderValue::from_static("application/json"));
        *req.body_mut() = Some(body.into());

        let response = self.http.execute(req).await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(CompareError::Auth(format!(
                "token exchange failed with status {status}: {text}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| CompareError::Auth(format!("failed to parse token response: {e}")))?;
        debug!("Access token acquired");
        Ok(AccessToken::new(token.access_token))
    }

    #[tracing::instrument(
        skip_all,
        fields(route_id = %query.route_id, metric = query.metric.name(), window = %query.window.label())
    )]
    async fn get_series(&self, query: &SeriesQuery, token: &AccessToken) -> Result<Value> {
        let url = self.series_url(query)?;
        let client = BearerToken::new(&self.http, token);
        fetch_json(&client, url, query.route_id).await
    }
}
