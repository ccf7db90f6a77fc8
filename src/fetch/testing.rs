//! Scripted [`HttpClient`] for exercising request code without a network.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Method, Request, Response, Url};

use super::HttpClient;

/// What a [`ScriptedClient`] saw for one request.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

/// Replies with queued `(status, body)` pairs in order and records every request.
#[derive(Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<(u16, String)>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedClient {
    pub fn new(replies: impl IntoIterator<Item = (u16, &'static str)>) -> Self {
        Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|(status, body)| (status, body.to_string()))
                    .collect(),
            ),
            requests: Mutex::default(),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for ScriptedClient {
    async fn execute(&self, req: Request) -> reqwest::Result<Response> {
        self.requests.lock().unwrap().push(RecordedRequest {
            method: req.method().clone(),
            url: req.url().clone(),
            headers: req.headers().clone(),
            body: req.body().and_then(|b| b.as_bytes()).map(<[u8]>::to_vec),
        });
        let (status, body) = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted reply left");
        let response = http::Response::builder()
            .status(status)
            .header("content-type", "application/json")
            .body(body)
            .unwrap();
        Ok(Response::from(response))
    }
}
