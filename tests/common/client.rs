//! Thin HTTP client wrapper for talking to a test server.

use serde_json::json;

pub struct TestClient {
    base_url: String,
    client: reqwest::Client,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    pub async fn create_subscriber(&self, email: &str) -> reqwest::Response {
        self.client
            .post(format!("{}/api/subscribers", self.base_url))
            .json(&json!({ "email": email }))
            .send()
            .await
            .expect("create_subscriber request failed")
    }

    pub async fn create_subscriber_raw(&self, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(format!("{}/api/subscribers", self.base_url))
            .json(&body)
            .send()
            .await
            .expect("create_subscriber request failed")
    }

    pub async fn list_subscribers(&self) -> reqwest::Response {
        self.client
            .get(format!("{}/api/subscribers", self.base_url))
            .send()
            .await
            .expect("list_subscribers request failed")
    }

    pub async fn sync_github(&self) -> reqwest::Response {
        self.client
            .post(format!("{}/api/sync-github", self.base_url))
            .send()
            .await
            .expect("sync_github request failed")
    }

    pub async fn healthz(&self) -> reqwest::Response {
        self.client
            .get(format!("{}/healthz", self.base_url))
            .send()
            .await
            .expect("healthz request failed")
    }
}
