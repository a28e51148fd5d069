//! pg-meta HTTP client
//!
//! Self-hosted stacks expose pg-meta directly (`{api_url}{meta_base_path}`);
//! the managed platform proxies it per project
//! (`{api_url}/platform/pg-meta/{project_id}`) behind a bearer token.

use super::{Method, RemoteApi, RemoteError, Request};
use reconcile::objects;
use serde::de::DeserializeOwned;

const USER_AGENT: &str = concat!("dbsync/", env!("CARGO_PKG_VERSION"));

pub struct PgMetaClient {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// Metadata base URL, without trailing slash.
    base_url: String,
    access_token: Option<String>,
}

impl PgMetaClient {
    pub fn new(base_url: impl Into<String>, access_token: Option<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            agent: ureq::Agent::new_with_defaults(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.filter(|t| !t.is_empty()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorize<B>(&self, request: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        let request = request
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT);
        match &self.access_token {
            Some(token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RemoteError> {
        let url = self.url(path);
        log::debug!("GET {url}");

        let mut response = self
            .authorize(self.agent.get(&url))
            .call()
            .map_err(|e| RemoteError::from_ureq(&url, e))?;

        response
            .body_mut()
            .read_json()
            .map_err(|e| RemoteError::from_ureq(&url, e))
    }
}

impl RemoteApi for PgMetaClient {
    fn fetch_roles(&self) -> Result<Vec<objects::Role>, RemoteError> {
        self.get_json("/roles")
    }

    fn fetch_tables(&self) -> Result<Vec<objects::Table>, RemoteError> {
        self.get_json("/tables")
    }

    fn fetch_policies(&self) -> Result<Vec<objects::Policy>, RemoteError> {
        self.get_json("/policies")
    }

    fn fetch_functions(&self) -> Result<Vec<objects::Function>, RemoteError> {
        self.get_json("/functions")
    }

    fn apply(&self, request: &Request) -> Result<(), RemoteError> {
        if request.method != Method::Post && request.id.is_none() {
            return Err(RemoteError::MissingId {
                kind: request.kind,
                name: request.name.clone(),
            });
        }

        let url = self.url(&request.path());
        log::debug!("{} {url}", request.method);

        let body = request.body.clone().unwrap_or(serde_json::Value::Null);
        let result = match request.method {
            Method::Post => self.authorize(self.agent.post(&url)).send_json(&body),
            Method::Patch => self.authorize(self.agent.patch(&url)).send_json(&body),
            Method::Delete => self.authorize(self.agent.delete(&url)).call(),
        };

        result
            .map(drop)
            .map_err(|e| RemoteError::from_ureq(&url, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trimmed() {
        let client = PgMetaClient::new("http://localhost:8000/pg-meta/", None);
        assert_eq!(client.base_url(), "http://localhost:8000/pg-meta");
        assert_eq!(client.url("/roles"), "http://localhost:8000/pg-meta/roles");
    }

    #[test]
    fn test_empty_token_ignored() {
        let client = PgMetaClient::new("http://localhost", Some(String::new()));
        assert!(client.access_token.is_none());
    }

    #[test]
    fn test_update_without_id_rejected_locally() {
        let client = PgMetaClient::new("http://127.0.0.1:9", None);
        let request = Request {
            method: Method::Delete,
            kind: reconcile::ResourceKind::Role,
            name: "analyst".into(),
            id: None,
            body: None,
        };
        assert!(matches!(
            client.apply(&request),
            Err(RemoteError::MissingId { .. })
        ));
    }
}
