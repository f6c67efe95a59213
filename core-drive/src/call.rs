//! Outgoing call description
//!
//! A [`DriveCall`] is the transport-neutral form of one Drive v3 request.
//! It is built by the caller, annotated by the shaper, and only rendered into
//! a [`HttpRequest`] when an attempt is made.

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpMethod, HttpRequest};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct DriveCall {
    pub method: HttpMethod,
    /// Path relative to the API base, e.g. `/files` or `/files/{id}`
    pub path: String,
    /// Query parameters in insertion order
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl DriveCall {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// `files.list` with a search expression.
    pub fn list_files(q: impl Into<String>) -> Self {
        Self::get("/files").param("q", q)
    }

    /// `files.get` for one id.
    pub fn get_file(file_id: &str) -> Self {
        Self::get(format!("/files/{}", urlencoding::encode(file_id)))
    }

    /// Append a query parameter, replacing an existing one with the same name.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_param(name, value);
        self
    }

    pub fn set_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.query.iter_mut().find(|(key, _)| *key == name) {
            Some(existing) => existing.1 = value,
            None => self.query.push((name, value)),
        }
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set a header, replacing any existing one with the same name
    /// (case-insensitive).
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(&name))
        {
            Some(existing) => existing.1 = value,
            None => self.headers.push((name, value)),
        }
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Full URL with an encoded query string.
    pub fn url(&self, base_url: &str) -> String {
        let mut url = format!("{}{}", base_url.trim_end_matches('/'), self.path);
        for (i, (name, value)) in self.query.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(&urlencoding::encode(name));
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url
    }

    /// Render into a bridge request against `base_url`.
    pub fn into_http_request(self, base_url: &str) -> BridgeResult<HttpRequest> {
        let mut request = HttpRequest::new(self.method, self.url(base_url))
            .header("Accept", "application/json");

        for (name, value) in self.headers {
            request = request.header(name, value);
        }

        match self.body {
            Some(body) => request.json(&body),
            None => Ok(request),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_replaces_existing() {
        let call = DriveCall::list_files("trashed = false")
            .param("pageSize", "100")
            .param("pageSize", "1000");

        assert_eq!(call.query.len(), 2);
        assert_eq!(call.query_param("pageSize"), Some("1000"));
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let call = DriveCall::get("/about")
            .header("X-Custom", "1")
            .header("x-custom", "2");

        assert_eq!(call.headers.len(), 1);
        assert_eq!(call.header_value("X-CUSTOM"), Some("2"));
    }

    #[test]
    fn test_url_encodes_query() {
        let call = DriveCall::list_files("name = 'a b' and 'root' in parents")
            .param("fields", "nextPageToken,files(id,name)");

        assert_eq!(
            call.url("https://www.googleapis.com/drive/v3/"),
            "https://www.googleapis.com/drive/v3/files\
             ?q=name%20%3D%20%27a%20b%27%20and%20%27root%27%20in%20parents\
             &fields=nextPageToken%2Cfiles%28id%2Cname%29"
        );
    }

    #[test]
    fn test_get_file_encodes_id() {
        let call = DriveCall::get_file("a/b");
        assert_eq!(call.path, "/files/a%2Fb");
    }

    #[test]
    fn test_into_http_request_carries_headers_and_body() {
        let request = DriveCall::new(HttpMethod::Patch, "/files/abc")
            .header("X-Goog-Drive-Resource-Keys", "abc/key")
            .json(serde_json::json!({"name": "renamed"}))
            .into_http_request("https://example.test/drive/v3")
            .unwrap();

        assert_eq!(request.method, HttpMethod::Patch);
        assert_eq!(request.url, "https://example.test/drive/v3/files/abc");
        assert_eq!(
            request.headers.get("X-Goog-Drive-Resource-Keys"),
            Some(&"abc/key".to_string())
        );
        assert_eq!(
            request.headers.get("Content-Type"),
            Some(&"application/json".to_string())
        );
        assert!(request.body.is_some());
    }
}
