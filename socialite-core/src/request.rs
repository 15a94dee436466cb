//! Read-only snapshot of the inbound HTTP request

use http::{header::CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, Method, Uri};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
struct RequestSnapshot {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    query: HashMap<String, String>,
    body: HashMap<String, String>,
    server: HashMap<String, String>,
}

/// Handle to the current inbound request
///
/// Cloning is cheap and every clone refers to the same snapshot.
#[derive(Debug, Clone, Default)]
pub struct RequestHandle {
    inner: Arc<RequestSnapshot>,
}

impl RequestHandle {
    #[must_use]
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    /// Snapshot an `http::Request`
    ///
    /// URL-encoded form bodies are parsed into body parameters; other bodies
    /// are ignored.
    pub fn from_http<B: AsRef<[u8]>>(request: &http::Request<B>) -> Self {
        let is_form = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/x-www-form-urlencoded"));

        let body = if is_form {
            parse_pairs(request.body().as_ref())
        } else {
            HashMap::new()
        };

        Self {
            inner: Arc::new(RequestSnapshot {
                method: request.method().clone(),
                uri: request.uri().clone(),
                headers: request.headers().clone(),
                query: request
                    .uri()
                    .query()
                    .map(|q| parse_pairs(q.as_bytes()))
                    .unwrap_or_default(),
                body,
                server: HashMap::new(),
            }),
        }
    }

    /// Snapshot the request described by the process environment
    ///
    /// Reads the CGI variables a gateway exports for the current request.
    /// Outside of a gateway this yields a bare `GET /`.
    #[must_use]
    pub fn from_globals() -> Self {
        // Non-UTF-8 variables are skipped.
        Self::from_server_vars(
            std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?))),
        )
    }

    /// Build a snapshot from CGI-style server variables
    pub fn from_server_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let server: HashMap<String, String> = vars.into_iter().collect();

        let method = server
            .get("REQUEST_METHOD")
            .and_then(|m| Method::from_bytes(m.as_bytes()).ok())
            .unwrap_or_default();

        let mut headers = HeaderMap::new();
        for (key, value) in &server {
            let name = match key.strip_prefix("HTTP_") {
                Some(name) => name,
                None if key == "CONTENT_TYPE" || key == "CONTENT_LENGTH" => key.as_str(),
                None => continue,
            };
            let name = name.to_ascii_lowercase().replace('_', "-");
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.append(name, value);
            }
        }

        let query_string = server.get("QUERY_STRING").cloned().unwrap_or_default();
        let uri = server_uri(&server, &query_string);

        Self {
            inner: Arc::new(RequestSnapshot {
                method,
                uri,
                headers,
                query: parse_pairs(query_string.as_bytes()),
                body: HashMap::new(),
                server,
            }),
        }
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.inner.uri
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.inner.headers
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers.get(name).and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn query(&self, key: &str) -> Option<&str> {
        self.inner.query.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.inner.query
    }

    #[must_use]
    pub fn body_params(&self) -> &HashMap<String, String> {
        &self.inner.body
    }

    /// Look up a parameter in the query string, then in the body
    #[must_use]
    pub fn input(&self, key: &str) -> Option<&str> {
        self.query(key)
            .or_else(|| self.inner.body.get(key).map(String::as_str))
    }

    #[must_use]
    pub fn server(&self, key: &str) -> Option<&str> {
        self.inner.server.get(key).map(String::as_str)
    }

    /// Whether both handles refer to the same snapshot
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Builder for hand-assembled request snapshots
#[derive(Debug, Default)]
pub struct RequestBuilder {
    snapshot: RequestSnapshot,
}

impl RequestBuilder {
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.snapshot.method = method;
        self
    }

    /// Set the URI; its query string is merged into the query parameters
    #[must_use]
    pub fn uri(mut self, uri: Uri) -> Self {
        if let Some(query) = uri.query() {
            self.snapshot.query.extend(parse_pairs(query.as_bytes()));
        }
        self.snapshot.uri = uri;
        self
    }

    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.snapshot.headers.append(name, value);
        self
    }

    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.snapshot.query.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn body(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.snapshot.body.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn server(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.snapshot.server.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn build(self) -> RequestHandle {
        RequestHandle {
            inner: Arc::new(self.snapshot),
        }
    }
}

fn parse_pairs(input: &[u8]) -> HashMap<String, String> {
    serde_urlencoded::from_bytes::<Vec<(String, String)>>(input)
        .map(|pairs| pairs.into_iter().collect())
        .unwrap_or_default()
}

fn server_uri(server: &HashMap<String, String>, query_string: &str) -> Uri {
    let path = server.get("REQUEST_URI").cloned().unwrap_or_else(|| {
        let mut path = server.get("SCRIPT_NAME").cloned().unwrap_or_default();
        if let Some(info) = server.get("PATH_INFO") {
            path.push_str(info);
        }
        if path.is_empty() {
            path.push('/');
        }
        if !query_string.is_empty() {
            path.push('?');
            path.push_str(query_string);
        }
        path
    });

    let scheme = match server.get("HTTPS").map(String::as_str) {
        Some(v) if !v.is_empty() && !v.eq_ignore_ascii_case("off") => "https",
        _ => "http",
    };
    let host = server.get("HTTP_HOST").cloned().or_else(|| {
        server.get("SERVER_NAME").map(|name| match server.get("SERVER_PORT") {
            Some(port) if port != "80" && port != "443" => format!("{name}:{port}"),
            _ => name.clone(),
        })
    });

    let full = match host {
        Some(host) => format!("{scheme}://{host}{path}"),
        None => path,
    };
    full.parse().unwrap_or_default()
}
