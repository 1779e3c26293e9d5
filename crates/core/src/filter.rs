use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::scalar::Scalar;

/// Alias lists the query layer tries in order when lifting a conventional
/// HTTP facet (method, route, status...) out of a root span's attributes.
/// OTLP's semantic conventions changed key names across versions; the source
/// collector copes by trying the old key, then the new one.
const METHOD_KEYS: &[&str] = &["http.method", "http.request.method"];
const ROUTE_KEYS: &[&str] = &["http.route", "http.target", "url.path"];
const STATUS_CODE_KEYS: &[&str] = &["http.status_code", "http.response.status_code"];
const SERVER_NAME_KEYS: &[&str] = &["http.server_name", "server.address", "net.host.name"];
const SCHEME_KEYS: &[&str] = &["http.scheme", "url.scheme"];
const HOST_KEYS: &[&str] = &["http.host", "server.address"];
const TARGET_KEYS: &[&str] = &["http.target", "url.path"];
const URL_KEYS: &[&str] = &["http.url", "url.full"];

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct HttpAttrs {
    pub method: Option<String>,
    pub route: Option<String>,
    pub status_code: Option<String>,
    pub server_name: Option<String>,
    pub scheme: Option<String>,
    pub host: Option<String>,
    pub target: Option<String>,
    pub url: Option<String>,
}

/// Returns the value of the first key present among `keys`, stringified.
pub fn first_of(attrs: &BTreeMap<String, Scalar>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| attrs.get(*key))
        .map(Scalar::to_display_string)
}

pub fn extract_http_attrs(attrs: &BTreeMap<String, Scalar>) -> HttpAttrs {
    HttpAttrs {
        method: first_of(attrs, METHOD_KEYS),
        route: first_of(attrs, ROUTE_KEYS),
        status_code: first_of(attrs, STATUS_CODE_KEYS),
        server_name: first_of(attrs, SERVER_NAME_KEYS),
        scheme: first_of(attrs, SCHEME_KEYS),
        host: first_of(attrs, HOST_KEYS),
        target: first_of(attrs, TARGET_KEYS),
        url: first_of(attrs, URL_KEYS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_through_alias_list() {
        let mut attrs = BTreeMap::new();
        attrs.insert(
            "http.request.method".to_string(),
            Scalar::String("GET".to_string()),
        );
        let http = extract_http_attrs(&attrs);
        assert_eq!(http.method.as_deref(), Some("GET"));
        assert_eq!(http.route, None);
    }

    #[test]
    fn prefers_first_alias_when_both_present() {
        let mut attrs = BTreeMap::new();
        attrs.insert("http.method".to_string(), Scalar::String("POST".into()));
        attrs.insert(
            "http.request.method".to_string(),
            Scalar::String("GET".into()),
        );
        let http = extract_http_attrs(&attrs);
        assert_eq!(http.method.as_deref(), Some("POST"));
    }
}
