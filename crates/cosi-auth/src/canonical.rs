//! Canonical string construction for both signing schemes.
//!
//! The user-management API signs a four-line string:
//!
//! ```text
//! HTTPRequestMethod\n
//! Host\n
//! URI\n
//! SortedQueryString
//! ```
//!
//! Object-storage requests use the AWS SigV4 canonical request:
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n\n
//! SignedHeaders\n
//! HashedPayload
//! ```

use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// Characters that stay unescaped: `A-Z a-z 0-9 - _ . ~`.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Escape a query component form-style: unreserved bytes are kept, a space
/// becomes `+` and everything else becomes `%XX`.
///
/// # Examples
///
/// ```
/// use cosi_auth::canonical::query_escape;
///
/// assert_eq!(query_escape("a b"), "a+b");
/// assert_eq!(query_escape("2024-01-02T03:04:05.6Z"), "2024-01-02T03%3A04%3A05.6Z");
/// assert_eq!(query_escape("k/v+="), "k%2Fv%2B%3D");
/// ```
#[must_use]
pub fn query_escape(input: &str) -> String {
    utf8_percent_encode(input, UNRESERVED)
        .to_string()
        .replace("%20", "+")
}

/// Build a query string with parameters sorted by key, each key and value
/// escaped with [`query_escape`], joined by `=` and `&`.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use cosi_auth::canonical::build_sorted_query_string;
///
/// let params = BTreeMap::from([
///     ("UserName".to_owned(), "alice".to_owned()),
///     ("Action".to_owned(), "GetUser".to_owned()),
/// ]);
/// assert_eq!(build_sorted_query_string(&params), "Action=GetUser&UserName=alice");
/// ```
#[must_use]
pub fn build_sorted_query_string(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", query_escape(k), query_escape(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the four-line string signed by the user-management API.
///
/// # Examples
///
/// ```
/// use cosi_auth::canonical::build_query_string_to_sign;
///
/// let sts = build_query_string_to_sign("GET", "10.0.0.1:9443", "/poe/rest", "Action=GetUser");
/// assert_eq!(sts, "GET\n10.0.0.1:9443\n/poe/rest\nAction=GetUser");
/// ```
#[must_use]
pub fn build_query_string_to_sign(method: &str, host: &str, uri: &str, query: &str) -> String {
    format!("{method}\n{host}\n{uri}\n{query}")
}

/// Build the full SigV4 canonical request string from its components.
///
/// # Examples
///
/// ```
/// use cosi_auth::canonical::build_canonical_request;
///
/// let canonical = build_canonical_request(
///     "GET",
///     "/test.txt",
///     "",
///     &[("host", "examplebucket.s3.amazonaws.com")],
///     &["host"],
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
/// );
/// assert!(canonical.starts_with("GET\n/test.txt\n"));
/// ```
#[must_use]
pub fn build_canonical_request(
    method: &str,
    uri: &str,
    query_string: &str,
    headers: &[(&str, &str)],
    signed_headers: &[&str],
    payload_hash: &str,
) -> String {
    let canonical_uri = build_canonical_uri(uri);
    let canonical_query = build_canonical_query_string(query_string);
    let canonical_headers = build_canonical_headers(headers, signed_headers);
    let signed_headers_str = build_signed_headers_string(signed_headers);

    format!(
        "{method}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}\n\n{signed_headers_str}\n{payload_hash}"
    )
}

/// Build the canonical URI by encoding each path segment; `/` is preserved
/// and an empty path becomes `/`.
///
/// # Examples
///
/// ```
/// use cosi_auth::canonical::build_canonical_uri;
///
/// assert_eq!(build_canonical_uri("/my-bucket"), "/my-bucket");
/// assert_eq!(build_canonical_uri(""), "/");
/// ```
#[must_use]
pub fn build_canonical_uri(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return "/".to_owned();
    }

    path.split('/')
        .map(|segment| {
            // Decode first so an already-encoded path is not double-encoded.
            let decoded = percent_decode_str(segment).decode_utf8_lossy();
            utf8_percent_encode(&decoded, UNRESERVED).to_string()
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Build the canonical query string by sorting `key=value` pairs.
///
/// A bare key such as `policy` is normalized to `policy=`.
///
/// # Examples
///
/// ```
/// use cosi_auth::canonical::build_canonical_query_string;
///
/// assert_eq!(build_canonical_query_string(""), "");
/// assert_eq!(build_canonical_query_string("policy"), "policy=");
/// assert_eq!(build_canonical_query_string("b=2&a=1"), "a=1&b=2");
/// ```
#[must_use]
pub fn build_canonical_query_string(query: &str) -> String {
    if query.is_empty() {
        return String::new();
    }

    let mut params: Vec<(&str, &str)> = query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|param| param.split_once('=').unwrap_or((param, "")))
        .collect();

    params.sort_unstable();

    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the canonical headers block from the headers named in `signed_headers`.
///
/// Names are lowercased, values trimmed with inner whitespace collapsed, and
/// the result is sorted by name without a trailing newline.
#[must_use]
pub fn build_canonical_headers(headers: &[(&str, &str)], signed_headers: &[&str]) -> String {
    let mut header_map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let trimmed_value = collapse_whitespace(value.trim());
        header_map
            .entry(name.to_lowercase())
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(&trimmed_value);
            })
            .or_insert(trimmed_value);
    }

    let mut sorted_signed: Vec<&str> = signed_headers.to_vec();
    sorted_signed.sort_unstable();

    sorted_signed
        .iter()
        .filter_map(|name| header_map.get(*name).map(|value| format!("{name}:{value}")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Semicolon-separated, sorted list of signed header names.
///
/// # Examples
///
/// ```
/// use cosi_auth::canonical::build_signed_headers_string;
///
/// assert_eq!(build_signed_headers_string(&["x-amz-date", "host"]), "host;x-amz-date");
/// ```
#[must_use]
pub fn build_signed_headers_string(signed_headers: &[&str]) -> String {
    let mut sorted: Vec<&str> = signed_headers.to_vec();
    sorted.sort_unstable();
    sorted.join(";")
}

fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_was_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_was_space {
                result.push(' ');
                prev_was_space = true;
            }
        } else {
            result.push(ch);
            prev_was_space = false;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_keep_unreserved_characters() {
        let unreserved = "ABCxyz019-_.~";
        assert_eq!(query_escape(unreserved), unreserved);
    }

    #[test]
    fn test_should_escape_reserved_characters_as_uppercase_hex() {
        assert_eq!(query_escape("a/b"), "a%2Fb");
        assert_eq!(query_escape("a+b"), "a%2Bb");
        assert_eq!(query_escape("a=b&c"), "a%3Db%26c");
        assert_eq!(query_escape("ü"), "%C3%BC");
    }

    #[test]
    fn test_should_encode_space_as_plus() {
        assert_eq!(query_escape("hello world"), "hello+world");
    }

    #[test]
    fn test_should_sort_params_by_key() {
        let params = BTreeMap::from([
            ("Timestamp".to_owned(), "2024-05-06T07:08:09.1Z".to_owned()),
            ("AWSAccessKeyId".to_owned(), "AK".to_owned()),
            ("Action".to_owned(), "CreateUser".to_owned()),
        ]);
        assert_eq!(
            build_sorted_query_string(&params),
            "AWSAccessKeyId=AK&Action=CreateUser&Timestamp=2024-05-06T07%3A08%3A09.1Z"
        );
    }

    #[test]
    fn test_should_build_empty_query_for_no_params() {
        assert_eq!(build_sorted_query_string(&BTreeMap::new()), "");
    }

    #[test]
    fn test_should_build_canonical_request_with_subresource_query() {
        let canonical = build_canonical_request(
            "GET",
            "/bucket",
            "policy",
            &[("Host", "10.0.0.1:443"), ("X-Amz-Date", "20240101T000000Z")],
            &["host", "x-amz-date"],
            "UNSIGNED",
        );
        assert_eq!(
            canonical,
            "GET\n/bucket\npolicy=\nhost:10.0.0.1:443\nx-amz-date:20240101T000000Z\n\nhost;x-amz-date\nUNSIGNED"
        );
    }

    #[test]
    fn test_should_not_double_encode_uri() {
        assert_eq!(build_canonical_uri("/my%20bucket"), "/my%20bucket");
        assert_eq!(build_canonical_uri("/my bucket"), "/my%20bucket");
    }

    #[test]
    fn test_should_collapse_header_whitespace() {
        let result = build_canonical_headers(&[("X-Amz-Acl", "  public   read ")], &["x-amz-acl"]);
        assert_eq!(result, "x-amz-acl:public read");
    }
}
