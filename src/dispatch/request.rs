//! Request line parsing and target validation.

use reqwest::Url;

use crate::error::{ProxyError, Result};

/// Method and target pulled out of a `GET <absolute-url> <version>` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    pub target: String,
    pub version: Option<String>,
}

impl RequestLine {
    /// Splits a request line. Needs at least a method and a target.
    pub fn parse(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
            return Err(ProxyError::BadRequest(format!(
                "malformed request line: {:?}",
                line.trim_end()
            )));
        };
        Ok(Self {
            method: method.to_string(),
            target: target.to_string(),
            version: parts.next().map(str::to_string),
        })
    }
}

/// Accepts only GET. Method names are case-sensitive.
pub fn validate_method(method: &str) -> Result<()> {
    if method == "GET" {
        Ok(())
    } else {
        Err(ProxyError::BadRequest(format!(
            "unsupported method: {method}"
        )))
    }
}

/// Parses an absolute `http`/`https` URL with a host.
pub fn parse_target(target: &str) -> Result<Url> {
    let url = Url::parse(target)
        .map_err(|err| ProxyError::BadRequest(format!("invalid url {target:?}: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ProxyError::BadRequest(format!(
            "unsupported scheme: {}",
            url.scheme()
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ProxyError::BadRequest(format!("url has no host: {target}")));
    }
    Ok(url)
}
