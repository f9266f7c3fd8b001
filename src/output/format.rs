use crate::url::extract_authority;
use crate::UrlError;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use url::Url;

/// How an accepted result URL is written to the output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// `host[:port]` only
    Domain,
    /// The full URL with `&amp;` entities decoded
    Url,
    /// `scheme://host[:port]`
    ProtocolDomain,
    /// The link exactly as extracted
    #[default]
    Raw,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "domain" => Ok(Self::Domain),
            "url" => Ok(Self::Url),
            "protocol_domain" => Ok(Self::ProtocolDomain),
            "raw" => Ok(Self::Raw),
            other => Err(format!(
                "unknown format '{}' (expected domain, url, protocol_domain or raw)",
                other
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Domain => "domain",
            Self::Url => "url",
            Self::ProtocolDomain => "protocol_domain",
            Self::Raw => "raw",
        })
    }
}

/// Formats a raw result URL according to the output mode
///
/// The link must parse as a URL with a host whatever the mode, so malformed
/// results are rejected before they reach the dedup filter.
///
/// # Examples
///
/// ```
/// use url_harvester::output::{format_result, OutputFormat};
///
/// let raw = "http://example.com/a?x=1&amp;y=2";
/// assert_eq!(format_result(raw, OutputFormat::Domain).unwrap(), "example.com");
/// assert_eq!(format_result(raw, OutputFormat::Url).unwrap(), "http://example.com/a?x=1&y=2");
/// assert_eq!(format_result(raw, OutputFormat::ProtocolDomain).unwrap(), "http://example.com");
/// ```
pub fn format_result(raw: &str, format: OutputFormat) -> Result<String, UrlError> {
    let url = Url::parse(raw).map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;
    let authority = extract_authority(&url).ok_or(UrlError::MissingDomain)?;

    Ok(match format {
        OutputFormat::Domain => authority,
        OutputFormat::Url => raw.replace("&amp;", "&"),
        OutputFormat::ProtocolDomain => format!("{}://{}", url.scheme(), authority),
        OutputFormat::Raw => raw.to_string(),
    })
}
