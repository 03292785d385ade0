//! Announces new articles on Twitter.
//!
//! [`Twitter`] posts a status through the v2 `POST /2/tweets` endpoint,
//! authorized with an OAuth 1.0a user-context signature (HMAC-SHA1) built
//! from the four configured credentials.

use crate::config::Config;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use log::info;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const TWEETS_URL: &str = "https://api.twitter.com/2/tweets";

/// RFC 3986 unreserved characters are left alone; everything else is
/// percent-encoded.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Posts short status updates.
pub trait Publisher {
    fn post(&self, status: &str) -> Result<()>;
}

/// The four OAuth 1.0a credentials.
#[derive(Clone)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("access_token", &self.access_token)
            .finish_non_exhaustive()
    }
}

/// Posts statuses to Twitter.
pub struct Twitter {
    credentials: Credentials,
    client: reqwest::blocking::Client,
}

#[derive(Serialize)]
struct TweetRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct TweetResponse {
    data: TweetData,
}

#[derive(Deserialize)]
struct TweetData {
    id: String,
}

impl Twitter {
    /// Builds a client from the `twtr_*` config keys. Returns `Ok(None)`
    /// unless all four are present.
    pub fn from_config(config: &Config) -> Result<Option<Twitter>> {
        match config.twitter_credentials() {
            Some([consumer_key, consumer_secret, access_token, access_token_secret]) => {
                Ok(Some(Twitter::new(Credentials {
                    consumer_key: consumer_key.to_owned(),
                    consumer_secret: consumer_secret.to_owned(),
                    access_token: access_token.to_owned(),
                    access_token_secret: access_token_secret.to_owned(),
                })?))
            }
            None => Ok(None),
        }
    }

    pub fn new(credentials: Credentials) -> Result<Twitter> {
        Ok(Twitter {
            credentials,
            client: reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()?,
        })
    }
}

impl Publisher for Twitter {
    fn post(&self, status: &str) -> Result<()> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let authorization = authorization_header(
            &self.credentials,
            "POST",
            TWEETS_URL,
            &[],
            &now.as_secs().to_string(),
            &format!("{:x}", now.as_nanos()),
        )?;

        let response = self
            .client
            .post(TWEETS_URL)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .json(&TweetRequest { text: status })
            .send()?;
        let status_code = response.status();
        if !status_code.is_success() {
            return Err(Error::Rejected {
                status: status_code.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }

        let body = response.text()?;
        let tweet: TweetResponse = serde_json::from_str(&body).map_err(Error::Decode)?;
        info!("Posted status {}", tweet.data.id);
        Ok(())
    }
}

fn encode(s: &str) -> String {
    utf8_percent_encode(s, OAUTH_ENCODE_SET).to_string()
}

/// Builds the OAuth 1.0a signature base string: the method, the URL, and
/// the sorted, encoded parameters, each encoded and joined by `&`.
pub fn signature_base_string(method: &str, url: &str, params: &[(&str, &str)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (encode(k), encode(v)))
        .collect();
    encoded.sort();
    let joined = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}&{}&{}", method, encode(url), encode(&joined))
}

/// Signs `base` with HMAC-SHA1 keyed by the two secrets and returns the
/// base64 signature.
pub fn sign(credentials: &Credentials, base: &str) -> Result<String> {
    let key = format!(
        "{}&{}",
        encode(&credentials.consumer_secret),
        encode(&credentials.access_token_secret)
    );
    let mut mac = Hmac::<Sha1>::new_from_slice(key.as_bytes()).map_err(|_| Error::SigningKey)?;
    mac.update(base.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Builds the `Authorization` header for a request. `request_params` are
/// the query or form parameters that take part in the signature (a JSON
/// body does not).
pub fn authorization_header(
    credentials: &Credentials,
    method: &str,
    url: &str,
    request_params: &[(&str, &str)],
    timestamp: &str,
    nonce: &str,
) -> Result<String> {
    let oauth_params = [
        ("oauth_consumer_key", credentials.consumer_key.as_str()),
        ("oauth_nonce", nonce),
        ("oauth_signature_method", "HMAC-SHA1"),
        ("oauth_timestamp", timestamp),
        ("oauth_token", credentials.access_token.as_str()),
        ("oauth_version", "1.0"),
    ];
    let mut all_params: Vec<(&str, &str)> = oauth_params.to_vec();
    all_params.extend_from_slice(request_params);
    let signature = sign(credentials, &signature_base_string(method, url, &all_params))?;

    let mut header_params: Vec<(&str, &str)> = oauth_params.to_vec();
    header_params.push(("oauth_signature", &signature));
    header_params.sort();
    Ok(format!(
        "OAuth {}",
        header_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join(", ")
    ))
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failure to post a status.
#[derive(Debug)]
pub enum Error {
    /// The HTTP request failed.
    Http(reqwest::Error),

    /// The API's response wasn't the expected JSON.
    Decode(serde_json::Error),

    /// The API answered with a non-success status.
    Rejected { status: u16, body: String },

    /// The HMAC key was rejected.
    SigningKey,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Http(err) => write!(f, "Posting status: {}", err),
            Error::Decode(err) => write!(f, "Decoding posted status: {}", err),
            Error::Rejected { status, body } => {
                write!(f, "Posting status: HTTP {}: {}", status, body)
            }
            Error::SigningKey => write!(f, "Posting status: invalid signing key"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(err) => Some(err),
            Error::Decode(err) => Some(err),
            Error::Rejected { .. } | Error::SigningKey => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Error {
        Error::Http(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::path::Path;

    // The worked example from Twitter's "Creating a signature" guide.
    fn example_credentials() -> Credentials {
        Credentials {
            consumer_key: String::from("xvz1evFS4wEEPTGEFPHBog"),
            consumer_secret: String::from("kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw"),
            access_token: String::from("370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb"),
            access_token_secret: String::from("LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE"),
        }
    }

    const EXAMPLE_URL: &str = "https://api.twitter.com/1.1/statuses/update.json";
    const EXAMPLE_STATUS: &str = "Hello Ladies + Gentlemen, a signed OAuth request!";
    const EXAMPLE_NONCE: &str = "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg";
    const EXAMPLE_TIMESTAMP: &str = "1318622958";

    #[test]
    fn test_signature_base_string() {
        let credentials = example_credentials();
        let base = signature_base_string(
            "POST",
            EXAMPLE_URL,
            &[
                ("status", EXAMPLE_STATUS),
                ("include_entities", "true"),
                ("oauth_consumer_key", &credentials.consumer_key),
                ("oauth_nonce", EXAMPLE_NONCE),
                ("oauth_signature_method", "HMAC-SHA1"),
                ("oauth_timestamp", EXAMPLE_TIMESTAMP),
                ("oauth_token", &credentials.access_token),
                ("oauth_version", "1.0"),
            ],
        );
        assert_eq!(
            "POST&https%3A%2F%2Fapi.twitter.com%2F1.1%2Fstatuses%2Fupdate.json&\
             include_entities%3Dtrue%26oauth_consumer_key%3Dxvz1evFS4wEEPTGEFPHBog%26\
             oauth_nonce%3DkYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg%26\
             oauth_signature_method%3DHMAC-SHA1%26oauth_timestamp%3D1318622958%26\
             oauth_token%3D370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb%26\
             oauth_version%3D1.0%26status%3DHello%2520Ladies%2520%252B%2520Gentlemen%252C%2520\
             a%2520signed%2520OAuth%2520request%2521",
            base
        );
    }

    #[test]
    fn test_authorization_header_signature() -> Result<()> {
        let header = authorization_header(
            &example_credentials(),
            "POST",
            EXAMPLE_URL,
            &[("include_entities", "true"), ("status", EXAMPLE_STATUS)],
            EXAMPLE_TIMESTAMP,
            EXAMPLE_NONCE,
        )?;
        assert!(header.starts_with("OAuth oauth_consumer_key=\"xvz1evFS4wEEPTGEFPHBog\", "));
        assert!(
            header.contains("oauth_signature=\"hCtSmYh%2BiHYCEqBWrE7C7hYmtUk%3D\""),
            "{}",
            header
        );
        assert!(!header.contains("status="), "{}", header);
        Ok(())
    }

    #[test]
    fn test_from_config_requires_all_credentials() -> Result<()> {
        let partial = Config::parse(Path::new("/blog"), "twtr_consumer_key a\n").unwrap();
        assert!(Twitter::from_config(&partial)?.is_none());
        Ok(())
    }

    #[test]
    fn test_decode_response() {
        let tweet: TweetResponse =
            serde_json::from_str(r#"{"data":{"id":"1445880548472328192","text":"Hello"}}"#)
                .unwrap();
        assert_eq!("1445880548472328192", tweet.data.id);
    }

    #[test]
    fn test_debug_hides_secrets() {
        let debug = format!("{:?}", example_credentials());
        assert!(!debug.contains("kAcSOq"), "{}", debug);
        assert!(!debug.contains("LswwdoUa"), "{}", debug);
    }
}
