//! Blocking JSON over HTTP with a bounded timeout.
//!
//! Each call is a single request: no retry, no queueing. Transport failures
//! map to [`BridgeError::Unreachable`] or [`BridgeError::Timeout`], non-2xx
//! answers to [`BridgeError::Status`] and undecodable bodies to
//! [`BridgeError::Malformed`].

use std::error::Error as _;
use std::io;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::BridgeError;

const USER_AGENT: &str = concat!("ptree/", env!("CARGO_PKG_VERSION"));

/// A ureq agent bound to one timeout.
#[derive(Debug, Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
    timeout: Duration,
}

impl HttpClient {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self { agent, timeout }
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `POST url` with a JSON body, decoding the JSON answer.
    pub fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, BridgeError> {
        debug!(url, "POST");
        let response = self
            .agent
            .post(url)
            .set("User-Agent", USER_AGENT)
            .set("Accept", "application/json")
            .send_json(body);
        self.decode(url, response)
    }

    /// `GET url`, decoding the JSON answer.
    pub fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, BridgeError> {
        debug!(url, "GET");
        let response = self
            .agent
            .get(url)
            .set("User-Agent", USER_AGENT)
            .set("Accept", "application/json")
            .call();
        self.decode(url, response)
    }

    /// `GET url`, succeeding on any 2xx answer regardless of body.
    pub fn get_ok(&self, url: &str) -> Result<(), BridgeError> {
        debug!(url, "GET");
        self.agent
            .get(url)
            .set("User-Agent", USER_AGENT)
            .call()
            .map(drop)
            .map_err(|err| self.map_error(url, err))
    }

    fn decode<T: DeserializeOwned>(
        &self,
        url: &str,
        response: Result<ureq::Response, ureq::Error>,
    ) -> Result<T, BridgeError> {
        let response = response.map_err(|err| self.map_error(url, err))?;
        let text = response
            .into_string()
            .map_err(|err| self.map_io(url, &err))?;
        serde_json::from_str(&text).map_err(|err| BridgeError::malformed(url, err.to_string()))
    }

    fn map_error(&self, url: &str, err: ureq::Error) -> BridgeError {
        match err {
            ureq::Error::Status(status, response) => {
                let body = response.into_string().unwrap_or_default();
                BridgeError::status(url, status, &body)
            }
            ureq::Error::Transport(transport) => {
                if is_timeout(&transport) {
                    self.timed_out(url)
                } else {
                    BridgeError::Unreachable {
                        url: url.to_string(),
                        reason: transport.to_string(),
                    }
                }
            }
        }
    }

    fn map_io(&self, url: &str, err: &io::Error) -> BridgeError {
        if matches!(err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) {
            self.timed_out(url)
        } else {
            BridgeError::malformed(url, err.to_string())
        }
    }

    fn timed_out(&self, url: &str) -> BridgeError {
        BridgeError::Timeout {
            url: url.to_string(),
            secs: self.timeout.as_secs().max(1),
        }
    }
}

fn is_timeout(transport: &ureq::Transport) -> bool {
    let mut source = transport.source();
    while let Some(err) = source {
        if let Some(io_err) = err.downcast_ref::<io::Error>()
            && matches!(
                io_err.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
            )
        {
            return true;
        }
        source = err.source();
    }
    transport.to_string().contains("timed out")
}

/// Join a base endpoint and a path with exactly one slash between them.
#[must_use]
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{path}")
    }
}

/// One-shot reachability check used by health polling.
pub fn probe(url: &str, timeout: Duration) -> Result<(), BridgeError> {
    HttpClient::new(timeout).get_ok(url)
}
