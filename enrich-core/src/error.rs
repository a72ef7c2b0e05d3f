use std::{fmt, time::Duration};

use thiserror::Error;

use crate::provider::ServiceKind;

/// Why a single outbound call did not produce a usable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallErrorKind {
    Timeout,
    Network,
    Http,
    Parse,
    /// The service answered successfully but had nothing for the query.
    NoMatch,
}

impl CallErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallErrorKind::Timeout => "timeout",
            CallErrorKind::Network => "network error",
            CallErrorKind::Http => "HTTP error",
            CallErrorKind::Parse => "parse error",
            CallErrorKind::NoMatch => "no match",
        }
    }

    /// Faults of the transport or the remote service, as opposed to an empty answer.
    pub fn is_fault(&self) -> bool {
        !matches!(self, CallErrorKind::NoMatch)
    }
}

impl fmt::Display for CallErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("{service} {kind}: {detail}")]
pub struct CallError {
    pub service: ServiceKind,
    pub kind: CallErrorKind,
    pub detail: String,
}

impl CallError {
    pub fn new(service: ServiceKind, kind: CallErrorKind, detail: impl Into<String>) -> Self {
        Self { service, kind, detail: detail.into() }
    }

    pub fn timeout(service: ServiceKind, after: Duration) -> Self {
        Self::new(service, CallErrorKind::Timeout, format!("no response within {after:?}"))
    }

    pub fn no_match(service: ServiceKind, detail: impl Into<String>) -> Self {
        Self::new(service, CallErrorKind::NoMatch, detail)
    }

    pub fn parse(service: ServiceKind, detail: impl Into<String>) -> Self {
        Self::new(service, CallErrorKind::Parse, detail)
    }

    /// Classify a reqwest failure that happened before a status was available.
    pub fn from_transport(service: ServiceKind, err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            CallErrorKind::Timeout
        } else if err.is_decode() {
            CallErrorKind::Parse
        } else {
            CallErrorKind::Network
        };

        Self::new(service, kind, err.to_string())
    }
}
