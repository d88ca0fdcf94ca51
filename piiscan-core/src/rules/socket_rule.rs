// piiscan-core/src/rules/socket_rule.rs
//! Delegates classification to an external service over TCP.
//!
//! The wire protocol is line-delimited JSON. Each request is a single line
//! `{"field": "...", "value": "..."}` and the service answers with a single line
//! holding a JSON array of parts (`Word`, `Classification`, `Offset`).
//! An empty array means the service found nothing.
//!
//! License: MIT OR APACHE 2.0

use std::fmt;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::{Mutex, PoisonError};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::errors::{PiiScanError, Result};
use crate::failure::FailurePart;
use crate::rules::{AppliableRule, RuleAction, RuleOutcome};

#[derive(Serialize)]
struct SocketRequest<'a> {
    field: &'a str,
    value: &'a str,
}

#[derive(Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SocketRule {
    pub host: String,
    pub port: u16,
    #[serde(skip)]
    connection: Mutex<Option<BufReader<TcpStream>>>,
}

impl SocketRule {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connection: Mutex::new(None),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn socket_error(&self, reason: impl fmt::Display) -> PiiScanError {
        PiiScanError::Socket {
            endpoint: self.endpoint(),
            reason: reason.to_string(),
        }
    }

    fn exchange(&self, conn: &mut BufReader<TcpStream>, request: &str) -> Result<Vec<FailurePart>> {
        let stream = conn.get_mut();
        stream.write_all(request.as_bytes()).map_err(|e| self.socket_error(e))?;
        stream.write_all(b"\n").map_err(|e| self.socket_error(e))?;
        stream.flush().map_err(|e| self.socket_error(e))?;

        let mut line = String::new();
        let read = conn.read_line(&mut line).map_err(|e| self.socket_error(e))?;
        if read == 0 {
            return Err(self.socket_error("connection closed by classifier"));
        }
        serde_json::from_str(line.trim_end()).map_err(|e| self.socket_error(format!("invalid response: {}", e)))
    }

    /// Sends one value to the classifier and returns the parts it found.
    pub fn classify(&self, field_name: &str, field_value: &str) -> Result<Vec<FailurePart>> {
        let request = serde_json::to_string(&SocketRequest {
            field: field_name,
            value: field_value,
        })
        .map_err(|e| PiiScanError::SerializationError(e.to_string()))?;

        let mut guard = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.is_none() {
            debug!("Connecting to socket classifier at {}", self.endpoint());
            let stream = TcpStream::connect((self.host.as_str(), self.port)).map_err(|e| self.socket_error(e))?;
            *guard = Some(BufReader::new(stream));
        }

        let result = match guard.as_mut() {
            Some(conn) => self.exchange(conn, &request),
            None => Err(self.socket_error("not connected")),
        };
        if let Err(e) = &result {
            warn!("Dropping connection to socket classifier: {}", e);
            *guard = None;
        }
        result
    }
}

impl Clone for SocketRule {
    fn clone(&self) -> Self {
        Self::new(self.host.clone(), self.port)
    }
}

impl PartialEq for SocketRule {
    fn eq(&self, other: &Self) -> bool {
        self.host == other.host && self.port == other.port
    }
}

impl fmt::Debug for SocketRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketRule")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

impl AppliableRule for SocketRule {
    fn apply(&self, field_name: &str, field_value: &str) -> Result<RuleOutcome> {
        let parts = self.classify(field_name, field_value)?;
        if parts.is_empty() {
            Ok((RuleAction::None, parts))
        } else {
            Ok((RuleAction::Report, parts))
        }
    }
}
