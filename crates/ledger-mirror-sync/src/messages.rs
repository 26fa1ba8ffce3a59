//! Fetch protocol message types.
//!
//! A replica sends a [`FetchRequest`] naming the position it wants served and,
//! optionally, the bytes it already holds just before that position. The
//! remote answers with a [`FetchReply`]: either a window of data described by
//! a cursor wire string, or an explicit error.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use ledger_mirror_core::Cursor;

use crate::error::{Result, SyncError};

/// Message size limits.
pub mod limits {
    /// Max payload bytes in one response.
    pub const MAX_RESPONSE_BYTES: u64 = 8 * 1024 * 1024;
    /// Max bytes_before in one request.
    pub const MAX_BYTES_BEFORE: usize = 64 * 1024;
    /// Max length of a cursor string.
    pub const MAX_CURSOR_LEN: usize = 256;
}

/// Ask the remote for the window starting at a position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    /// Request cursor string (`position=<n>`). `None` asks for the start of the ledger.
    pub cursor: Option<String>,
    /// Local bytes immediately preceding the requested position.
    pub bytes_before: Option<Bytes>,
}

impl FetchRequest {
    /// Build a request from a local cursor.
    pub fn from_cursor(cursor: &Cursor, bytes_before: Option<Bytes>) -> Self {
        Self {
            cursor: Some(cursor.to_request_string()),
            bytes_before,
        }
    }

    /// The position this request asks for, if any.
    pub fn requested_position(&self) -> Option<u64> {
        self.cursor.as_deref().map(|c| Cursor::parse(c).position)
    }

    /// Check if this request respects size limits.
    pub fn validate_limits(&self) -> std::result::Result<(), &'static str> {
        if self
            .cursor
            .as_ref()
            .is_some_and(|c| c.len() > limits::MAX_CURSOR_LEN)
        {
            return Err("cursor string too long");
        }
        if self
            .bytes_before
            .as_ref()
            .is_some_and(|b| b.len() > limits::MAX_BYTES_BEFORE)
        {
            return Err("too many bytes_before");
        }
        Ok(())
    }

    /// Encode as CBOR.
    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        to_cbor(self)
    }

    /// Decode from CBOR.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        from_cbor(bytes)
    }
}

/// One window of ledger data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResponse {
    /// Cursor wire string describing `data`.
    pub cursor: String,
    /// The bytes of the window.
    pub data: Bytes,
}

impl FetchResponse {
    /// Decode the attached cursor.
    pub fn parsed_cursor(&self) -> Cursor {
        Cursor::parse(&self.cursor)
    }
}

/// What a remote sends back for a [`FetchRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchReply {
    /// The requested window.
    Data(FetchResponse),
    /// The remote refused or failed to serve the request.
    Error {
        /// Human-readable description.
        message: String,
    },
}

impl FetchReply {
    /// Turn an explicit remote error into [`SyncError::Remote`].
    pub fn into_result(self) -> Result<FetchResponse> {
        match self {
            FetchReply::Data(response) => Ok(response),
            FetchReply::Error { message } => Err(SyncError::Remote(message)),
        }
    }

    /// Encode as CBOR.
    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        to_cbor(self)
    }

    /// Decode from CBOR.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        from_cbor(bytes)
    }
}

impl From<Result<FetchResponse>> for FetchReply {
    fn from(result: Result<FetchResponse>) -> Self {
        match result {
            Ok(response) => FetchReply::Data(response),
            Err(SyncError::Remote(message)) => FetchReply::Error { message },
            Err(e) => FetchReply::Error {
                message: e.to_string(),
            },
        }
    }
}

fn to_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf)
        .map_err(|e| SyncError::InvalidMessage(format!("CBOR encode failed: {}", e)))?;
    Ok(buf)
}

fn from_cbor<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T> {
    ciborium::from_reader(bytes)
        .map_err(|e| SyncError::InvalidMessage(format!("CBOR decode failed: {}", e)))
}
