// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Low-level RouterOS API connection handling

mod auth;
mod protocol;

use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::router::{PortError, Row};
pub use protocol::{encode_length, encode_word};
use protocol::read_sentence;

/// Connection timeout (5 seconds)
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Read operation timeout (30 seconds)
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// A complete reply to one API command
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Reply {
    pub rows: Vec<Row>,
    /// Message of a `!trap` sentence, if the router reported one
    pub trap: Option<String>,
    /// `=ret=` value carried by `!done`
    pub ret: Option<String>,
}

impl Reply {
    /// Folds raw sentences (each a list of words) into a reply
    pub(crate) fn from_sentences(sentences: &[Vec<String>]) -> Result<Self, PortError> {
        let mut reply = Reply::default();
        for sentence in sentences {
            let Some((kind, attrs)) = sentence.split_first() else {
                continue;
            };
            let attrs = parse_attributes(attrs);
            match kind.as_str() {
                "!re" => reply.rows.push(attrs),
                "!trap" => {
                    let msg = attrs
                        .get("message")
                        .cloned()
                        .unwrap_or_else(|| "trap".to_string());
                    if reply.trap.is_none() {
                        reply.trap = Some(msg);
                    }
                }
                "!done" => {
                    if let Some(ret) = attrs.get("ret") {
                        reply.ret = Some(ret.clone());
                    }
                }
                "!fatal" => {
                    let msg = sentence.get(1).cloned().unwrap_or_default();
                    return Err(PortError::Protocol(format!("RouterOS fatal: {msg}")));
                }
                other => {
                    tracing::trace!("Ignoring unexpected reply word: {}", other);
                }
            }
        }
        Ok(reply)
    }
}

fn parse_attributes(words: &[String]) -> Row {
    let mut row = Row::new();
    for word in words {
        if let Some(stripped) = word.strip_prefix('=') {
            if let Some((k, v)) = stripped.split_once('=') {
                row.insert(k.to_string(), v.to_string());
            }
        }
        // ignore tags and other headers
    }
    row
}

/// Low-level RouterOS API connection
pub(crate) struct RouterOsConnection {
    stream: TcpStream,
}

impl RouterOsConnection {
    pub(crate) async fn connect(addr: &str) -> Result<Self, PortError> {
        tracing::trace!("Attempting TCP connection to: {}", addr);
        let stream = timeout(CONNECTION_TIMEOUT, TcpStream::connect(addr))
            .await
            .map_err(|_| PortError::Timeout(format!("connecting to {addr}")))?
            .map_err(|e| PortError::Connect {
                address: addr.to_string(),
                reason: e.to_string(),
            })?;
        tracing::trace!("TCP connection established to: {}", addr);
        Ok(Self { stream })
    }

    pub(crate) async fn command(&mut self, words: &[String]) -> Result<Reply, PortError> {
        self.send_words(words).await?;
        let sentences = self.read_reply().await?;
        Reply::from_sentences(&sentences)
    }

    async fn send_words(&mut self, words: &[String]) -> Result<(), PortError> {
        let mut buf = Vec::new();
        for w in words {
            buf.extend(encode_word(w));
        }
        // zero length word terminator
        buf.push(0);
        self.stream.write_all(&buf).await?;
        Ok(())
    }

    async fn read_reply(&mut self) -> Result<Vec<Vec<String>>, PortError> {
        // Bound the whole reply so a dead connection cannot hang the caller
        timeout(READ_TIMEOUT, async {
            let mut sentences = Vec::new();
            loop {
                let sentence = read_sentence(&mut self.stream).await?;
                if sentence.is_empty() {
                    continue;
                }
                tracing::trace!("Received sentence: {:?}", sentence);
                let last = matches!(sentence[0].as_str(), "!done" | "!fatal");
                sentences.push(sentence);
                if last {
                    tracing::trace!("Command complete, {} sentences received", sentences.len());
                    return Ok::<_, PortError>(sentences);
                }
            }
        })
        .await
        .map_err(|_| {
            PortError::Timeout("RouterOS did not respond within 30 seconds".to_string())
        })?
    }
}
