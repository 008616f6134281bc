use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;

use failure::{format_err, ResultExt};
use log::info;
use serde::{Deserialize, Serialize};

use crate::errors::*;

/// An auxiliary entity returned by the tokenization service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpacyEntity {
    pub entity: String,
    pub resolution: SpacyResolution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpacyResolution {
    pub value: String,
}

/// Line-based socket client of the tokenization child process. The
/// process is recycled on language switch, after which `connect` must be
/// called again before any extraction.
pub trait TokenizerClient: Send {
    fn connect(&mut self) -> Result<()>;

    fn spacy_entities(&mut self, utterance: &str) -> Result<Vec<SpacyEntity>>;
}

#[derive(Serialize)]
struct Request<'a> {
    method: &'static str,
    utterance: &'a str,
}

pub struct TcpTokenizerClient {
    addr: String,
    stream: Option<TcpStream>,
}

impl TcpTokenizerClient {
    pub fn new(host: &str, port: u16) -> TcpTokenizerClient {
        TcpTokenizerClient {
            addr: format!("{}:{}", host, port),
            stream: None,
        }
    }

    fn request(&mut self, request: &Request) -> Result<String> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| format_err!("Tokenization service is not connected"))?;
        let mut payload = serde_json::to_string(request)?;
        payload.push('\n');
        stream
            .write_all(payload.as_bytes())
            .with_context(|_| "Cannot write to the tokenization service")?;

        let mut reply = String::new();
        let mut reader = BufReader::new(stream.try_clone()?);
        reader
            .read_line(&mut reply)
            .with_context(|_| "Cannot read from the tokenization service")?;
        Ok(reply)
    }
}

impl TokenizerClient for TcpTokenizerClient {
    fn connect(&mut self) -> Result<()> {
        let stream = TcpStream::connect(&self.addr)
            .with_context(|_| format!("Cannot reach the tokenization service at {}", self.addr))?;
        info!("Connected to the tokenization service ({})", self.addr);
        self.stream = Some(stream);
        Ok(())
    }

    fn spacy_entities(&mut self, utterance: &str) -> Result<Vec<SpacyEntity>> {
        let reply = self.request(&Request {
            method: "get_spacy_entities",
            utterance,
        })?;
        let entities = serde_json::from_str(&reply)
            .with_context(|_| "Invalid reply from the tokenization service")?;
        Ok(entities)
    }
}
