//! Two-step control surface modeled on an async message-channel host:
//! `init` isolates the header from the supplied byte ranges, `parse`
//! decodes it. Each step answers with a serializable discriminated
//! response so the host can forward it over a channel verbatim.

use crate::parser::{locate_header, parse_header, ParseLimits, ParseOutput};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ParserResponse {
    /// The step completed; `id` names it.
    Event { id: &'static str },
    Error { cause: String },
}

#[derive(Debug, Default)]
pub struct Mp4Parser {
    limits: ParseLimits,
    header: Option<Vec<u8>>,
    output: Option<ParseOutput>,
}

impl Mp4Parser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: ParseLimits) -> Self {
        Self { limits, ..Self::default() }
    }

    /// Locate and copy the brand and movie-header boxes out of `head`
    /// (and `tail`, when the caller fetched a file suffix as well).
    pub fn init(&mut self, head: &[u8], tail: Option<&[u8]>) -> ParserResponse {
        match locate_header(head, tail) {
            Ok(bytes) => {
                self.header = Some(bytes);
                self.output = None;
                ParserResponse::Event { id: "init-done" }
            }
            Err(e) => ParserResponse::Error { cause: e.to_string() },
        }
    }

    /// Decode the isolated header. Requires a successful [`Mp4Parser::init`].
    pub fn parse(&mut self) -> ParserResponse {
        let Some(header) = &self.header else {
            return ParserResponse::Error { cause: "init has not completed".to_string() };
        };
        match parse_header(header, &self.limits) {
            Ok(out) => {
                self.output = Some(out);
                ParserResponse::Event { id: "parse-done" }
            }
            Err(e) => ParserResponse::Error { cause: e.to_string() },
        }
    }

    /// The typed result of the last successful [`Mp4Parser::parse`].
    pub fn output(&self) -> Option<&ParseOutput> {
        self.output.as_ref()
    }

    pub fn take_output(&mut self) -> Option<ParseOutput> {
        self.output.take()
    }
}
