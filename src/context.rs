//! Parse runs: options, the run state machine and the streaming pipeline.
//!
//! A run moves through `Idle -> FormatSelected -> Streaming -> Done`, or
//! ends in `Failed` on the first fatal error. A context is good for one run.

use crate::aggregator::{Aggregator, Frame};
use crate::decode::{Decoder, Record};
use crate::dispatch::{Dispatcher, DuplicatePolicy, RecordCounts, RecordHandler};
use crate::error::{DecodeWarning, Error, ErrorKind, Result};
use crate::header::{detect_dialect, OfxHeader};
use crate::tokenizer::Tokenizer;
use crate::types::RecordKind;
use crate::{Dialect, FormatSelection};
use chrono::{FixedOffset, Local};
use log::{error, info, warn};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Which categories of diagnostics a run logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MessageFilter {
    /// Dialect and progress notes.
    pub info: bool,
    /// Status records as they are dispatched.
    pub status: bool,
    /// Decode warnings.
    pub warning: bool,
    /// The fatal error that ends a run.
    pub error: bool,
}

impl Default for MessageFilter {
    fn default() -> Self {
        MessageFilter {
            info: true,
            status: true,
            warning: true,
            error: true,
        }
    }
}

impl MessageFilter {
    /// Nothing is logged.
    pub fn silent() -> Self {
        MessageFilter {
            info: false,
            status: false,
            warning: false,
            error: false,
        }
    }
}

/// Per-run configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    pub format: FormatSelection,
    /// Offset for date/times that carry none.
    pub local_offset: FixedOffset,
    pub duplicates: DuplicatePolicy,
    pub messages: MessageFilter,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            format: FormatSelection::Autodetect,
            local_offset: *Local::now().offset(),
            duplicates: DuplicatePolicy::default(),
            messages: MessageFilter::default(),
        }
    }
}

/// Why a run failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
    pub offset: Option<usize>,
}

impl From<&Error> for Failure {
    fn from(err: &Error) -> Self {
        Failure {
            kind: err.kind(),
            message: err.to_string(),
            offset: err.offset(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Idle,
    FormatSelected,
    Streaming,
    Done,
    Failed(Failure),
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseSummary {
    pub dialect: Dialect,
    pub header: Option<OfxHeader>,
    pub counts: RecordCounts,
    pub warnings: Vec<DecodeWarning>,
}

/// One parse run delivering records to `H`.
///
/// # Examples
///
/// ```no_run
/// use ofxkit::{Callbacks, ParseContext, ParseOptions};
/// use std::ops::ControlFlow;
///
/// let mut context = ParseContext::new(Callbacks::new().on_statement(|statement| {
///     println!("ledger balance: {:?}", statement.ledger_balance);
///     ControlFlow::Continue(())
/// }));
/// context.configure(ParseOptions::default())?;
/// let summary = context.parse_file("statement.ofx")?;
/// println!("{} transactions", summary.counts.transaction);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct ParseContext<H> {
    options: ParseOptions,
    state: RunState,
    handler: H,
    warnings: Vec<DecodeWarning>,
}

impl<H: RecordHandler> ParseContext<H> {
    pub fn new(handler: H) -> Self {
        ParseContext {
            options: ParseOptions::default(),
            state: RunState::Idle,
            handler,
            warnings: Vec::new(),
        }
    }

    /// Set the run options. Allowed until the run begins.
    pub fn configure(&mut self, options: ParseOptions) -> Result<()> {
        match self.state {
            RunState::Idle | RunState::FormatSelected => {
                self.options = options;
                self.state = RunState::FormatSelected;
                Ok(())
            }
            _ => Err(self.invalid_state("configure")),
        }
    }

    /// Read `source` to the end and stream it through the pipeline.
    ///
    /// Records are handed to the handler as their elements close. Records
    /// delivered before a fatal error stand.
    pub fn begin<R: Read>(&mut self, mut source: R) -> Result<ParseSummary> {
        if self.state != RunState::FormatSelected {
            return Err(self.invalid_state("begin"));
        }
        self.state = RunState::Streaming;
        let outcome = self.run(&mut source);
        self.settle(outcome)
    }

    /// Open `path` and run [`begin`](Self::begin) on it.
    pub fn parse_file(&mut self, path: impl AsRef<Path>) -> Result<ParseSummary> {
        if self.state != RunState::FormatSelected {
            return Err(self.invalid_state("begin"));
        }
        match File::open(path.as_ref()) {
            Ok(file) => self.begin(BufReader::new(file)),
            Err(err) => {
                self.state = RunState::Streaming;
                self.settle(Err(err.into()))
            }
        }
    }

    fn settle(&mut self, outcome: Result<ParseSummary>) -> Result<ParseSummary> {
        match outcome {
            Ok(summary) => {
                self.state = RunState::Done;
                if self.options.messages.info {
                    info!(
                        "parsed {} records with {} warnings",
                        summary.counts.total(),
                        summary.warnings.len()
                    );
                }
                Ok(summary)
            }
            Err(err) => {
                if self.options.messages.error {
                    error!("{}", err);
                }
                self.state = RunState::Failed(Failure::from(&err));
                Err(err)
            }
        }
    }

    fn invalid_state(&self, operation: &str) -> Error {
        Error::InvalidState(format!("cannot {} in state {:?}", operation, self.state))
    }

    fn run(&mut self, source: &mut dyn Read) -> Result<ParseSummary> {
        let mut bytes = Vec::new();
        source.read_to_end(&mut bytes)?;

        let options = self.options;
        let dialect = match options.format {
            FormatSelection::Explicit(dialect) => dialect,
            FormatSelection::Autodetect => detect_dialect(&bytes).ok_or_else(|| {
                Error::UnsupportedDialect("no OFX or OFC signature in the document prefix".into())
            })?,
        };
        if options.messages.info {
            info!("parsing {} document ({} bytes)", dialect.name(), bytes.len());
        }
        let header = OfxHeader::parse(&bytes);

        let decoder = Decoder::new(options.local_offset);
        let mut dispatcher = Dispatcher::new(options.duplicates);
        let mut aggregator = Aggregator::new();
        let handler = &mut self.handler;
        let warnings = &mut self.warnings;

        let mut on_record = |kind: RecordKind, frame: &Frame, ancestors: &[Frame]| {
            let before = warnings.len();
            let record = decoder.decode(kind, frame, ancestors, warnings);
            if options.messages.warning {
                for warning in &warnings[before..] {
                    warn!("{}", warning);
                }
            }
            if options.messages.status {
                if let Record::Status(status) = &record {
                    log_status(status);
                }
            }
            dispatcher.dispatch(record, &mut *handler)
        };

        for event in Tokenizer::new(dialect, &bytes) {
            aggregator.feed(event?, &mut on_record)?;
        }
        aggregator.finish(bytes.len())?;

        Ok(ParseSummary {
            dialect,
            header,
            counts: dispatcher.counts(),
            warnings: self.warnings.clone(),
        })
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Decode warnings collected so far, including those of a failed run.
    pub fn warnings(&self) -> &[DecodeWarning] {
        &self.warnings
    }
}

fn log_status(status: &crate::types::StatusRecord) {
    info!(
        "status {} ({}) for <{}>: {}",
        status.code.map_or_else(|| "?".to_string(), |code| code.to_string()),
        status.severity.map_or("?", |severity| severity.as_str()),
        status.element_name.as_deref().unwrap_or("?"),
        status
            .server_message
            .as_deref()
            .or(status.name.as_deref())
            .unwrap_or("")
    );
}

/// Parse one document from `reader`, delivering records to `handler`.
///
/// # Arguments
///
/// * `reader` - Source of the document bytes
/// * `options` - Run configuration
/// * `handler` - Receiver of the records; pass `&mut handler` to keep it
///
/// # Examples
///
/// ```no_run
/// use ofxkit::{parse, OfxInfo, ParseOptions};
/// use std::fs::File;
///
/// let mut info = OfxInfo::default();
/// let summary = parse(File::open("statement.ofx")?, ParseOptions::default(), &mut info)?;
/// println!("{:?}: {} accounts", summary.dialect, info.accounts.len());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn parse<R: Read, H: RecordHandler>(
    reader: R,
    options: ParseOptions,
    handler: H,
) -> Result<ParseSummary> {
    let mut context = ParseContext::new(handler);
    context.configure(options)?;
    context.begin(reader)
}
