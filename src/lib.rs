//! OFX Kit Library
//!
//! A streaming parser for bank and brokerage statement files with a
//! callback-driven reporting API.
//!
//! # Supported Formats
//!
//! - **OFX 1.x**: SGML tag soup, closing tags optional
//! - **OFX 2.x**: well-formed XML
//! - **OFC**: the older Microsoft Open Financial Connectivity SGML format
//!
//! # Features
//!
//! - Autodetect the dialect from the document header
//! - Status, account, statement, transaction and security records handed to
//!   a [`RecordHandler`] in document order, as soon as each block closes
//! - Every optional field is an `Option`; bad field text never fails a run
//! - Collect everything into [`OfxInfo`] and export transactions as CSV
//!
//! # Examples
//!
//! ## Collecting a statement
//!
//! ```no_run
//! use std::fs::File;
//! use ofxkit::{OfxInfo, ParseOptions};
//!
//! let mut file = File::open("statement.ofx")?;
//! let (info, summary) = OfxInfo::from_read(&mut file, ParseOptions::default())?;
//! println!("{:?}: {} transactions", summary.dialect, info.transactions.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Streaming transactions through a callback
//!
//! ```no_run
//! use std::fs::File;
//! use std::ops::ControlFlow;
//! use ofxkit::{parse, Callbacks, ParseOptions};
//!
//! let callbacks = Callbacks::new().on_transaction(|txn| {
//!     println!("{:?} {:?}", txn.date_posted, txn.amount);
//!     ControlFlow::Continue(())
//! });
//! parse(File::open("statement.ofx")?, ParseOptions::default(), callbacks)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod aggregator;
pub mod collector;
pub mod context;
pub mod decode;
pub mod dispatch;
pub mod error;
pub mod header;
pub mod status_codes;
pub mod tokenizer;
pub mod types;

use serde::Serialize;
use std::str::FromStr;

// Re-export commonly used types
pub use collector::OfxInfo;
pub use context::{parse, MessageFilter, ParseContext, ParseOptions, ParseSummary, RunState};
pub use dispatch::{Callbacks, DuplicatePolicy, RecordCounts, RecordHandler};
pub use error::{DecodeWarning, Error, ErrorKind, Result};
pub use header::OfxHeader;
pub use types::{
    AccountRecord, AccountType, CorrectionAction, InvestmentTransactionType, RecordKind,
    SecurityRecord, Severity, StatementRecord, StatusRecord, TransactionRecord, TransactionType,
};

/// Supported document dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Dialect {
    /// OFX 1.x SGML
    OfxSgml,
    /// OFX 2.x XML
    OfxXml,
    /// OFC SGML
    Ofc,
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ofx" | "ofx1" | "sgml" | "ofxsgml" => Ok(Dialect::OfxSgml),
            "ofx2" | "xml" | "ofxxml" => Ok(Dialect::OfxXml),
            "ofc" => Ok(Dialect::Ofc),
            _ => Err(Error::InvalidFormat(s.to_string())),
        }
    }
}

impl Dialect {
    /// Whether the dialect goes through the tag-soup tokenizer.
    pub fn is_sgml(&self) -> bool {
        matches!(self, Dialect::OfxSgml | Dialect::Ofc)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Dialect::OfxSgml => "OFX/SGML",
            Dialect::OfxXml => "OFX/XML",
            Dialect::Ofc => "OFC",
        }
    }
}

/// How a run picks its dialect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FormatSelection {
    /// Inspect the document prefix.
    #[default]
    Autodetect,
    Explicit(Dialect),
}

impl FromStr for FormatSelection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "auto" | "autodetect" => Ok(FormatSelection::Autodetect),
            _ => s.parse().map(FormatSelection::Explicit),
        }
    }
}

impl From<Dialect> for FormatSelection {
    fn from(dialect: Dialect) -> Self {
        FormatSelection::Explicit(dialect)
    }
}
