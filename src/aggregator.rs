//! Event stream to element tree.
//!
//! The aggregator keeps a stack of in-progress [`Frame`]s. When a frame that
//! roots one of the five record kinds closes, it is handed to the caller
//! together with its open ancestors, before the next event is consumed.

use crate::error::{Error, Result};
use crate::tokenizer::{Event, Token};
use crate::types::{InvestmentTransactionType, RecordKind};

pub const ACCOUNT_ELEMENTS: [&str; 3] = ["BANKACCTFROM", "CCACCTFROM", "INVACCTFROM"];
pub const STATEMENT_ELEMENTS: [&str; 3] = ["STMTRS", "CCSTMTRS", "INVSTMTRS"];
pub const SECURITY_ELEMENT: &str = "SECINFO";

/// Elements that hold other elements rather than a value. Tag soup uses this
/// to tell an empty leaf such as `<MEMO>` from a container awaiting children.
const AGGREGATES: &[&str] = &[
    "ACCTFROM",
    "ACCTINFO",
    "ACCTSTMT",
    "AVAILBAL",
    "BAL",
    "BALLIST",
    "BANKACCTINFO",
    "BANKACCTTO",
    "BANKTRANLIST",
    "CCACCTINFO",
    "CCACCTTO",
    "CURRENCY",
    "DEBTINFO",
    "EXTBANKACCTTO",
    "FI",
    "GENTRN",
    "INV401K",
    "INV401KBAL",
    "INVACCTINFO",
    "INVACCTTO",
    "INVBAL",
    "INVBANKTRAN",
    "INVBUY",
    "INVPOS",
    "INVPOSLIST",
    "INVSELL",
    "INVTRAN",
    "INVTRANLIST",
    "LEDGERBAL",
    "MFASSETCLASS",
    "MFINFO",
    "MSGSETLIST",
    "OFC",
    "OFX",
    "OPTINFO",
    "ORIGCURRENCY",
    "OTHERINFO",
    "PAYEE",
    "PORTION",
    "POSDEBT",
    "POSMF",
    "POSOPT",
    "POSOTHER",
    "POSSTOCK",
    "SECID",
    "SECLIST",
    "SIGNONINFO",
    "SIGNONINFOLIST",
    "SONRQ",
    "SONRS",
    "STATUS",
    "STMTTRN",
    "STOCKINFO",
];

/// Whether `name` is a container element in the OFX/OFC vocabulary.
pub fn is_aggregate(name: &str) -> bool {
    AGGREGATES.contains(&name)
        || ACCOUNT_ELEMENTS.contains(&name)
        || STATEMENT_ELEMENTS.contains(&name)
        || name == SECURITY_ELEMENT
        || InvestmentTransactionType::ELEMENTS.contains(&name)
        || ["MSGSRSV1", "MSGSRQV1", "TRNRS", "TRNRQ", "STMTRQ"]
            .iter()
            .any(|suffix| name.ends_with(suffix))
}

/// One element: its name, its own text and its retained children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub name: String,
    pub text: String,
    pub children: Vec<Frame>,
}

impl Frame {
    pub fn new(name: impl Into<String>) -> Self {
        Frame {
            name: name.into(),
            ..Default::default()
        }
    }

    fn push_text(&mut self, text: &str) {
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(text);
    }

    /// Own text, if any.
    pub fn text(&self) -> Option<&str> {
        let text = self.text.trim();
        (!text.is_empty()).then_some(text)
    }

    /// First direct child with the given name.
    pub fn child(&self, name: &str) -> Option<&Frame> {
        self.children.iter().find(|child| child.name == name)
    }

    /// First direct child whose name is any of `names`.
    pub fn child_any(&self, names: &[&str]) -> Option<&Frame> {
        self.children
            .iter()
            .find(|child| names.contains(&child.name.as_str()))
    }

    /// Text of the element reached by following `path` through direct children.
    pub fn path_text(&self, path: &[&str]) -> Option<&str> {
        path.iter()
            .try_fold(self, |frame, name| frame.child(name))
            .and_then(Frame::text)
    }

    /// Depth-first search for a descendant, never entering frames named in
    /// `skip`.
    pub fn find(&self, name: &str, skip: &[&str]) -> Option<&Frame> {
        for child in &self.children {
            if child.name == name {
                return Some(child);
            }
            if skip.contains(&child.name.as_str()) {
                continue;
            }
            if let Some(found) = child.find(name, skip) {
                return Some(found);
            }
        }
        None
    }
}

impl RecordKind {
    /// Record kind rooted at an element, given its open ancestors
    /// (outermost first).
    pub fn classify(name: &str, ancestors: &[Frame]) -> Option<RecordKind> {
        match name {
            "STATUS" => Some(RecordKind::Status),
            "STMTTRN" => Some(RecordKind::Transaction),
            SECURITY_ELEMENT => Some(RecordKind::Security),
            _ if ACCOUNT_ELEMENTS.contains(&name) => Some(RecordKind::Account),
            _ if STATEMENT_ELEMENTS.contains(&name) => Some(RecordKind::Statement),
            _ if InvestmentTransactionType::ELEMENTS.contains(&name)
                && ancestors.iter().any(|frame| frame.name == "INVTRANLIST") =>
            {
                Some(RecordKind::Transaction)
            }
            _ => None,
        }
    }
}

/// Builds frames from events and reports completed record roots.
#[derive(Debug, Default)]
pub struct Aggregator {
    stack: Vec<Frame>,
    document: Option<Frame>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one event.
    ///
    /// `on_record` receives every completed record root with its ancestor
    /// stack; an error from it is returned unchanged.
    pub fn feed<F>(&mut self, event: Event, on_record: &mut F) -> Result<()>
    where
        F: FnMut(RecordKind, &Frame, &[Frame]) -> Result<()>,
    {
        match event.token {
            Token::Open(name) => self.stack.push(Frame::new(name)),
            Token::Text(text) => {
                if let Some(top) = self.stack.last_mut() {
                    top.push_text(&text);
                }
            }
            Token::Close(name) => {
                let frame = match self.stack.pop() {
                    Some(frame) if frame.name == name => frame,
                    Some(frame) => {
                        return Err(Error::malformed(
                            event.offset,
                            format!("</{}> does not close <{}>", name, frame.name),
                        ))
                    }
                    None => {
                        return Err(Error::malformed(
                            event.offset,
                            format!("</{}> without open element", name),
                        ))
                    }
                };
                self.complete(frame, on_record)?;
            }
        }
        Ok(())
    }

    fn complete<F>(&mut self, frame: Frame, on_record: &mut F) -> Result<()>
    where
        F: FnMut(RecordKind, &Frame, &[Frame]) -> Result<()>,
    {
        let retain = match RecordKind::classify(&frame.name, &self.stack) {
            // Embedded in its transaction rather than reported on its own.
            Some(RecordKind::Security) if self.inside_transaction() => true,
            Some(kind) => {
                on_record(kind, &frame, &self.stack)?;
                !matches!(kind, RecordKind::Transaction | RecordKind::Security)
            }
            None => true,
        };

        if retain {
            match self.stack.last_mut() {
                Some(parent) => parent.children.push(frame),
                None => self.document = Some(frame),
            }
        }
        Ok(())
    }

    fn inside_transaction(&self) -> bool {
        (0..self.stack.len()).any(|i| {
            RecordKind::classify(&self.stack[i].name, &self.stack[..i])
                == Some(RecordKind::Transaction)
        })
    }

    /// Check that nothing is left open at end of input.
    pub fn finish(&self, end: usize) -> Result<()> {
        match self.stack.last() {
            Some(frame) => Err(Error::malformed(
                end,
                format!("unexpected end of document inside <{}>", frame.name),
            )),
            None => Ok(()),
        }
    }

    /// The outermost element, once closed. Dispatched transactions and
    /// securities are not part of it.
    pub fn into_document(self) -> Option<Frame> {
        self.document
    }
}
