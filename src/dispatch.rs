//! Record delivery: the handler trait, closure slots and duplicate policy.

use crate::decode::Record;
use crate::error::{Error, Result};
use crate::types::{
    AccountRecord, RecordKind, SecurityRecord, StatementRecord, StatusRecord, TransactionRecord,
};
use serde::Serialize;
use std::ops::ControlFlow;

/// Receives records in document order.
///
/// Every method defaults to discarding the record. Returning
/// `ControlFlow::Break(reason)` stops the run with
/// [`Error::CallbackAbort`]; no further methods are called afterwards.
pub trait RecordHandler {
    fn status(&mut self, _record: StatusRecord) -> ControlFlow<String> {
        ControlFlow::Continue(())
    }

    fn account(&mut self, _record: AccountRecord) -> ControlFlow<String> {
        ControlFlow::Continue(())
    }

    fn statement(&mut self, _record: StatementRecord) -> ControlFlow<String> {
        ControlFlow::Continue(())
    }

    fn transaction(&mut self, _record: TransactionRecord) -> ControlFlow<String> {
        ControlFlow::Continue(())
    }

    fn security(&mut self, _record: SecurityRecord) -> ControlFlow<String> {
        ControlFlow::Continue(())
    }
}

impl<H: RecordHandler + ?Sized> RecordHandler for &mut H {
    fn status(&mut self, record: StatusRecord) -> ControlFlow<String> {
        (**self).status(record)
    }

    fn account(&mut self, record: AccountRecord) -> ControlFlow<String> {
        (**self).account(record)
    }

    fn statement(&mut self, record: StatementRecord) -> ControlFlow<String> {
        (**self).statement(record)
    }

    fn transaction(&mut self, record: TransactionRecord) -> ControlFlow<String> {
        (**self).transaction(record)
    }

    fn security(&mut self, record: SecurityRecord) -> ControlFlow<String> {
        (**self).security(record)
    }
}

type Slot<'a, T> = Option<Box<dyn FnMut(T) -> ControlFlow<String> + 'a>>;

/// A handler built from optional closures, one per record kind.
///
/// # Examples
///
/// ```
/// use ofxkit::{parse, Callbacks, ParseOptions};
/// use std::ops::ControlFlow;
///
/// let doc = "OFXHEADER:100\n\n<OFX><STMTTRN><TRNTYPE>DEBIT<TRNAMT>-20.00</STMTTRN></OFX>";
/// let mut amounts = Vec::new();
/// let mut callbacks = Callbacks::new().on_transaction(|txn| {
///     amounts.push(txn.amount);
///     ControlFlow::Continue(())
/// });
/// parse(doc.as_bytes(), ParseOptions::default(), &mut callbacks).unwrap();
/// drop(callbacks);
/// assert_eq!(amounts.len(), 1);
/// ```
#[derive(Default)]
pub struct Callbacks<'a> {
    status: Slot<'a, StatusRecord>,
    account: Slot<'a, AccountRecord>,
    statement: Slot<'a, StatementRecord>,
    transaction: Slot<'a, TransactionRecord>,
    security: Slot<'a, SecurityRecord>,
}

impl<'a> Callbacks<'a> {
    /// All slots empty.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_status(mut self, f: impl FnMut(StatusRecord) -> ControlFlow<String> + 'a) -> Self {
        self.status = Some(Box::new(f));
        self
    }

    pub fn on_account(mut self, f: impl FnMut(AccountRecord) -> ControlFlow<String> + 'a) -> Self {
        self.account = Some(Box::new(f));
        self
    }

    pub fn on_statement(
        mut self,
        f: impl FnMut(StatementRecord) -> ControlFlow<String> + 'a,
    ) -> Self {
        self.statement = Some(Box::new(f));
        self
    }

    pub fn on_transaction(
        mut self,
        f: impl FnMut(TransactionRecord) -> ControlFlow<String> + 'a,
    ) -> Self {
        self.transaction = Some(Box::new(f));
        self
    }

    pub fn on_security(
        mut self,
        f: impl FnMut(SecurityRecord) -> ControlFlow<String> + 'a,
    ) -> Self {
        self.security = Some(Box::new(f));
        self
    }
}

fn call<T>(slot: &mut Slot<'_, T>, record: T) -> ControlFlow<String> {
    match slot {
        Some(callback) => callback(record),
        None => ControlFlow::Continue(()),
    }
}

impl RecordHandler for Callbacks<'_> {
    fn status(&mut self, record: StatusRecord) -> ControlFlow<String> {
        call(&mut self.status, record)
    }

    fn account(&mut self, record: AccountRecord) -> ControlFlow<String> {
        call(&mut self.account, record)
    }

    fn statement(&mut self, record: StatementRecord) -> ControlFlow<String> {
        call(&mut self.statement, record)
    }

    fn transaction(&mut self, record: TransactionRecord) -> ControlFlow<String> {
        call(&mut self.transaction, record)
    }

    fn security(&mut self, record: SecurityRecord) -> ControlFlow<String> {
        call(&mut self.security, record)
    }
}

/// What to do with a second account or statement in one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum DuplicatePolicy {
    /// Dispatch every block.
    #[default]
    CollectAll,
    /// Fail the run on the second account or statement block.
    RejectDuplicates,
}

/// Number of records dispatched, per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecordCounts {
    pub status: usize,
    pub account: usize,
    pub statement: usize,
    pub transaction: usize,
    pub security: usize,
}

impl RecordCounts {
    pub fn get(&self, kind: RecordKind) -> usize {
        match kind {
            RecordKind::Status => self.status,
            RecordKind::Account => self.account,
            RecordKind::Statement => self.statement,
            RecordKind::Transaction => self.transaction,
            RecordKind::Security => self.security,
        }
    }

    fn slot(&mut self, kind: RecordKind) -> &mut usize {
        match kind {
            RecordKind::Status => &mut self.status,
            RecordKind::Account => &mut self.account,
            RecordKind::Statement => &mut self.statement,
            RecordKind::Transaction => &mut self.transaction,
            RecordKind::Security => &mut self.security,
        }
    }

    pub fn total(&self) -> usize {
        self.status + self.account + self.statement + self.transaction + self.security
    }
}

/// Applies the duplicate policy and hands records to a handler.
#[derive(Debug, Default)]
pub struct Dispatcher {
    policy: DuplicatePolicy,
    counts: RecordCounts,
}

impl Dispatcher {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Dispatcher {
            policy,
            counts: RecordCounts::default(),
        }
    }

    /// Deliver one record.
    pub fn dispatch<H: RecordHandler>(&mut self, record: Record, handler: &mut H) -> Result<()> {
        let kind = record.kind();
        if self.policy == DuplicatePolicy::RejectDuplicates
            && matches!(kind, RecordKind::Account | RecordKind::Statement)
            && self.counts.get(kind) > 0
        {
            return Err(Error::DuplicateTopLevelRecord { kind });
        }
        *self.counts.slot(kind) += 1;

        let flow = match record {
            Record::Status(record) => handler.status(record),
            Record::Account(record) => handler.account(record),
            Record::Statement(record) => handler.statement(record),
            Record::Transaction(record) => handler.transaction(record),
            Record::Security(record) => handler.security(record),
        };
        match flow {
            ControlFlow::Continue(()) => Ok(()),
            ControlFlow::Break(reason) => Err(Error::CallbackAbort { kind, reason }),
        }
    }

    pub fn counts(&self) -> RecordCounts {
        self.counts
    }
}
