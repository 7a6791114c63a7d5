//! In-memory collection of every record of a run, with CSV export.

use crate::context::{parse, ParseOptions, ParseSummary};
use crate::dispatch::RecordHandler;
use crate::error::Result;
use crate::types::{
    AccountRecord, CorrectionAction, InvestmentTransactionType, SecurityRecord, StatementRecord,
    StatusRecord, TransactionRecord, TransactionType,
};
use chrono::{DateTime, FixedOffset};
use csv::WriterBuilder;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::ops::ControlFlow;
use std::path::Path;

/// Everything one document reported, in dispatch order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OfxInfo {
    pub statuses: Vec<StatusRecord>,
    pub accounts: Vec<AccountRecord>,
    pub statements: Vec<StatementRecord>,
    pub transactions: Vec<TransactionRecord>,
    pub securities: Vec<SecurityRecord>,
}

impl RecordHandler for OfxInfo {
    fn status(&mut self, record: StatusRecord) -> ControlFlow<String> {
        self.statuses.push(record);
        ControlFlow::Continue(())
    }

    fn account(&mut self, record: AccountRecord) -> ControlFlow<String> {
        self.accounts.push(record);
        ControlFlow::Continue(())
    }

    fn statement(&mut self, record: StatementRecord) -> ControlFlow<String> {
        self.statements.push(record);
        ControlFlow::Continue(())
    }

    fn transaction(&mut self, record: TransactionRecord) -> ControlFlow<String> {
        self.transactions.push(record);
        ControlFlow::Continue(())
    }

    fn security(&mut self, record: SecurityRecord) -> ControlFlow<String> {
        self.securities.push(record);
        ControlFlow::Continue(())
    }
}

/// Flat transaction row for the CSV table.
#[derive(Debug, Serialize)]
struct TransactionRow<'a> {
    account_id: Option<&'a str>,
    transaction_type: Option<TransactionType>,
    initiated: Option<DateTime<FixedOffset>>,
    posted: Option<DateTime<FixedOffset>>,
    funds_available: Option<DateTime<FixedOffset>>,
    amount: Option<Decimal>,
    units: Option<Decimal>,
    old_units: Option<Decimal>,
    new_units: Option<Decimal>,
    unit_price: Option<Decimal>,
    fees: Option<Decimal>,
    commission: Option<Decimal>,
    fi_id: Option<&'a str>,
    fi_id_corrected: Option<&'a str>,
    fi_id_correction_action: Option<CorrectionAction>,
    investment_transaction_type: Option<InvestmentTransactionType>,
    unique_security_id: Option<&'a str>,
    unique_id_type: Option<&'a str>,
    server_transaction_id: Option<&'a str>,
    check_number: Option<&'a str>,
    reference_number: Option<&'a str>,
    standard_industrial_code: Option<&'a str>,
    payee_id: Option<&'a str>,
    name: Option<&'a str>,
    memo: Option<&'a str>,
}

impl TransactionRow<'_> {
    const HEADERS: [&'static str; 25] = [
        "account_id",
        "transaction_type",
        "initiated",
        "posted",
        "funds_available",
        "amount",
        "units",
        "old_units",
        "new_units",
        "unit_price",
        "fees",
        "commission",
        "fi_id",
        "fi_id_corrected",
        "fi_id_correction_action",
        "investment_transaction_type",
        "unique_security_id",
        "unique_id_type",
        "server_transaction_id",
        "check_number",
        "reference_number",
        "standard_industrial_code",
        "payee_id",
        "name",
        "memo",
    ];
}

impl<'a> From<&'a TransactionRecord> for TransactionRow<'a> {
    fn from(txn: &'a TransactionRecord) -> Self {
        TransactionRow {
            account_id: txn.account_id.as_deref(),
            transaction_type: txn.transaction_type,
            initiated: txn.date_initiated,
            posted: txn.date_posted,
            funds_available: txn.date_funds_available,
            amount: txn.amount,
            units: txn.units,
            old_units: txn.old_units,
            new_units: txn.new_units,
            unit_price: txn.unit_price,
            fees: txn.fees,
            commission: txn.commission,
            fi_id: txn.fi_id.as_deref(),
            fi_id_corrected: txn.fi_id_corrected.as_deref(),
            fi_id_correction_action: txn.fi_id_correction_action,
            investment_transaction_type: txn.investment_transaction_type,
            unique_security_id: txn.unique_security_id.as_deref(),
            unique_id_type: txn.unique_id_type.as_deref(),
            server_transaction_id: txn.server_transaction_id.as_deref(),
            check_number: txn.check_number.as_deref(),
            reference_number: txn.reference_number.as_deref(),
            standard_industrial_code: txn.standard_industrial_code.as_deref(),
            payee_id: txn.payee_id.as_deref(),
            name: txn.name.as_deref(),
            memo: txn.memo.as_deref(),
        }
    }
}

impl OfxInfo {
    /// Parse a document from any source implementing `Read`.
    ///
    /// # Arguments
    ///
    /// * `reader` - A mutable reference to a type implementing `Read`
    /// * `options` - Run configuration
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::fs::File;
    /// use ofxkit::{OfxInfo, ParseOptions};
    ///
    /// let mut file = File::open("statement.ofx")?;
    /// let (info, _summary) = OfxInfo::from_read(&mut file, ParseOptions::default())?;
    /// println!("{} transactions", info.transactions.len());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_read<R: Read>(reader: &mut R, options: ParseOptions) -> Result<(Self, ParseSummary)> {
        let mut info = OfxInfo::default();
        let summary = parse(reader, options, &mut info)?;
        Ok((info, summary))
    }

    /// Parse the document stored at `path`.
    pub fn from_path(path: impl AsRef<Path>, options: ParseOptions) -> Result<(Self, ParseSummary)> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::from_read(&mut reader, options)
    }

    /// Write one CSV row per transaction. Absent fields are empty cells.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::fs::File;
    /// use ofxkit::{OfxInfo, ParseOptions};
    ///
    /// let (info, _) = OfxInfo::from_path("statement.ofx", ParseOptions::default())?;
    /// let mut file = File::create("transactions.csv")?;
    /// info.write_transactions_csv(&mut file)?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn write_transactions_csv<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut csv_writer = WriterBuilder::new().has_headers(false).from_writer(writer);
        csv_writer.write_record(TransactionRow::HEADERS)?;

        for transaction in &self.transactions {
            csv_writer.serialize(TransactionRow::from(transaction))?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}
