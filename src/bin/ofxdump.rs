//! OFX Dump - CLI tool printing everything ofxkit understands about a file.

use chrono::{DateTime, FixedOffset};
use clap::Parser;
use ofxkit::{
    AccountRecord, DuplicatePolicy, Error, FormatSelection, OfxInfo, ParseContext, ParseOptions,
    RecordHandler, Result, SecurityRecord, StatementRecord, StatusRecord, TransactionRecord,
};
use std::fmt::Display;
use std::fs::File;
use std::io;
use std::ops::ControlFlow;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ofxdump")]
#[command(about = "Dump the records of an OFX or OFC file", long_about = None)]
struct Cli {
    /// Input file path (or stdin if not provided)
    file: Option<PathBuf>,

    /// Input format (auto, ofx, ofx2, ofc)
    #[arg(short, long, default_value = "auto")]
    format: String,

    /// Offset for timestamps without one, e.g. +02:00 (default: local time)
    #[arg(long = "utc-offset", allow_hyphen_values = true)]
    utc_offset: Option<String>,

    /// Fail on a second account or statement block
    #[arg(long = "single-statement")]
    single_statement: bool,

    /// Also write the transactions to this CSV file
    #[arg(long = "transactions-csv")]
    transactions_csv: Option<PathBuf>,
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut options = ParseOptions {
        format: cli.format.parse::<FormatSelection>()?,
        ..ParseOptions::default()
    };
    if let Some(ref offset) = cli.utc_offset {
        options.local_offset = parse_utc_offset(offset)?;
    }
    if cli.single_statement {
        options.duplicates = DuplicatePolicy::RejectDuplicates;
    }

    let mut context = ParseContext::new(Printer::default());
    context.configure(options)?;
    let summary = match cli.file {
        Some(ref path) => context.parse_file(path)?,
        None => context.begin(io::stdin().lock())?,
    };

    if let Some(header) = &summary.header {
        println!("header:");
        for (key, value) in &header.fields {
            println!("    {}: {}", key, value);
        }
    }
    println!(
        "{}: {} statuses, {} accounts, {} statements, {} transactions, {} securities",
        summary.dialect.name(),
        summary.counts.status,
        summary.counts.account,
        summary.counts.statement,
        summary.counts.transaction,
        summary.counts.security
    );
    for warning in &summary.warnings {
        println!("warning: {}", warning);
    }

    if let Some(ref path) = cli.transactions_csv {
        let mut file = File::create(path)?;
        context.handler().info.write_transactions_csv(&mut file)?;
    }

    Ok(())
}

/// Parses `+HH:MM`, `-HHMM` or `+HH`.
fn parse_utc_offset(text: &str) -> Result<FixedOffset> {
    let invalid = || Error::InvalidFormat(format!("UTC offset {:?}", text));
    let (sign, body) = match text.as_bytes().first() {
        Some(b'-') => (-1, &text[1..]),
        Some(b'+') => (1, &text[1..]),
        _ => (1, text),
    };
    let digits: String = body.chars().filter(|c| *c != ':').collect();
    if !digits.bytes().all(|b| b.is_ascii_digit()) || !matches!(digits.len(), 2 | 4) {
        return Err(invalid());
    }
    let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
    let minutes: i32 = if digits.len() == 4 {
        digits[2..].parse().map_err(|_| invalid())?
    } else {
        0
    };
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// Prints each record as it arrives and keeps a copy for the CSV export.
#[derive(Default)]
struct Printer {
    info: OfxInfo,
}

fn line<T: Display>(label: &str, value: Option<T>) {
    if let Some(value) = value {
        println!("    {}: {}", label, value);
    }
}

fn date(value: Option<DateTime<FixedOffset>>) -> Option<String> {
    value.map(|d| d.format("%Y-%m-%d %H:%M:%S %:z").to_string())
}

impl RecordHandler for Printer {
    fn status(&mut self, record: StatusRecord) -> ControlFlow<String> {
        println!("status:");
        line("Element", record.element_name.as_deref());
        line("Severity", record.severity.map(|s| s.as_str()));
        line("Code", record.code);
        line("Name", record.name.as_deref());
        line("Description", record.description.as_deref());
        line("Server message", record.server_message.as_deref());
        self.info.status(record)
    }

    fn account(&mut self, record: AccountRecord) -> ControlFlow<String> {
        println!("account:");
        line("Account ID", record.account_id.as_deref());
        line("Account name", record.account_name.as_deref());
        line("Account type", record.account_type.map(|t| t.code()));
        line("Currency", record.currency.as_deref());
        line("Bank ID", record.bank_id.as_deref());
        line("Branch ID", record.branch_id.as_deref());
        line("Broker ID", record.broker_id.as_deref());
        line("Account number", record.account_number.as_deref());
        self.info.account(record)
    }

    fn statement(&mut self, record: StatementRecord) -> ControlFlow<String> {
        println!("statement:");
        line("Currency", record.currency.as_deref());
        line("Account ID", record.account_id.as_deref());
        line("Start date", date(record.date_start));
        line("End date", date(record.date_end));
        line("Ledger balance", record.ledger_balance);
        line("Ledger balance as of", date(record.ledger_balance_date));
        line("Available balance", record.available_balance);
        line("Available balance as of", date(record.available_balance_date));
        line("Marketing info", record.marketing_info.as_deref());
        self.info.statement(record)
    }

    fn transaction(&mut self, record: TransactionRecord) -> ControlFlow<String> {
        println!("transaction:");
        line("Account ID", record.account_id.as_deref());
        line(
            "Transaction type",
            record
                .transaction_type
                .map(|t| format!("{}: {}", t.code(), t.description())),
        );
        line(
            "Investment transaction type",
            record
                .investment_transaction_type
                .map(|t| format!("{}: {}", t.code(), t.description())),
        );
        line("Date initiated", date(record.date_initiated));
        line("Date posted", date(record.date_posted));
        line("Date funds available", date(record.date_funds_available));
        line("Amount", record.amount);
        line("Units", record.units);
        line("Old units", record.old_units);
        line("New units", record.new_units);
        line("Unit price", record.unit_price);
        line("Fees", record.fees);
        line("Commission", record.commission);
        line("Financial institution ID", record.fi_id.as_deref());
        line("Corrects FITID", record.fi_id_corrected.as_deref());
        line("Correction action", record.fi_id_correction_action.map(|a| a.code()));
        line("Server transaction ID", record.server_transaction_id.as_deref());
        line("Check number", record.check_number.as_deref());
        line("Reference number", record.reference_number.as_deref());
        line("Standard Industrial Code", record.standard_industrial_code.as_deref());
        line("Payee ID", record.payee_id.as_deref());
        line("Name", record.name.as_deref());
        line("Memo", record.memo.as_deref());
        line("Security unique ID", record.unique_security_id.as_deref());
        line("Security ID type", record.unique_id_type.as_deref());
        if let Some(security) = &record.security {
            line("Security name", security.name.as_deref());
            line("Ticker", security.ticker.as_deref());
        }
        self.info.transaction(record)
    }

    fn security(&mut self, record: SecurityRecord) -> ControlFlow<String> {
        println!("security:");
        line("Unique ID", record.unique_id.as_deref());
        line("ID type", record.unique_id_type.as_deref());
        line("Name", record.name.as_deref());
        line("Ticker", record.ticker.as_deref());
        line("Unit price", record.unit_price);
        line("Price as of", date(record.unit_price_date));
        line("Currency", record.currency.as_deref());
        line("Memo", record.memo.as_deref());
        self.info.security(record)
    }
}
