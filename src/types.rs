//! Records produced by a parse run and the code tables behind their
//! enumerated fields.
//!
//! Every optional field is an `Option`: `None` means the document did not
//! carry a usable value, which is never the same thing as zero or an empty
//! string.

use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// The five kinds of records a run can dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RecordKind {
    Status,
    Account,
    Statement,
    Transaction,
    Security,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Status => "status",
            RecordKind::Account => "account",
            RecordKind::Statement => "statement",
            RecordKind::Transaction => "transaction",
            RecordKind::Security => "security",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl Severity {
    /// Exact match on the `SEVERITY` element text.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "INFO" => Some(Severity::Info),
            "WARN" => Some(Severity::Warn),
            "ERROR" => Some(Severity::Error),
            _ => None,
        }
    }

    /// Severity implied by a numeric status code.
    pub fn from_status_code(code: u32) -> Self {
        match code {
            0 => Severity::Info,
            1..=1999 => Severity::Warn,
            _ => Severity::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

/// Account type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountType {
    Checking,
    Savings,
    MoneyMarket,
    CreditLine,
    Cma,
    CreditCard,
    Investment,
    Unknown,
}

impl FromStr for AccountType {
    type Err = Infallible;

    /// Parses an `ACCTTYPE` code. Unknown codes map to `Unknown`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "CHECKING" => AccountType::Checking,
            "SAVINGS" => AccountType::Savings,
            "MONEYMRKT" => AccountType::MoneyMarket,
            "CREDITLINE" => AccountType::CreditLine,
            "CMA" => AccountType::Cma,
            "CREDITCARD" => AccountType::CreditCard,
            "INVESTMENT" => AccountType::Investment,
            _ => AccountType::Unknown,
        })
    }
}

impl AccountType {
    pub fn code(&self) -> &'static str {
        match self {
            AccountType::Checking => "CHECKING",
            AccountType::Savings => "SAVINGS",
            AccountType::MoneyMarket => "MONEYMRKT",
            AccountType::CreditLine => "CREDITLINE",
            AccountType::Cma => "CMA",
            AccountType::CreditCard => "CREDITCARD",
            AccountType::Investment => "INVESTMENT",
            AccountType::Unknown => "UNKNOWN",
        }
    }
}

/// Bank transaction type (`TRNTYPE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    Credit,
    Debit,
    Int,
    Div,
    Fee,
    SrvChg,
    Dep,
    Atm,
    Pos,
    Xfer,
    Check,
    Payment,
    Cash,
    DirectDep,
    DirectDebit,
    RepeatPmt,
    /// The `OTHER` code, and any code this crate does not know.
    Other,
}

impl FromStr for TransactionType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "CREDIT" => TransactionType::Credit,
            "DEBIT" => TransactionType::Debit,
            "INT" => TransactionType::Int,
            "DIV" => TransactionType::Div,
            "FEE" => TransactionType::Fee,
            "SRVCHG" => TransactionType::SrvChg,
            "DEP" => TransactionType::Dep,
            "ATM" => TransactionType::Atm,
            "POS" => TransactionType::Pos,
            "XFER" => TransactionType::Xfer,
            "CHECK" => TransactionType::Check,
            "PAYMENT" => TransactionType::Payment,
            "CASH" => TransactionType::Cash,
            "DIRECTDEP" => TransactionType::DirectDep,
            "DIRECTDEBIT" => TransactionType::DirectDebit,
            "REPEATPMT" => TransactionType::RepeatPmt,
            _ => TransactionType::Other,
        })
    }
}

impl TransactionType {
    pub fn code(&self) -> &'static str {
        match self {
            TransactionType::Credit => "CREDIT",
            TransactionType::Debit => "DEBIT",
            TransactionType::Int => "INT",
            TransactionType::Div => "DIV",
            TransactionType::Fee => "FEE",
            TransactionType::SrvChg => "SRVCHG",
            TransactionType::Dep => "DEP",
            TransactionType::Atm => "ATM",
            TransactionType::Pos => "POS",
            TransactionType::Xfer => "XFER",
            TransactionType::Check => "CHECK",
            TransactionType::Payment => "PAYMENT",
            TransactionType::Cash => "CASH",
            TransactionType::DirectDep => "DIRECTDEP",
            TransactionType::DirectDebit => "DIRECTDEBIT",
            TransactionType::RepeatPmt => "REPEATPMT",
            TransactionType::Other => "OTHER",
        }
    }

    /// Human-readable meaning of the code.
    pub fn description(&self) -> &'static str {
        match self {
            TransactionType::Credit => "Generic credit",
            TransactionType::Debit => "Generic debit",
            TransactionType::Int => "Interest earned or paid (depends on signage of amount)",
            TransactionType::Div => "Dividend",
            TransactionType::Fee => "FI fee",
            TransactionType::SrvChg => "Service charge",
            TransactionType::Dep => "Deposit",
            TransactionType::Atm => "ATM debit or credit (depends on signage of amount)",
            TransactionType::Pos => "Point of sale debit or credit (depends on signage of amount)",
            TransactionType::Xfer => "Transfer",
            TransactionType::Check => "Check",
            TransactionType::Payment => "Electronic payment",
            TransactionType::Cash => "Cash withdrawal",
            TransactionType::DirectDep => "Direct deposit",
            TransactionType::DirectDebit => "Merchant initiated debit",
            TransactionType::RepeatPmt => "Repeating payment/standing order",
            TransactionType::Other => "Other",
        }
    }
}

/// Investment transaction type, named after the aggregate that carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvestmentTransactionType {
    BuyDebt,
    BuyMf,
    BuyOpt,
    BuyOther,
    BuyStock,
    ClosureOpt,
    Income,
    InvExpense,
    JrnlFund,
    JrnlSec,
    MarginInterest,
    Reinvest,
    RetOfCap,
    SellDebt,
    SellMf,
    SellOpt,
    SellOther,
    SellStock,
    Split,
    Transfer,
    Other,
}

impl FromStr for InvestmentTransactionType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "BUYDEBT" => InvestmentTransactionType::BuyDebt,
            "BUYMF" => InvestmentTransactionType::BuyMf,
            "BUYOPT" => InvestmentTransactionType::BuyOpt,
            "BUYOTHER" => InvestmentTransactionType::BuyOther,
            "BUYSTOCK" => InvestmentTransactionType::BuyStock,
            "CLOSUREOPT" => InvestmentTransactionType::ClosureOpt,
            "INCOME" => InvestmentTransactionType::Income,
            "INVEXPENSE" => InvestmentTransactionType::InvExpense,
            "JRNLFUND" => InvestmentTransactionType::JrnlFund,
            "JRNLSEC" => InvestmentTransactionType::JrnlSec,
            "MARGININTEREST" => InvestmentTransactionType::MarginInterest,
            "REINVEST" => InvestmentTransactionType::Reinvest,
            "RETOFCAP" => InvestmentTransactionType::RetOfCap,
            "SELLDEBT" => InvestmentTransactionType::SellDebt,
            "SELLMF" => InvestmentTransactionType::SellMf,
            "SELLOPT" => InvestmentTransactionType::SellOpt,
            "SELLOTHER" => InvestmentTransactionType::SellOther,
            "SELLSTOCK" => InvestmentTransactionType::SellStock,
            "SPLIT" => InvestmentTransactionType::Split,
            "TRANSFER" => InvestmentTransactionType::Transfer,
            _ => InvestmentTransactionType::Other,
        })
    }
}

impl InvestmentTransactionType {
    /// Element names of the investment transaction aggregates.
    pub const ELEMENTS: [&'static str; 20] = [
        "BUYDEBT",
        "BUYMF",
        "BUYOPT",
        "BUYOTHER",
        "BUYSTOCK",
        "CLOSUREOPT",
        "INCOME",
        "INVEXPENSE",
        "JRNLFUND",
        "JRNLSEC",
        "MARGININTEREST",
        "REINVEST",
        "RETOFCAP",
        "SELLDEBT",
        "SELLMF",
        "SELLOPT",
        "SELLOTHER",
        "SELLSTOCK",
        "SPLIT",
        "TRANSFER",
    ];

    pub fn code(&self) -> &'static str {
        match self {
            InvestmentTransactionType::BuyDebt => "BUYDEBT",
            InvestmentTransactionType::BuyMf => "BUYMF",
            InvestmentTransactionType::BuyOpt => "BUYOPT",
            InvestmentTransactionType::BuyOther => "BUYOTHER",
            InvestmentTransactionType::BuyStock => "BUYSTOCK",
            InvestmentTransactionType::ClosureOpt => "CLOSUREOPT",
            InvestmentTransactionType::Income => "INCOME",
            InvestmentTransactionType::InvExpense => "INVEXPENSE",
            InvestmentTransactionType::JrnlFund => "JRNLFUND",
            InvestmentTransactionType::JrnlSec => "JRNLSEC",
            InvestmentTransactionType::MarginInterest => "MARGININTEREST",
            InvestmentTransactionType::Reinvest => "REINVEST",
            InvestmentTransactionType::RetOfCap => "RETOFCAP",
            InvestmentTransactionType::SellDebt => "SELLDEBT",
            InvestmentTransactionType::SellMf => "SELLMF",
            InvestmentTransactionType::SellOpt => "SELLOPT",
            InvestmentTransactionType::SellOther => "SELLOTHER",
            InvestmentTransactionType::SellStock => "SELLSTOCK",
            InvestmentTransactionType::Split => "SPLIT",
            InvestmentTransactionType::Transfer => "TRANSFER",
            InvestmentTransactionType::Other => "OTHER",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            InvestmentTransactionType::BuyDebt => "Buy debt security",
            InvestmentTransactionType::BuyMf => "Buy mutual fund",
            InvestmentTransactionType::BuyOpt => "Buy option",
            InvestmentTransactionType::BuyOther => "Buy other security type",
            InvestmentTransactionType::BuyStock => "Buy stock",
            InvestmentTransactionType::ClosureOpt => "Close a position for an option",
            InvestmentTransactionType::Income => {
                "Investment income is realized as cash into the investment account"
            }
            InvestmentTransactionType::InvExpense => {
                "Misc investment expense that is associated with a specific security"
            }
            InvestmentTransactionType::JrnlFund => {
                "Journaling cash holdings between subaccounts within the same investment account"
            }
            InvestmentTransactionType::JrnlSec => {
                "Journaling security holdings between subaccounts within the same investment account"
            }
            InvestmentTransactionType::MarginInterest => "Margin interest expense",
            InvestmentTransactionType::Reinvest => "Reinvestment of income",
            InvestmentTransactionType::RetOfCap => "Return of capital",
            InvestmentTransactionType::SellDebt => {
                "Sell debt security. Used when debt is sold, called, or reached maturity"
            }
            InvestmentTransactionType::SellMf => "Sell mutual fund",
            InvestmentTransactionType::SellOpt => "Sell option",
            InvestmentTransactionType::SellOther => "Sell other type of security",
            InvestmentTransactionType::SellStock => "Sell stock",
            InvestmentTransactionType::Split => "Stock or mutual fund split",
            InvestmentTransactionType::Transfer => {
                "Transfer holdings in and out of the investment account"
            }
            InvestmentTransactionType::Other => "Other investment transaction",
        }
    }
}

/// Action to take on the transaction named by `CORRECTFITID`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionAction {
    Delete,
    Replace,
    Other,
}

impl FromStr for CorrectionAction {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "DELETE" => CorrectionAction::Delete,
            "REPLACE" => CorrectionAction::Replace,
            _ => CorrectionAction::Other,
        })
    }
}

impl CorrectionAction {
    pub fn code(&self) -> &'static str {
        match self {
            CorrectionAction::Delete => "DELETE",
            CorrectionAction::Replace => "REPLACE",
            CorrectionAction::Other => "OTHER",
        }
    }
}

// Code enums serialize as their OFX codes.
macro_rules! serialize_as_code {
    ($($ty:ty => $method:ident),* $(,)?) => {
        $(
            impl Serialize for $ty {
                fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    serializer.serialize_str(self.$method())
                }
            }
        )*
    };
}

serialize_as_code! {
    AccountType => code,
    TransactionType => code,
    InvestmentTransactionType => code,
    CorrectionAction => code,
}

/// A protocol-level status block.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusRecord {
    /// Aggregate the status applies to (e.g. `SONRS`, `STMTTRNRS`).
    pub element_name: Option<String>,
    pub severity: Option<Severity>,
    pub code: Option<u32>,
    /// Short name of the status code.
    pub name: Option<String>,
    /// Long description of the status code.
    pub description: Option<String>,
    /// Free-form `MESSAGE` sent by the server.
    pub server_message: Option<String>,
}

/// Account identification block.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccountRecord {
    /// Bank or broker id, branch id and account number joined by spaces.
    pub account_id: Option<String>,
    /// Human-readable label, e.g. "Bank account 000112345".
    pub account_name: Option<String>,
    pub account_type: Option<AccountType>,
    pub currency: Option<String>,
    pub bank_id: Option<String>,
    pub branch_id: Option<String>,
    pub account_number: Option<String>,
    pub broker_id: Option<String>,
}

/// Statement response: period, balances and currency.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatementRecord {
    pub currency: Option<String>,
    pub account_id: Option<String>,
    pub date_start: Option<DateTime<FixedOffset>>,
    pub date_end: Option<DateTime<FixedOffset>>,
    pub ledger_balance: Option<Decimal>,
    pub ledger_balance_date: Option<DateTime<FixedOffset>>,
    pub available_balance: Option<Decimal>,
    pub available_balance_date: Option<DateTime<FixedOffset>>,
    pub marketing_info: Option<String>,
}

/// Security description, standalone or embedded in a transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SecurityRecord {
    pub unique_id: Option<String>,
    /// Format of the unique id, usually `CUSIP`.
    pub unique_id_type: Option<String>,
    pub name: Option<String>,
    pub ticker: Option<String>,
    pub unit_price: Option<Decimal>,
    /// Date as of which `unit_price` is valid.
    pub unit_price_date: Option<DateTime<FixedOffset>>,
    pub currency: Option<String>,
    pub memo: Option<String>,
}

/// Bank or investment transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransactionRecord {
    pub account_id: Option<String>,
    pub transaction_type: Option<TransactionType>,
    pub date_initiated: Option<DateTime<FixedOffset>>,
    pub date_posted: Option<DateTime<FixedOffset>>,
    pub date_funds_available: Option<DateTime<FixedOffset>>,
    pub amount: Option<Decimal>,
    pub units: Option<Decimal>,
    pub old_units: Option<Decimal>,
    pub new_units: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub fees: Option<Decimal>,
    pub commission: Option<Decimal>,
    /// Financial institution's id for this transaction (`FITID`).
    pub fi_id: Option<String>,
    /// `FITID` of the transaction this one corrects.
    pub fi_id_corrected: Option<String>,
    pub fi_id_correction_action: Option<CorrectionAction>,
    pub investment_transaction_type: Option<InvestmentTransactionType>,
    pub unique_security_id: Option<String>,
    pub unique_id_type: Option<String>,
    /// Security described inline within the transaction.
    pub security: Option<SecurityRecord>,
    pub server_transaction_id: Option<String>,
    pub check_number: Option<String>,
    pub reference_number: Option<String>,
    pub standard_industrial_code: Option<String>,
    pub payee_id: Option<String>,
    pub name: Option<String>,
    pub memo: Option<String>,
}
