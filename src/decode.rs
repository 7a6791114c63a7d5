//! Frame to typed record decoding.
//!
//! Decoding never fails: a field whose text breaks its rule is left `None`
//! and a [`DecodeWarning`] is recorded instead. Unrecognized child elements
//! are ignored.

use crate::aggregator::{Frame, ACCOUNT_ELEMENTS, SECURITY_ELEMENT, STATEMENT_ELEMENTS};
use crate::error::DecodeWarning;
use crate::status_codes;
use crate::types::{
    AccountRecord, AccountType, RecordKind, SecurityRecord, Severity, StatementRecord,
    StatusRecord, TransactionRecord,
};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::convert::Infallible;
use std::str::FromStr;

/// A decoded record of any kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Status(StatusRecord),
    Account(AccountRecord),
    Statement(StatementRecord),
    Transaction(TransactionRecord),
    Security(SecurityRecord),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Status(_) => RecordKind::Status,
            Record::Account(_) => RecordKind::Account,
            Record::Statement(_) => RecordKind::Statement,
            Record::Transaction(_) => RecordKind::Transaction,
            Record::Security(_) => RecordKind::Security,
        }
    }
}

/// Parse an OFX decimal: optional sign, digits, at most one `.`.
///
/// Grouping separators and exponents are rejected.
///
/// # Examples
///
/// ```
/// use ofxkit::decode::parse_decimal;
///
/// assert_eq!(parse_decimal("-20.00").map(|d| d.to_string()), Some("-20.00".to_string()));
/// assert_eq!(parse_decimal("1,000.00"), None);
/// ```
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    let (negative, body) = match raw.as_bytes().first()? {
        b'-' => (true, &raw[1..]),
        b'+' => (false, &raw[1..]),
        _ => (false, raw),
    };
    let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if int_part.len() + frac_part.len() == 0 || !all_digits(int_part) || !all_digits(frac_part) {
        return None;
    }

    let mut normalized = String::with_capacity(body.len() + 2);
    if negative {
        normalized.push('-');
    }
    normalized.push_str(if int_part.is_empty() { "0" } else { int_part });
    if !frac_part.is_empty() {
        normalized.push('.');
        normalized.push_str(frac_part);
    }
    Decimal::from_str(&normalized).ok()
}

/// Parse an OFX date/time.
///
/// The accepted shape is `YYYYMMDD[HHMM[SS[.fff]]][offset[:TZ]]`, where
/// the offset is in hours (`-5`, `+5.5`) or written as `±HHMM`. A missing
/// time means midnight and a missing offset means `local`.
///
/// # Examples
///
/// ```
/// use chrono::FixedOffset;
/// use ofxkit::decode::parse_datetime;
///
/// let utc = FixedOffset::east_opt(0).unwrap();
/// let posted = parse_datetime("20230615120000[-5:EST]", utc).unwrap();
/// assert_eq!(posted.to_rfc3339(), "2023-06-15T12:00:00-05:00");
/// ```
pub fn parse_datetime(raw: &str, local: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    let (stamp, zone) = match raw.find('[') {
        Some(open) => {
            let close = open + raw[open..].find(']')?;
            if !raw[close + 1..].trim().is_empty() {
                return None;
            }
            (&raw[..open], Some(&raw[open + 1..close]))
        }
        None => (raw, None),
    };

    let (digits, fraction) = match stamp.split_once('.') {
        Some((digits, fraction)) => (digits, Some(fraction)),
        None => (stamp, None),
    };
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let number = |from: usize, to: usize| digits[from..to].parse::<u32>().ok();

    let (hour, minute, second) = match digits.len() {
        8 => (0, 0, 0),
        12 => (number(8, 10)?, number(10, 12)?, 0),
        14 => (number(8, 10)?, number(10, 12)?, number(12, 14)?),
        _ => return None,
    };
    let nanos = match fraction {
        None => 0,
        Some(fraction)
            if digits.len() == 14
                && !fraction.is_empty()
                && fraction.bytes().all(|b| b.is_ascii_digit()) =>
        {
            let mut nanos = fraction.chars().take(9).collect::<String>();
            while nanos.len() < 9 {
                nanos.push('0');
            }
            nanos.parse().ok()?
        }
        Some(_) => return None,
    };

    let date = NaiveDate::from_ymd_opt(digits[0..4].parse().ok()?, number(4, 6)?, number(6, 8)?)?;
    let time = NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)?;
    let offset = match zone {
        Some(zone) => parse_offset(zone)?,
        None => local,
    };
    offset.from_local_datetime(&date.and_time(time)).single()
}

fn parse_offset(zone: &str) -> Option<FixedOffset> {
    let hours = zone.split(':').next()?.trim();
    let (sign, body) = match hours.as_bytes().first()? {
        b'-' => (-1, &hours[1..]),
        b'+' => (1, &hours[1..]),
        _ => (1, hours),
    };

    let seconds = if body.len() == 4 && body.bytes().all(|b| b.is_ascii_digit()) {
        body[0..2].parse::<i32>().ok()? * 3600 + body[2..4].parse::<i32>().ok()? * 60
    } else {
        let hours = parse_decimal(body)?;
        if hours.is_sign_negative() {
            return None;
        }
        hours.checked_mul(Decimal::from(3600))?.round().to_i32()?
    };
    FixedOffset::east_opt(sign * seconds)
}

/// Account id: bank or broker id, branch id and account number, joined by
/// spaces.
pub fn account_id(account: &Frame) -> Option<String> {
    let parts: Vec<&str> = ["BANKID", "BROKERID", "BRANCHID", "ACCTID"]
        .iter()
        .filter_map(|name| account.child(name).and_then(Frame::text))
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

fn statement_account_id(ancestors: &[Frame]) -> Option<String> {
    ancestors
        .iter()
        .rev()
        .find(|frame| STATEMENT_ELEMENTS.contains(&frame.name.as_str()))
        .and_then(|statement| statement.child_any(&ACCOUNT_ELEMENTS))
        .and_then(account_id)
}

/// Field reader bound to one record root. Collects warnings as it goes.
struct Fields<'a, 'w> {
    root: &'a Frame,
    skip: &'static [&'static str],
    local: FixedOffset,
    warnings: &'w mut Vec<DecodeWarning>,
}

impl<'a, 'w> Fields<'a, 'w> {
    fn frame(&self, name: &str) -> Option<&'a Frame> {
        self.root.find(name, self.skip)
    }

    fn text(&self, name: &str) -> Option<&'a str> {
        self.frame(name).and_then(Frame::text)
    }

    fn string(&self, name: &str) -> Option<String> {
        self.text(name).map(str::to_string)
    }

    fn code<T: FromStr<Err = Infallible>>(&self, name: &str) -> Option<T> {
        self.text(name).map(|text| match text.parse() {
            Ok(value) => value,
            Err(never) => match never {},
        })
    }

    fn warn(&mut self, field: &str, value: &str, reason: &str) {
        self.warnings.push(DecodeWarning {
            element: self.root.name.clone(),
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        });
    }

    fn decimal_of(&mut self, frame: Option<&'a Frame>) -> Option<Decimal> {
        let frame = frame?;
        let raw = frame.text()?;
        let value = parse_decimal(raw);
        if value.is_none() {
            self.warn(&frame.name, raw, "not a decimal number");
        }
        value
    }

    fn datetime_of(&mut self, frame: Option<&'a Frame>) -> Option<DateTime<FixedOffset>> {
        let frame = frame?;
        let raw = frame.text()?;
        let value = parse_datetime(raw, self.local);
        if value.is_none() {
            self.warn(&frame.name, raw, "not an OFX date/time");
        }
        value
    }

    fn decimal(&mut self, name: &str) -> Option<Decimal> {
        let frame = self.frame(name);
        self.decimal_of(frame)
    }

    /// First of `names` present with text, decoded as a decimal.
    fn decimal_any(&mut self, names: &[&str]) -> Option<Decimal> {
        let frame = names.iter().find_map(|name| self.frame(name).filter(|f| f.text().is_some()));
        self.decimal_of(frame)
    }

    fn datetime(&mut self, name: &str) -> Option<DateTime<FixedOffset>> {
        let frame = self.frame(name);
        self.datetime_of(frame)
    }

    fn datetime_any(&mut self, names: &[&str]) -> Option<DateTime<FixedOffset>> {
        let frame = names.iter().find_map(|name| self.frame(name).filter(|f| f.text().is_some()));
        self.datetime_of(frame)
    }
}

/// Turns completed record roots into records.
#[derive(Debug, Clone, Copy)]
pub struct Decoder {
    local_offset: FixedOffset,
}

impl Decoder {
    /// `local_offset` applies to date/times written without an offset.
    pub fn new(local_offset: FixedOffset) -> Self {
        Decoder { local_offset }
    }

    fn fields<'a, 'w>(
        &self,
        root: &'a Frame,
        skip: &'static [&'static str],
        warnings: &'w mut Vec<DecodeWarning>,
    ) -> Fields<'a, 'w> {
        Fields {
            root,
            skip,
            local: self.local_offset,
            warnings,
        }
    }

    /// Decode a record root of the given kind.
    pub fn decode(
        &self,
        kind: RecordKind,
        frame: &Frame,
        ancestors: &[Frame],
        warnings: &mut Vec<DecodeWarning>,
    ) -> Record {
        match kind {
            RecordKind::Status => Record::Status(self.status(frame, ancestors, warnings)),
            RecordKind::Account => Record::Account(self.account(frame, ancestors)),
            RecordKind::Statement => Record::Statement(self.statement(frame, warnings)),
            RecordKind::Transaction => {
                Record::Transaction(self.transaction(frame, ancestors, warnings))
            }
            RecordKind::Security => Record::Security(self.security(frame, warnings)),
        }
    }

    pub fn status(
        &self,
        frame: &Frame,
        ancestors: &[Frame],
        warnings: &mut Vec<DecodeWarning>,
    ) -> StatusRecord {
        let mut fields = self.fields(frame, &[], warnings);

        let code = match fields.text("CODE") {
            Some(raw) => match raw.parse::<u32>() {
                Ok(code) => Some(code),
                Err(_) => {
                    fields.warn("CODE", raw, "not a status code");
                    None
                }
            },
            None => None,
        };

        let severity = match fields.text("SEVERITY") {
            Some(raw) => match Severity::from_code(raw) {
                Some(severity) => Some(severity),
                None => {
                    fields.warn("SEVERITY", raw, "unknown severity");
                    code.map(Severity::from_status_code)
                }
            },
            None => code.map(Severity::from_status_code),
        };

        let known = code.and_then(status_codes::lookup);
        StatusRecord {
            element_name: ancestors.last().map(|parent| parent.name.clone()),
            severity,
            code,
            name: known.map(|entry| entry.name.to_string()),
            description: known.map(|entry| entry.description.to_string()),
            server_message: fields.string("MESSAGE"),
        }
    }

    pub fn account(&self, frame: &Frame, ancestors: &[Frame]) -> AccountRecord {
        let text = |name: &str| frame.child(name).and_then(Frame::text).map(str::to_string);
        let account_number = text("ACCTID");
        let broker_id = text("BROKERID");

        let account_type = match frame.name.as_str() {
            "CCACCTFROM" => Some(AccountType::CreditCard),
            "INVACCTFROM" => Some(AccountType::Investment),
            _ => frame
                .child("ACCTTYPE")
                .and_then(Frame::text)
                .map(|code| match code.parse() {
                    Ok(account_type) => account_type,
                    Err(never) => match never {},
                }),
        };

        let account_name = account_number.as_ref().map(|number| match frame.name.as_str() {
            "CCACCTFROM" => format!("Credit card {}", number),
            "INVACCTFROM" => match &broker_id {
                Some(broker) => format!("Investment account {} at broker {}", number, broker),
                None => format!("Investment account {}", number),
            },
            _ => format!("Bank account {}", number),
        });

        let currency = ancestors
            .iter()
            .rev()
            .find_map(|ancestor| ancestor.child("CURDEF").and_then(Frame::text))
            .map(str::to_string);

        AccountRecord {
            account_id: account_id(frame),
            account_name,
            account_type,
            currency,
            bank_id: text("BANKID"),
            branch_id: text("BRANCHID"),
            account_number,
            broker_id,
        }
    }

    pub fn statement(&self, frame: &Frame, warnings: &mut Vec<DecodeWarning>) -> StatementRecord {
        let mut fields = self.fields(frame, &[], warnings);
        let tranlist = frame.child_any(&["BANKTRANLIST", "INVTRANLIST"]);
        let ledger = frame.child("LEDGERBAL");

        let (available, available_date) = if frame.name == "INVSTMTRS" {
            (
                frame.child("INVBAL").and_then(|bal| bal.child("AVAILCASH")),
                frame.child("DTASOF"),
            )
        } else {
            let bal = frame.child("AVAILBAL");
            (
                bal.and_then(|bal| bal.child("BALAMT")),
                bal.and_then(|bal| bal.child("DTASOF")),
            )
        };

        StatementRecord {
            currency: frame.child("CURDEF").and_then(Frame::text).map(str::to_string),
            account_id: frame.child_any(&ACCOUNT_ELEMENTS).and_then(account_id),
            date_start: fields.datetime_of(tranlist.and_then(|list| list.child("DTSTART"))),
            date_end: fields.datetime_of(tranlist.and_then(|list| list.child("DTEND"))),
            ledger_balance: fields.decimal_of(ledger.and_then(|bal| bal.child("BALAMT"))),
            ledger_balance_date: fields.datetime_of(ledger.and_then(|bal| bal.child("DTASOF"))),
            available_balance: fields.decimal_of(available),
            available_balance_date: fields.datetime_of(available_date),
            marketing_info: frame.child("MKTGINFO").and_then(Frame::text).map(str::to_string),
        }
    }

    pub fn transaction(
        &self,
        frame: &Frame,
        ancestors: &[Frame],
        warnings: &mut Vec<DecodeWarning>,
    ) -> TransactionRecord {
        let investment_transaction_type = if frame.name == "STMTTRN" {
            None
        } else {
            match frame.name.parse() {
                Ok(kind) => Some(kind),
                Err(never) => match never {},
            }
        };
        let security = frame
            .find(SECURITY_ELEMENT, &[])
            .map(|secinfo| self.security(secinfo, warnings));

        let mut fields = self.fields(frame, &[SECURITY_ELEMENT], warnings);
        TransactionRecord {
            account_id: statement_account_id(ancestors),
            transaction_type: fields.code("TRNTYPE"),
            date_initiated: fields.datetime_any(&["DTUSER", "DTTRADE"]),
            date_posted: fields.datetime_any(&["DTPOSTED", "DTSETTLE"]),
            date_funds_available: fields.datetime("DTAVAIL"),
            amount: fields.decimal_any(&["TRNAMT", "TOTAL"]),
            units: fields.decimal("UNITS"),
            old_units: fields.decimal("OLDUNITS"),
            new_units: fields.decimal("NEWUNITS"),
            unit_price: fields.decimal("UNITPRICE"),
            fees: fields.decimal("FEES"),
            commission: fields.decimal("COMMISSION"),
            fi_id: fields.string("FITID"),
            fi_id_corrected: fields.string("CORRECTFITID"),
            fi_id_correction_action: fields.code("CORRECTACTION"),
            investment_transaction_type,
            unique_security_id: fields.string("UNIQUEID"),
            unique_id_type: fields.string("UNIQUEIDTYPE"),
            security,
            server_transaction_id: fields.string("SRVRTID"),
            check_number: fields.string("CHECKNUM"),
            reference_number: fields.string("REFNUM"),
            standard_industrial_code: fields.string("SIC"),
            payee_id: fields.string("PAYEEID"),
            name: fields.string("NAME"),
            memo: fields.string("MEMO"),
        }
    }

    pub fn security(&self, frame: &Frame, warnings: &mut Vec<DecodeWarning>) -> SecurityRecord {
        let mut fields = self.fields(frame, &[], warnings);
        let currency = fields
            .frame("CURRENCY")
            .or_else(|| fields.frame("ORIGCURRENCY"))
            .and_then(|currency| currency.child("CURSYM"))
            .and_then(Frame::text)
            .map(str::to_string);

        SecurityRecord {
            unique_id: fields.string("UNIQUEID"),
            unique_id_type: fields.string("UNIQUEIDTYPE"),
            name: fields.string("SECNAME"),
            ticker: fields.string("TICKER"),
            unit_price: fields.decimal("UNITPRICE"),
            unit_price_date: fields.datetime("DTASOF"),
            currency,
            memo: fields.string("MEMO"),
        }
    }
}
