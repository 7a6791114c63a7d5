use chrono::{FixedOffset, TimeZone};
use ofxkit::{
    parse, Callbacks, Dialect, DuplicatePolicy, ErrorKind, FormatSelection, MessageFilter,
    OfxInfo, ParseContext, ParseOptions, RecordHandler, RunState, Severity, TransactionType,
};
use ofxkit::{
    AccountRecord, AccountType, InvestmentTransactionType, SecurityRecord, StatementRecord,
    StatusRecord, TransactionRecord,
};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use std::io::Write;
use std::ops::ControlFlow;
use std::str::FromStr;
use std::thread;

const BANK_SGML: &str = "OFXHEADER:100
DATA:OFXSGML
VERSION:102
SECURITY:NONE
ENCODING:USASCII
CHARSET:1252
COMPRESSION:NONE
OLDFILEUID:NONE
NEWFILEUID:NONE

<OFX>
<SIGNONMSGSRSV1>
<SONRS>
<STATUS>
<CODE>0
<SEVERITY>INFO
</STATUS>
<DTSERVER>20240131120000[-5:EST]
<LANGUAGE>ENG
</SONRS>
</SIGNONMSGSRSV1>
<BANKMSGSRSV1>
<STMTTRNRS>
<TRNUID>1001
<STATUS>
<CODE>0
<SEVERITY>INFO
</STATUS>
<STMTRS>
<CURDEF>USD
<BANKACCTFROM>
<BANKID>121099999
<ACCTID>000112345
<ACCTTYPE>CHECKING
</BANKACCTFROM>
<BANKTRANLIST>
<DTSTART>20240101
<DTEND>20240131
<STMTTRN>
<TRNTYPE>DEBIT
<DTPOSTED>20240105120000[-5:EST]
<TRNAMT>-20.00
<FITID>20240105-1
<NAME>Coffee &amp; Co
</STMTTRN>
<STMTTRN>
<TRNTYPE>DIRECTDEP
<DTPOSTED>20240115
<DTUSER>20240114
<TRNAMT>1500.00
<FITID>20240115-1
<CHECKNUM>1042
<MEMO>Payroll
</STMTTRN>
</BANKTRANLIST>
<LEDGERBAL>
<BALAMT>2480.00
<DTASOF>20240131
</LEDGERBAL>
<AVAILBAL>
<BALAMT>2400.00
<DTASOF>20240131
</AVAILBAL>
</STMTRS>
</STMTTRNRS>
</BANKMSGSRSV1>
</OFX>
";

const BANK_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<?OFX OFXHEADER="200" VERSION="220" SECURITY="NONE" OLDFILEUID="NONE" NEWFILEUID="NONE"?>
<OFX>
  <SIGNONMSGSRSV1>
    <SONRS>
      <STATUS><CODE>0</CODE><SEVERITY>INFO</SEVERITY></STATUS>
      <DTSERVER>20240131120000[-5:EST]</DTSERVER>
      <LANGUAGE>ENG</LANGUAGE>
    </SONRS>
  </SIGNONMSGSRSV1>
  <BANKMSGSRSV1>
    <STMTTRNRS>
      <TRNUID>1001</TRNUID>
      <STATUS><CODE>0</CODE><SEVERITY>INFO</SEVERITY></STATUS>
      <STMTRS>
        <CURDEF>USD</CURDEF>
        <BANKACCTFROM>
          <BANKID>121099999</BANKID>
          <ACCTID>000112345</ACCTID>
          <ACCTTYPE>CHECKING</ACCTTYPE>
        </BANKACCTFROM>
        <BANKTRANLIST>
          <DTSTART>20240101</DTSTART>
          <DTEND>20240131</DTEND>
          <STMTTRN>
            <TRNTYPE>DEBIT</TRNTYPE>
            <DTPOSTED>20240105120000[-5:EST]</DTPOSTED>
            <TRNAMT>-20.00</TRNAMT>
            <FITID>20240105-1</FITID>
            <NAME>Coffee &amp; Co</NAME>
          </STMTTRN>
          <STMTTRN>
            <TRNTYPE>DIRECTDEP</TRNTYPE>
            <DTPOSTED>20240115</DTPOSTED>
            <DTUSER>20240114</DTUSER>
            <TRNAMT>1500.00</TRNAMT>
            <FITID>20240115-1</FITID>
            <CHECKNUM>1042</CHECKNUM>
            <MEMO>Payroll</MEMO>
          </STMTTRN>
        </BANKTRANLIST>
        <LEDGERBAL><BALAMT>2480.00</BALAMT><DTASOF>20240131</DTASOF></LEDGERBAL>
        <AVAILBAL><BALAMT>2400.00</BALAMT><DTASOF>20240131</DTASOF></AVAILBAL>
      </STMTRS>
    </STMTTRNRS>
  </BANKMSGSRSV1>
</OFX>
"#;

const INVESTMENT_SGML: &str = "OFXHEADER:100
DATA:OFXSGML
VERSION:103

<OFX>
<INVSTMTMSGSRSV1>
<INVSTMTTRNRS>
<TRNUID>2002
<STATUS><CODE>0<SEVERITY>INFO</STATUS>
<INVSTMTRS>
<DTASOF>20240201
<CURDEF>USD
<INVACCTFROM>
<BROKERID>broker.example.com
<ACCTID>77-123
</INVACCTFROM>
<INVTRANLIST>
<DTSTART>20240101
<DTEND>20240201
<BUYSTOCK>
<INVBUY>
<INVTRAN>
<FITID>B-1
<DTTRADE>20240110
<DTSETTLE>20240112
<MEMO>Opening position
</INVTRAN>
<SECID><UNIQUEID>037833100<UNIQUEIDTYPE>CUSIP</SECID>
<UNITS>10
<UNITPRICE>185.50
<COMMISSION>4.95
<TOTAL>-1859.95
<SUBACCTSEC>CASH
<SUBACCTFUND>CASH
</INVBUY>
<BUYTYPE>BUY
<SECINFO>
<SECID><UNIQUEID>037833100<UNIQUEIDTYPE>CUSIP</SECID>
<SECNAME>Apple Inc
<TICKER>AAPL
</SECINFO>
</BUYSTOCK>
<SPLIT>
<INVTRAN><FITID>S-1<DTTRADE>20240120</INVTRAN>
<SECID><UNIQUEID>037833100<UNIQUEIDTYPE>CUSIP</SECID>
<SUBACCTSEC>CASH
<OLDUNITS>10
<NEWUNITS>40
<NUMERATOR>4
<DENOMINATOR>1
</SPLIT>
<INVBANKTRAN>
<STMTTRN><TRNTYPE>INT<DTPOSTED>20240131<TRNAMT>1.25<FITID>I-1</STMTTRN>
<SUBACCTFUND>CASH
</INVBANKTRAN>
</INVTRANLIST>
<INVBAL>
<AVAILCASH>512.30
<MARGINBALANCE>0
<SHORTBALANCE>0
</INVBAL>
</INVSTMTRS>
</INVSTMTTRNRS>
</INVSTMTMSGSRSV1>
<SECLISTMSGSRSV1>
<SECLIST>
<STOCKINFO>
<SECINFO>
<SECID><UNIQUEID>037833100<UNIQUEIDTYPE>CUSIP</SECID>
<SECNAME>Apple Inc
<TICKER>AAPL
<UNITPRICE>190.00
<DTASOF>20240201
</SECINFO>
</STOCKINFO>
</SECLIST>
</SECLISTMSGSRSV1>
</OFX>
";

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

fn options() -> ParseOptions {
    ParseOptions {
        local_offset: utc(),
        messages: MessageFilter::silent(),
        ..ParseOptions::default()
    }
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn collect(doc: &str, options: ParseOptions) -> OfxInfo {
    let mut info = OfxInfo::default();
    parse(doc.as_bytes(), options, &mut info).unwrap();
    info
}

/// Records the kind and a key of every record, in arrival order.
#[derive(Default)]
struct Recorder {
    events: Vec<String>,
}

impl RecordHandler for Recorder {
    fn status(&mut self, record: StatusRecord) -> ControlFlow<String> {
        let element = record.element_name.unwrap_or_default();
        self.events.push(format!("status {}", element));
        ControlFlow::Continue(())
    }

    fn account(&mut self, record: AccountRecord) -> ControlFlow<String> {
        let id = record.account_id.unwrap_or_default();
        self.events.push(format!("account {}", id));
        ControlFlow::Continue(())
    }

    fn statement(&mut self, record: StatementRecord) -> ControlFlow<String> {
        let currency = record.currency.unwrap_or_default();
        self.events.push(format!("statement {}", currency));
        ControlFlow::Continue(())
    }

    fn transaction(&mut self, record: TransactionRecord) -> ControlFlow<String> {
        let id = record.fi_id.unwrap_or_default();
        self.events.push(format!("transaction {}", id));
        ControlFlow::Continue(())
    }

    fn security(&mut self, record: SecurityRecord) -> ControlFlow<String> {
        let ticker = record.ticker.unwrap_or_default();
        self.events.push(format!("security {}", ticker));
        ControlFlow::Continue(())
    }
}

#[test]
fn test_single_transaction_without_fitid() {
    let doc = "OFXHEADER:100\n\n<OFX><BANKTRANLIST><STMTTRN><TRNTYPE>DEBIT<TRNAMT>-20.00</STMTTRN></BANKTRANLIST></OFX>";
    let info = collect(doc, options());

    assert_eq!(info.transactions.len(), 1);
    let txn = &info.transactions[0];
    assert_eq!(txn.transaction_type, Some(TransactionType::Debit));
    assert_eq!(txn.amount, Some(dec("-20.00")));
    assert_eq!(txn.fi_id, None);
}

#[test]
fn test_zero_and_empty_values_stay_distinct() {
    let doc = "OFXHEADER:100\n\n<OFX><STMTRS><CURDEF>USD\
               <BANKACCTFROM><BANKID>1<BRANCHID><ACCTID>2<ACCTTYPE>CHECKING</BANKACCTFROM>\
               <BANKTRANLIST><STMTTRN><TRNTYPE>OTHER<TRNAMT>0.00<MEMO><FITID>Z-1</STMTTRN>\
               </BANKTRANLIST></STMTRS></OFX>";
    let info = collect(doc, options());

    let txn = &info.transactions[0];
    assert_eq!(txn.amount, Some(dec("0.00")));
    assert_eq!(txn.memo, None);
    assert_eq!(txn.fi_id.as_deref(), Some("Z-1"));
    assert_eq!(txn.account_id.as_deref(), Some("1 2"));

    let account = &info.accounts[0];
    assert_eq!(account.branch_id, None);
    assert_eq!(account.account_number.as_deref(), Some("2"));
    assert_eq!(account.account_type, Some(AccountType::Checking));
}

#[test]
fn test_second_statement_rejected_after_first_dispatched() {
    let doc = "OFXHEADER:100\n\n<OFX><BANKMSGSRSV1>\
               <STMTTRNRS><STMTRS><CURDEF>USD</STMTRS></STMTTRNRS>\
               <STMTTRNRS><STMTRS><CURDEF>EUR</STMTRS></STMTTRNRS>\
               </BANKMSGSRSV1></OFX>";
    let mut currencies = Vec::new();
    let handler = Callbacks::new().on_statement(|statement| {
        currencies.push(statement.currency);
        ControlFlow::Continue(())
    });
    let mut context = ParseContext::new(handler);
    context
        .configure(ParseOptions {
            duplicates: DuplicatePolicy::RejectDuplicates,
            ..options()
        })
        .unwrap();

    let err = context.begin(doc.as_bytes()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateTopLevelRecord);
    assert_eq!(err.to_string(), "Duplicate top-level statement record");
    match context.state() {
        RunState::Failed(failure) => {
            assert_eq!(failure.kind, ErrorKind::DuplicateTopLevelRecord)
        }
        other => panic!("unexpected state {:?}", other),
    }
    drop(context);
    assert_eq!(currencies, vec![Some("USD".to_string())]);
}

#[test]
fn test_collect_all_keeps_every_statement() {
    let doc = BANK_SGML.replace(
        "</BANKMSGSRSV1>",
        "<STMTTRNRS><STMTRS><CURDEF>EUR<BANKACCTFROM><BANKID>9<ACCTID>8</BANKACCTFROM>\
         </STMTRS></STMTTRNRS></BANKMSGSRSV1>",
    );
    let info = collect(&doc, options());
    assert_eq!(info.statements.len(), 2);
    assert_eq!(info.accounts.len(), 2);
    assert_eq!(info.accounts[1].account_id.as_deref(), Some("9 8"));
    assert_eq!(info.accounts[1].currency.as_deref(), Some("EUR"));

    let err = parse(
        doc.as_bytes(),
        ParseOptions {
            duplicates: DuplicatePolicy::RejectDuplicates,
            ..options()
        },
        OfxInfo::default(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateTopLevelRecord);
}

#[test]
fn test_posted_date_with_named_zone() {
    let doc = "OFXHEADER:100\n\n<OFX><STMTTRN><DTPOSTED>20230615120000[-5:EST]</STMTTRN></OFX>";
    let info = collect(doc, options());
    let est = FixedOffset::west_opt(5 * 3600).unwrap();
    assert_eq!(
        info.transactions[0].date_posted,
        Some(est.with_ymd_and_hms(2023, 6, 15, 12, 0, 0).unwrap())
    );
}

#[test]
fn test_unterminated_quote_is_malformed() {
    let doc = "OFXHEADER:100\n\n<OFX>\n<STMTTRN>\n<NAME id=\"abc>Joe\n<TRNAMT>1\n</STMTTRN>\n</OFX>\n";
    let quote = doc.find('"').unwrap();
    let mut context = ParseContext::new(OfxInfo::default());
    context.configure(options()).unwrap();

    let err = context.begin(doc.as_bytes()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedDocument);
    assert_eq!(err.offset(), Some(quote));
    match context.state() {
        RunState::Failed(failure) => assert_eq!(failure.offset, Some(quote)),
        other => panic!("unexpected state {:?}", other),
    }
    assert!(context.handler().transactions.is_empty());
}

#[test]
fn test_records_arrive_in_close_order() {
    let mut recorder = Recorder::default();
    parse(BANK_SGML.as_bytes(), options(), &mut recorder).unwrap();
    assert_eq!(
        recorder.events,
        vec![
            "status SONRS",
            "status STMTTRNRS",
            "account 121099999 000112345",
            "transaction 20240105-1",
            "transaction 20240115-1",
            "statement USD",
        ]
    );
}

#[test]
fn test_bank_statement_fields() {
    let info = collect(BANK_SGML, options());

    let status = &info.statuses[1];
    assert_eq!(status.element_name.as_deref(), Some("STMTTRNRS"));
    assert_eq!(status.severity, Some(Severity::Info));
    assert_eq!(status.code, Some(0));
    assert_eq!(status.name.as_deref(), Some("Success"));

    let account = &info.accounts[0];
    assert_eq!(account.account_type, Some(AccountType::Checking));
    assert_eq!(account.account_name.as_deref(), Some("Bank account 000112345"));
    assert_eq!(account.currency.as_deref(), Some("USD"));

    let statement = &info.statements[0];
    assert_eq!(statement.account_id.as_deref(), Some("121099999 000112345"));
    assert_eq!(statement.ledger_balance, Some(dec("2480.00")));
    assert_eq!(statement.available_balance, Some(dec("2400.00")));
    assert_eq!(
        statement.date_start,
        Some(utc().with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    );

    let coffee = &info.transactions[0];
    assert_eq!(coffee.name.as_deref(), Some("Coffee & Co"));
    assert_eq!(coffee.account_id.as_deref(), Some("121099999 000112345"));

    let payroll = &info.transactions[1];
    assert_eq!(payroll.transaction_type, Some(TransactionType::DirectDep));
    assert_eq!(payroll.check_number.as_deref(), Some("1042"));
    assert_eq!(
        payroll.date_initiated,
        Some(utc().with_ymd_and_hms(2024, 1, 14, 0, 0, 0).unwrap())
    );
}

#[test]
fn test_xml_dialect_matches_sgml() {
    let mut sgml = OfxInfo::default();
    let sgml_summary = parse(BANK_SGML.as_bytes(), options(), &mut sgml).unwrap();
    let mut xml = OfxInfo::default();
    let xml_summary = parse(BANK_XML.as_bytes(), options(), &mut xml).unwrap();

    assert_eq!(sgml_summary.dialect, Dialect::OfxSgml);
    assert_eq!(xml_summary.dialect, Dialect::OfxXml);
    assert_eq!(xml_summary.header.as_ref().and_then(|h| h.version()), Some("220"));
    assert_eq!(sgml, xml);
}

#[test]
fn test_investment_statement() {
    let mut recorder = Recorder::default();
    parse(INVESTMENT_SGML.as_bytes(), options(), &mut recorder).unwrap();
    assert_eq!(
        recorder.events,
        vec![
            "status INVSTMTTRNRS",
            "account broker.example.com 77-123",
            "transaction B-1",
            "transaction S-1",
            "transaction I-1",
            "statement USD",
            "security AAPL",
        ]
    );

    let info = collect(INVESTMENT_SGML, options());
    let buy = &info.transactions[0];
    assert_eq!(buy.investment_transaction_type, Some(InvestmentTransactionType::BuyStock));
    assert_eq!(buy.account_id.as_deref(), Some("broker.example.com 77-123"));
    assert_eq!(buy.amount, Some(dec("-1859.95")));
    assert_eq!(buy.units, Some(dec("10")));
    assert_eq!(buy.unit_price, Some(dec("185.50")));
    assert_eq!(buy.commission, Some(dec("4.95")));
    assert_eq!(buy.unique_security_id.as_deref(), Some("037833100"));
    assert_eq!(buy.memo.as_deref(), Some("Opening position"));
    assert_eq!(
        buy.date_posted,
        Some(utc().with_ymd_and_hms(2024, 1, 12, 0, 0, 0).unwrap())
    );
    let nested = buy.security.as_ref().unwrap();
    assert_eq!(nested.name.as_deref(), Some("Apple Inc"));
    assert_eq!(nested.unit_price, None);

    let split = &info.transactions[1];
    assert_eq!(split.investment_transaction_type, Some(InvestmentTransactionType::Split));
    assert_eq!(split.old_units, Some(dec("10")));
    assert_eq!(split.new_units, Some(dec("40")));
    assert_eq!(split.security, None);

    let interest = &info.transactions[2];
    assert_eq!(interest.transaction_type, Some(TransactionType::Int));
    assert_eq!(interest.investment_transaction_type, None);

    let statement = &info.statements[0];
    assert_eq!(statement.available_balance, Some(dec("512.30")));
    assert_eq!(
        statement.available_balance_date,
        Some(utc().with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap())
    );

    assert_eq!(info.accounts[0].account_type, Some(AccountType::Investment));
    assert_eq!(info.securities.len(), 1);
    assert_eq!(info.securities[0].unit_price, Some(dec("190.00")));
}

#[test]
fn test_ofc_document() {
    let doc = "<OFC>\n<ACCTSTMT>\n<STMTRS>\n<STMTTRN>\n<TRNTYPE>CREDIT\n<DTPOSTED>19990105\n\
               <TRNAMT>12.50\n<FITID>OFC-1\n</STMTTRN>\n</STMTRS>\n</ACCTSTMT>\n</OFC>\n";
    let mut info = OfxInfo::default();
    let summary = parse(doc.as_bytes(), options(), &mut info).unwrap();
    assert_eq!(summary.dialect, Dialect::Ofc);
    assert_eq!(summary.header, None);
    assert_eq!(info.transactions.len(), 1);
    assert_eq!(info.transactions[0].amount, Some(dec("12.50")));
    assert_eq!(info.statements.len(), 1);
}

#[test]
fn test_explicit_format_overrides_detection() {
    let xml_as_sgml = ParseOptions {
        format: FormatSelection::Explicit(Dialect::OfxSgml),
        ..options()
    };
    let mut info = OfxInfo::default();
    let summary = parse(BANK_XML.as_bytes(), xml_as_sgml, &mut info).unwrap();
    assert_eq!(summary.dialect, Dialect::OfxSgml);
    assert_eq!(info, collect(BANK_XML, options()));
}

#[test]
fn test_local_offset_applies_to_bare_dates() {
    let cet = FixedOffset::east_opt(3600).unwrap();
    let info = collect(
        BANK_SGML,
        ParseOptions {
            local_offset: cet,
            ..options()
        },
    );
    let payroll = &info.transactions[1];
    assert_eq!(
        payroll.date_posted,
        Some(cet.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap())
    );
}

#[test]
fn test_parallel_runs() {
    let handles: Vec<_> = [BANK_SGML, INVESTMENT_SGML, BANK_XML]
        .into_iter()
        .map(|doc| {
            thread::spawn(move || {
                let mut info = OfxInfo::default();
                parse(doc.as_bytes(), options(), &mut info).map(|_| info.transactions.len())
            })
        })
        .collect();

    let counts: Vec<usize> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap().unwrap())
        .collect();
    assert_eq!(counts, vec![2, 3, 2]);
}

#[test]
fn test_from_path_and_csv_export() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(BANK_SGML.as_bytes()).unwrap();
    file.flush().unwrap();

    let (info, summary) = OfxInfo::from_path(file.path(), options()).unwrap();
    assert_eq!(summary.counts.transaction, 2);
    assert!(summary.warnings.is_empty());

    let mut csv = Vec::new();
    info.write_transactions_csv(&mut csv).unwrap();
    let text = String::from_utf8(csv).unwrap();
    let rows: Vec<&str> = text.lines().collect();
    assert_eq!(rows.len(), 3);
    assert!(rows[1].starts_with("121099999 000112345,DEBIT,,2024-01-05T12:00:00-05:00,,-20.00,"));
}

#[test]
fn test_decode_warnings_do_not_stop_the_run() {
    let doc = BANK_SGML.replace("<TRNAMT>1500.00", "<TRNAMT>1,500.00");
    let mut info = OfxInfo::default();
    let summary = parse(doc.as_bytes(), options(), &mut info).unwrap();

    assert_eq!(info.transactions.len(), 2);
    assert_eq!(info.transactions[1].amount, None);
    assert_eq!(summary.warnings.len(), 1);
    assert_eq!(summary.warnings[0].field, "TRNAMT");
    assert_eq!(summary.warnings[0].value, "1,500.00");
}

#[test]
fn test_abort_keeps_earlier_records() {
    let mut seen = Vec::new();
    let handler = Callbacks::new().on_transaction(|txn| {
        seen.push(txn.fi_id.clone());
        ControlFlow::Break("first one is enough".to_string())
    });
    let err = parse(BANK_SGML.as_bytes(), options(), handler).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CallbackAbort);
    assert_eq!(seen, vec![Some("20240105-1".to_string())]);
}
