//! OFX status codes with their short names and descriptions.

/// Entry of the status-code table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCode {
    pub code: u32,
    pub name: &'static str,
    pub description: &'static str,
}

const fn entry(code: u32, name: &'static str, description: &'static str) -> StatusCode {
    StatusCode {
        code,
        name,
        description,
    }
}

/// Known codes, sorted by `code`.
pub const STATUS_CODES: &[StatusCode] = &[
    entry(0, "Success", "The server successfully processed the request."),
    entry(1, "Client is up-to-date", "Based on the client timestamp, the client has the latest information. The response does not supply any additional information."),
    entry(2000, "General error", "Error other than those specified by the remaining error codes."),
    entry(2001, "Invalid account", "The account number is not valid at this financial institution."),
    entry(2002, "General account error", "Account error not specified by the remaining error codes."),
    entry(2003, "Account not found", "The specified account number does not correspond to one of the user's accounts."),
    entry(2004, "Account closed", "The specified account number corresponds to an account that has been closed."),
    entry(2005, "Account not authorized", "The user is not authorized to perform this action on the account, or the server does not allow this type of action to be performed on the account."),
    entry(2006, "Source account not found", "The specified account number does not correspond to one of the user's accounts."),
    entry(2007, "Source account closed", "The specified account number corresponds to an account that has been closed."),
    entry(2008, "Source account not authorized", "The user is not authorized to perform this action on the account, or the server does not allow this type of action to be performed on the account."),
    entry(2009, "Destination account not found", "The specified account number does not correspond to one of the user's accounts."),
    entry(2010, "Destination account closed", "The specified account number corresponds to an account that has been closed."),
    entry(2011, "Destination account not authorized", "The user is not authorized to perform this action on the account, or the server does not allow this type of action to be performed on the account."),
    entry(2012, "Invalid amount", "The specified amount is not valid for this action; for example, the user specified a negative payment amount."),
    entry(2014, "Date too soon", "The server cannot process the requested action by the date specified by the user."),
    entry(2015, "Date too far in future", "The server cannot accept requests for an action that far in the future."),
    entry(2016, "Transaction already committed", "Transaction has entered the processing loop and cannot be modified/cancelled using OFX."),
    entry(2017, "Already canceled", "The transaction cannot be canceled or modified because it has already been canceled."),
    entry(2018, "Unknown server ID", "The specified server ID does not exist or no longer exists."),
    entry(2019, "Duplicate request", "A request with this <TRNUID> has already been received and processed."),
    entry(2020, "Invalid date", "The specified datetime stamp cannot be parsed; for instance, the datetime stamp specifies 25:00 hours."),
    entry(2021, "Unsupported version", "The server does not support the requested version. The version of the message set specified by the client is not supported by this server."),
    entry(2022, "Invalid TAN", "The server was unable to validate the TAN sent in the request."),
    entry(2023, "Unknown FITID", "The specified FITID/BILLID does not exist or no longer exists."),
    entry(2025, "Branch ID missing", "A <BRANCHID> value must be provided in the <BANKACCTFROM> aggregate for this country system, but this field is missing."),
    entry(2026, "Bank name doesn't match bank ID", "The value of <BANKNAME> in the <EXTBANKACCTTO> aggregate is inconsistent with the value of <BANKID> in the <BANKACCTTO> aggregate."),
    entry(2027, "Invalid date range", "Response for non-overlapping dates, date ranges in the future, et cetera."),
    entry(2028, "Requested element unknown", "One or more elements of the request were not recognized by the server or the server (as noted in the FI Profile) does not support the elements."),
    entry(6500, "<REJECTIFMISSING>Y invalid without <TOKEN>", "This error code may appear in the <SYNCERROR> element of an <xxxSYNCRS> wrapper (in <PRESENTMENTDLVRS> and V2 message set responses) or the <CODE> contained in any embedded transaction wrappers within a sync response."),
    entry(6501, "Embedded transactions in request failed to process: Out of date", "Used when the server is not able to process the request due to the state of the client; the client must synchronize before retrying."),
    entry(6502, "Unable to process embedded transaction due to out-of-date <TOKEN>", "Used in response transaction wrapper for embedded transactions when <SYNCERROR>6501 appears in the surrounding sync wrapper."),
    entry(10000, "Stop check in process", "Stop check is already in process."),
    entry(10500, "Too many checks to process", "The stop-payment request <STPCHKRQ> specifies too many checks."),
    entry(10501, "Invalid payee", "Payee error not specified by the remaining error codes."),
    entry(10502, "Invalid payee address", "Some portion of the payee's address is incorrect or unknown."),
    entry(10503, "Invalid payee account number", "The account number <PAYACCT> of the requested payee is invalid."),
    entry(10504, "Insufficient funds", "The server cannot process the request because the specified account does not have enough funds."),
    entry(10505, "Cannot modify element", "The server does not allow modifications to one or more values in a modification request."),
    entry(10506, "Cannot modify source account", "Reserved for future use."),
    entry(10507, "Cannot modify destination account", "Reserved for future use."),
    entry(10508, "Invalid frequency", "The specified frequency <FREQ> does not match one of the accepted frequencies for recurring transactions."),
    entry(10509, "Model already canceled", "The server has already canceled the specified recurring model."),
    entry(10510, "Invalid payee ID", "The specified payee ID does not exist or no longer exists."),
    entry(10511, "Invalid payee city", "The specified city is incorrect or unknown."),
    entry(10512, "Invalid payee state", "The specified state is incorrect or unknown."),
    entry(10513, "Invalid payee postal code", "The specified postal code is incorrect or unknown."),
    entry(10514, "Transaction already processed", "Transaction has already been sent or date due is past."),
    entry(10515, "Payee not modifiable by client", "The server does not allow clients to change payee information."),
    entry(10516, "Wire beneficiary invalid", "The specified wire beneficiary does not exist or no longer exists."),
    entry(10517, "Invalid payee name", "The server does not recognize the specified payee name."),
    entry(10518, "Unknown model ID", "The specified model ID does not exist or no longer exists."),
    entry(10519, "Invalid payee list ID", "The specified payee list ID does not exist or no longer exists."),
    entry(12250, "Investment transaction download not supported", "The server does not support investment transaction download."),
    entry(12251, "Investment position download not supported", "The server does not support investment position download."),
    entry(12252, "Investment positions for specified date not available", "The server does not support investment positions for the specified date."),
    entry(12253, "Investment open order download not supported", "The server does not support open order download."),
    entry(12254, "Investment balances download not supported", "The server does not support investment balances download."),
    entry(12255, "401(k) not available for this account", "401(k) information requested from a non-401(k) account."),
    entry(12500, "One or more securities not found", "The server could not find the requested securities."),
    entry(13000, "User ID & password will be sent out-of-band", "The server will send the user ID and password via postal mail, e-mail, or another means."),
    entry(13500, "Unable to enroll user", "The server could not enroll the user."),
    entry(13501, "User already enrolled", "The server has already enrolled the user."),
    entry(13502, "Invalid service", "The server does not support the service <SVC> specified in the service-activation request."),
    entry(13503, "Cannot change user information", "The server does not support the <CHGUSERINFORQ> request."),
    entry(13504, "<FI> Missing or Invalid in <SONRQ>", "The FI requires the client to provide the <FI> aggregate in the <SONRQ> request, but either none was provided, or the one provided was invalid."),
    entry(14500, "1099 forms not available", "1099 forms are not yet available for the tax year requested."),
    entry(14501, "1099 forms not available for user ID", "This user does not have any 1099 forms available."),
    entry(14600, "W2 forms not available", "W2 forms are not yet available for the tax year requested."),
    entry(14601, "W2 forms not available for user ID", "The user does not have any W2 forms available."),
    entry(14700, "1098 forms not available", "1098 forms are not yet available for the tax year requested."),
    entry(14701, "1098 forms not available for user ID", "The user does not have any 1098 forms available."),
    entry(15000, "Must change USERPASS", "The user must change his or her <USERPASS> number as part of the next OFX request."),
    entry(15500, "Signon invalid", "The user cannot signon because he or she entered an invalid user ID or password."),
    entry(15501, "Customer account already in use", "The server allows only one connection at a time, and another user is already signed on."),
    entry(15502, "USERPASS lockout", "The server will not allow the user to signon because he or she has entered too many invalid passwords."),
    entry(15503, "Could not change USERPASS", "The server does not allow the user to change his or her password."),
    entry(15504, "Could not provide random data", "The server could not generate random data as requested by the <CHALLENGERQ>."),
    entry(15505, "Country system not supported", "The server does not support the country specified in the <COUNTRY> field of the <SONRQ> aggregate."),
    entry(15506, "Empty signon not supported", "The server does not support signons not accompanied by some other transaction."),
    entry(15507, "Signon invalid without supporting pin change request", "The OFX block associated with the signon does not contain a pin change request and should."),
    entry(15508, "Transaction not authorized", "Current user is not authorized to perform this action on behalf of the <USERID>."),
    entry(15510, "CLIENTUID error", "The CLIENTUID sent by the client was incorrect. User must register the Client UID."),
    entry(15511, "MFA error", "User should contact financial institution."),
    entry(15512, "AUTHTOKEN required", "User needs to contact financial institution to obtain AUTHTOKEN."),
    entry(15513, "AUTHTOKEN invalid", "The AUTHTOKEN sent by the client was invalid."),
    entry(16500, "HTML not allowed", "The server does not accept HTML formatting in the request."),
    entry(16501, "Unknown mail To:", "The server was unable to send mail to the specified Internet address."),
    entry(16502, "Invalid URL", "The server could not parse the URL."),
    entry(16503, "Unable to get URL", "The server was unable to retrieve the information at this URL (e.g., an HTTP 400 or 500 series error)."),
];

/// Look up a status code.
pub fn lookup(code: u32) -> Option<&'static StatusCode> {
    STATUS_CODES
        .binary_search_by_key(&code, |entry| entry.code)
        .ok()
        .map(|index| &STATUS_CODES[index])
}
