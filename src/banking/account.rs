//! Account-creation records and per-step field checks.

use std::str::FromStr;

use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Image service that renders the account number as a QR code.
pub const QR_CODE_URL_PREFIX: &str = "https://api.qrserver.com/v1/create-qr-code/?size=150x150&data=";

/// Steps of the account-creation wizard, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStep {
    Name,
    Email,
    BankDetails,
    Security,
}

impl AccountStep {
    /// The following step, or `None` after `Security` (the wizard completes).
    pub fn next(&self) -> Option<AccountStep> {
        match self {
            Self::Name => Some(Self::Email),
            Self::Email => Some(Self::BankDetails),
            Self::BankDetails => Some(Self::Security),
            Self::Security => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::BankDetails => "bank_details",
            Self::Security => "security",
        }
    }
}

impl std::fmt::Display for AccountStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a submission did not advance the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub field: &'static str,
    pub reason: &'static str,
}

impl Rejection {
    fn new(field: &'static str, reason: &'static str) -> Self {
        Self { field, reason }
    }
}

/// Raw bank-details form, as posted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BankDetailsForm {
    #[serde(default)]
    pub bank_id: String,
    #[serde(default)]
    pub daily_limit: String,
    #[serde(default)]
    pub ifsc_code: String,
    #[serde(default)]
    pub upi_id: String,
    #[serde(default)]
    pub login_id: String,
    #[serde(default)]
    pub agent_id: String,
}

/// Raw security form, as posted. A checked checkbox arrives as `"on"`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub trxn_password: String,
    #[serde(default)]
    pub otp_access: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BankDetails {
    pub bank_id: String,
    pub daily_limit: Decimal,
    pub ifsc_code: String,
    pub upi_id: String,
    pub login_id: String,
    pub agent_id: String,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
    pub trxn_password: SecretString,
    pub otp_access: bool,
}

/// Fields collected so far. Cleared on completion or cancellation.
#[derive(Debug, Clone, Default)]
pub struct AccountDraft {
    pub name: Option<String>,
    pub email: Option<String>,
    pub bank: Option<BankDetails>,
}

/// A finished account. Exists only once every required field is set.
#[derive(Debug, Clone)]
pub struct AccountRecord {
    pub account_number: String,
    pub name: String,
    pub email: String,
    pub bank: BankDetails,
    pub credentials: Credentials,
    pub qrcode_url: String,
}

impl AccountRecord {
    /// Finalize a draft. Returns `None` if an earlier step was never completed.
    pub fn finalize(draft: AccountDraft, credentials: Credentials) -> Option<Self> {
        let account_number = generate_account_number();
        Some(Self {
            qrcode_url: qr_code_url(&account_number),
            account_number,
            name: draft.name?,
            email: draft.email?,
            bank: draft.bank?,
            credentials,
        })
    }

    /// Confirmation message appended to the log.
    pub fn summary(&self) -> String {
        format!(
            "Account created successfully! 🎉\n\
             Account Number: {}\n\
             Name: {}\n\
             Email: {}\n\
             Bank ID: {}\n\
             Daily Limit: ${}\n\
             IFSC Code: {}\n\
             UPI ID: {}\n\
             Login ID: {}\n\
             Agent ID: {}\n\
             Username: {}\n\
             QR Code: {}",
            self.account_number,
            self.name,
            self.email,
            self.bank.bank_id,
            format_amount(self.bank.daily_limit),
            self.bank.ifsc_code,
            self.bank.upi_id,
            self.bank.login_id,
            self.bank.agent_id,
            self.credentials.username,
            self.qrcode_url,
        )
    }
}

/// Short opaque account identifier: the first 8 hex digits of a v4 UUID.
pub fn generate_account_number() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

pub fn qr_code_url(account_number: &str) -> String {
    format!("{QR_CODE_URL_PREFIX}{account_number}")
}

/// Two fractional digits, no grouping: `5000` → `5000.00`.
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

/// Lenient number parse; anything unparseable counts as zero.
pub fn parse_amount(raw: &str) -> Decimal {
    Decimal::from_str(raw.trim()).unwrap_or(Decimal::ZERO)
}

/// Trimmed value, or `None` when blank. Collected fields are stored trimmed.
fn present(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub fn check_name(raw: &str) -> Result<String, Rejection> {
    present(raw).ok_or_else(|| Rejection::new("name", "Please enter your full name."))
}

pub fn check_email(raw: &str) -> Result<String, Rejection> {
    match present(raw) {
        Some(email) if email.contains('@') => Ok(email),
        _ => Err(Rejection::new("email", "Please enter a valid email address.")),
    }
}

pub fn check_bank_details(form: &BankDetailsForm) -> Result<BankDetails, Rejection> {
    let bank_id = present(&form.bank_id)
        .ok_or_else(|| Rejection::new("bank_id", "Bank ID is required."))?;
    let daily_limit = parse_amount(&form.daily_limit);
    if daily_limit <= Decimal::ZERO {
        return Err(Rejection::new(
            "daily_limit",
            "Daily limit must be greater than zero.",
        ));
    }
    let ifsc_code = present(&form.ifsc_code)
        .ok_or_else(|| Rejection::new("ifsc_code", "IFSC code is required."))?;

    Ok(BankDetails {
        bank_id,
        daily_limit,
        ifsc_code,
        upi_id: form.upi_id.trim().to_string(),
        login_id: form.login_id.trim().to_string(),
        agent_id: form.agent_id.trim().to_string(),
    })
}

pub fn check_security(form: &SecurityForm) -> Result<Credentials, Rejection> {
    let username = present(&form.username)
        .ok_or_else(|| Rejection::new("username", "Username is required."))?;
    if present(&form.password).is_none() {
        return Err(Rejection::new("password", "Password is required."));
    }
    if present(&form.trxn_password).is_none() {
        return Err(Rejection::new(
            "trxn_password",
            "Transaction password is required.",
        ));
    }

    Ok(Credentials {
        username,
        password: SecretString::from(form.password.clone()),
        trxn_password: SecretString::from(form.trxn_password.clone()),
        otp_access: form.otp_access.is_some(),
    })
}
