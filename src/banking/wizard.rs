//! Wizard state machine for mode selection and the two guided flows.
//!
//! Account creation walks `name → email → bank_details → security` and then
//! completes. Transactions walk `select_kind → amount` and then complete. A
//! submission that fails its field check leaves the step where it is and
//! returns `StepOutcome::Rejected`; nothing is appended to the log. Completion
//! appends a summary and returns the session to idle, dropping every
//! collected field.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::account::{
    AccountDraft, AccountRecord, AccountStep, BankDetailsForm, Rejection, SecurityForm,
    check_bank_details, check_email, check_name, check_security,
};
use super::message::Message;
use super::session::Session;
use super::transaction::{
    TransactionDraft, TransactionKind, TransactionRecord, TransactionStep, check_amount,
};

/// The three things the main menu offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BankingMode {
    Chat,
    Account,
    Transaction,
}

impl BankingMode {
    /// Assistant message appended when the mode is entered.
    pub fn greeting(&self) -> &'static str {
        match self {
            Self::Chat => "How can I help you with your banking questions?",
            Self::Account => "Let's create your account! What's your full name?",
            Self::Transaction => "Would you like to make a deposit or withdrawal?",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Account => "account",
            Self::Transaction => "transaction",
        }
    }
}

impl std::fmt::Display for BankingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BankingMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chat" => Ok(Self::Chat),
            "account" => Ok(Self::Account),
            "transaction" => Ok(Self::Transaction),
            _ => Err(format!("Unknown mode: {}", s)),
        }
    }
}

/// Current mode plus the data collected for it.
#[derive(Debug, Clone, Default)]
pub enum WizardState {
    #[default]
    Idle,
    Chat,
    Account {
        step: AccountStep,
        draft: AccountDraft,
    },
    Transaction(TransactionDraft),
}

impl WizardState {
    pub fn mode(&self) -> Option<BankingMode> {
        match self {
            Self::Idle => None,
            Self::Chat => Some(BankingMode::Chat),
            Self::Account { .. } => Some(BankingMode::Account),
            Self::Transaction(_) => Some(BankingMode::Transaction),
        }
    }

    pub fn step(&self) -> Option<WizardStep> {
        match self {
            Self::Idle | Self::Chat => None,
            Self::Account { step, .. } => Some(WizardStep::Account(*step)),
            Self::Transaction(draft) => Some(WizardStep::Transaction(draft.step())),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    fn account_draft_at(&mut self, expected: AccountStep) -> Option<&mut AccountDraft> {
        match self {
            Self::Account { step, draft } if *step == expected => Some(draft),
            _ => None,
        }
    }
}

/// A step of either wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    Account(AccountStep),
    Transaction(TransactionStep),
}

impl WizardStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Account(step) => step.as_str(),
            Self::Transaction(step) => step.as_str(),
        }
    }
}

impl Serialize for WizardStep {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// Result of a wizard submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Moved on to this step.
    Advanced(WizardStep),
    /// Wizard finished; carries the summary that was appended to the log.
    Completed(String),
    /// Field check failed; the step is re-presented unchanged.
    Rejected(Rejection),
    /// Submission does not belong to the current step.
    Ignored,
}

/// Enter a mode from the main menu. Returns `false` outside the menu.
pub fn select_mode(session: &mut Session, mode: BankingMode) -> bool {
    if !session.wizard.is_idle() {
        debug!(session = %session.id(), %mode, "Mode selection ignored outside the menu");
        return false;
    }

    session.wizard = match mode {
        BankingMode::Chat => WizardState::Chat,
        BankingMode::Account => WizardState::Account {
            step: AccountStep::Name,
            draft: AccountDraft::default(),
        },
        BankingMode::Transaction => WizardState::Transaction(TransactionDraft::default()),
    };
    session.rejection = None;
    session.push_message(Message::assistant(mode.greeting()));
    info!(session = %session.id(), %mode, "Mode selected");
    true
}

/// Return to the main menu from anywhere, discarding partial data.
pub fn back_to_menu(session: &mut Session) {
    if let Some(mode) = session.wizard.mode() {
        info!(session = %session.id(), %mode, "Back to main menu");
    }
    session.wizard = WizardState::Idle;
    session.rejection = None;
}

pub fn submit_name(session: &mut Session, raw: &str) -> StepOutcome {
    let Some(draft) = session.wizard.account_draft_at(AccountStep::Name) else {
        return StepOutcome::Ignored;
    };
    match check_name(raw) {
        Ok(name) => {
            let prompt = format!("Thanks {name}! Please enter your email:");
            draft.name = Some(name);
            advance_account(session, prompt)
        }
        Err(rejection) => reject(session, rejection),
    }
}

pub fn submit_email(session: &mut Session, raw: &str) -> StepOutcome {
    let Some(draft) = session.wizard.account_draft_at(AccountStep::Email) else {
        return StepOutcome::Ignored;
    };
    match check_email(raw) {
        Ok(email) => {
            draft.email = Some(email);
            advance_account(session, "Please enter your banking details:".to_string())
        }
        Err(rejection) => reject(session, rejection),
    }
}

pub fn submit_bank_details(session: &mut Session, form: &BankDetailsForm) -> StepOutcome {
    let Some(draft) = session.wizard.account_draft_at(AccountStep::BankDetails) else {
        return StepOutcome::Ignored;
    };
    match check_bank_details(form) {
        Ok(details) => {
            draft.bank = Some(details);
            advance_account(
                session,
                "Please set up your security credentials:".to_string(),
            )
        }
        Err(rejection) => reject(session, rejection),
    }
}

pub fn submit_security(session: &mut Session, form: &SecurityForm) -> StepOutcome {
    if session.wizard.account_draft_at(AccountStep::Security).is_none() {
        return StepOutcome::Ignored;
    }
    let credentials = match check_security(form) {
        Ok(credentials) => credentials,
        Err(rejection) => return reject(session, rejection),
    };

    let draft = match std::mem::take(&mut session.wizard) {
        WizardState::Account { draft, .. } => draft,
        _ => AccountDraft::default(),
    };
    session.rejection = None;

    let Some(record) = AccountRecord::finalize(draft, credentials) else {
        warn!(session = %session.id(), "Account draft incomplete at security step; resetting");
        return StepOutcome::Ignored;
    };

    let summary = record.summary();
    session.push_message(Message::assistant(summary.as_str()));
    info!(
        session = %session.id(),
        account_number = %record.account_number,
        otp_access = record.credentials.otp_access,
        "Account created"
    );
    StepOutcome::Completed(summary)
}

pub fn select_transaction_kind(session: &mut Session, kind: TransactionKind) -> StepOutcome {
    match &mut session.wizard {
        WizardState::Transaction(draft) if draft.kind.is_none() => {
            draft.kind = Some(kind);
        }
        _ => return StepOutcome::Ignored,
    }
    session.rejection = None;
    session.push_message(Message::assistant(kind.amount_prompt()));
    debug!(session = %session.id(), %kind, "Transaction kind selected");
    StepOutcome::Advanced(WizardStep::Transaction(TransactionStep::Amount))
}

pub fn submit_amount(session: &mut Session, raw: &str) -> StepOutcome {
    let kind = match &session.wizard {
        WizardState::Transaction(TransactionDraft { kind: Some(kind) }) => *kind,
        _ => return StepOutcome::Ignored,
    };
    let amount = match check_amount(raw) {
        Ok(amount) => amount,
        Err(rejection) => return reject(session, rejection),
    };

    let record = TransactionRecord { kind, amount };
    session.wizard = WizardState::Idle;
    session.rejection = None;

    let summary = record.summary();
    session.push_message(Message::assistant(summary.as_str()));
    info!(session = %session.id(), %kind, %amount, "Transaction recorded");
    StepOutcome::Completed(summary)
}

/// Move to the step after the current one and post its prompt.
fn advance_account(session: &mut Session, prompt: String) -> StepOutcome {
    let WizardState::Account { step, .. } = &mut session.wizard else {
        return StepOutcome::Ignored;
    };
    let Some(next) = step.next() else {
        return StepOutcome::Ignored;
    };
    *step = next;
    session.rejection = None;
    session.push_message(Message::assistant(prompt));
    debug!(session = %session.id(), step = %next, "Account wizard advanced");
    StepOutcome::Advanced(WizardStep::Account(next))
}

fn reject(session: &mut Session, rejection: Rejection) -> StepOutcome {
    debug!(
        session = %session.id(),
        field = rejection.field,
        "Wizard submission rejected"
    );
    session.rejection = Some(rejection);
    StepOutcome::Rejected(rejection)
}
