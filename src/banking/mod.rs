//! Banking assistant core: session state and the handlers that mutate it.
//!
//! Every handler takes the session by `&mut` and is otherwise pure: the web
//! layer resolves the session, calls one handler, and re-renders.

pub mod account;
pub mod chat;
pub mod message;
pub mod session;
pub mod transaction;
pub mod wizard;

pub use account::{AccountRecord, AccountStep, BankDetailsForm, Rejection, SecurityForm};
pub use chat::{ChatOutcome, send_chat};
pub use message::{Author, Message};
pub use session::{Session, SessionSnapshot};
pub use transaction::{AmountForm, TransactionKind, TransactionRecord, TransactionStep};
pub use wizard::{BankingMode, StepOutcome, WizardState, WizardStep};
