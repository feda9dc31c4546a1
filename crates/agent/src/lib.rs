//! Message routing and fulfillment.
//!
//! Every inbound chat message goes through [`runtime::MessageHandler`]:
//!
//! 1. **Classification** (`understanding`) asks the language model which of the
//!    five intents the message carries, degrading to keyword matching
//!    (`conversation`) when the service misbehaves.
//! 2. **Routing** sends low-confidence messages to coaching.
//! 3. **Fulfillment** runs the intent against the record store: logging
//!    resolves exercise names (`resolver`), coaching grounds the reply in
//!    stored history (`context`).
//!
//! The model only translates text. Set numbering, record keeping, statistics
//! and every write are decided here and in the store.

pub mod context;
pub mod conversation;
pub mod llm;
pub mod resolver;
pub mod runtime;
pub mod understanding;

pub use llm::{LlmClient, LlmError, OpenAiCompatibleClient};
pub use runtime::MessageHandler;
pub use understanding::{LlmTextUnderstanding, RetryPolicy, TextUnderstanding};
