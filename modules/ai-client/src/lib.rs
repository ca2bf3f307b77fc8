//! Provider-agnostic structured-completion client.
//!
//! Callers depend on [`CompletionClient`]; [`claude::Claude`] is the
//! production backend.

pub mod claude;
pub mod schema;
pub mod traits;
pub mod util;

pub use claude::Claude;
pub use schema::StructuredOutput;
pub use traits::{
    Completion, CompletionClient, CompletionRequest, Message, MessageRole, RequestTag, Usage,
};
