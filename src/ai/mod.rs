//! Provider invocation layer
//!
//! This module owns everything between "we have a request body" and "we have
//! a classified outcome": provider configuration, the HTTP seam, retry with
//! backoff, and the error taxonomy.

pub mod error;
pub mod mock;
pub mod outcome;
pub mod provider;
pub mod retry;
pub mod sender;
pub mod transport;

pub use error::{AnalysisError, TransportError};
pub use mock::{MockReply, MockSender};
pub use outcome::{InvocationOutcome, RawReply};
pub use provider::{ChatPayload, CredentialScheme, Message, PromptPlacement, ProviderConfig};
pub use retry::{RetryPolicy, RetryPolicyError};
pub use sender::{HttpReply, HttpSender, ReqwestSender, SendError};
pub use transport::InferenceTransport;
