//! Form-chain engine: a cookie-carrying session, request/response steps, and
//! the chain that runs them while threading hidden postback state from one
//! page to the next.

pub mod chain;
pub mod form;
pub mod hidden;
pub mod recovery;
pub mod session;
pub mod shared;
pub mod step;

pub use chain::{ActionChain, ChainState};
pub use form::FormValues;
pub use hidden::{HIDDEN_STATE_PREFIX, harvest_hidden_fields};
pub use recovery::{Authenticator, Recovery, ensure_session, run_protected};
pub use session::{SESSION_COOKIE_NAME, SessionContext, SessionOptions};
pub use shared::Shared;
pub use step::{
    Consumer, DocumentConsumer, RawConsumer, RequestProducer, Step, StepBuilder, StepRequest,
    StepResponse,
};
