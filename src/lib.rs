//! `recruit-client` is the resilient request client used to talk to the
//! recruiting platform API.
//!
//! Every call goes through one retry loop:
//! - each attempt is raced against a timeout
//! - failures are classified by [`classify`] (network, timeout, server, client, unknown)
//! - retryable failures are retried after [`retry_delay`] (exponential backoff with jitter)
//! - terminal failures carry status, code, raw body and a [`human_message`]
//!
//! Entry points are [`ApiClient::get`], [`ApiClient::post`], [`ApiClient::put`],
//! [`ApiClient::delete`] and [`ApiClient::upload`].

mod classify;
mod client;
mod decode;
mod error;
mod options;
mod request;
mod types;
mod wire;

pub use classify::{
    classify, human_message, humanize, retry_delay, retry_delay_with_jitter, MAX_RETRY_DELAY,
};
pub use client::ApiClient;
pub use error::{ClientError, Failure, FailureKind};
pub use options::{ClientOptions, RequestOptions, DEFAULT_BASE_URL};
pub use request::{FormPart, Method, RequestBody, RequestDescriptor, UploadForm};
pub use types::{ErrorJudgment, ErrorType, ResponseEnvelope};

pub type Result<T> = std::result::Result<T, ClientError>;
