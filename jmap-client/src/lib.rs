// jmap-client/src/lib.rs
//! Client core for JMAP mail servers (RFC 8620, RFC 8621, RFC 8887).
//!
//! Every operation on [`JmapClient`] discovers a fresh [`Session`], sends
//! one or more batches over an [`HttpClient`], and correlates the answers by
//! call id. Dependent lookups are expressed as back-references inside a
//! single batch.
pub mod auth;
pub mod blob;
pub mod client;
pub mod error;
pub mod http;
pub mod mail;
pub mod push;
pub mod request;
pub mod response;
pub mod session;
pub mod types;

pub use auth::CredentialProvider;
pub use blob::{download_url, expand_template, upload_url};
pub use client::JmapClient;
pub use error::{error_types, JmapError, MethodError, Result};
pub use http::{HttpClient, HttpError};
pub use mail::{
    find_mailbox, find_outbox, keyword_patch, Attachment, AttachmentContent, BodyContent,
    CallError, Draft, Message, MessageQuery, SendOutcome, UpdateOutcome,
};
pub use push::{PushChannel, PushState};
pub use request::{Ids, Method, MethodCall, Request, RequestBuilder, ResultReference};
pub use response::{MethodResponse, Outcome, Response};
pub use session::{
    AccountData, Session, WebSocketCapability, CAPABILITY_CORE, CAPABILITY_MAIL,
    CAPABILITY_SUBMISSION, CAPABILITY_WEBSOCKET,
};
pub use types::{
    keywords, BodyPart, Comparator, CreatedObject, Email, EmailAddress, EmailFilterCondition,
    GetResponse, Identity, Mailbox, QueryResponse, SetError, SetResponse, UploadResponse,
};

#[cfg(feature = "reqwest")]
pub use http::ReqwestClient;
