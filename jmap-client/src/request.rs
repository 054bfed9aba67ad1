// jmap-client/src/request.rs
use crate::error::{JmapError, Result};
use crate::session::{CAPABILITY_CORE, CAPABILITY_MAIL, CAPABILITY_SUBMISSION};
use crate::types::{Comparator, EmailFilterCondition};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Map, Value};
use std::fmt;

/// Methods this client knows how to issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    CoreEcho,
    MailboxQuery,
    MailboxGet,
    EmailQuery,
    EmailGet,
    EmailSet,
    IdentityGet,
    EmailSubmissionSet,
}

impl Method {
    pub fn name(&self) -> &'static str {
        match self {
            Method::CoreEcho => "Core/echo",
            Method::MailboxQuery => "Mailbox/query",
            Method::MailboxGet => "Mailbox/get",
            Method::EmailQuery => "Email/query",
            Method::EmailGet => "Email/get",
            Method::EmailSet => "Email/set",
            Method::IdentityGet => "Identity/get",
            Method::EmailSubmissionSet => "EmailSubmission/set",
        }
    }

    /// Capability that must be declared in `using` to call this method
    pub fn capability(&self) -> &'static str {
        match self {
            Method::CoreEcho => CAPABILITY_CORE,
            Method::MailboxQuery
            | Method::MailboxGet
            | Method::EmailQuery
            | Method::EmailGet
            | Method::EmailSet => CAPABILITY_MAIL,
            Method::IdentityGet | Method::EmailSubmissionSet => CAPABILITY_SUBMISSION,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Back-reference to the result of an earlier call in the same batch
/// (RFC 8620 Section 3.7). Expanded by the server, never locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultReference {
    #[serde(rename = "resultOf")]
    pub result_of: String,
    pub name: String,
    pub path: String,
}

impl ResultReference {
    pub fn new(call: &MethodCall, path: impl Into<String>) -> Self {
        Self {
            result_of: call.call_id.clone(),
            name: call.method.name().to_string(),
            path: path.into(),
        }
    }

    /// Every id returned by an earlier query or get
    pub fn ids(call: &MethodCall) -> Self {
        Self::new(call, "/ids/*")
    }
}

/// Value of an `ids` argument
#[derive(Debug, Clone)]
pub enum Ids {
    /// `null`: every object in the account
    All,
    List(Vec<String>),
    Ref(ResultReference),
}

/// One `[name, arguments, callId]` invocation
#[derive(Debug, Clone)]
pub struct MethodCall {
    method: Method,
    arguments: Map<String, Value>,
    call_id: String,
}

impl MethodCall {
    pub fn new(method: Method, call_id: impl Into<String>) -> Self {
        Self {
            method,
            arguments: Map::new(),
            call_id: call_id.into(),
        }
    }

    pub fn arg(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.to_string(), value.into());
        self
    }

    /// Take argument `key` from an earlier call's result.
    pub fn reference(mut self, key: &str, reference: ResultReference) -> Self {
        self.arguments.remove(key);
        self.arguments
            .insert(format!("#{}", key), json!(reference));
        self
    }

    fn ids(self, ids: Ids) -> Self {
        match ids {
            Ids::All => self.arg("ids", Value::Null),
            Ids::List(list) => self.arg("ids", list),
            Ids::Ref(reference) => self.reference("ids", reference),
        }
    }

    fn properties(self, properties: &[&str]) -> Self {
        if properties.is_empty() {
            self
        } else {
            self.arg("properties", properties.to_vec())
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn arguments(&self) -> &Map<String, Value> {
        &self.arguments
    }

    /// Back-references carried by this call's arguments
    pub fn references(&self) -> Result<Vec<ResultReference>> {
        self.arguments
            .iter()
            .filter(|(key, _)| key.starts_with('#'))
            .map(|(key, value)| {
                serde_json::from_value(value.clone()).map_err(|e| {
                    JmapError::InvalidRequest(format!(
                        "{} argument {} is not a result reference: {}",
                        self.call_id, key, e
                    ))
                })
            })
            .collect()
    }

    // Typed constructors, one per method.

    pub fn echo(call_id: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            method: Method::CoreEcho,
            arguments,
            call_id: call_id.into(),
        }
    }

    pub fn mailbox_query(call_id: impl Into<String>, account_id: &str) -> Self {
        Self::new(Method::MailboxQuery, call_id).arg("accountId", account_id)
    }

    pub fn mailbox_get(
        call_id: impl Into<String>,
        account_id: &str,
        ids: Ids,
        properties: &[&str],
    ) -> Self {
        Self::new(Method::MailboxGet, call_id)
            .arg("accountId", account_id)
            .ids(ids)
            .properties(properties)
    }

    pub fn email_query(
        call_id: impl Into<String>,
        account_id: &str,
        filter: &EmailFilterCondition,
        sort: &[Comparator],
        limit: Option<u64>,
    ) -> Self {
        let mut call = Self::new(Method::EmailQuery, call_id)
            .arg("accountId", account_id)
            .arg("filter", json!(filter));
        if !sort.is_empty() {
            call = call.arg("sort", json!(sort));
        }
        if let Some(limit) = limit {
            call = call.arg("limit", limit);
        }
        call
    }

    pub fn email_get(
        call_id: impl Into<String>,
        account_id: &str,
        ids: Ids,
        properties: &[&str],
    ) -> Self {
        Self::new(Method::EmailGet, call_id)
            .arg("accountId", account_id)
            .ids(ids)
            .properties(properties)
    }

    /// Email/set with a single patch, keyed by email id
    pub fn email_update(
        call_id: impl Into<String>,
        account_id: &str,
        email_id: &str,
        patch: Map<String, Value>,
    ) -> Self {
        let mut update = Map::new();
        update.insert(email_id.to_string(), Value::Object(patch));
        Self::new(Method::EmailSet, call_id)
            .arg("accountId", account_id)
            .arg("update", update)
    }

    /// Email/set creating one email under `create_key`
    pub fn email_create(
        call_id: impl Into<String>,
        account_id: &str,
        create_key: &str,
        email: Value,
    ) -> Self {
        Self::new(Method::EmailSet, call_id)
            .arg("accountId", account_id)
            .arg("create", json!({ create_key: email }))
    }

    pub fn identity_get(call_id: impl Into<String>, account_id: &str) -> Self {
        Self::new(Method::IdentityGet, call_id)
            .arg("accountId", account_id)
            .arg("ids", Value::Null)
    }

    /// EmailSubmission/set creating one submission under `create_key`
    pub fn submission_create(
        call_id: impl Into<String>,
        account_id: &str,
        create_key: &str,
        submission: Value,
    ) -> Self {
        Self::new(Method::EmailSubmissionSet, call_id)
            .arg("accountId", account_id)
            .arg("create", json!({ create_key: submission }))
    }
}

impl Serialize for MethodCall {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(3)?;
        tuple.serialize_element(self.method.name())?;
        tuple.serialize_element(&self.arguments)?;
        tuple.serialize_element(&self.call_id)?;
        tuple.end()
    }
}

/// Request envelope `{using, methodCalls}`
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    pub using: Vec<String>,
    #[serde(rename = "methodCalls")]
    pub method_calls: Vec<MethodCall>,
}

/// Collects calls for one batch, rejecting anything the server could
/// never resolve.
#[derive(Debug, Default)]
pub struct RequestBuilder {
    using: Vec<String>,
    calls: Vec<MethodCall>,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an extra capability beyond those implied by the calls
    pub fn using(mut self, capability: &str) -> Self {
        if !self.using.iter().any(|u| u == capability) {
            self.using.push(capability.to_string());
        }
        self
    }

    /// Append a call. Fails if its id is already taken or if any
    /// back-reference does not point at an earlier call of the named method.
    pub fn call(&mut self, call: MethodCall) -> Result<&mut Self> {
        if call.call_id.is_empty() {
            return Err(JmapError::InvalidRequest(format!(
                "{} call has an empty call id",
                call.method
            )));
        }
        if self.calls.iter().any(|c| c.call_id == call.call_id) {
            return Err(JmapError::InvalidRequest(format!(
                "duplicate call id {}",
                call.call_id
            )));
        }

        for key in call.arguments.keys().filter(|k| k.starts_with('#')) {
            if call.arguments.contains_key(&key[1..]) {
                return Err(JmapError::InvalidRequest(format!(
                    "{} sets both {} and {}",
                    call.call_id,
                    &key[1..],
                    key
                )));
            }
        }

        for reference in call.references()? {
            let target = self
                .calls
                .iter()
                .find(|c| c.call_id == reference.result_of)
                .ok_or_else(|| {
                    JmapError::InvalidRequest(format!(
                        "{} references {} which is not an earlier call",
                        call.call_id, reference.result_of
                    ))
                })?;
            if target.method.name() != reference.name {
                return Err(JmapError::InvalidRequest(format!(
                    "{} references {} as {} but it is {}",
                    call.call_id, reference.result_of, reference.name, target.method
                )));
            }
            if !reference.path.starts_with('/') {
                return Err(JmapError::InvalidRequest(format!(
                    "invalid reference path {:?}",
                    reference.path
                )));
            }
        }

        self.calls.push(call);
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Finish the batch; `using` is core, then each call's capability in
    /// order of first use, then any explicit extras.
    pub fn build(self) -> Request {
        let mut using = vec![CAPABILITY_CORE.to_string()];
        let implied = self.calls.iter().map(|c| c.method.capability().to_string());
        for capability in implied.chain(self.using) {
            if !using.contains(&capability) {
                using.push(capability);
            }
        }
        Request {
            using,
            method_calls: self.calls,
        }
    }
}
