// jmap-client/src/response.rs
use crate::error::{JmapError, MethodError, Result};
use crate::request::{Method, Request};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Name the server uses for a method-level error response
pub const ERROR_RESPONSE_NAME: &str = "error";

/// Result of one method call, kept as data
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Map<String, Value>),
    Error(MethodError),
}

/// One `[name, result, callId]` entry of `methodResponses`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "(String, Value, String)")]
pub struct MethodResponse {
    pub name: String,
    pub outcome: Outcome,
    pub call_id: String,
}

impl TryFrom<(String, Value, String)> for MethodResponse {
    type Error = String;

    fn try_from((name, result, call_id): (String, Value, String)) -> Result<Self, String> {
        let outcome = if name == ERROR_RESPONSE_NAME {
            Outcome::Error(
                serde_json::from_value(result)
                    .map_err(|e| format!("malformed error for {}: {}", call_id, e))?,
            )
        } else {
            match result {
                Value::Object(map) => Outcome::Success(map),
                other => {
                    return Err(format!(
                        "{} result for {} is not an object: {}",
                        name, call_id, other
                    ))
                }
            }
        };
        Ok(Self {
            name,
            outcome,
            call_id,
        })
    }
}

impl MethodResponse {
    /// Whether this entry answers `method` issued as `call_id`. An error
    /// entry answers whatever method carried its call id.
    pub fn answers(&self, method: Method, call_id: &str) -> bool {
        self.call_id == call_id
            && (self.name == method.name() || self.name == ERROR_RESPONSE_NAME)
    }
}

/// Response envelope `{methodResponses, sessionState}`
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    #[serde(rename = "methodResponses")]
    pub method_responses: Vec<MethodResponse>,
    #[serde(rename = "sessionState")]
    #[serde(default)]
    pub session_state: Option<String>,
}

impl Response {
    /// Entry for `method` issued as `call_id`, wherever it sits in the list
    pub fn get(&self, method: Method, call_id: &str) -> Option<&MethodResponse> {
        self.method_responses
            .iter()
            .find(|r| r.answers(method, call_id))
    }

    pub fn outcome(&self, method: Method, call_id: &str) -> Result<&Outcome> {
        self.get(method, call_id)
            .map(|r| &r.outcome)
            .ok_or_else(|| {
                JmapError::Protocol(format!("no {} response for call {}", method, call_id))
            })
    }

    /// Decode the success object of a call; a method error becomes
    /// `JmapError::Method` carrying the server's error object.
    pub fn result<T: DeserializeOwned>(&self, method: Method, call_id: &str) -> Result<T> {
        match self.outcome(method, call_id)? {
            Outcome::Success(map) => serde_json::from_value(Value::Object(map.clone()))
                .map_err(|e| {
                    JmapError::Protocol(format!("unexpected {} result shape: {}", method, e))
                }),
            Outcome::Error(error) => Err(JmapError::Method {
                method: method.name().to_string(),
                error: error.clone(),
            }),
        }
    }

    /// Pair every call of `request` with its response, in request order.
    pub fn correlate<'a>(&'a self, request: &Request) -> Result<Vec<&'a MethodResponse>> {
        request
            .method_calls
            .iter()
            .map(|call| {
                self.get(call.method(), call.call_id()).ok_or_else(|| {
                    JmapError::Protocol(format!(
                        "no {} response for call {}",
                        call.method(),
                        call.call_id()
                    ))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{MethodCall, RequestBuilder};
    use crate::types::QueryResponse;
    use serde_json::json;

    fn reordered() -> Response {
        serde_json::from_value(json!({
            "sessionState": "s1",
            "methodResponses": [
                ["Mailbox/get", {"accountId": "A1", "list": [], "notFound": []}, "b"],
                ["error", {"type": "forbidden"}, "c"],
                ["Mailbox/query", {"accountId": "A1", "ids": ["M1"], "position": 0}, "a"]
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_lookup_ignores_position() {
        let resp = reordered();
        let query: QueryResponse = resp.result(Method::MailboxQuery, "a").unwrap();
        assert_eq!(query.ids, vec!["M1"]);
        assert!(resp.get(Method::MailboxQuery, "b").is_none());
        assert_eq!(resp.get(Method::MailboxGet, "b").unwrap().call_id, "b");
    }

    #[test]
    fn test_error_entry_is_data() {
        let resp = reordered();
        match resp.outcome(Method::IdentityGet, "c").unwrap() {
            Outcome::Error(e) => assert_eq!(e.type_, "forbidden"),
            other => panic!("Expected error outcome, got {:?}", other),
        }
        match resp.result::<QueryResponse>(Method::IdentityGet, "c") {
            Err(JmapError::Method { method, error }) => {
                assert_eq!(method, "Identity/get");
                assert_eq!(error.type_, "forbidden");
            }
            other => panic!("Expected method error, got {:?}", other),
        }
    }

    #[test]
    fn test_correlate_in_request_order() {
        let mut builder = RequestBuilder::new();
        builder
            .call(MethodCall::mailbox_query("a", "A1"))
            .unwrap()
            .call(MethodCall::mailbox_get("b", "A1", crate::request::Ids::All, &[]))
            .unwrap()
            .call(MethodCall::identity_get("c", "A1"))
            .unwrap();
        let request = builder.build();

        let resp = reordered();
        let pairs = resp.correlate(&request).unwrap();
        let ids: Vec<_> = pairs.iter().map(|r| r.call_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_missing_entry_is_protocol_error() {
        let resp = reordered();
        assert!(matches!(
            resp.outcome(Method::EmailGet, "a"),
            Err(JmapError::Protocol(_))
        ));
    }

    #[test]
    fn test_non_object_result_is_rejected() {
        let parsed = serde_json::from_value::<Response>(json!({
            "methodResponses": [["Email/get", [1, 2], "x"]]
        }));
        assert!(parsed.is_err());
    }
}
