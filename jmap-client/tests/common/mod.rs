// jmap-client/tests/common/mod.rs
#![allow(dead_code)]

use jmap_client::{CredentialProvider, JmapClient, ReqwestClient};
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const BASIC_AUTH: &str = "Basic dXNlcjpwYXNz";

pub fn session_doc(server: &MockServer) -> Value {
    json!({
        "capabilities": {
            "urn:ietf:params:jmap:core": {"maxCallsInRequest": 16},
            "urn:ietf:params:jmap:mail": {},
            "urn:ietf:params:jmap:submission": {}
        },
        "accounts": {
            "A1": {"name": "user@example.com", "isPersonal": true, "isReadOnly": false}
        },
        "primaryAccounts": {
            "urn:ietf:params:jmap:core": "A1",
            "urn:ietf:params:jmap:mail": "A1",
            "urn:ietf:params:jmap:submission": "A1"
        },
        "username": "user@example.com",
        "apiUrl": format!("{}/jmap", server.uri()),
        "downloadUrl": format!("{}/download/{{accountId}}/{{blobId}}/{{name}}?type={{type}}", server.uri()),
        "uploadUrl": format!("{}/upload/{{accountId}}/", server.uri()),
        "state": "s1"
    })
}

pub async fn mount_session_doc(server: &MockServer, doc: Value) {
    Mock::given(method("GET"))
        .and(path("/.well-known/jmap"))
        .respond_with(ResponseTemplate::new(200).set_body_json(doc))
        .mount(server)
        .await;
}

pub async fn mount_session(server: &MockServer) {
    mount_session_doc(server, session_doc(server)).await;
}

pub fn client(server: &MockServer) -> JmapClient<ReqwestClient> {
    let credentials = CredentialProvider::basic(Some("user"), Some("pass")).unwrap();
    JmapClient::new(ReqwestClient::new(), &server.uri(), credentials).unwrap()
}

pub fn mailbox(id: &str, name: &str, parent: Option<&str>, role: Option<&str>) -> Value {
    json!({"id": id, "name": name, "parentId": parent, "role": role})
}

/// Batch answer for the Mailbox/query + Mailbox/get pair
pub fn mailbox_responses(list: Value) -> Vec<Value> {
    let ids: Vec<Value> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].clone())
        .collect();
    vec![
        json!(["Mailbox/query", {"accountId": "A1", "ids": ids, "position": 0}, "mq"]),
        json!(["Mailbox/get", {"accountId": "A1", "state": "m1", "list": list, "notFound": []}, "mg"]),
    ]
}

pub fn batch(responses: Vec<Value>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "sessionState": "s1",
        "methodResponses": responses
    }))
}

/// Answer the plain mailbox listing batch (no identity lookup in it)
pub async fn mount_mailboxes(server: &MockServer, list: Value) {
    Mock::given(method("POST"))
        .and(path("/jmap"))
        .and(body_string_contains("Mailbox/query"))
        .respond_with(batch(mailbox_responses(list)))
        .mount(server)
        .await;
}
