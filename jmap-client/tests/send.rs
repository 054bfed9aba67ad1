// jmap-client/tests/send.rs
mod common;

use common::{batch, client, mailbox, mailbox_responses, mount_session, mount_session_doc};
use jmap_client::{
    Attachment, AttachmentContent, BodyContent, CallError, Draft, EmailAddress, JmapError,
    SendOutcome, CAPABILITY_SUBMISSION,
};
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn draft() -> Draft {
    Draft {
        from: None,
        to: vec![EmailAddress::new("bob@example.com")],
        cc: Vec::new(),
        bcc: vec![EmailAddress::new("carol@example.com")],
        subject: "Quarterly numbers".to_string(),
        body: BodyContent::Inline("See attached.".to_string()),
        html: false,
        attachments: Vec::new(),
    }
}

fn identity_response(list: Value) -> Value {
    json!(["Identity/get", {"accountId": "A1", "state": "i1", "list": list, "notFound": []}, "ig"])
}

async fn mount_prerequisites(server: &MockServer, mailboxes: Value, identities: Value) {
    let mut responses = mailbox_responses(mailboxes);
    responses.push(identity_response(identities));
    Mock::given(method("POST"))
        .and(path("/jmap"))
        .and(body_string_contains("Identity/get"))
        .respond_with(batch(responses))
        .mount(server)
        .await;
}

async fn mount_standard_prerequisites(server: &MockServer) {
    mount_prerequisites(
        server,
        json!([
            mailbox("M1", "Inbox", None, Some("inbox")),
            mailbox("M9", "Outbox", None, Some("outbox")),
        ]),
        json!([{"id": "I1", "email": "ann@example.com", "name": "Ann"}]),
    )
    .await;
}

async fn mount_upload(server: &MockServer, blob_id: &str) {
    Mock::given(method("POST"))
        .and(path("/upload/A1/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "accountId": "A1", "blobId": blob_id, "type": "text/plain", "size": 13
        })))
        .mount(server)
        .await;
}

async fn mount_send(server: &MockServer, responses: Vec<Value>) {
    Mock::given(method("POST"))
        .and(path("/jmap"))
        .and(body_string_contains("EmailSubmission/set"))
        .and(body_string_contains("\"emailId\":\"#draft\""))
        .respond_with(batch(responses))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_send_creates_and_submits_in_one_batch() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    mount_standard_prerequisites(&server).await;
    mount_upload(&server, "Bbody").await;
    Mock::given(method("POST"))
        .and(path("/jmap"))
        .and(body_string_contains("\"mailboxIds\":{\"M9\":true}"))
        .and(body_string_contains("\"keywords\":{\"$seen\":true}"))
        .and(body_string_contains("\"blobId\":\"Bbody\""))
        .and(body_string_contains("\"identityId\":\"I1\""))
        .and(body_string_contains("carol@example.com"))
        .respond_with(batch(vec![
            json!(["Email/set", {"accountId": "A1", "newState": "e2",
                "created": {"draft": {"id": "E5", "blobId": "Braw", "threadId": "T5", "size": 900}}}, "c1"]),
            json!(["EmailSubmission/set", {"accountId": "A1", "newState": "u2",
                "created": {"send": {"id": "S5"}}}, "c2"]),
        ]))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client(&server).send_email(&draft()).await.unwrap();
    assert_eq!(
        outcome,
        SendOutcome::Sent {
            email_id: "E5".to_string(),
            submission_id: "S5".to_string(),
        }
    );
}

#[tokio::test]
async fn test_missing_outbox_sends_nothing() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    mount_prerequisites(
        &server,
        json!([mailbox("M1", "Inbox", None, Some("inbox"))]),
        json!([{"id": "I1", "email": "ann@example.com"}]),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/upload/A1/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/jmap"))
        .and(body_string_contains("Email/set"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    match client(&server).send_email(&draft()).await {
        Err(JmapError::NotFound { kind, name }) => {
            assert_eq!(kind, "mailbox");
            assert_eq!(name, "outbox");
        }
        other => panic!("Expected NotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_failed_submission_reports_created_message() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    mount_standard_prerequisites(&server).await;
    mount_upload(&server, "Bbody").await;
    mount_send(
        &server,
        vec![
            json!(["Email/set", {"accountId": "A1", "newState": "e2",
                "created": {"draft": {"id": "E6"}}}, "c1"]),
            json!(["EmailSubmission/set", {"accountId": "A1", "newState": "u2",
                "notCreated": {"send": {"type": "forbiddenToSend", "description": "quota"}}}, "c2"]),
        ],
    )
    .await;

    match client(&server).send_email(&draft()).await.unwrap() {
        SendOutcome::CreatedNotSent { email_id, error } => {
            assert_eq!(email_id, "E6");
            match error {
                CallError::NotCreated(err) => assert_eq!(err.type_, "forbiddenToSend"),
                other => panic!("Expected NotCreated, got {:?}", other),
            }
        }
        other => panic!("Expected CreatedNotSent, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_submission_response_is_reported() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    mount_standard_prerequisites(&server).await;
    mount_upload(&server, "Bbody").await;
    mount_send(
        &server,
        vec![json!(["Email/set", {"accountId": "A1", "newState": "e2",
            "created": {"draft": {"id": "E8"}}}, "c1"])],
    )
    .await;

    assert_eq!(
        client(&server).send_email(&draft()).await.unwrap(),
        SendOutcome::CreatedNotSent {
            email_id: "E8".to_string(),
            error: CallError::NoResponse,
        }
    );
}

#[tokio::test]
async fn test_rejected_message_is_not_submitted() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    mount_standard_prerequisites(&server).await;
    mount_upload(&server, "Bbody").await;
    mount_send(
        &server,
        vec![
            json!(["Email/set", {"accountId": "A1", "newState": "e2",
                "notCreated": {"draft": {"type": "invalidProperties", "properties": ["from"]}}}, "c1"]),
            json!(["error", {"type": "invalidResultReference"}, "c2"]),
        ],
    )
    .await;

    match client(&server).send_email(&draft()).await.unwrap() {
        SendOutcome::Rejected {
            error: CallError::NotCreated(err),
        } => {
            assert_eq!(err.type_, "invalidProperties");
            assert_eq!(err.properties, Some(vec!["from".to_string()]));
        }
        other => panic!("Expected Rejected, got {:?}", other),
    }
}

#[tokio::test]
async fn test_attachments_are_uploaded_with_their_type() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    mount_standard_prerequisites(&server).await;
    Mock::given(method("POST"))
        .and(path("/upload/A1/"))
        .and(header("content-type", "text/plain"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "accountId": "A1", "blobId": "Bbody", "type": "text/plain", "size": 13
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload/A1/"))
        .and(header("content-type", "application/pdf"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "accountId": "A1", "blobId": "Bpdf", "type": "application/pdf", "size": 4
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/jmap"))
        .and(body_string_contains("\"blobId\":\"Bpdf\""))
        .and(body_string_contains("\"name\":\"report.pdf\""))
        .and(body_string_contains("\"disposition\":\"attachment\""))
        .and(body_string_contains("\"blobId\":\"Bexisting\""))
        .respond_with(batch(vec![
            json!(["Email/set", {"accountId": "A1", "created": {"draft": {"id": "E7"}}}, "c1"]),
            json!(["EmailSubmission/set", {"accountId": "A1", "created": {"send": {"id": "S7"}}}, "c2"]),
        ]))
        .expect(1)
        .mount(&server)
        .await;

    let mut message = draft();
    message.attachments = vec![
        Attachment {
            name: "report.pdf".to_string(),
            media_type: "application/pdf".to_string(),
            content: AttachmentContent::Inline(b"%PDF".to_vec()),
        },
        Attachment {
            name: "notes.txt".to_string(),
            media_type: "text/plain".to_string(),
            content: AttachmentContent::Blob("Bexisting".to_string()),
        },
    ];

    assert!(matches!(
        client(&server).send_email(&message).await.unwrap(),
        SendOutcome::Sent { .. }
    ));
}

#[tokio::test]
async fn test_no_identity_fails_before_upload() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    mount_prerequisites(
        &server,
        json!([mailbox("M9", "Outbox", None, Some("outbox"))]),
        json!([]),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/upload/A1/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    assert!(matches!(
        client(&server).send_email(&draft()).await,
        Err(JmapError::NoIdentity(_))
    ));
}

#[tokio::test]
async fn test_send_requires_submission_capability() {
    let server = MockServer::start().await;
    let mut doc = common::session_doc(&server);
    doc["primaryAccounts"]
        .as_object_mut()
        .unwrap()
        .remove(CAPABILITY_SUBMISSION);
    mount_session_doc(&server, doc).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    match client(&server).send_email(&draft()).await {
        Err(JmapError::Capability(urn)) => assert_eq!(urn, CAPABILITY_SUBMISSION),
        other => panic!("Expected Capability error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_send_without_recipients_is_invalid() {
    let server = MockServer::start().await;
    let mut message = draft();
    message.to.clear();
    message.bcc.clear();

    assert!(matches!(
        client(&server).send_email(&message).await,
        Err(JmapError::InvalidRequest(_))
    ));
}
