use cedar_client::config::{ConnectionConfig, RecordOptions};
use cedar_client::domain::{Message, Severity};
use cedar_client::rpc::RpcError;
use cedar_client::sender::{SenderError, StreamingSender};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_open_send_close_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/buildlogger"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "rec-9"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/buildlogger/rec-9"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/buildlogger/rec-9/close"))
        .and(body_partial_json(json!({"exit_code": 0})))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let config = ConnectionConfig::new(server.uri());
    let options = RecordOptions {
        project: "evg".to_string(),
        task_id: "task-1".to_string(),
        max_buffer_size: 16,
        ..RecordOptions::default()
    };

    let sender = StreamingSender::open(config, options).await.unwrap();
    assert_eq!(sender.record_id().as_str(), "rec-9");

    sender
        .send(Message::new(Severity::Info, "one line of telemetry"))
        .await;
    sender.close().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let paths: Vec<String> = requests
        .iter()
        .map(|request| request.url.path().to_string())
        .collect();
    assert_eq!(
        paths,
        vec![
            "/rest/v1/buildlogger".to_string(),
            "/rest/v1/buildlogger/rec-9".to_string(),
            "/rest/v1/buildlogger/rec-9/close".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_secure_connection_requires_credentials() {
    let config = ConnectionConfig::new("https://cedar.example.com");
    let err = StreamingSender::open(config, RecordOptions::default())
        .await
        .unwrap_err();
    match err {
        SenderError::InvalidOptions(err) => {
            assert!(err.to_string().contains("must specify API credentials"));
        }
        other => panic!("expected invalid options, got: {other}"),
    }
}

#[tokio::test]
async fn test_unbuildable_transport_fails_with_connect_error() {
    // reqwest rejects header values with control characters when the
    // client is built, before any request is made.
    let mut config = ConnectionConfig::new("http://cedar.example.com");
    config.user_agent = "cedar\nclient".to_string();

    let err = StreamingSender::open(config, RecordOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SenderError::Connect(_)));
}

#[tokio::test]
async fn test_open_with_cancelled_token_fails_before_dialing() {
    let token = CancellationToken::new();
    token.cancel();
    let options = RecordOptions {
        cancellation: Some(token),
        ..RecordOptions::default()
    };
    // Nothing listens on this address; the call must fail on the token,
    // not on a connection attempt.
    let config = ConnectionConfig::new("http://127.0.0.1:9");

    let err = StreamingSender::open(config, options).await.unwrap_err();
    assert!(matches!(
        err,
        SenderError::CreateRecord(RpcError::Cancelled)
    ));
}
