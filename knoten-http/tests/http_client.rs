use knoten_http::{Auth, HttpClient, HttpError, RequestOpts};
use reqwest::StatusCode;
use reqwest::header::{HeaderName, HeaderValue};
use serde::Deserialize;
use std::borrow::Cow;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Deserialize, PartialEq)]
struct Item {
    id: String,
}

#[tokio::test]
async fn get_json_sends_query_and_decodes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .and(query_param("format", "json"))
        .and(query_param("zoom", "16"))
        .and(header("user-agent", "knotenalarm-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "n1"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri())
        .unwrap()
        .with_user_agent("knotenalarm-test")
        .unwrap();
    let got: Item = client
        .get_json(
            "reverse",
            RequestOpts {
                query: Some(vec![
                    ("format", Cow::Borrowed("json")),
                    ("zoom", Cow::Borrowed("16")),
                ]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(got, Item { id: "n1".into() });
}

#[tokio::test]
async fn absolute_url_overrides_base() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/nodelist.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "x"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new("https://unused.invalid").unwrap();
    let url = format!("{}/data/nodelist.json", server.uri());
    let got: Item = client
        .get_json(
            &url,
            RequestOpts {
                allow_absolute: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(got.id, "x");
}

#[tokio::test]
async fn server_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let err = client
        .get_json::<Item>("nodes", RequestOpts::default())
        .await
        .unwrap_err();
    match err {
        HttpError::Api {
            status, message, ..
        } => {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(message, "upstream down");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let err = client
        .get_json::<Item>("nodes", RequestOpts::default())
        .await
        .unwrap_err();
    assert!(matches!(err, HttpError::Decode(_, ref snip) if snip.contains("nope")));
}

#[tokio::test]
async fn post_json_with_header_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .and(header("authorization", "OAuth test"))
        .and(body_json(serde_json::json!({"text": "hello"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": "99"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let got: Item = client
        .post_json_opts(
            "2/tweets",
            &serde_json::json!({"text": "hello"}),
            RequestOpts {
                auth: Some(Auth::Header {
                    name: HeaderName::from_static("authorization"),
                    value: HeaderValue::from_static("OAuth test"),
                }),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(got.id, "99");
}

#[test]
fn invalid_base_is_rejected() {
    assert!(matches!(HttpClient::new("not a url"), Err(HttpError::Url(_))));
}
