//! End-to-end interception through `Client` and the process-wide hook slot.
//!
//! Every test touches the hook, so they run serially.

use assert_json_diff::assert_json_eq;
use async_trait::async_trait;
use serde_json::{json, Value};
use serial_test::serial;
use snare::{
    AssertionError, Client, Content, Context, HeaderMap, Method, Mock, MockConfig, MockError,
    Request, Response, RouteOptions, StatusCode, Transport, TransportError, UrlPattern, UsageError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Stands in for the network: answers "real" and counts requests.
#[derive(Clone, Default)]
struct FakeNetwork {
    sent: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl FakeNetwork {
    fn sent(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FakeNetwork {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut headers = HeaderMap::new();
        headers.insert("content-type", "text/plain".parse().unwrap());
        Ok(Response::new(StatusCode::OK, headers, format!("real {}", request.path())))
    }
}

struct Unreachable;

#[async_trait]
impl Transport for Unreachable {
    async fn send(&self, _request: Request) -> Result<Response, TransportError> {
        Err(TransportError::Connect("connection refused".to_string()))
    }
}

fn client(network: &FakeNetwork) -> Client {
    Client::with_transport(network.clone())
}

#[tokio::test]
#[serial]
async fn test_global_instance() {
    let network = FakeNetwork::default();
    let http = client(&network);

    let route = snare::get("https://foo/bar/", RouteOptions::new().status(202)).unwrap();
    let response = snare::mocked_async(|_| async { http.get("https://foo/bar/").await })
        .await
        .unwrap()
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(route.called());
    assert_eq!(route.call_count(), 1);
    assert_eq!(network.sent(), 0);
    // Stopping the global instance resets it
    assert!(snare::calls().is_empty());
    assert_eq!(snare::stats().call_count, 0);
}

#[tokio::test]
#[serial]
async fn test_local_instance_is_independent_of_global() {
    let network = FakeNetwork::default();
    let http = client(&network);
    snare::get("https://foo/global/", RouteOptions::new().alias("global")).unwrap();

    let local = Mock::new();
    local
        .get("https://foo/local/", RouteOptions::new().alias("local"))
        .unwrap();
    local
        .run_async(|mock| async move {
            assert!(mock.route("local").is_some());
            assert!(mock.route("global").is_none());
            http.get("https://foo/local/").await.unwrap();
        })
        .await
        .unwrap();

    assert!(snare::route("global").is_some());
    assert!(snare::route("local").is_none());
    snare::reset();
}

#[tokio::test]
#[serial]
async fn test_http_methods() {
    let network = FakeNetwork::default();
    let http = client(&network);
    let mock = Mock::new();
    let url = "https://foo/bar/";
    let routes = vec![
        mock.get(url, RouteOptions::new().status(404)).unwrap(),
        mock.post(url, RouteOptions::new().status(201)).unwrap(),
        mock.put(url, RouteOptions::new().status(202)).unwrap(),
        mock.patch(url, RouteOptions::new().status(500)).unwrap(),
        mock.delete(url, RouteOptions::new().status(204)).unwrap(),
        mock.head(url, RouteOptions::new().status(405)).unwrap(),
        mock.options(url, RouteOptions::new().status(501)).unwrap(),
    ];

    let guard = mock.activate().unwrap();
    let statuses = vec![
        http.get(url).await.unwrap().status().as_u16(),
        http.post(url).await.unwrap().status().as_u16(),
        http.put(url).await.unwrap().status().as_u16(),
        http.patch(url).await.unwrap().status().as_u16(),
        http.delete(url).await.unwrap().status().as_u16(),
        http.head(url).await.unwrap().status().as_u16(),
        http.options(url).await.unwrap().status().as_u16(),
    ];
    assert_eq!(statuses, vec![404, 201, 202, 500, 204, 405, 501]);
    assert!(routes.iter().all(|r| r.call_count() == 1));
    assert_eq!(guard.stats().call_count, 7);
    guard.finish().unwrap();
}

#[tokio::test]
#[serial]
async fn test_content_type_and_headers() {
    let network = FakeNetwork::default();
    let http = client(&network);
    let mock = Mock::new();
    mock.get(
        "https://foo/bar/",
        RouteOptions::new()
            .header("Content-Type", "foo/bar")
            .header("X-Foo", "bar; baz")
            .content_type("ham/spam")
            .content("foobar"),
    )
    .unwrap();
    mock.get(
        "https://foo/list/",
        RouteOptions::new()
            .header("Content-Type", "application/json; charset=utf-8")
            .content(json!(["foo", "bar"])),
    )
    .unwrap();

    let (text, list) = mock
        .run_async(|_| async {
            (
                http.get("https://foo/bar/").await.unwrap(),
                http.get("https://foo/list/").await.unwrap(),
            )
        })
        .await
        .unwrap();

    assert_eq!(text.content_type(), Some("ham/spam"));
    assert_eq!(text.headers()["x-foo"], "bar; baz");
    assert_eq!(text.text(), "foobar");
    assert_eq!(list.content_type(), Some("application/json; charset=utf-8"));
    assert_json_eq!(list.json::<Value>().unwrap(), json!(["foo", "bar"]));
}

#[tokio::test]
#[serial]
async fn test_raw_and_json_content() {
    let network = FakeNetwork::default();
    let http = client(&network);
    let mock = Mock::new();
    mock.get("https://foo/raw/", RouteOptions::new().content(b"raw content"))
        .unwrap();
    mock.get(
        "https://foo/json/",
        RouteOptions::new().content(Content::json(&json!({"foo": "bar", "ham": [1, 2]})).unwrap()),
    )
    .unwrap();

    let guard = mock.activate().unwrap();
    let raw = http.get("https://foo/raw/").await.unwrap();
    assert_eq!(raw.body().as_ref(), b"raw content");
    assert_eq!(raw.content_type(), Some("text/plain"));

    let body: Value = http.get("https://foo/json/").await.unwrap().json().unwrap();
    assert_json_eq!(body, json!({"foo": "bar", "ham": [1, 2]}));
    guard.finish().unwrap();
}

#[tokio::test]
#[serial]
async fn test_raised_content() {
    let network = FakeNetwork::default();
    let http = client(&network);
    let mock = Mock::new();
    let route = mock
        .get(
            "https://foo/bar/",
            RouteOptions::new().content(TransportError::ConnectTimeout),
        )
        .unwrap();

    let guard = mock.activate().unwrap();
    let err = http.get("https://foo/bar/").await.unwrap_err();
    assert_eq!(err.as_transport(), Some(&TransportError::ConnectTimeout));
    let call = route.last_call().unwrap();
    assert_eq!(call.request.url(), "https://foo/bar/");
    assert!(call.response.is_none());
    guard.finish().unwrap();
}

#[tokio::test]
#[serial]
async fn test_callback_with_regex_capture() {
    let network = FakeNetwork::default();
    let http = client(&network);
    let mock = Mock::new();
    mock.get(
        UrlPattern::regex(r"https://foo/bar/(?P<id>\d+)/").unwrap(),
        RouteOptions::new().content(Content::callback_with(["id"], |request: &Request, ctx: &Context| {
            assert_eq!(request.method(), Method::GET);
            format!("foobar #{}", ctx.get_string("id").unwrap_or_default())
        })),
    )
    .unwrap();

    let response = mock
        .run_async(|_| async { http.get("https://foo/bar/123/").await.unwrap() })
        .await
        .unwrap();
    assert_eq!(response.text(), "foobar #123");
}

#[tokio::test]
#[serial]
async fn test_callback_parameter_mismatch_is_usage_error() {
    let network = FakeNetwork::default();
    let http = client(&network);
    let mock = Mock::with_config(MockConfig::new().assert_all_called(false));
    mock.get(
        UrlPattern::regex(r"https://foo/(?P<slug>\w+)/").unwrap(),
        RouteOptions::new().content(Content::callback_with(["id"], |_, _| "never")),
    )
    .unwrap();

    let guard = mock.activate().unwrap();
    let err = http.get("https://foo/bar/").await.unwrap_err();
    assert!(matches!(err, MockError::Usage(UsageError::ParameterMismatch { .. })));
    guard.finish().unwrap();
}

#[tokio::test]
#[serial]
async fn test_alias() {
    let network = FakeNetwork::default();
    let http = client(&network);
    let mock = Mock::new();
    mock.get("https://foo/bar/", RouteOptions::new().status(200).alias("foobar"))
        .unwrap();

    let guard = mock.activate().unwrap();
    http.get("https://foo/bar/").await.unwrap();
    let route = guard.route("foobar").unwrap();
    assert!(route.called());
    assert_eq!(guard.aliases().len(), 1);
    guard.finish().unwrap();
}

#[tokio::test]
#[serial]
async fn test_invalid_url_pattern() {
    let network = FakeNetwork::default();
    let http = client(&network);
    let mock = Mock::with_config(MockConfig::new().assert_all_called(false));
    mock.get(json!(["invalid"]), RouteOptions::new()).unwrap();

    let guard = mock.activate().unwrap();
    let err = http.get("https://foo/bar/").await.unwrap_err();
    assert!(err.is_usage());
    guard.finish().unwrap();
}

#[tokio::test]
#[serial]
async fn test_unknown_url_passes_through_when_not_asserting() {
    let network = FakeNetwork::default();
    let http = client(&network);
    let mock = Mock::with_config(MockConfig::new().assert_all_mocked(false));

    let guard = mock.activate().unwrap();
    let response = http.post("https://foo/bar/").await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.content_type(), Some("text/plain"));
    assert_eq!(network.sent(), 1);

    let calls = guard.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].request.method(), Method::POST);
    assert_eq!(calls[0].response.as_ref().map(Response::status), Some(StatusCode::OK));
    guard.finish().unwrap();
}

#[tokio::test]
#[serial]
async fn test_pass_through_route() {
    let network = FakeNetwork::default();
    let http = client(&network);
    let mock = Mock::new();
    let route = mock
        .get(
            "https://example.org/",
            RouteOptions::new().content("mocked").pass_through(true),
        )
        .unwrap();

    let guard = mock.activate().unwrap();
    let response = http.get("https://example.org/").await.unwrap();
    assert_eq!(response.text(), "real /");
    assert_eq!(network.sent(), 1);
    assert!(route.called());
    guard.finish().unwrap();
}

#[tokio::test]
#[serial]
async fn test_pass_through_transport_error() {
    let http = Client::with_transport(Unreachable);
    let mock = Mock::new();
    let route = mock
        .post(
            "https://example.org/",
            RouteOptions::new().content("mocked").pass_through(true),
        )
        .unwrap();

    let guard = mock.activate().unwrap();
    let err = http.post("https://example.org/").await.unwrap_err();
    assert!(matches!(err.as_transport(), Some(TransportError::Connect(_))));
    let call = route.last_call().unwrap();
    assert!(call.response.is_none());
    assert_eq!(guard.calls().len(), 1);
    guard.finish().unwrap();
}

#[tokio::test]
#[serial]
async fn test_custom_matcher() {
    let network = FakeNetwork::default();
    let http = client(&network);
    let mock = Mock::new();
    let route = mock
        .matcher(
            |request, mut template| {
                if request.path() != "/bar/" {
                    return None;
                }
                template.context.insert("id", 123);
                template.content = Content::callback_with(["id"], |_, ctx: &Context| {
                    format!("foobar #{}", ctx.get_string("id").unwrap_or_default())
                });
                Some(template)
            },
            RouteOptions::new()
                .status(201)
                .header("X-Ham", "spam")
                .header("X-Foo", "bar")
                .content_type("text/plain"),
        )
        .unwrap();

    let guard = mock.activate().unwrap();
    let response = http.get("https://foo/bar/").await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers()["x-ham"], "spam");
    assert_eq!(response.headers()["x-foo"], "bar");
    assert_eq!(response.content_type(), Some("text/plain"));
    assert_eq!(response.text(), "foobar #123");
    assert!(route.called());
    guard.finish().unwrap();
}

#[tokio::test]
#[serial]
async fn test_custom_matcher_pass_through() {
    let network = FakeNetwork::default();
    let http = client(&network);
    let mock = Mock::new();
    let route = mock
        .matcher(|request, _| request.clone(), RouteOptions::new())
        .unwrap();

    let guard = mock.activate().unwrap();
    let response = http.get("https://foo/bar/").await.unwrap();
    assert_eq!(response.text(), "real /bar/");
    assert_eq!(route.pass_through(), None);
    assert_eq!(network.sent(), 1);
    guard.finish().unwrap();
}

#[tokio::test]
#[serial]
async fn test_custom_matcher_invalid_verdict() {
    let network = FakeNetwork::default();
    let http = client(&network);
    let mock = Mock::new();
    mock.matcher(|_, _| "invalid", RouteOptions::new()).unwrap();

    let guard = mock.activate().unwrap();
    let err = http.get("https://foo/bar/").await.unwrap_err();
    assert!(matches!(err, MockError::Usage(UsageError::InvalidMatcherResult(_))));
    // The failing verdict doesn't count as a call
    assert!(guard.finish().is_err());
}

#[tokio::test]
#[serial]
async fn test_assert_all_called() {
    let network = FakeNetwork::default();
    let http = client(&network);
    let mock = Mock::new();
    mock.get("https://foo/bar/1/", RouteOptions::new().status(202)).unwrap();
    mock.get("https://foo/bar/2/", RouteOptions::new().status(204).alias("two"))
        .unwrap();

    let guard = mock.activate().unwrap();
    http.get("https://foo/bar/1/").await.unwrap();
    let err = guard.finish().unwrap_err();
    assert_eq!(err, AssertionError::NotCalled(vec!["two".to_string()]));
    assert!(!mock.is_active());

    let mock = Mock::new();
    mock.get("https://foo/bar/1/", RouteOptions::new()).unwrap();
    mock.get("https://foo/bar/2/", RouteOptions::new()).unwrap();
    let guard = mock.activate().unwrap();
    http.get("https://foo/bar/1/").await.unwrap();
    http.get("https://foo/bar/2/").await.unwrap();
    guard.finish().unwrap();
}

#[tokio::test]
#[serial]
async fn test_assert_all_mocked() {
    let network = FakeNetwork::default();
    let http = client(&network);
    let mock = Mock::new();

    let guard = mock.activate().unwrap();
    let err = http.get("https://foo/bar/").await.unwrap_err();
    assert!(matches!(err, MockError::Assertion(AssertionError::NotMocked { .. })));
    assert_eq!(network.sent(), 0);
    assert_eq!(guard.stats().call_count, 0);
    guard.finish().unwrap();
}

#[tokio::test]
#[serial]
async fn test_start_stop_without_reset() {
    let network = FakeNetwork::default();
    let http = client(&network);
    let mock = Mock::new();
    let route = mock.get("https://foo/bar/", RouteOptions::new().status(202)).unwrap();

    mock.start().unwrap();
    let response = http.get("https://foo/bar/").await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    mock.stop_with(false).unwrap();

    // Inactive: the request now reaches the network
    let response = http.get("https://foo/bar/").await.unwrap();
    assert_eq!(response.text(), "real /bar/");
    assert_eq!(route.call_count(), 1);
    assert_eq!(mock.calls().len(), 1);

    mock.stop().unwrap();
    assert!(mock.routes().is_empty());
}

#[tokio::test]
#[serial]
async fn test_dropped_instance_stops_intercepting() {
    let network = FakeNetwork::default();
    let http = client(&network);

    {
        let mock = Mock::new();
        mock.get("https://foo/bar/", RouteOptions::new()).unwrap();
        mock.start().unwrap();
    }
    let response = http.get("https://other/").await.unwrap();
    assert_eq!(response.text(), "real /");
    assert_eq!(network.sent(), 1);

    // An instance still alive underneath takes over again
    let outer = Mock::new();
    outer.get("https://foo/bar/", RouteOptions::new().status(202)).unwrap();
    let guard = outer.activate().unwrap();
    {
        let inner = Mock::new();
        inner.start().unwrap();
    }
    let response = http.get("https://foo/bar/").await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    guard.finish().unwrap();
}

#[tokio::test]
#[serial]
async fn test_try_mocked_async_returns_body_error() {
    let network = FakeNetwork::default();
    let http = client(&network);

    let err = snare::try_mocked_async(|m| async move {
        m.get("https://foo/bar/", RouteOptions::new())?;
        m.get("https://foo/baz/", RouteOptions::new())?;
        let response = http.get("https://foo/bar/").await?;
        anyhow::ensure!(response.status() == StatusCode::CREATED, "unexpected {}", response.status());
        Ok::<(), anyhow::Error>(())
    })
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "unexpected 200 OK");
    assert!(snare::global().routes().is_empty());
    assert!(!snare::global().is_active());
}

#[tokio::test]
#[serial]
async fn test_parallel_requests_recorded_in_dispatch_order() {
    let slow = FakeNetwork {
        delay: Some(Duration::from_millis(50)),
        ..Default::default()
    };
    let fast = FakeNetwork::default();
    let mock = Mock::new();
    let route = mock
        .any(
            UrlPattern::regex("https://foo/").unwrap(),
            RouteOptions::new().pass_through(true),
        )
        .unwrap();
    let synthesized = mock
        .get("https://bar/", RouteOptions::new().content("mocked"))
        .unwrap();

    let (slow_client, fast_client) = (client(&slow), client(&fast));

    let guard = mock.activate().unwrap();
    let (a, b, c) = tokio::join!(
        slow_client.get("https://foo/slow/"),
        fast_client.get("https://foo/fast/"),
        fast_client.get("https://bar/"),
    );
    assert_eq!(a.unwrap().text(), "real /slow/");
    assert_eq!(b.unwrap().text(), "real /fast/");
    assert_eq!(c.unwrap().text(), "mocked");

    let urls: Vec<String> = guard
        .calls()
        .iter()
        .map(|call| call.request.url().to_string())
        .collect();
    assert_eq!(urls, vec!["https://foo/slow/", "https://foo/fast/", "https://bar/"]);
    assert_eq!(route.call_count(), 2);
    assert_eq!(synthesized.call_count(), 1);
    guard.finish().unwrap();
}

#[tokio::test]
#[serial]
async fn test_cancelled_request_records_nothing() {
    let slow = FakeNetwork {
        delay: Some(Duration::from_secs(5)),
        ..Default::default()
    };
    let mock = Mock::with_config(MockConfig::new().assert_all_called(false));
    let route = mock
        .get("https://foo/slow/", RouteOptions::new().pass_through(true))
        .unwrap();

    let guard = mock.activate().unwrap();
    let outcome =
        tokio::time::timeout(Duration::from_millis(20), client(&slow).get("https://foo/slow/")).await;
    assert!(outcome.is_err());
    assert!(!route.called());
    assert!(guard.calls().is_empty());
    guard.finish().unwrap();
}

#[test]
#[serial]
fn test_blocking_client() {
    let network = FakeNetwork::default();
    let http = client(&network);
    let route = snare::post(
        "https://foo/bar/",
        RouteOptions::new().status(201).content(json!({"id": 1})),
    )
    .unwrap();

    let response = snare::mocked(|_| {
        let request = Request::new(Method::POST, "https://foo/bar/")
            .unwrap()
            .with_json(&json!({"name": "ham"}))
            .unwrap();
        http.send_blocking(request).unwrap()
    })
    .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let call = route.last_call().unwrap();
    assert_json_eq!(
        serde_json::from_slice::<Value>(call.request.body()).unwrap(),
        json!({"name": "ham"})
    );
}

#[test]
#[serial]
fn test_with_mock_local_instance() {
    let network = FakeNetwork::default();
    let http = client(&network);

    let status = snare::with_mock(MockConfig::new(), |mock| {
        mock.get("https://foo/bar/", RouteOptions::new().status(204)).unwrap();
        tokio_test::block_on(http.get("https://foo/bar/")).unwrap().status()
    })
    .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(snare::global().routes().is_empty());
}
