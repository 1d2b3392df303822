//! End-to-end behaviour of the plaintext listener against stub origins.

mod common;

use std::time::{Duration, Instant};

use reqwest::header::HOST;
use reqwest::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use common::*;

#[tokio::test]
async fn test_proxied_body_and_header() {
    let backend = start_test_backend().await;
    let proxy = start_proxy(config(vec![route("test.home", backend)])).await;

    let res = client()
        .get(proxy.url("/"))
        .header(HOST, "test.home")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["test-header"], "test-value");
    assert_eq!(res.text().await.unwrap(), TEST_BODY);
}

#[tokio::test]
async fn test_bypass_answers_locally() {
    let backend = start_test_backend().await;
    let proxy = start_proxy(config(vec![route("test.home", backend)])).await;

    for host in ["test.home", "undefined"] {
        let res = client()
            .get(proxy.url("/status"))
            .header(HOST, host)
            .header("x-no-proxy", "true")
            .send()
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.text().await.unwrap(), "The proxy is running");
    }
}

#[tokio::test]
async fn test_undefined_host_is_404() {
    let backend = start_test_backend().await;
    let proxy = start_proxy(config(vec![route("test.home", backend)])).await;

    let res = client()
        .get(proxy.url("/"))
        .header(HOST, "undefined")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.text().await.unwrap(), "No route for host");
}

#[tokio::test]
async fn test_falsy_bypass_value_is_routed() {
    let backend = start_test_backend().await;
    let proxy = start_proxy(config(vec![route("test.home", backend)])).await;

    let res = client()
        .get(proxy.url("/"))
        .header(HOST, "test.home")
        .header("x-no-proxy", "false")
        .send()
        .await
        .unwrap();

    assert_eq!(res.text().await.unwrap(), TEST_BODY);
}

#[tokio::test]
async fn test_host_match_ignores_case_and_port() {
    let backend = start_test_backend().await;
    let proxy = start_proxy(config(vec![route("test.home", backend)])).await;

    for host in ["TEST.home", "test.home:3000", "Test.Home:8443"] {
        let res = client()
            .get(proxy.url("/"))
            .header(HOST, host)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK, "host {host}");
        assert_eq!(res.text().await.unwrap(), TEST_BODY);
    }
}

#[tokio::test]
async fn test_path_query_and_body_forwarded() {
    let backend = start_test_backend().await;
    let proxy = start_proxy(config(vec![route("test.home", backend)])).await;

    let res = client()
        .post(proxy.url("/echo?a=1&b=two"))
        .header(HOST, "test.home")
        .body("payload")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body = res.text().await.unwrap();
    assert!(body.contains("method=POST"), "{body}");
    assert!(body.contains("uri=/echo?a=1&b=two"), "{body}");
    assert!(body.contains("host=test.home"), "{body}");
    assert!(body.ends_with("body=payload"), "{body}");
}

#[tokio::test]
async fn test_forwarded_request_carries_loop_guard_and_request_id() {
    let backend = start_test_backend().await;
    let proxy = start_proxy(config(vec![route("test.home", backend)])).await;

    let body = client()
        .get(proxy.url("/echo"))
        .header(HOST, "test.home")
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(body.contains("x-no-proxy=true"), "{body}");
    assert!(!body.contains("x-request-id=-"), "{body}");
}

#[tokio::test]
async fn test_large_body_relayed_intact() {
    let backend = start_test_backend().await;
    let proxy = start_proxy(config(vec![route("test.home", backend)])).await;

    let bytes = client()
        .get(proxy.url("/large"))
        .header(HOST, "test.home")
        .send()
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();

    assert_eq!(bytes.len(), 4 * 1024 * 1024);
    assert!(bytes.iter().all(|b| *b == b'x'));
}

#[tokio::test]
async fn test_dead_upstream_is_502() {
    let dead = dead_address().await;
    let proxy = start_proxy(config(vec![route("dead.home", dead)])).await;

    let res = client()
        .get(proxy.url("/"))
        .header(HOST, "dead.home")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(res.text().await.unwrap(), "Cannot connect to backend");
}

#[tokio::test]
async fn test_silent_upstream_is_504() {
    let silent = start_silent_backend().await;
    let mut cfg = config(vec![route("silent.home", silent)]);
    cfg.timeouts.request_secs = 1;
    let proxy = start_proxy(cfg).await;

    let start = Instant::now();
    let res = client()
        .get(proxy.url("/"))
        .header(HOST, "silent.home")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_unconnectable_upstream_is_502_when_connect_bound_exceeds_response_bound() {
    let saturated = start_saturated_backend().await;
    let mut cfg = config(vec![route("stuck.home", saturated)]);
    cfg.timeouts.connect_secs = 2;
    cfg.timeouts.request_secs = 1;
    let proxy = start_proxy(cfg).await;

    let res = client()
        .get(proxy.url("/"))
        .header(HOST, "stuck.home")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(res.text().await.unwrap(), "Cannot connect to backend");
}

#[tokio::test]
async fn test_client_disconnect_abandons_upstream() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let upstream = listener.local_addr().unwrap();
    let (head_tx, head_rx) = oneshot::channel();

    // Reads the request head, then waits for the proxy to hang up.
    let origin = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        let mut head = Vec::new();
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            assert!(n > 0, "proxy closed before sending the request head");
            head.extend_from_slice(&buf[..n]);
        }
        head_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), socket.read(&mut buf)).await
    });

    let proxy = start_proxy(config(vec![route("gone.home", upstream)])).await;

    let mut client = TcpStream::connect(proxy.addr).await.unwrap();
    client
        .write_all(b"GET / HTTP/1.1\r\nHost: gone.home\r\n\r\n")
        .await
        .unwrap();
    head_rx.await.unwrap();
    drop(client);

    let read = origin.await.unwrap();
    assert!(
        matches!(read, Ok(Ok(0)) | Ok(Err(_))),
        "upstream connection still open after client left: {read:?}"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_slow_upstream_does_not_block_others() {
    let backend = start_test_backend().await;
    let proxy = start_proxy(config(vec![route("test.home", backend)])).await;

    let slow_url = proxy.url("/slow");
    let slow = tokio::spawn(async move {
        let start = Instant::now();
        let res = client()
            .get(slow_url)
            .header(HOST, "test.home")
            .send()
            .await
            .unwrap();
        assert_eq!(res.text().await.unwrap(), TEST_BODY);
        start.elapsed()
    });

    tokio::time::sleep(Duration::from_millis(100)).await;

    let start = Instant::now();
    let fast = client()
        .get(proxy.url("/"))
        .header(HOST, "test.home")
        .send()
        .await
        .unwrap();
    assert_eq!(fast.text().await.unwrap(), TEST_BODY);

    let status = client()
        .get(proxy.url("/status"))
        .header("x-no-proxy", "true")
        .send()
        .await
        .unwrap();
    assert_eq!(status.status(), StatusCode::OK);
    let fast_elapsed = start.elapsed();

    let slow_elapsed = slow.await.unwrap();
    assert!(fast_elapsed < Duration::from_secs(1), "{fast_elapsed:?}");
    assert!(slow_elapsed >= SLOW_DELAY, "{slow_elapsed:?}");
}

#[tokio::test]
async fn test_round_robin_across_upstreams() {
    let a = start_named_backend("a").await;
    let b = start_named_backend("b").await;
    let mut lb = route("lb.home", a);
    lb.upstreams.push(b.to_string());
    let proxy = start_proxy(config(vec![lb])).await;

    let mut seen = Vec::new();
    for _ in 0..4 {
        let body = client()
            .get(proxy.url("/"))
            .header(HOST, "lb.home")
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        seen.push(body);
    }

    assert_eq!(seen, vec!["a", "b", "a", "b"]);
}

#[tokio::test]
async fn test_repeated_requests_are_stable() {
    let backend = start_test_backend().await;
    let proxy = start_proxy(config(vec![route("test.home", backend)])).await;
    let client = client();

    for _ in 0..5 {
        let ok = client
            .get(proxy.url("/"))
            .header(HOST, "test.home")
            .send()
            .await
            .unwrap();
        assert_eq!(ok.text().await.unwrap(), TEST_BODY);

        let miss = client
            .get(proxy.url("/"))
            .header(HOST, "undefined")
            .send()
            .await
            .unwrap();
        assert_eq!(miss.status(), StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn test_route_update_applies_without_restart() {
    let backend = start_test_backend().await;
    let proxy = start_proxy(config(Vec::new())).await;

    let res = client()
        .get(proxy.url("/"))
        .header(HOST, "new.home")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    proxy
        .updates
        .send(config(vec![route("new.home", backend)]))
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        let res = client()
            .get(proxy.url("/"))
            .header(HOST, "new.home")
            .send()
            .await
            .unwrap();
        if res.status() == StatusCode::OK {
            assert_eq!(res.text().await.unwrap(), TEST_BODY);
            break;
        }
        assert!(Instant::now() < deadline, "route update never applied");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn test_admin_disabled_forwards_bypass_requests() {
    let backend = start_test_backend().await;
    let mut cfg = config(vec![route("test.home", backend)]);
    cfg.admin.enabled = false;
    let proxy = start_proxy(cfg).await;

    let res = client()
        .get(proxy.url("/"))
        .header(HOST, "test.home")
        .header("x-no-proxy", "true")
        .send()
        .await
        .unwrap();

    assert_eq!(res.text().await.unwrap(), TEST_BODY);
}
