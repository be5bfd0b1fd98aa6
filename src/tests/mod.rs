use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::collection::FetchTicket;
use crate::gateway::{ApiRequest, Fetch, FetchError, Gateway, GatewayOptions};
use crate::present::BookingStatus;
use crate::resources::{AdminUsers, AllProducts, BandBookings, BandProducts};
use crate::session::Session;
use crate::view::{ActionOutcome, ItemAction, ViewController, ViewError, ViewSnapshot};

struct Reply {
    delay: Duration,
    result: Result<Value, FetchError>,
}

#[derive(Default)]
struct Script {
    replies: HashMap<String, VecDeque<Reply>>,
    log: Vec<String>,
}

/// In-process backend: answers requests from a per-route queue and records
/// every call.
#[derive(Clone, Default)]
struct ScriptedFetch {
    inner: Arc<Mutex<Script>>,
}

fn route(request: &ApiRequest) -> String {
    let mut out = format!("{} {}", request.method, request.endpoint);
    if !request.query.is_empty() {
        let query = request
            .query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        out.push('?');
        out.push_str(&query);
    }
    out
}

impl ScriptedFetch {
    fn reply(&self, route: &str, result: Result<Value, FetchError>) -> &Self {
        self.reply_after(route, Duration::ZERO, result)
    }

    fn reply_after(&self, route: &str, delay: Duration, result: Result<Value, FetchError>) -> &Self {
        self.inner
            .lock()
            .unwrap()
            .replies
            .entry(route.to_string())
            .or_default()
            .push_back(Reply { delay, result });
        self
    }

    fn log(&self) -> Vec<String> {
        self.inner.lock().unwrap().log.clone()
    }

    fn calls_to(&self, route: &str) -> usize {
        self.log().iter().filter(|r| r.as_str() == route).count()
    }
}

impl Fetch for ScriptedFetch {
    fn send(&self, request: ApiRequest) -> impl Future<Output = Result<Value, FetchError>> + Send {
        let inner = self.inner.clone();
        async move {
            let key = route(&request);
            let reply = {
                let mut script = inner.lock().unwrap();
                script.log.push(key.clone());
                script.replies.get_mut(&key).and_then(VecDeque::pop_front)
            };
            match reply {
                Some(reply) => {
                    if !reply.delay.is_zero() {
                        tokio::time::sleep(reply.delay).await;
                    }
                    reply.result
                }
                None => Err(FetchError::Network(format!("no scripted reply for {key}"))),
            }
        }
    }
}

fn products(ids: std::ops::RangeInclusive<u64>) -> Value {
    Value::Array(
        ids.map(|id| json!({"product_id": id, "name": format!("item {id}"), "price": "1500"}))
            .collect(),
    )
}

fn page_ids<R>(view: &ViewController<R, ScriptedFetch>) -> Vec<u64>
where
    R: crate::resources::Resource,
    R::Item: crate::collection::CollectionItem<Id = u64>,
{
    use crate::collection::CollectionItem;
    match view.render() {
        ViewSnapshot::Page(page) => page.items.iter().map(|i| i.id()).collect(),
        other => panic!("expected a page, got {other:?}"),
    }
}

#[tokio::test]
async fn client_pages_slice_without_refetching() {
    let fetch = ScriptedFetch::default();
    fetch.reply("GET /products", Ok(products(1..=12)));
    let mut view = ViewController::new(AllProducts, fetch.clone(), 5);

    view.mount(()).await;
    assert_eq!(page_ids(&view), vec![1, 2, 3, 4, 5]);
    assert!(view.next_page().await.unwrap());
    assert_eq!(page_ids(&view), vec![6, 7, 8, 9, 10]);
    assert!(view.next_page().await.unwrap());
    assert_eq!(page_ids(&view), vec![11, 12]);
    assert!(!view.next_page().await.unwrap());

    match view.render() {
        ViewSnapshot::Page(page) => {
            assert_eq!(page.total_pages, 3);
            assert_eq!(page.total_items, 12);
            assert_eq!(page.first_index, 11);
        }
        other => panic!("expected a page, got {other:?}"),
    }
    assert!(!view.go_to_page(99).await.unwrap());
    assert_eq!(view.cursor().page(), 3);
    assert_eq!(fetch.log(), vec!["GET /products".to_string()]);
}

#[tokio::test]
async fn empty_and_message_bodies_render_empty_state() {
    let fetch = ScriptedFetch::default();
    fetch
        .reply("GET /products", Ok(json!([])))
        .reply("GET /bands/products/3", Ok(json!({"message": "No products found for this band."})));

    let mut all = ViewController::new(AllProducts, fetch.clone(), 10);
    all.mount(()).await;
    assert_eq!(all.render(), ViewSnapshot::Empty("No products registered yet."));

    let mut band = ViewController::new(BandProducts, fetch.clone(), 10);
    band.mount(3).await;
    assert_eq!(band.render(), ViewSnapshot::Empty("No products found for this band."));
}

#[tokio::test]
async fn fetch_failure_renders_error_text() {
    let fetch = ScriptedFetch::default();
    fetch.reply(
        "GET /products",
        Err(FetchError::Http {
            status: 404,
            message: "not found".to_string(),
        }),
    );
    let mut view = ViewController::new(AllProducts, fetch, 10);
    view.mount(()).await;
    assert_eq!(view.state().error(), Some("not found"));
    assert_eq!(view.render(), ViewSnapshot::Error("not found"));
}

async fn tagged<F: Fetch>(
    fetch: &F,
    ticket: FetchTicket<u64>,
    request: ApiRequest,
) -> (FetchTicket<u64>, Result<Value, FetchError>) {
    (ticket, fetch.send(request).await)
}

#[tokio::test]
async fn overlapping_fetches_keep_the_latest() {
    let fetch = ScriptedFetch::default();
    fetch
        .reply_after(
            "GET /bands/products/1",
            Duration::from_millis(50),
            Ok(products(1..=1)),
        )
        .reply("GET /bands/products/2", Ok(products(2..=2)));
    let mut view = ViewController::new(BandProducts, fetch.clone(), 10);

    let a = view.begin(1);
    let request_a = view.request_for(&a);
    let b = view.begin(2);
    let request_b = view.request_for(&b);

    let mut pending = FuturesUnordered::new();
    pending.push(tagged(&fetch, a, request_a));
    pending.push(tagged(&fetch, b, request_b));

    let mut applied = Vec::new();
    while let Some((ticket, result)) = pending.next().await {
        applied.push((*ticket.key(), view.complete(ticket, result)));
    }

    assert_eq!(applied, vec![(2, true), (1, false)]);
    assert_eq!(page_ids(&view), vec![2]);
    assert_eq!(view.dependency(), Some(&2));
}

#[tokio::test]
async fn unchanged_dependency_does_not_refetch() {
    let fetch = ScriptedFetch::default();
    fetch
        .reply("GET /bands/products/1", Ok(products(1..=2)))
        .reply("GET /bands/products/2", Ok(products(3..=4)));
    let mut view = ViewController::new(BandProducts, fetch.clone(), 10);

    assert!(view.set_dependency(1).await);
    assert!(!view.set_dependency(1).await);
    assert!(view.set_dependency(2).await);
    assert_eq!(page_ids(&view), vec![3, 4]);
    assert_eq!(fetch.log().len(), 2);
}

#[tokio::test]
async fn delete_removes_locally_and_reclamps() {
    let fetch = ScriptedFetch::default();
    fetch
        .reply("GET /products", Ok(products(1..=11)))
        .reply("DELETE /admin/products/11", Ok(json!({"message": "deleted"})));
    let mut view = ViewController::new(AllProducts, fetch.clone(), 5);
    view.mount(()).await;
    view.go_to_page(3).await.unwrap();
    assert_eq!(page_ids(&view), vec![11]);

    let outcome = view.dispatch(ItemAction::Delete(11)).await.unwrap();
    assert_eq!(outcome, ActionOutcome::Removed);
    assert_eq!(view.cursor().page(), 2);
    assert_eq!(view.cursor().total_pages(), 2);
    assert_eq!(page_ids(&view), vec![6, 7, 8, 9, 10]);
    assert_eq!(fetch.calls_to("GET /products"), 1);
}

#[tokio::test]
async fn failed_mutation_falls_back_to_refetch() {
    let fetch = ScriptedFetch::default();
    fetch
        .reply("GET /products", Ok(products(1..=3)))
        .reply(
            "DELETE /admin/products/2",
            Err(FetchError::Http {
                status: 500,
                message: "Internal Server Error.".to_string(),
            }),
        )
        .reply("GET /products", Ok(products(1..=3)));
    let mut view = ViewController::new(AllProducts, fetch.clone(), 10);
    view.mount(()).await;

    let err = view.dispatch(ItemAction::Delete(2)).await.unwrap_err();
    assert_eq!(err.to_string(), "Internal Server Error.");
    assert_eq!(fetch.calls_to("GET /products"), 2);
    assert_eq!(page_ids(&view), vec![1, 2, 3]);
}

#[tokio::test]
async fn actions_need_a_loaded_known_item() {
    let fetch = ScriptedFetch::default();
    fetch.reply("GET /products", Ok(products(4..=4)));
    let mut view = ViewController::new(AllProducts, fetch, 10);

    assert_eq!(
        view.dispatch(ItemAction::Open(4)).await.unwrap_err(),
        ViewError::NotLoaded
    );
    view.mount(()).await;
    assert_eq!(
        view.dispatch(ItemAction::Open(4)).await.unwrap(),
        ActionOutcome::Navigate("/band/product/4".to_string())
    );
    assert_eq!(
        view.dispatch(ItemAction::Delete(9)).await.unwrap_err(),
        ViewError::UnknownItem { id: "9".to_string() }
    );
}

#[tokio::test]
async fn update_merges_fields_into_item() {
    let fetch = ScriptedFetch::default();
    fetch
        .reply("GET /products", Ok(products(1..=2)))
        .reply("PUT /admin/products/2", Ok(json!({"message": "updated"})));
    let mut view = ViewController::new(AllProducts, fetch, 10);
    view.mount(()).await;

    let outcome = view
        .dispatch(ItemAction::Update {
            id: 2,
            body: json!({"name": "Renamed", "price": 900}),
        })
        .await
        .unwrap();
    assert_eq!(outcome, ActionOutcome::Updated);
    let item = &view.state().items().unwrap()[1];
    assert_eq!(item.name, "Renamed");
    assert_eq!(item.price.amount(), Some(900.0));
}

#[tokio::test]
async fn accepting_a_booking_patches_its_status() {
    let fetch = ScriptedFetch::default();
    fetch
        .reply(
            "GET /bookings/band",
            Ok(json!([
                {"offer_id": 3, "user_name": "fan", "booking_date": "2024-08-01", "price": "50000.00", "status": "Pending"}
            ])),
        )
        .reply("POST /bookings/3/accept", Ok(Value::Null));
    let mut view = ViewController::new(BandBookings, fetch.clone(), 10);
    view.mount(()).await;

    let outcome = view
        .dispatch(ItemAction::Command {
            id: 3,
            command: "accept".to_string(),
            patch: Some(json!({"status": "Accepted"})),
        })
        .await
        .unwrap();
    assert_eq!(outcome, ActionOutcome::Updated);
    assert_eq!(view.state().items().unwrap()[0].status, BookingStatus::Accepted);
    assert_eq!(fetch.calls_to("GET /bookings/band"), 1);
}

fn users_page(page: usize, ids: std::ops::RangeInclusive<u64>) -> Value {
    let users: Vec<Value> = ids
        .map(|id| json!({"user_id": id, "username": format!("u{id}"), "email": format!("u{id}@x.jp")}))
        .collect();
    json!({
        "users": users,
        "pagination": {"page": page, "limit": 2, "total": 5, "total_pages": 3}
    })
}

#[tokio::test]
async fn server_pages_refetch_with_page_query() {
    let fetch = ScriptedFetch::default();
    fetch
        .reply("GET /admin/users?page=1&limit=2", Ok(users_page(1, 1..=2)))
        .reply("GET /admin/users?page=2&limit=2", Ok(users_page(2, 3..=4)));
    let mut view = ViewController::new(AdminUsers, fetch.clone(), 2);
    view.mount(()).await;
    assert_eq!(page_ids(&view), vec![1, 2]);

    assert!(view.next_page().await.unwrap());
    assert_eq!(page_ids(&view), vec![3, 4]);
    match view.render() {
        ViewSnapshot::Page(page) => {
            assert_eq!(page.page, 2);
            assert_eq!(page.total_pages, 3);
            assert_eq!(page.total_items, 5);
            assert_eq!(page.first_index, 3);
        }
        other => panic!("expected a page, got {other:?}"),
    }
    assert_eq!(
        fetch.log(),
        vec![
            "GET /admin/users?page=1&limit=2".to_string(),
            "GET /admin/users?page=2&limit=2".to_string(),
        ]
    );
}

#[tokio::test]
async fn deleting_last_user_on_server_page_refills_from_server() {
    let fetch = ScriptedFetch::default();
    fetch
        .reply(
            "GET /admin/users?page=1&limit=2",
            Ok(json!({
                "users": [
                    {"user_id": 1, "username": "u1", "email": "u1@x.jp"},
                    {"user_id": 2, "username": "u2", "email": "u2@x.jp"}
                ],
                "pagination": {"page": 1, "limit": 2, "total": 3, "total_pages": 2}
            })),
        )
        .reply(
            "GET /admin/users?page=2&limit=2",
            Ok(json!({
                "users": [{"user_id": 3, "username": "u3", "email": "u3@x.jp"}],
                "pagination": {"page": 2, "limit": 2, "total": 3, "total_pages": 2}
            })),
        )
        .reply("DELETE /admin/users/3", Ok(json!({"message": "deleted"})))
        .reply(
            "GET /admin/users?page=1&limit=2",
            Ok(json!({
                "users": [
                    {"user_id": 1, "username": "u1", "email": "u1@x.jp"},
                    {"user_id": 2, "username": "u2", "email": "u2@x.jp"}
                ],
                "pagination": {"page": 1, "limit": 2, "total": 2, "total_pages": 1}
            })),
        );
    let mut view = ViewController::new(AdminUsers, fetch.clone(), 2);
    view.mount(()).await;
    assert!(view.next_page().await.unwrap());
    assert_eq!(page_ids(&view), vec![3]);

    assert_eq!(view.dispatch(ItemAction::Delete(3)).await.unwrap(), ActionOutcome::Removed);
    assert_eq!(page_ids(&view), vec![1, 2]);
    match view.render() {
        ViewSnapshot::Page(page) => {
            assert_eq!(page.page, 1);
            assert_eq!(page.total_pages, 1);
            assert_eq!(page.total_items, 2);
        }
        other => panic!("expected a page, got {other:?}"),
    }
    assert_eq!(fetch.calls_to("GET /admin/users?page=1&limit=2"), 2);
}

#[tokio::test]
async fn server_resource_without_metadata_pages_locally() {
    let fetch = ScriptedFetch::default();
    fetch.reply(
        "GET /admin/users?page=1&limit=2",
        Ok(json!([
            {"user_id": 1, "username": "u1", "email": "u1@x.jp"},
            {"user_id": 2, "username": "u2", "email": "u2@x.jp"},
            {"user_id": 3, "username": "u3", "email": "u3@x.jp"}
        ])),
    );
    let mut view = ViewController::new(AdminUsers, fetch.clone(), 2);
    view.mount(()).await;
    assert_eq!(page_ids(&view), vec![1, 2]);

    assert!(view.next_page().await.unwrap());
    assert_eq!(view.cursor().page(), 2);
    assert_eq!(page_ids(&view), vec![3]);
    assert!(!view.next_page().await.unwrap());
    assert_eq!(fetch.log(), vec!["GET /admin/users?page=1&limit=2".to_string()]);
}

/// One-shot HTTP responder on a random local port. Resolves to the raw
/// request it received.
async fn serve_once(
    status: &'static str,
    body: &'static str,
    delay: Duration,
) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut raw = Vec::new();
        let mut buf = [0u8; 1024];
        while !raw.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&buf[..n]);
        }
        tokio::time::sleep(delay).await;
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;
        String::from_utf8_lossy(&raw).to_string()
    });
    (base, handle)
}

fn gateway(base_url: String, timeout_seconds: u64, session: Session) -> Gateway {
    Gateway::new(
        GatewayOptions {
            base_url,
            timeout_seconds,
            proxy: None,
        },
        session,
    )
    .unwrap()
}

#[tokio::test]
async fn gateway_sends_bearer_token() {
    let (base, server) = serve_once("200 OK", r#"[{"product_id": 1, "name": "Tee"}]"#, Duration::ZERO).await;
    let session = Session::in_memory();
    session.login("tok123", None).unwrap();

    let body = gateway(base, 10, session).get("/products").await.unwrap();
    assert_eq!(body[0]["name"], "Tee");

    let request = server.await.unwrap().to_ascii_lowercase();
    assert!(request.starts_with("get /products http/1.1"));
    assert!(request.contains("authorization: bearer tok123"));
}

#[tokio::test]
async fn gateway_error_text_reaches_the_view() {
    let (base, server) = serve_once("404 Not Found", r#"{"error": "not found"}"#, Duration::ZERO).await;
    let mut view = ViewController::new(AllProducts, gateway(base, 10, Session::in_memory()), 10);
    view.mount(()).await;
    assert_eq!(view.render(), ViewSnapshot::Error("not found"));
    let request = server.await.unwrap().to_ascii_lowercase();
    assert!(!request.contains("authorization:"));
}

#[tokio::test]
async fn unauthorized_response_clears_session() {
    let (base, _server) = serve_once("401 Unauthorized", r#"{"error": "Unauthorized"}"#, Duration::ZERO).await;
    let session = Session::in_memory();
    session.login("stale", Some(&json!({"username": "mika"}))).unwrap();

    let err = gateway(base, 10, session.clone())
        .get("/admin/users")
        .await
        .unwrap_err();
    assert!(err.is_auth());
    assert_eq!(session.token(), None);
    assert_eq!(session.user(), None);
}

#[tokio::test]
async fn slow_backend_times_out() {
    let (base, _server) = serve_once("200 OK", "[]", Duration::from_secs(3)).await;
    let mut view = ViewController::new(AllProducts, gateway(base, 1, Session::in_memory()), 10);
    view.mount(()).await;
    assert_eq!(view.render(), ViewSnapshot::Error("request timed out after 1s"));
}
