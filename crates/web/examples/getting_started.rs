use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use totea_http::route::RouteTable;
use totea_web::metadata::Declarations;
use totea_web::middleware::RequestLogger;
use totea_web::{Controller, HttpError, Json, RequestContext, Server, ServerOptions, Target, Validator, handler_fn};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct User {
    name: String,
    zip: Option<String>,
}

#[derive(Default)]
struct Users {
    inner: Mutex<Vec<User>>,
}

impl Users {
    fn lock(&self) -> MutexGuard<'_, Vec<User>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn users(ctx: &RequestContext) -> Result<Arc<Users>, HttpError> {
    ctx.peers().controller::<Users>("user").ok_or_else(HttpError::internal)
}

// curl -X POST -H 'Content-Type: application/json' -d '{"name":"leo"}' /user
async fn add_user(ctx: RequestContext) -> Result<Json<User>, HttpError> {
    let user = ctx.body_as::<User>()?;
    users(&ctx)?.lock().push(user.clone());
    Ok(Json(user))
}

async fn get_user(ctx: RequestContext) -> Result<Json<User>, HttpError> {
    let index = ctx
        .param("id")
        .and_then(|id| id.parse::<usize>().ok())
        .ok_or_else(|| HttpError::bad_request("id must be an index"))?;
    users(&ctx)?.lock().get(index).cloned().map(Json).ok_or_else(HttpError::not_found)
}

async fn list_users(ctx: RequestContext) -> Result<Json<Vec<User>>, HttpError> {
    Ok(Json(users(&ctx)?.lock().clone()))
}

async fn dispatch(table: &RouteTable, method: Method, uri: &str, body: Option<&'static str>) {
    let builder = http::Request::builder().method(method.clone()).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Bytes::from_static(body.as_bytes())),
        None => builder.body(Bytes::new()),
    };
    let Ok(request) = request else {
        return;
    };

    let response = table.dispatch(request).await;
    let envelope = serde_json::from_slice::<Value>(response.body()).unwrap_or(Value::Null);
    info!(%method, uri, %envelope, "answered");
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let user = Controller::builder("user")
        .routes(
            Declarations::new()
                .post("/", "addUser", handler_fn(add_user))
                .get("/", "listUsers", handler_fn(list_users))
                .get("/:id", "getUser", handler_fn(get_user))
                .validate("addUser", Validator::schema::<User>(Target::Body)),
        )
        .state(Arc::new(Users::default()))
        .build()
        .expect("controller name is valid");

    let mut server = Server::builder()
        .options(ServerOptions::new().middleware(RequestLogger::new()))
        .routes(Declarations::new().get("/", "root", handler_fn(|_ctx: RequestContext| async { "hello totea" })))
        .controller(user)
        .build()
        .expect("routes do not conflict");

    let mut table = RouteTable::new();
    server.assign(&mut table).expect("table accepts routes");

    dispatch(&table, Method::GET, "/", None).await;
    dispatch(&table, Method::POST, "/user", Some(r#"{"name":"leo","zip":"100000"}"#)).await;
    dispatch(&table, Method::POST, "/user", Some(r#"{"zip":"100000"}"#)).await;
    dispatch(&table, Method::GET, "/user/0", None).await;
    dispatch(&table, Method::GET, "/user/9", None).await;
    dispatch(&table, Method::GET, "/user", None).await;
    dispatch(&table, Method::DELETE, "/user/0", None).await;
}
