#![allow(dead_code)]

use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::{Method, StatusCode};
use actix_web::{test, web, App};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

use octofit_backend::config::Config;
use octofit_backend::db::{MemoryStore, SharedStore, Store};
use octofit_backend::models::User;
use octofit_backend::routes;
use octofit_backend::utils::jwt::generate_token;

pub const SECRET: &str = "test-secret";

pub fn config() -> Config {
    Config::from_lookup(|key| match key {
        "STORAGE_BACKEND" => Some("memory".to_string()),
        "JWT_SECRET" => Some(SECRET.to_string()),
        _ => None,
    })
    .expect("test configuration")
}

pub fn store() -> SharedStore {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    web::Data::from(store)
}

pub fn app(
    store: SharedStore,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(config()))
        .app_data(store)
        .configure(routes::configure)
}

/// Inserts a user directly, the way seeding does, and returns a bearer token for it.
pub async fn user(store: &SharedStore, username: &str, staff: bool) -> (User, String) {
    let mut user = User::new(username, &format!("{}@x.com", username));
    user.is_staff = staff;
    store.insert_user(&user).await.expect("insert user");
    let token = generate_token(user.id, SECRET, 1).expect("token");
    (user, token)
}

pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

impl Reply {
    pub fn json<T: DeserializeOwned>(&self) -> T {
        serde_json::from_value(self.body.clone()).expect("response shape")
    }
}

pub fn request(method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> test::TestRequest {
    let mut req = test::TestRequest::default().method(method).uri(path);
    if let Some(token) = token {
        req = req.insert_header(("Authorization", format!("Bearer {}", token)));
    }
    if let Some(body) = body {
        req = req.set_json(body);
    }
    req
}

fn parse(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

/// Sends a request and normalises middleware errors into responses.
pub async fn send<S, R, B>(app: &S, req: R) -> Reply
where
    S: Service<R, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    match app.call(req).await {
        Ok(resp) => {
            let status = resp.status();
            let bytes = test::read_body(resp).await;
            Reply { status, body: parse(&bytes) }
        }
        Err(err) => {
            let resp = err.error_response();
            let status = resp.status();
            let bytes = actix_web::body::to_bytes(resp.into_body()).await.unwrap_or_default();
            Reply { status, body: parse(&bytes) }
        }
    }
}
