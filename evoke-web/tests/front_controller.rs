use std::sync::Arc;

use axum::body::to_bytes;
use axum::http::{header, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use evoke_core::{ClassDescriptor, ClassRegistry, ParamDescriptor, Provider, RegexRule, Router, StrReplace, TrimLeft};
use evoke_web::{controller_class, Controller, FrontController, MediaRouter};
use tower::ServiceExt;

struct Greeting {
    salutation: String,
}

struct UserController {
    id: String,
    uri: String,
    greeting: Arc<Greeting>,
}

impl Controller for UserController {
    fn execute(&self, format: &str) -> anyhow::Result<Response> {
        let body = match format {
            "JSON" => format!(r#"{{"id":"{}","uri":"{}"}}"#, self.id, self.uri),
            _ => format!("{} user {}", self.greeting.salutation, self.id),
        };
        Ok((StatusCode::OK, body).into_response())
    }
}

fn app() -> axum::Router {
    let registry = ClassRegistry::new()
        .with_class(
            ClassDescriptor::concrete("Greeting", |args| {
                Ok(Greeting {
                    salutation: args.value("salutation")?,
                })
            })
            .param(ParamDescriptor::new("salutation").with_default("Hello".to_string())),
        )
        .unwrap()
        .with_class(
            controller_class("Impl\\AdminController\\Users", |args| {
                Ok(UserController {
                    id: args.value("id")?,
                    uri: args.value("uri")?,
                    greeting: args.get("greeting")?,
                })
            })
            .param(ParamDescriptor::new("id"))
            .param(ParamDescriptor::new("uri"))
            .param(ParamDescriptor::typed("greeting", "Greeting")),
        )
        .unwrap();

    let uri_router = Router::new()
        .with_rule(TrimLeft::new("/", false).unwrap())
        .with_rule(StrReplace::new("Admin/", "Impl\\AdminController\\", false).unwrap())
        .with_rule(RegexRule::new(r"/(?P<id>\d+)$", "", true).unwrap());

    let media_router = MediaRouter::new()
        .with_format("application", "json", "JSON")
        .with_format("text", "*", "TEXT");

    FrontController::new(uri_router, Arc::new(Provider::new(Arc::new(registry))))
        .with_media_router(media_router)
        .into_router()
}

async fn send(uri: &str, accept: Option<&str>) -> (StatusCode, String) {
    let mut builder = Request::builder().uri(uri);
    if let Some(accept) = accept {
        builder = builder.header(header::ACCEPT, accept);
    }
    let request = builder.body(axum::body::Body::empty()).unwrap();

    let response = app().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_routes_to_controller_with_params() {
    let (status, body) = send("/Admin/Users/5", Some("text/html")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Hello user 5");
}

#[tokio::test]
async fn test_format_follows_accept_quality() {
    let (status, body) = send("/Admin/Users/7", Some("text/html;q=0.5, application/json")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"id":"7","uri":"/Admin/Users/7"}"#);
}

#[tokio::test]
async fn test_unresolvable_route_is_500() {
    let (status, body) = send("/Nowhere", Some("text/plain")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("class 'Nowhere' is not registered"));
}

#[tokio::test]
async fn test_missing_param_is_500() {
    // 没有数字后缀时 id 无法解析
    let (status, body) = send("/Admin/Users", None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("cannot resolve parameter 'id'"));
}

#[tokio::test]
async fn test_unacceptable_format_is_406() {
    let (status, _) = send("/Admin/Users/5", Some("image/png")).await;
    assert_eq!(status, StatusCode::NOT_ACCEPTABLE);
}
