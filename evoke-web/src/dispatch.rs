//! 前端控制器
//!
//! 每个请求经过三步：
//! 1. URI 规则链把请求路径归约为控制器类名，并提取路由参数
//! 2. 媒体路由根据 `Accept` 选择输出格式
//! 3. Provider 以路由参数（外加 `uri`）为参数袋构造控制器，并执行它
//!
//! 核心库不记录解析失败；错误在这里被记录并转换为 HTTP 响应。

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use evoke_core::{Arguments, ClassDescriptor, Params, Provider, ResolutionError, Router};
use thiserror::Error;
use tokio::net::TcpListener;

use crate::media::MediaRouter;
use crate::request::Request;

/// 控制器
///
/// 构造参数由 Provider 解析（路由参数、`uri` 以及声明了类型的依赖），
/// `execute` 只接收选定的输出格式。
pub trait Controller: Send + Sync {
    fn execute(&self, format: &str) -> anyhow::Result<Response>;
}

/// 注册控制器类，使 Provider 构造出的实例是 `Arc<dyn Controller>`
///
/// ```
/// use axum::response::IntoResponse;
/// use evoke_core::ParamDescriptor;
/// use evoke_web::{controller_class, Controller};
///
/// struct Users {
///     id: String,
/// }
///
/// impl Controller for Users {
///     fn execute(&self, _format: &str) -> anyhow::Result<axum::response::Response> {
///         Ok(format!("user {}", self.id).into_response())
///     }
/// }
///
/// let class = controller_class("App\\Users", |args| Ok(Users { id: args.value("id")? }))
///     .param(ParamDescriptor::new("id"));
/// assert!(class.is_instantiable());
/// ```
pub fn controller_class<C, F>(name: impl Into<String>, build: F) -> ClassDescriptor
where
    C: Controller + 'static,
    F: Fn(&Arguments) -> anyhow::Result<C> + Send + Sync + 'static,
{
    ClassDescriptor::concrete(name, move |args| Ok(Arc::new(build(args)?) as Arc<dyn Controller>))
}

/// 分发错误
#[derive(Debug, Error)]
pub enum DispatchError {
    /// 控制器或其依赖无法构造 - 500
    #[error("failed to resolve controller '{controller}': {source}")]
    Resolution {
        controller: String,
        #[source]
        source: ResolutionError,
    },

    /// 没有可接受的输出格式 - 406
    #[error("no acceptable output format for '{accept}'")]
    NotAcceptable { accept: String },

    /// 控制器执行失败 - 500
    #[error("controller '{controller}' failed: {source}")]
    Controller {
        controller: String,
        #[source]
        source: anyhow::Error,
    },
}

impl DispatchError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DispatchError::Resolution { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            DispatchError::NotAcceptable { .. } => StatusCode::NOT_ACCEPTABLE,
            DispatchError::Controller { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::warn!("{}", self);
        }

        let reason = status.canonical_reason().unwrap_or("Error");
        (status, format!("{} {}: {}", status.as_u16(), reason, self)).into_response()
    }
}

/// 前端控制器
pub struct FrontController {
    uri_router: Router,
    media_router: MediaRouter,
    default_format: Option<String>,
    provider: Arc<Provider>,
}

impl FrontController {
    pub fn new(uri_router: Router, provider: Arc<Provider>) -> Self {
        Self {
            uri_router,
            media_router: MediaRouter::new(),
            default_format: None,
            provider,
        }
    }

    pub fn with_media_router(mut self, media_router: MediaRouter) -> Self {
        self.media_router = media_router;
        self
    }

    /// 没有媒体规则匹配时使用的格式；未设置时返回 406
    pub fn with_default_format(mut self, format: impl Into<String>) -> Self {
        self.default_format = Some(format.into());
        self
    }

    pub fn provider(&self) -> &Arc<Provider> {
        &self.provider
    }

    fn select_format<R: Request>(&self, request: &R) -> Result<String, DispatchError> {
        let accepted = request.parse_accept();
        if let Some(format) = self.media_router.route(&accepted) {
            return Ok(format);
        }

        self.default_format.clone().ok_or_else(|| DispatchError::NotAcceptable {
            accept: accepted
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    /// 处理单个请求
    pub fn dispatch<R: Request>(&self, request: &R) -> Result<Response, DispatchError> {
        let uri = request.uri();
        let route = self.uri_router.route(&uri);
        let format = self.select_format(request)?;

        let mut params = Params::from(route.params);
        if !params.contains("uri") {
            params.insert("uri", uri.clone());
        }

        tracing::debug!("Dispatching '{}' to '{}' as {}", uri, route.result, format);

        let controller = self
            .provider
            .make_as::<Arc<dyn Controller>>(&route.result, &params)
            .map_err(|source| DispatchError::Resolution {
                controller: route.result.clone(),
                source,
            })?;

        controller
            .execute(&format)
            .map_err(|source| DispatchError::Controller {
                controller: route.result,
                source,
            })
    }

    /// 转换为 axum 路由，所有请求都经过 fallback 分发
    pub fn into_router(self) -> axum::Router {
        axum::Router::new()
            .fallback(handle)
            .with_state(Arc::new(self))
    }

    /// 在给定地址上启动服务器
    pub async fn serve(self, addr: &str) -> anyhow::Result<()> {
        let app = self.into_router().into_make_service();

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", addr, e))?;

        tracing::info!("Evoke front controller listening on http://{}", addr);

        axum::serve(listener, app)
            .await
            .map_err(|e| anyhow::anyhow!("Server error: {}", e))
    }
}

async fn handle(State(front): State<Arc<FrontController>>, request: axum::extract::Request) -> Response {
    let (parts, _body) = request.into_parts();
    match front.dispatch(&parts) {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}
