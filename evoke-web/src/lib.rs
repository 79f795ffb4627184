//! # Evoke Web
//!
//! 基于 Axum 的前端控制器：
//!
//! - **请求协作者** - 从 HTTP 请求读取 URI 和 `Accept`
//! - **媒体路由** - 按 `Accept` 质量选择输出格式
//! - **分发** - URI 规则链 + Provider 构造控制器，失败转换为 HTTP 响应

pub mod dispatch;
pub mod media;
pub mod request;

pub use dispatch::{controller_class, Controller, DispatchError, FrontController};
pub use media::{parse_accept, MediaRouter, MediaType};
pub use request::Request;

pub mod prelude {
    //! 预导入模块

    pub use crate::dispatch::*;
    pub use crate::media::*;
    pub use crate::request::*;

    pub use axum;
    pub use axum::http::StatusCode;
    pub use axum::response::{IntoResponse, Response};
    pub use evoke_core::prelude::*;
}
