//! 请求协作者
//!
//! 前端控制器只需要请求的两样东西：用于路由的 URI，以及按质量排序的
//! `Accept` 媒体类型。

use http::header::ACCEPT;
use http::HeaderMap;

use crate::media::{parse_accept, MediaType};

/// 前端控制器看到的请求
pub trait Request {
    /// 请求路径（不含查询字符串）
    fn uri(&self) -> String;

    /// 解析后的 `Accept` 头，按 q 降序
    fn parse_accept(&self) -> Vec<MediaType>;
}

fn accept_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(ACCEPT).and_then(|value| value.to_str().ok())
}

impl Request for http::request::Parts {
    fn uri(&self) -> String {
        self.uri.path().to_string()
    }

    fn parse_accept(&self) -> Vec<MediaType> {
        parse_accept(accept_header(&self.headers))
    }
}

impl<B> Request for http::Request<B> {
    fn uri(&self) -> String {
        self.uri().path().to_string()
    }

    fn parse_accept(&self) -> Vec<MediaType> {
        parse_accept(accept_header(self.headers()))
    }
}
