//! 错误类型
//!
//! 路由本身从不失败（无法完全归约的输入原样返回），因此这里只有三类错误：
//! - [`ConfigurationError`]：规则、注册表或配置文件在构造时不合法
//! - [`ResolutionError`]：Provider 无法满足某个构造参数
//! - [`ProcessingError`]：数据处理规则链执行失败
//!
//! 用户提供的构造函数和回调返回 `anyhow::Result`，通过 `.context()` 附加上下文。

use std::fmt;
use thiserror::Error;

/// 统一的 anyhow Result，用于构造函数闭包和处理回调
pub use anyhow::Result;

/// 构造期配置错误
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("invalid rule configuration: {0}")]
    InvalidRule(String),

    #[error("invalid regex pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("class '{0}' is already registered")]
    DuplicateClass(String),

    #[error("failed to read configuration file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

/// Provider 解析失败的具体原因
#[derive(Debug, Error)]
pub enum ResolutionErrorKind {
    /// 目标类不存在于注册表（对应反射失败）
    #[error("class '{0}' is not registered")]
    UnknownClass(String),

    #[error("class '{0}' is not instantiable")]
    NotInstantiable(String),

    #[error("cannot resolve parameter '{param}' of '{class}'")]
    UnresolvedParameter { param: String, class: String },

    #[error("no instantiable implementation of '{interface}' found for '{class}'")]
    UnresolvedInterface { interface: String, class: String },

    #[error("circular dependency detected: {}", .0.join(" -> "))]
    CircularDependency(Vec<String>),

    #[error("argument '{param}' of '{class}' is not of type {expected}")]
    ArgumentType {
        param: String,
        class: String,
        expected: &'static str,
    },

    #[error("constructor of '{class}' failed: {source}")]
    Construction {
        class: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Provider 的统一错误
///
/// `chain` 记录出错时正在构造的类名链（从最外层的 `make` 目标开始），
/// 用于定位是哪一个依赖无法满足。
#[derive(Debug, Error)]
#[error("{kind}{}", ChainSuffix(.chain))]
pub struct ResolutionError {
    kind: ResolutionErrorKind,
    chain: Vec<String>,
}

impl ResolutionError {
    pub fn new(kind: ResolutionErrorKind, chain: Vec<String>) -> Self {
        Self { kind, chain }
    }

    pub fn kind(&self) -> &ResolutionErrorKind {
        &self.kind
    }

    /// 出错时的解析链
    pub fn chain(&self) -> &[String] {
        &self.chain
    }
}

struct ChainSuffix<'a>(&'a [String]);

impl fmt::Display for ChainSuffix<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            Ok(())
        } else {
            write!(f, " (while resolving {})", self.0.join(" -> "))
        }
    }
}

/// 构造函数读取已解析参数时的错误
///
/// 由 [`Arguments`](crate::class::Arguments) 返回；Provider 会把它转换为
/// [`ResolutionErrorKind::ArgumentType`]。
#[derive(Debug, Error)]
pub enum ArgumentError {
    #[error("argument '{0}' was not declared")]
    Undeclared(String),

    #[error("argument '{param}' is not of type {expected}")]
    Type {
        param: String,
        expected: &'static str,
    },
}

/// 数据处理错误
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("no processing rule matched keys [{}]", .keys.join(", "))]
    NoMatch { keys: Vec<String> },

    #[error("processing callback failed: {0}")]
    Callback(#[source] anyhow::Error),
}
