// evoke-core: 规则链路由与依赖提供者
//
// 提供：
// - 规则（子串替换、后缀替换、多重替换、左侧裁剪、正则）
// - 规则链路由器（先写者优先的参数合并、权威规则短路）
// - 接口路由器（带可实例化检查的规则链）
// - 基于注册表的依赖提供者（递归构造、循环依赖检测）
// - 按字段分发的数据处理规则

pub mod class;
pub mod config;
pub mod error;
pub mod interface_router;
pub mod logging;
pub mod processing;
pub mod provider;
pub mod router;
pub mod rule;
pub mod utils;

// 重新导出常用类型
pub use class::{
    Arguments, ClassDescriptor, ClassKind, ClassRegistration, ClassRegistry, Instance,
    InstantiabilityCache, ParamDescriptor, Visibility,
};
pub use config::{RoutingConfig, RuleConfig};
pub use error::{
    ArgumentError, ConfigurationError, ProcessingError, ResolutionError, ResolutionErrorKind,
    Result,
};
pub use interface_router::InterfaceRouter;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use processing::{BlankRule, Data, DataRule, KeyOtherRule, KeyValueRule, Processing};
pub use provider::{Params, Provider};
pub use router::{Route, Router};
pub use rule::{RegexRule, ReplaceList, RouteParams, Rule, StrReplace, StrReplaceRight, TrimLeft};

// 导出 inventory，供 `ClassRegistration` 提交使用
pub use inventory;

/// Prelude 模块，包含常用的 traits 和类型
pub mod prelude {
    pub use crate::class::{ClassDescriptor, ClassRegistry, Instance, ParamDescriptor};
    pub use crate::error::{ConfigurationError, ResolutionError, ResolutionErrorKind, Result};
    pub use crate::interface_router::InterfaceRouter;
    pub use crate::provider::{Params, Provider};
    pub use crate::router::{Route, Router};
    pub use crate::rule::{RegexRule, ReplaceList, Rule, StrReplace, StrReplaceRight, TrimLeft};
    pub use anyhow::{anyhow, Context};
}
