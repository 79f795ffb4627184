//! 接口路由器
//!
//! 把接口/抽象类型名映射为可实例化的具体类名。
//! 规则链的走法与 URI 路由相同，区别在于每次匹配产生的候选类名
//! 必须通过可实例化检查才会被采用。

use std::sync::Arc;

use crate::class::InstantiabilityCache;
use crate::router::Router;
use crate::rule::Rule;
use crate::utils::naming;

pub struct InterfaceRouter {
    rules: Router,
    cache: Arc<InstantiabilityCache>,
}

impl InterfaceRouter {
    pub fn new(cache: Arc<InstantiabilityCache>) -> Self {
        Self {
            rules: Router::new(),
            cache,
        }
    }

    /// 使用已有的规则链
    pub fn with_router(cache: Arc<InstantiabilityCache>, rules: Router) -> Self {
        Self { rules, cache }
    }

    pub fn add_rule(&mut self, rule: impl Rule + 'static) {
        self.rules.add_rule(rule);
    }

    pub fn add_boxed_rule(&mut self, rule: Box<dyn Rule>) {
        self.rules.add_boxed_rule(rule);
    }

    pub fn rules(&self) -> &Router {
        &self.rules
    }

    /// 查找接口的具体实现
    ///
    /// 与 [`Router::route`] 一样沿规则链逐步改写接口名，每次匹配后检查当前结果：
    /// 第一个可实例化的候选即为结果；不可实例化的候选继续交给后面的规则；
    /// 权威规则匹配后停止。没有结果时返回 `None`，由调用方决定是否致命。
    pub fn route(&self, interface: &str) -> Option<String> {
        let interface = naming::normalize(interface);
        let mut current = interface.to_string();

        for (idx, rule) in self.rules.rules().iter().enumerate() {
            if !rule.is_match(&current) {
                continue;
            }

            current = naming::normalize(&rule.output(&current)).to_string();
            if self.cache.is_instantiable(&current) {
                tracing::debug!(
                    "Interface '{}' resolved to '{}' by rule #{}",
                    interface,
                    current,
                    idx
                );
                return Some(current);
            }

            tracing::trace!(
                "Rule #{} {} produced non-instantiable candidate '{}' for '{}'",
                idx,
                rule.describe(),
                current,
                interface
            );

            if rule.is_authoritative() {
                break;
            }
        }

        tracing::debug!("No instantiable implementation found for '{}'", interface);
        None
    }
}

impl std::fmt::Debug for InterfaceRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterfaceRouter")
            .field("rules", &self.rules)
            .finish()
    }
}
