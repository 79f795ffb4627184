//! 规则链路由器
//!
//! 按注册顺序依次尝试规则，逐步把输入（URI 或接口名）归约为最终标识符，
//! 同时累积参数。参数合并遵循"先写者优先"：较早规则设置的键不会被后面的规则覆盖。
//! 遇到第一个匹配的权威（authoritative）规则时立即停止。
//!
//! 路由器从不失败：没有规则能继续归约时，原样返回当前的部分归约结果，
//! 由调用方决定未解析的标识符是否致命。

use std::fmt;

use crate::rule::{Rule, RouteParams};

/// 路由结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// 归约后的标识符
    pub result: String,

    /// 累积的参数
    pub params: RouteParams,
}

/// 规则链路由器
#[derive(Default)]
pub struct Router {
    rules: Vec<Box<dyn Rule>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加规则（注册顺序即优先级顺序）
    pub fn add_rule(&mut self, rule: impl Rule + 'static) {
        self.add_boxed_rule(Box::new(rule));
    }

    pub fn add_boxed_rule(&mut self, rule: Box<dyn Rule>) {
        tracing::trace!("Adding routing rule #{}: {}", self.rules.len(), rule.describe());
        self.rules.push(rule);
    }

    /// 构建器风格的 `add_rule`
    pub fn with_rule(mut self, rule: impl Rule + 'static) -> Self {
        self.add_rule(rule);
        self
    }

    /// 已注册的规则（按优先级顺序）
    pub fn rules(&self) -> &[Box<dyn Rule>] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 路由输入
    pub fn route(&self, input: &str) -> Route {
        let mut current = input.to_string();
        let mut params = RouteParams::new();

        for (idx, rule) in self.rules.iter().enumerate() {
            if !rule.is_match(&current) {
                continue;
            }

            for (key, value) in rule.params(&current) {
                params.entry(key).or_insert(value);
            }

            let output = rule.output(&current);
            tracing::trace!(
                "Rule #{} {} matched: '{}' -> '{}'",
                idx,
                rule.describe(),
                current,
                output
            );
            current = output;

            if rule.is_authoritative() {
                tracing::trace!("Rule #{} is authoritative, stopping", idx);
                break;
            }
        }

        tracing::debug!("Routed '{}' to '{}' with {} param(s)", input, current, params.len());

        Route {
            result: current,
            params,
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field(
                "rules",
                &self.rules.iter().map(|r| r.describe()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{RegexRule, StrReplace, TrimLeft};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// 固定参数的测试规则，记录被询问的次数
    struct FixedRule {
        needle: &'static str,
        output: &'static str,
        params: Vec<(&'static str, &'static str)>,
        authoritative: bool,
        probes: Arc<AtomicUsize>,
    }

    impl FixedRule {
        fn new(needle: &'static str, output: &'static str, authoritative: bool) -> Self {
            Self {
                needle,
                output,
                params: Vec::new(),
                authoritative,
                probes: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn with_param(mut self, key: &'static str, value: &'static str) -> Self {
            self.params.push((key, value));
            self
        }
    }

    impl Rule for FixedRule {
        fn is_match(&self, input: &str) -> bool {
            self.probes.fetch_add(1, Ordering::SeqCst);
            input.contains(self.needle)
        }

        fn output(&self, _input: &str) -> String {
            self.output.to_string()
        }

        fn params(&self, _input: &str) -> RouteParams {
            self.params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        }

        fn is_authoritative(&self) -> bool {
            self.authoritative
        }
    }

    #[test]
    fn test_empty_router_returns_input() {
        let router = Router::new();
        let route = router.route("/admin/users");

        assert_eq!(route.result, "/admin/users");
        assert!(route.params.is_empty());
    }

    #[test]
    fn test_non_matching_input_is_unchanged() {
        let router = Router::new()
            .with_rule(StrReplace::new("Controller", "Impl", false).unwrap())
            .with_rule(TrimLeft::new("/", false).unwrap());

        let route = router.route("index");
        assert_eq!(route, Route { result: "index".into(), params: RouteParams::new() });
    }

    #[test]
    fn test_first_writer_wins_on_param_collision() {
        let router = Router::new()
            .with_rule(FixedRule::new("a", "ab", false).with_param("id", "first"))
            .with_rule(
                FixedRule::new("b", "abc", false)
                    .with_param("id", "second")
                    .with_param("page", "2"),
            );

        let route = router.route("a");
        assert_eq!(route.result, "abc");
        assert_eq!(route.params.get("id").map(String::as_str), Some("first"));
        assert_eq!(route.params.get("page").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_authoritative_rule_short_circuits() {
        let later = FixedRule::new("x", "never", false).with_param("late", "1");
        let probes = Arc::clone(&later.probes);

        let router = Router::new()
            .with_rule(FixedRule::new("x", "x-stop", true))
            .with_rule(later);

        let route = router.route("x");
        assert_eq!(route.result, "x-stop");
        assert!(route.params.is_empty());
        assert_eq!(probes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_non_authoritative_rules_chain() {
        let router = Router::new()
            .with_rule(StrReplace::new("/admin", "Admin", false).unwrap())
            .with_rule(StrReplace::new("/users", "\\Users", false).unwrap());

        assert_eq!(router.route("/admin/users").result, "Admin\\Users");
    }

    #[test]
    fn test_later_rules_see_refined_input() {
        // 第二条规则只能匹配第一条规则的输出
        let router = Router::new()
            .with_rule(StrReplace::new("old", "new", false).unwrap())
            .with_rule(StrReplace::new("new", "final", false).unwrap());

        assert_eq!(router.route("old").result, "final");
    }

    #[test]
    fn test_substring_and_trim_composition() {
        let router = Router::new()
            .with_rule(StrReplace::new("Controller\\Admin", "Impl\\AdminController", true).unwrap());

        assert_eq!(
            router.route("Controller\\Admin\\Users/5").result,
            "Impl\\AdminController\\Users/5"
        );

        let trim = Router::new().with_rule(TrimLeft::new("/", false).unwrap());
        assert_eq!(trim.route("/5").result, "5");
    }

    #[test]
    fn test_router_is_reusable_across_calls() {
        let router = Router::new()
            .with_rule(RegexRule::new(r"/(?P<id>\d+)$", "", false).unwrap());

        let first = router.route("Users/5");
        let second = router.route("Users/42");
        let third = router.route("Users");

        assert_eq!(first.params.get("id").map(String::as_str), Some("5"));
        assert_eq!(second.params.get("id").map(String::as_str), Some("42"));
        assert!(third.params.is_empty());
        assert_eq!(third.result, "Users");
    }
}
