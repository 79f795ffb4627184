//! 数据处理规则
//!
//! 与字符串路由规则能力相同（匹配、执行、是否权威），但输入是数据映射
//! （例如 POST/GET 字段），匹配后执行绑定的回调，用于按字段分发请求。

use std::fmt;

use serde_json::{Map, Value};

use crate::error::{ConfigurationError, ProcessingError};

/// 请求数据
pub type Data = Map<String, Value>;

type ValueCallback = Box<dyn Fn(&Value) -> anyhow::Result<()> + Send + Sync>;
type DataCallback = Box<dyn Fn(Data) -> anyhow::Result<()> + Send + Sync>;
type BlankCallback = Box<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

/// 数据规则 trait
pub trait DataRule: Send + Sync {
    fn is_match(&self, data: &Data) -> bool;

    /// 执行回调，只在 `is_match` 返回 true 后调用
    fn execute(&self, data: &Data) -> anyhow::Result<()>;

    fn is_authoritative(&self) -> bool;

    fn describe(&self) -> String;
}

fn require_key(key: &str) -> Result<(), ConfigurationError> {
    if key.is_empty() {
        return Err(ConfigurationError::InvalidRule(
            "processing key must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// 键存在时以该键的值调用回调
pub struct KeyValueRule {
    key: String,
    callback: ValueCallback,
    authoritative: bool,
}

impl KeyValueRule {
    pub fn new<F>(key: impl Into<String>, callback: F, authoritative: bool) -> Result<Self, ConfigurationError>
    where
        F: Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let key = key.into();
        require_key(&key)?;

        Ok(Self {
            key,
            callback: Box::new(callback),
            authoritative,
        })
    }
}

impl DataRule for KeyValueRule {
    fn is_match(&self, data: &Data) -> bool {
        data.contains_key(&self.key)
    }

    fn execute(&self, data: &Data) -> anyhow::Result<()> {
        match data.get(&self.key) {
            Some(value) => (self.callback)(value),
            None => Ok(()),
        }
    }

    fn is_authoritative(&self) -> bool {
        self.authoritative
    }

    fn describe(&self) -> String {
        format!("KeyValue({})", self.key)
    }
}

/// 键存在时以去掉该键之后的其余数据调用回调
///
/// 典型用法：提交按钮名决定动作，其余字段是记录内容。
pub struct KeyOtherRule {
    key: String,
    callback: DataCallback,
    authoritative: bool,
}

impl KeyOtherRule {
    pub fn new<F>(key: impl Into<String>, callback: F, authoritative: bool) -> Result<Self, ConfigurationError>
    where
        F: Fn(Data) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let key = key.into();
        require_key(&key)?;

        Ok(Self {
            key,
            callback: Box::new(callback),
            authoritative,
        })
    }
}

impl DataRule for KeyOtherRule {
    fn is_match(&self, data: &Data) -> bool {
        data.contains_key(&self.key)
    }

    fn execute(&self, data: &Data) -> anyhow::Result<()> {
        let mut others = data.clone();
        others.remove(&self.key);
        (self.callback)(others)
    }

    fn is_authoritative(&self) -> bool {
        self.authoritative
    }

    fn describe(&self) -> String {
        format!("KeyOther({})", self.key)
    }
}

/// 数据为空时调用回调
pub struct BlankRule {
    callback: BlankCallback,
    authoritative: bool,
}

impl BlankRule {
    pub fn new<F>(callback: F, authoritative: bool) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
            authoritative,
        }
    }
}

impl DataRule for BlankRule {
    fn is_match(&self, data: &Data) -> bool {
        data.is_empty()
    }

    fn execute(&self, _data: &Data) -> anyhow::Result<()> {
        (self.callback)()
    }

    fn is_authoritative(&self) -> bool {
        self.authoritative
    }

    fn describe(&self) -> String {
        "Blank".to_string()
    }
}

/// 数据处理规则链
#[derive(Default)]
pub struct Processing {
    rules: Vec<Box<dyn DataRule>>,
    match_required: bool,
}

impl Processing {
    pub fn new() -> Self {
        Self::default()
    }

    /// 没有任何规则匹配时是否视为错误
    pub fn match_required(mut self, required: bool) -> Self {
        self.match_required = required;
        self
    }

    pub fn add_rule(&mut self, rule: impl DataRule + 'static) {
        self.rules.push(Box::new(rule));
    }

    pub fn with_rule(mut self, rule: impl DataRule + 'static) -> Self {
        self.add_rule(rule);
        self
    }

    /// 依次执行所有匹配的规则，遇到权威规则后停止
    ///
    /// 返回执行的规则数量。
    pub fn process(&self, data: &Data) -> Result<usize, ProcessingError> {
        let mut executed = 0;

        for rule in &self.rules {
            if !rule.is_match(data) {
                continue;
            }

            tracing::trace!("Processing rule {} matched", rule.describe());
            rule.execute(data).map_err(ProcessingError::Callback)?;
            executed += 1;

            if rule.is_authoritative() {
                break;
            }
        }

        if executed == 0 && self.match_required {
            let keys = data.keys().cloned().collect();
            tracing::debug!("No processing rule matched");
            return Err(ProcessingError::NoMatch { keys });
        }

        Ok(executed)
    }
}

impl fmt::Debug for Processing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Processing")
            .field("rules", &self.rules.iter().map(|r| r.describe()).collect::<Vec<_>>())
            .field("match_required", &self.match_required)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;

    fn data(value: Value) -> Data {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_key_value_rule_receives_value() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);

        let processing = Processing::new().with_rule(
            KeyValueRule::new(
                "delete",
                move |value| {
                    *sink.lock() = Some(value.clone());
                    Ok(())
                },
                false,
            )
            .unwrap(),
        );

        let executed = processing.process(&data(json!({"delete": 7}))).unwrap();
        assert_eq!(executed, 1);
        assert_eq!(*seen.lock(), Some(json!(7)));
    }

    #[test]
    fn test_key_other_rule_receives_remaining_fields() {
        let seen = Arc::new(Mutex::new(Data::new()));
        let sink = Arc::clone(&seen);

        let processing = Processing::new().with_rule(
            KeyOtherRule::new(
                "add",
                move |record| {
                    *sink.lock() = record;
                    Ok(())
                },
                true,
            )
            .unwrap(),
        );

        processing
            .process(&data(json!({"add": "Add", "name": "Ann", "age": 3})))
            .unwrap();

        let record = seen.lock();
        assert_eq!(record.len(), 2);
        assert!(!record.contains_key("add"));
        assert_eq!(record.get("name"), Some(&json!("Ann")));
    }

    #[test]
    fn test_blank_rule_only_matches_empty_data() {
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);

        let processing = Processing::new().with_rule(BlankRule::new(
            move || {
                *counter.lock() += 1;
                Ok(())
            },
            false,
        ));

        assert_eq!(processing.process(&Data::new()).unwrap(), 1);
        assert_eq!(processing.process(&data(json!({"x": 1}))).unwrap(), 0);
        assert_eq!(*calls.lock(), 1);
    }

    #[test]
    fn test_authoritative_rule_stops_processing() {
        let processing = Processing::new()
            .with_rule(KeyValueRule::new("a", |_| Ok(()), true).unwrap())
            .with_rule(KeyValueRule::new("b", |_| anyhow::bail!("must not run"), false).unwrap());

        assert_eq!(processing.process(&data(json!({"a": 1, "b": 2}))).unwrap(), 1);
    }

    #[test]
    fn test_match_required() {
        let processing = Processing::new()
            .match_required(true)
            .with_rule(KeyValueRule::new("save", |_| Ok(()), false).unwrap());

        let err = processing.process(&data(json!({"other": 1}))).unwrap_err();
        assert!(matches!(err, ProcessingError::NoMatch { keys } if keys == vec!["other".to_string()]));
    }

    #[test]
    fn test_callback_error_propagates() {
        let processing = Processing::new()
            .with_rule(KeyValueRule::new("x", |_| anyhow::bail!("rejected"), false).unwrap());

        let err = processing.process(&data(json!({"x": 1}))).unwrap_err();
        assert!(matches!(err, ProcessingError::Callback(_)));
        assert!(err.to_string().contains("rejected"));
    }

    #[test]
    fn test_empty_key_is_rejected() {
        assert!(KeyValueRule::new("", |_| Ok(()), false).is_err());
        assert!(KeyOtherRule::new("", |_| Ok(()), false).is_err());
    }
}
