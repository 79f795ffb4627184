//! 路由配置
//!
//! 规则通常在启动时以代码方式注册；也可以从 TOML 文件加载：
//!
//! ```toml
//! [logging]
//! level = "debug"
//! format = "json"
//!
//! [[uri]]
//! kind = "str_replace"
//! match = "Controller\\Admin"
//! replacement = "Impl\\AdminController"
//! authoritative = true
//!
//! [[interface]]
//! kind = "str_replace_right"
//! match = "Iface"
//! replacement = ""
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigurationError;
use crate::logging::{LogFormat, LogLevel, LoggingConfig};
use crate::router::Router;
use crate::rule::{RegexRule, ReplaceList, Rule, StrReplace, StrReplaceRight, TrimLeft};

/// 单条规则的配置
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleConfig {
    StrReplace {
        #[serde(rename = "match")]
        pattern: String,
        replacement: String,
        #[serde(default)]
        authoritative: bool,
    },
    StrReplaceRight {
        #[serde(rename = "match")]
        pattern: String,
        replacement: String,
        #[serde(default)]
        authoritative: bool,
    },
    ReplaceList {
        pairs: Vec<(String, String)>,
        #[serde(default)]
        authoritative: bool,
    },
    TrimLeft {
        characters: String,
        #[serde(default)]
        authoritative: bool,
    },
    Regex {
        pattern: String,
        #[serde(default)]
        replacement: String,
        #[serde(default)]
        authoritative: bool,
    },
}

impl RuleConfig {
    /// 构造规则，非法值（空匹配串、非法正则等）在这里被拒绝
    pub fn build(&self) -> Result<Box<dyn Rule>, ConfigurationError> {
        let rule: Box<dyn Rule> = match self {
            RuleConfig::StrReplace {
                pattern,
                replacement,
                authoritative,
            } => Box::new(StrReplace::new(pattern.as_str(), replacement.as_str(), *authoritative)?),
            RuleConfig::StrReplaceRight {
                pattern,
                replacement,
                authoritative,
            } => Box::new(StrReplaceRight::new(
                pattern.as_str(),
                replacement.as_str(),
                *authoritative,
            )?),
            RuleConfig::ReplaceList {
                pairs,
                authoritative,
            } => Box::new(ReplaceList::new(pairs.iter().cloned(), *authoritative)?),
            RuleConfig::TrimLeft {
                characters,
                authoritative,
            } => Box::new(TrimLeft::new(characters, *authoritative)?),
            RuleConfig::Regex {
                pattern,
                replacement,
                authoritative,
            } => Box::new(RegexRule::new(pattern, replacement.as_str(), *authoritative)?),
        };
        Ok(rule)
    }
}

/// 日志配置段
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    pub level: Option<String>,
    pub format: Option<String>,
    pub filter: Option<String>,
    #[serde(default)]
    pub show_target: bool,
}

/// 路由配置文件
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    #[serde(default)]
    pub logging: Option<LoggingSection>,

    /// URI 路由规则
    #[serde(default)]
    pub uri: Vec<RuleConfig>,

    /// 接口映射规则
    #[serde(default)]
    pub interface: Vec<RuleConfig>,
}

impl RoutingConfig {
    /// 从 TOML 字符串解析
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigurationError> {
        let config: RoutingConfig = toml::from_str(content)?;
        tracing::debug!(
            "Parsed routing configuration: {} uri rule(s), {} interface rule(s)",
            config.uri.len(),
            config.interface.len()
        );
        Ok(config)
    }

    /// 从文件加载
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
            path: path.display().to_string(),
            source,
        })?;

        tracing::info!("Loading routing configuration from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// 构建 URI 路由器
    pub fn uri_router(&self) -> Result<Router, ConfigurationError> {
        build_router(&self.uri)
    }

    /// 构建接口映射规则链
    pub fn interface_rules(&self) -> Result<Router, ConfigurationError> {
        build_router(&self.interface)
    }

    /// 日志配置；未配置的项使用默认值，非法的级别或格式视为配置错误
    pub fn logging(&self) -> Result<LoggingConfig, ConfigurationError> {
        let mut config = LoggingConfig::default();
        let Some(section) = &self.logging else {
            return Ok(config);
        };

        if let Some(level) = &section.level {
            config = config.level(level.parse::<LogLevel>().map_err(ConfigurationError::Logging)?);
        }
        if let Some(format) = &section.format {
            config = config.format(format.parse::<LogFormat>().map_err(ConfigurationError::Logging)?);
        }
        if let Some(filter) = &section.filter {
            config = config.filter(filter.clone());
        }
        Ok(config.show_target(section.show_target))
    }
}

fn build_router(rules: &[RuleConfig]) -> Result<Router, ConfigurationError> {
    let mut router = Router::new();
    for rule in rules {
        router.add_boxed_rule(rule.build()?);
    }
    Ok(router)
}
