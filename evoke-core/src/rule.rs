//! 路由规则
//!
//! 规则是一个纯粹的匹配/变换单元：给定输入字符串，报告是否匹配、
//! 产生变换后的输出、抽取（可能为空的）参数，以及匹配后是否终止后续规则。
//!
//! 所有方法都显式接收输入，规则本身在构造之后不可变，
//! 因此同一个规则实例可以在多次（甚至并发的）路由调用之间安全复用。

use std::collections::BTreeMap;

use regex::Regex;

use crate::error::ConfigurationError;

/// 路由参数：参数名 -> 字符串值
pub type RouteParams = BTreeMap<String, String>;

/// 规则 trait
///
/// `output` 和 `params` 只会在 `is_match` 对同一输入返回 true 之后被调用。
pub trait Rule: Send + Sync {
    /// 输入是否匹配此规则（无副作用）
    fn is_match(&self, input: &str) -> bool;

    /// 变换后的输出
    fn output(&self, input: &str) -> String;

    /// 抽取的参数，默认没有参数
    fn params(&self, _input: &str) -> RouteParams {
        RouteParams::new()
    }

    /// 匹配后是否停止处理后续规则
    fn is_authoritative(&self) -> bool;

    /// 用于日志的规则描述
    fn describe(&self) -> String {
        std::any::type_name::<Self>()
            .rsplit("::")
            .next()
            .unwrap_or("Rule")
            .to_string()
    }
}

fn require_non_empty(value: &str, what: &str) -> Result<(), ConfigurationError> {
    if value.is_empty() {
        return Err(ConfigurationError::InvalidRule(format!(
            "{} must not be empty",
            what
        )));
    }
    Ok(())
}

/// 子串替换规则
///
/// 输入中任意位置出现 `pattern` 即匹配，输出将所有出现替换为 `replacement`。
#[derive(Debug, Clone)]
pub struct StrReplace {
    pattern: String,
    replacement: String,
    authoritative: bool,
}

impl StrReplace {
    pub fn new(
        pattern: impl Into<String>,
        replacement: impl Into<String>,
        authoritative: bool,
    ) -> Result<Self, ConfigurationError> {
        let pattern = pattern.into();
        require_non_empty(&pattern, "str_replace match")?;

        Ok(Self {
            pattern,
            replacement: replacement.into(),
            authoritative,
        })
    }
}

impl Rule for StrReplace {
    fn is_match(&self, input: &str) -> bool {
        input.contains(&self.pattern)
    }

    fn output(&self, input: &str) -> String {
        input.replace(&self.pattern, &self.replacement)
    }

    fn is_authoritative(&self) -> bool {
        self.authoritative
    }

    fn describe(&self) -> String {
        format!("StrReplace({:?} -> {:?})", self.pattern, self.replacement)
    }
}

/// 后缀替换规则
///
/// 仅当输入以 `pattern` 结尾时匹配，只替换该后缀。
/// 典型用法是把 `Foo\BarIface` 映射为 `Foo\Bar`。
#[derive(Debug, Clone)]
pub struct StrReplaceRight {
    pattern: String,
    replacement: String,
    authoritative: bool,
}

impl StrReplaceRight {
    pub fn new(
        pattern: impl Into<String>,
        replacement: impl Into<String>,
        authoritative: bool,
    ) -> Result<Self, ConfigurationError> {
        let pattern = pattern.into();
        require_non_empty(&pattern, "str_replace_right match")?;

        Ok(Self {
            pattern,
            replacement: replacement.into(),
            authoritative,
        })
    }
}

impl Rule for StrReplaceRight {
    fn is_match(&self, input: &str) -> bool {
        input.ends_with(&self.pattern)
    }

    fn output(&self, input: &str) -> String {
        match input.strip_suffix(&self.pattern) {
            Some(stem) => format!("{}{}", stem, self.replacement),
            None => input.to_string(),
        }
    }

    fn is_authoritative(&self) -> bool {
        self.authoritative
    }

    fn describe(&self) -> String {
        format!(
            "StrReplaceRight({:?} -> {:?})",
            self.pattern, self.replacement
        )
    }
}

/// 多重替换规则
///
/// 任意一对的匹配串出现即匹配；输出按列表顺序依次应用所有替换，
/// 后面的替换作用于前面替换的结果之上。
#[derive(Debug, Clone)]
pub struct ReplaceList {
    pairs: Vec<(String, String)>,
    authoritative: bool,
}

impl ReplaceList {
    pub fn new<I, M, R>(pairs: I, authoritative: bool) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = (M, R)>,
        M: Into<String>,
        R: Into<String>,
    {
        let pairs: Vec<(String, String)> = pairs
            .into_iter()
            .map(|(m, r)| (m.into(), r.into()))
            .collect();

        if pairs.is_empty() {
            return Err(ConfigurationError::InvalidRule(
                "replace_list requires at least one pair".to_string(),
            ));
        }
        for (pattern, _) in &pairs {
            require_non_empty(pattern, "replace_list match")?;
        }

        Ok(Self {
            pairs,
            authoritative,
        })
    }
}

impl Rule for ReplaceList {
    fn is_match(&self, input: &str) -> bool {
        self.pairs.iter().any(|(pattern, _)| input.contains(pattern))
    }

    fn output(&self, input: &str) -> String {
        self.pairs
            .iter()
            .fold(input.to_string(), |acc, (pattern, replacement)| {
                acc.replace(pattern, replacement)
            })
    }

    fn is_authoritative(&self) -> bool {
        self.authoritative
    }

    fn describe(&self) -> String {
        format!("ReplaceList({} pairs)", self.pairs.len())
    }
}

/// 左侧裁剪规则
///
/// 输入首字符属于字符集时匹配，输出去掉所有属于字符集的前导字符。
#[derive(Debug, Clone)]
pub struct TrimLeft {
    characters: Vec<char>,
    authoritative: bool,
}

impl TrimLeft {
    pub fn new(characters: &str, authoritative: bool) -> Result<Self, ConfigurationError> {
        require_non_empty(characters, "trim_left character set")?;

        Ok(Self {
            characters: characters.chars().collect(),
            authoritative,
        })
    }
}

impl Rule for TrimLeft {
    fn is_match(&self, input: &str) -> bool {
        input
            .chars()
            .next()
            .is_some_and(|first| self.characters.contains(&first))
    }

    fn output(&self, input: &str) -> String {
        input
            .trim_start_matches(|c: char| self.characters.contains(&c))
            .to_string()
    }

    fn is_authoritative(&self) -> bool {
        self.authoritative
    }

    fn describe(&self) -> String {
        format!(
            "TrimLeft({:?})",
            self.characters.iter().collect::<String>()
        )
    }
}

/// 正则规则
///
/// 正则匹配时命中；输出替换第一个匹配（`replacement` 支持 `$name` 展开），
/// 参数为参与匹配的具名捕获组。
#[derive(Debug, Clone)]
pub struct RegexRule {
    regex: Regex,
    replacement: String,
    authoritative: bool,
}

impl RegexRule {
    pub fn new(
        pattern: &str,
        replacement: impl Into<String>,
        authoritative: bool,
    ) -> Result<Self, ConfigurationError> {
        require_non_empty(pattern, "regex pattern")?;
        let regex = Regex::new(pattern).map_err(|source| ConfigurationError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        Ok(Self {
            regex,
            replacement: replacement.into(),
            authoritative,
        })
    }
}

impl Rule for RegexRule {
    fn is_match(&self, input: &str) -> bool {
        self.regex.is_match(input)
    }

    fn output(&self, input: &str) -> String {
        self.regex
            .replace(input, self.replacement.as_str())
            .into_owned()
    }

    fn params(&self, input: &str) -> RouteParams {
        let mut params = RouteParams::new();
        if let Some(captures) = self.regex.captures(input) {
            for name in self.regex.capture_names().flatten() {
                if let Some(value) = captures.name(name) {
                    params.insert(name.to_string(), value.as_str().to_string());
                }
            }
        }
        params
    }

    fn is_authoritative(&self) -> bool {
        self.authoritative
    }

    fn describe(&self) -> String {
        format!("Regex({})", self.regex.as_str())
    }
}
