//! 媒体类型路由
//!
//! 解析 `Accept` 请求头，并按规则把客户端可接受的媒体类型映射为输出格式
//! （例如 `text/html` -> `HTML`，`application/json` -> `JSON`）。

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// `Accept` 中的一项
#[derive(Debug, Clone, PartialEq)]
pub struct MediaType {
    pub main_type: String,
    pub sub_type: String,
    pub params: BTreeMap<String, String>,
    /// 质量因子，缺省为 1.0
    pub q: f32,
}

impl MediaType {
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            params: BTreeMap::new(),
            q: 1.0,
        }
    }

    /// 解析单个媒体范围，格式非法时返回 `None`
    pub fn parse(range: &str) -> Option<Self> {
        let mut parts = range.split(';').map(str::trim);
        let (main_type, sub_type) = parts.next()?.split_once('/')?;
        let (main_type, sub_type) = (main_type.trim(), sub_type.trim());
        if main_type.is_empty() || sub_type.is_empty() {
            return None;
        }

        let mut media = MediaType::new(main_type.to_lowercase(), sub_type.to_lowercase());
        for param in parts.filter(|p| !p.is_empty()) {
            let (key, value) = param.split_once('=')?;
            let key = key.trim().to_lowercase();
            let value = value.trim().trim_matches('"');

            if key == "q" {
                let q: f32 = value.parse().ok()?;
                if !(0.0..=1.0).contains(&q) {
                    return None;
                }
                media.q = q;
            } else {
                media.params.insert(key, value.to_string());
            }
        }

        Some(media)
    }

    fn part_matches(pattern: &str, value: &str) -> bool {
        pattern == "*" || value == "*" || pattern == value
    }

    /// 与 `main/sub` 模式（支持 `*`）是否兼容
    pub fn matches(&self, main_type: &str, sub_type: &str) -> bool {
        Self::part_matches(main_type, &self.main_type) && Self::part_matches(sub_type, &self.sub_type)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.main_type, self.sub_type)?;
        for (key, value) in &self.params {
            write!(f, ";{}={}", key, value)?;
        }
        if self.q < 1.0 {
            write!(f, ";q={}", self.q)?;
        }
        Ok(())
    }
}

/// 解析 `Accept` 头
///
/// 非法项被丢弃；结果按 q 降序排列，q 相同时保持原始顺序。
/// 缺失或为空的头等同于 `*/*`。
pub fn parse_accept(header: Option<&str>) -> Vec<MediaType> {
    let mut accepted: Vec<MediaType> = header
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|range| !range.is_empty())
        .filter_map(|range| {
            let media = MediaType::parse(range);
            if media.is_none() {
                tracing::trace!("Ignoring malformed media range '{}'", range);
            }
            media
        })
        .collect();

    if accepted.is_empty() {
        return vec![MediaType::new("*", "*")];
    }

    accepted.sort_by(|a, b| b.q.partial_cmp(&a.q).unwrap_or(Ordering::Equal));
    accepted
}

#[derive(Debug, Clone)]
struct MediaRule {
    main_type: String,
    sub_type: String,
    format: String,
}

/// 媒体类型 -> 输出格式
#[derive(Debug, Clone, Default)]
pub struct MediaRouter {
    rules: Vec<MediaRule>,
}

impl MediaRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加映射，`main_type`/`sub_type` 可以是 `*`
    pub fn with_format(
        mut self,
        main_type: impl Into<String>,
        sub_type: impl Into<String>,
        format: impl Into<String>,
    ) -> Self {
        self.rules.push(MediaRule {
            main_type: main_type.into().to_lowercase(),
            sub_type: sub_type.into().to_lowercase(),
            format: format.into(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 为质量最高的可接受项选择输出格式；q=0 的项表示不可接受，永远不会被选中
    pub fn route(&self, accepted: &[MediaType]) -> Option<String> {
        for media in accepted.iter().filter(|m| m.q > 0.0) {
            if let Some(rule) = self
                .rules
                .iter()
                .find(|rule| media.matches(&rule.main_type, &rule.sub_type))
            {
                tracing::trace!("Media type {} selected format '{}'", media, rule.format);
                return Some(rule.format.clone());
            }
        }
        None
    }
}
