//! 类注册表
//!
//! 用显式的注册表代替运行时反射：启动时为每个类名登记构造参数描述和构造函数，
//! Provider 通过注册表查询参数元数据以及类是否可实例化。
//!
//! 注册表在共享给 Provider 之后即被冻结（`Arc<ClassRegistry>` 只读），
//! 因此可实例化判断的缓存永远不会过期。

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{ArgumentError, ConfigurationError};
use crate::utils::naming;

/// 已构造的对象、标量或数组
pub type Instance = Arc<dyn Any + Send + Sync>;

/// 构造函数
pub type Constructor = Arc<dyn Fn(&Arguments) -> anyhow::Result<Instance> + Send + Sync>;

/// 类的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Concrete,
    Interface,
    Abstract,
}

/// 构造函数可见性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// 构造参数描述
#[derive(Clone)]
pub struct ParamDescriptor {
    name: String,
    declared_type: Option<String>,
    default: Option<Instance>,
}

impl ParamDescriptor {
    /// 无类型声明的参数
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: None,
            default: None,
        }
    }

    /// 声明了类型（类名或接口名）的参数
    ///
    /// 未注册的类型名会先交给接口路由；路由不到时按标量处理，回退到默认值。
    pub fn typed(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: Some(naming::normalize(&declared_type.into()).to_string()),
            default: None,
        }
    }

    /// 设置默认值
    pub fn with_default<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.default = Some(Arc::new(value));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_type(&self) -> Option<&str> {
        self.declared_type.as_deref()
    }

    pub fn default_value(&self) -> Option<&Instance> {
        self.default.as_ref()
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

impl fmt::Debug for ParamDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamDescriptor")
            .field("name", &self.name)
            .field("declared_type", &self.declared_type)
            .field("has_default", &self.has_default())
            .finish()
    }
}

/// 类描述
#[derive(Clone)]
pub struct ClassDescriptor {
    name: String,
    kind: ClassKind,
    visibility: Visibility,
    params: Vec<ParamDescriptor>,
    constructor: Option<Constructor>,
}

impl ClassDescriptor {
    /// 具体类
    ///
    /// # 示例
    ///
    /// ```
    /// use evoke_core::class::{ClassDescriptor, ParamDescriptor};
    ///
    /// struct Counter {
    ///     start: i64,
    /// }
    ///
    /// let class = ClassDescriptor::concrete("App\\Counter", |args| {
    ///     Ok(Counter { start: args.value::<i64>("start")? })
    /// })
    /// .param(ParamDescriptor::typed("start", "int").with_default(9_i64));
    ///
    /// assert_eq!(class.params().len(), 1);
    /// ```
    pub fn concrete<T, F>(name: impl Into<String>, build: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Arguments) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let constructor: Constructor = Arc::new(move |args: &Arguments| {
            let instance = build(args)?;
            Ok(Arc::new(instance) as Instance)
        });

        Self {
            name: naming::normalize(&name.into()).to_string(),
            kind: ClassKind::Concrete,
            visibility: Visibility::Public,
            params: Vec::new(),
            constructor: Some(constructor),
        }
    }

    /// 接口（不可实例化，需经接口路由映射到具体类）
    pub fn interface(name: impl Into<String>) -> Self {
        Self::without_constructor(name, ClassKind::Interface)
    }

    /// 抽象类（不可实例化）
    pub fn abstract_class(name: impl Into<String>) -> Self {
        Self::without_constructor(name, ClassKind::Abstract)
    }

    fn without_constructor(name: impl Into<String>, kind: ClassKind) -> Self {
        Self {
            name: naming::normalize(&name.into()).to_string(),
            kind,
            visibility: Visibility::Public,
            params: Vec::new(),
            constructor: None,
        }
    }

    /// 追加构造参数（声明顺序即构造顺序）
    pub fn param(mut self, param: ParamDescriptor) -> Self {
        self.params.push(param);
        self
    }

    /// 构造函数不可公开访问
    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn params(&self) -> &[ParamDescriptor] {
        &self.params
    }

    pub fn constructor(&self) -> Option<&Constructor> {
        self.constructor.as_ref()
    }

    /// 具体类且构造函数公开
    pub fn is_instantiable(&self) -> bool {
        self.kind == ClassKind::Concrete
            && self.visibility == Visibility::Public
            && self.constructor.is_some()
    }
}

impl fmt::Debug for ClassDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("visibility", &self.visibility)
            .field("params", &self.params)
            .finish()
    }
}

/// 传给构造函数的已解析参数（按声明顺序）
pub struct Arguments {
    values: Vec<(String, Instance)>,
}

impl Arguments {
    pub(crate) fn new(values: Vec<(String, Instance)>) -> Self {
        Self { values }
    }

    /// 按名称取共享引用
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, ArgumentError> {
        let value = self
            .values
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, value)| Arc::clone(value))
            .ok_or_else(|| ArgumentError::Undeclared(name.to_string()))?;

        value.downcast::<T>().map_err(|_| ArgumentError::Type {
            param: name.to_string(),
            expected: type_name::<T>(),
        })
    }

    /// 按名称取克隆值，适合标量和配置值
    pub fn value<T: Any + Send + Sync + Clone>(&self, name: &str) -> Result<T, ArgumentError> {
        self.get::<T>(name).map(|value| T::clone(&value))
    }

    /// 按位置取原始实例
    pub fn at(&self, index: usize) -> Option<&Instance> {
        self.values.get(index).map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// 编译期类注册项，通过 `inventory::submit!` 提交
///
/// ```ignore
/// evoke_core::inventory::submit! {
///     evoke_core::ClassRegistration {
///         name: "App\\Clock",
///         describe: || ClassDescriptor::concrete("App\\Clock", |_| Ok(Clock)),
///     }
/// }
/// ```
pub struct ClassRegistration {
    pub name: &'static str,
    pub describe: fn() -> ClassDescriptor,
}

inventory::collect!(ClassRegistration);

/// 类注册表
#[derive(Default)]
pub struct ClassRegistry {
    classes: HashMap<String, ClassDescriptor>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 收集所有通过 `inventory` 提交的类
    pub fn from_inventory() -> Result<Self, ConfigurationError> {
        let registry = Self::collect(inventory::iter::<ClassRegistration>)?;
        tracing::info!("Collected {} class registration(s)", registry.len());
        Ok(registry)
    }

    /// 注册项的 `name` 必须与 `describe()` 返回的类名一致
    fn collect<'a>(
        registrations: impl IntoIterator<Item = &'a ClassRegistration>,
    ) -> Result<Self, ConfigurationError> {
        let mut registry = Self::new();
        for registration in registrations {
            tracing::trace!("Collecting class registration '{}'", registration.name);
            let class = (registration.describe)();
            if naming::normalize(registration.name) != class.name() {
                return Err(ConfigurationError::InvalidRule(format!(
                    "class registration '{}' describes class '{}'",
                    registration.name,
                    class.name()
                )));
            }
            registry.register(class)?;
        }
        Ok(registry)
    }

    /// 注册类描述，重复的类名会被拒绝
    pub fn register(&mut self, class: ClassDescriptor) -> Result<(), ConfigurationError> {
        if self.classes.contains_key(class.name()) {
            tracing::warn!("Class '{}' already registered, registration failed", class.name());
            return Err(ConfigurationError::DuplicateClass(class.name().to_string()));
        }

        tracing::debug!(
            "Registered class '{}' ({:?}, {} param(s))",
            class.name(),
            class.kind(),
            class.params().len()
        );
        self.classes.insert(class.name().to_string(), class);
        Ok(())
    }

    /// 构建器风格的 `register`
    pub fn with_class(mut self, class: ClassDescriptor) -> Result<Self, ConfigurationError> {
        self.register(class)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&ClassDescriptor> {
        self.classes.get(naming::normalize(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// 类存在、为具体类且构造函数公开
    pub fn is_instantiable(&self, name: &str) -> bool {
        self.get(name).is_some_and(ClassDescriptor::is_instantiable)
    }

    /// 所有类名（排序后）
    pub fn class_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.classes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassDescriptor> {
        self.classes.values()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassRegistry")
            .field("classes", &self.class_names())
            .finish()
    }
}

/// 可实例化判断的缓存
///
/// 进程级、惰性填充、从不失效：注册表共享之后不再变化。
pub struct InstantiabilityCache {
    registry: Arc<ClassRegistry>,
    known: RwLock<HashMap<String, bool>>,
}

impl InstantiabilityCache {
    pub fn new(registry: Arc<ClassRegistry>) -> Self {
        Self {
            registry,
            known: RwLock::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<ClassRegistry> {
        &self.registry
    }

    pub fn is_instantiable(&self, name: &str) -> bool {
        let name = naming::normalize(name);

        if let Some(&cached) = self.known.read().get(name) {
            return cached;
        }

        let instantiable = self.registry.is_instantiable(name);
        self.known.write().insert(name.to_string(), instantiable);
        tracing::trace!("Cached instantiability of '{}': {}", name, instantiable);
        instantiable
    }

    /// 已缓存的条目数
    pub fn len(&self) -> usize {
        self.known.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.read().is_empty()
    }
}

impl fmt::Debug for InstantiabilityCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstantiabilityCache")
            .field("cached", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Clock;

    fn registry() -> ClassRegistry {
        ClassRegistry::new()
            .with_class(ClassDescriptor::concrete("App\\Clock", |_| Ok(Clock)))
            .unwrap()
            .with_class(ClassDescriptor::interface("App\\ClockIface"))
            .unwrap()
            .with_class(ClassDescriptor::abstract_class("App\\BaseClock"))
            .unwrap()
            .with_class(ClassDescriptor::concrete("App\\Singleton", |_| Ok(Clock)).private())
            .unwrap()
    }

    #[test]
    fn test_instantiability() {
        let registry = registry();

        assert!(registry.is_instantiable("App\\Clock"));
        assert!(registry.is_instantiable("\\App\\Clock"));
        assert!(!registry.is_instantiable("App\\ClockIface"));
        assert!(!registry.is_instantiable("App\\BaseClock"));
        assert!(!registry.is_instantiable("App\\Singleton"));
        assert!(!registry.is_instantiable("App\\Missing"));
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut registry = registry();
        let result = registry.register(ClassDescriptor::interface("\\App\\Clock"));

        assert!(matches!(result, Err(ConfigurationError::DuplicateClass(name)) if name == "App\\Clock"));
    }

    #[test]
    fn test_class_names_sorted() {
        assert_eq!(
            registry().class_names(),
            vec!["App\\BaseClock", "App\\Clock", "App\\ClockIface", "App\\Singleton"]
        );
    }

    #[test]
    fn test_cache_memoizes() {
        let cache = InstantiabilityCache::new(Arc::new(registry()));

        assert!(cache.is_empty());
        assert!(cache.is_instantiable("App\\Clock"));
        assert!(cache.is_instantiable("\\App\\Clock"));
        assert!(!cache.is_instantiable("App\\ClockIface"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_arguments_typed_access() {
        let args = Arguments::new(vec![
            ("x".to_string(), Arc::new(5_i64) as Instance),
            ("name".to_string(), Arc::new("users".to_string()) as Instance),
        ]);

        assert_eq!(args.value::<i64>("x").unwrap(), 5);
        assert_eq!(*args.get::<String>("name").unwrap(), "users");
        assert!(matches!(args.value::<u8>("x"), Err(ArgumentError::Type { .. })));
        assert!(matches!(args.get::<i64>("y"), Err(ArgumentError::Undeclared(_))));
        assert_eq!(args.len(), 2);
        assert!(args.at(1).is_some());
    }

    fn describe_clock() -> ClassDescriptor {
        ClassDescriptor::concrete("App\\Clock", |_| Ok(Clock))
    }

    #[test]
    fn test_collect_registrations() {
        let registrations = [ClassRegistration {
            name: "\\App\\Clock",
            describe: describe_clock,
        }];

        let registry = ClassRegistry::collect(&registrations).unwrap();
        assert!(registry.is_instantiable("App\\Clock"));
    }

    #[test]
    fn test_registration_name_must_match_descriptor() {
        let registrations = [ClassRegistration {
            name: "App\\Timer",
            describe: describe_clock,
        }];

        let result = ClassRegistry::collect(&registrations);
        assert!(matches!(result, Err(ConfigurationError::InvalidRule(msg)) if msg.contains("App\\Timer")));
    }

    #[test]
    fn test_typed_param_is_normalized() {
        let param = ParamDescriptor::typed("clock", "\\App\\ClockIface").with_default(1_u8);
        assert_eq!(param.declared_type(), Some("App\\ClockIface"));
        assert!(param.has_default());
    }
}
