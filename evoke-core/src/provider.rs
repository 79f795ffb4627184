//! 依赖提供者（Provider）
//!
//! `make(classname, params)` 按构造参数的声明顺序深度优先地解析并构造整个依赖图：
//!
//! 1. 参数袋中存在同名参数时直接使用
//! 2. 声明类型为可实例化的具体类时递归构造
//! 3. 声明类型为接口或抽象类（或未注册的类型）时经接口路由找到具体类后递归构造
//! 4. 参数有默认值时使用默认值
//! 5. 否则失败
//!
//! 同一个参数袋在整棵子树中共享，查找仅按参数名进行，与所在位置无关。
//! 任何解析错误都会中止整个 `make` 调用，不会返回部分构造的对象图。

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::class::{Arguments, ClassDescriptor, ClassKind, ClassRegistry, Instance, InstantiabilityCache};
use crate::error::{ArgumentError, ResolutionError, ResolutionErrorKind};
use crate::interface_router::InterfaceRouter;
use crate::router::Router;
use crate::rule::RouteParams;
use crate::utils::dependency::{find_cycle, ResolutionStack};
use crate::utils::naming;

/// 参数袋：参数名 -> 已构造的值
#[derive(Clone, Default)]
pub struct Params {
    values: HashMap<String, Instance>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// 构建器风格的 `insert`
    pub fn with<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) {
        self.values.insert(name.into(), Arc::new(value));
    }

    /// 插入已经共享的实例（例如已构造好的 Response 对象）
    pub fn insert_instance(&mut self, name: impl Into<String>, value: Instance) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Instance> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// 路由参数以 `String` 值进入参数袋
impl From<RouteParams> for Params {
    fn from(route_params: RouteParams) -> Self {
        let mut params = Params::new();
        for (name, value) in route_params {
            params.insert(name, value);
        }
        params
    }
}

impl fmt::Debug for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.values.keys().collect();
        names.sort();
        f.debug_struct("Params").field("names", &names).finish()
    }
}

/// 依赖提供者
pub struct Provider {
    registry: Arc<ClassRegistry>,
    cache: Arc<InstantiabilityCache>,
    interfaces: InterfaceRouter,
}

impl Provider {
    /// 创建没有接口规则的 Provider
    pub fn new(registry: Arc<ClassRegistry>) -> Self {
        Self::with_rules(registry, Router::new())
    }

    /// 使用给定的接口映射规则创建 Provider
    pub fn with_rules(registry: Arc<ClassRegistry>, interface_rules: Router) -> Self {
        let cache = Arc::new(InstantiabilityCache::new(Arc::clone(&registry)));
        let interfaces = InterfaceRouter::with_router(Arc::clone(&cache), interface_rules);

        Self {
            registry,
            cache,
            interfaces,
        }
    }

    pub fn registry(&self) -> &Arc<ClassRegistry> {
        &self.registry
    }

    pub fn interface_router(&self) -> &InterfaceRouter {
        &self.interfaces
    }

    /// 类是否可实例化（带缓存）
    pub fn is_instantiable(&self, name: &str) -> bool {
        self.cache.is_instantiable(name)
    }

    /// 构造类及其完整依赖图
    pub fn make(&self, classname: &str, params: &Params) -> Result<Instance, ResolutionError> {
        let mut stack = ResolutionStack::new();
        let instance = self.make_in(naming::normalize(classname), params, &mut stack)?;
        tracing::debug!("Made '{}'", naming::normalize(classname));
        Ok(instance)
    }

    /// `make` 并转换为具体类型
    pub fn make_as<T: Any + Send + Sync>(
        &self,
        classname: &str,
        params: &Params,
    ) -> Result<Arc<T>, ResolutionError> {
        let classname = naming::normalize(classname);
        self.make(classname, params)?.downcast::<T>().map_err(|_| {
            ResolutionError::new(
                ResolutionErrorKind::ArgumentType {
                    param: "<result>".to_string(),
                    class: classname.to_string(),
                    expected: std::any::type_name::<T>(),
                },
                vec![classname.to_string()],
            )
        })
    }

    fn make_in(
        &self,
        classname: &str,
        params: &Params,
        stack: &mut ResolutionStack,
    ) -> Result<Instance, ResolutionError> {
        if stack.contains(classname) {
            let cycle = stack.cycle_through(classname);
            tracing::error!("Circular dependency detected: {}", cycle.join(" -> "));
            return Err(ResolutionError::new(
                ResolutionErrorKind::CircularDependency(cycle),
                stack.chain(),
            ));
        }

        let class = self.registry.get(classname).ok_or_else(|| {
            ResolutionError::new(
                ResolutionErrorKind::UnknownClass(classname.to_string()),
                with_frame(stack, classname),
            )
        })?;

        let constructor = match class.constructor() {
            Some(constructor) if class.is_instantiable() => Arc::clone(constructor),
            _ => {
                return Err(ResolutionError::new(
                    ResolutionErrorKind::NotInstantiable(classname.to_string()),
                    with_frame(stack, classname),
                ))
            }
        };

        stack.enter(classname);
        let result = self
            .resolve_arguments(class, params, stack)
            .and_then(|arguments| {
                tracing::trace!("Constructing '{}' with {} argument(s)", classname, arguments.len());
                constructor(&arguments).map_err(|e| construction_error(classname, e, stack))
            });
        stack.leave();

        result
    }

    fn resolve_arguments(
        &self,
        class: &ClassDescriptor,
        params: &Params,
        stack: &mut ResolutionStack,
    ) -> Result<Arguments, ResolutionError> {
        let mut values = Vec::with_capacity(class.params().len());

        for param in class.params() {
            let value = self.resolve_parameter(class, param.name(), param.declared_type(), params, stack)?;
            let value = match value {
                Some(value) => value,
                None => match param.default_value() {
                    Some(default) => {
                        tracing::trace!("Using default for '{}' of '{}'", param.name(), class.name());
                        Arc::clone(default)
                    }
                    None => {
                        return Err(ResolutionError::new(
                            ResolutionErrorKind::UnresolvedParameter {
                                param: param.name().to_string(),
                                class: class.name().to_string(),
                            },
                            stack.chain(),
                        ))
                    }
                },
            };
            values.push((param.name().to_string(), value));
        }

        Ok(Arguments::new(values))
    }

    /// 解析单个参数；`Ok(None)` 表示应回退到默认值
    fn resolve_parameter(
        &self,
        class: &ClassDescriptor,
        name: &str,
        declared_type: Option<&str>,
        params: &Params,
        stack: &mut ResolutionStack,
    ) -> Result<Option<Instance>, ResolutionError> {
        if let Some(known) = params.get(name) {
            tracing::trace!("Parameter '{}' of '{}' supplied by caller", name, class.name());
            return Ok(Some(Arc::clone(known)));
        }

        let Some(declared_type) = declared_type else {
            return Ok(None);
        };

        if self.cache.is_instantiable(declared_type) {
            tracing::trace!("Parameter '{}' of '{}' built from '{}'", name, class.name(), declared_type);
            return self.make_in(declared_type, params, stack).map(Some);
        }

        // 已注册的接口/抽象类必须能路由到实现；未注册的类型（可能是从未登记的接口）
        // 也先尝试接口路由，路由不到时按标量处理
        let registered = self.registry.get(declared_type);
        let routable = registered
            .map_or(true, |target| matches!(target.kind(), ClassKind::Interface | ClassKind::Abstract));
        if !routable {
            return Ok(None);
        }

        match self.interfaces.route(declared_type) {
            Some(concrete) => {
                tracing::trace!(
                    "Parameter '{}' of '{}' built from '{}' for '{}'",
                    name,
                    class.name(),
                    concrete,
                    declared_type
                );
                self.make_in(&concrete, params, stack).map(Some)
            }
            None if registered.is_some() => Err(ResolutionError::new(
                ResolutionErrorKind::UnresolvedInterface {
                    interface: declared_type.to_string(),
                    class: class.name().to_string(),
                },
                stack.chain(),
            )),
            // 标量或未注册的类型：交给默认值处理
            None => Ok(None),
        }
    }

    /// 静态检查注册表中由类型声明构成的依赖图是否有环
    ///
    /// 接口类型按当前接口规则解析；无法解析的边被忽略（运行时可能由参数袋提供）。
    pub fn validate(&self) -> Result<(), ResolutionError> {
        let mut graph: HashMap<String, Vec<String>> = HashMap::new();

        for class in self.registry.iter().filter(|c| c.is_instantiable()) {
            let deps = class
                .params()
                .iter()
                .filter_map(|param| param.declared_type())
                .filter_map(|ty| {
                    if self.cache.is_instantiable(ty) {
                        Some(ty.to_string())
                    } else {
                        self.interfaces.route(ty)
                    }
                })
                .collect();
            graph.insert(class.name().to_string(), deps);
        }

        if let Some(cycle) = find_cycle(&graph) {
            return Err(ResolutionError::new(
                ResolutionErrorKind::CircularDependency(cycle),
                Vec::new(),
            ));
        }

        tracing::info!("Dependency validation passed for {} class(es)", graph.len());
        Ok(())
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("registry", &self.registry)
            .field("interfaces", &self.interfaces)
            .finish()
    }
}

fn with_frame(stack: &ResolutionStack, classname: &str) -> Vec<String> {
    let mut chain = stack.chain();
    chain.push(classname.to_string());
    chain
}

fn construction_error(
    classname: &str,
    error: anyhow::Error,
    stack: &ResolutionStack,
) -> ResolutionError {
    let kind = match error.downcast::<ArgumentError>() {
        Ok(ArgumentError::Type { param, expected }) => ResolutionErrorKind::ArgumentType {
            param,
            class: classname.to_string(),
            expected,
        },
        Ok(other) => ResolutionErrorKind::Construction {
            class: classname.to_string(),
            source: other.into(),
        },
        Err(source) => ResolutionErrorKind::Construction {
            class: classname.to_string(),
            source,
        },
    };

    ResolutionError::new(kind, stack.chain())
}
