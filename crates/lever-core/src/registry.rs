//! # HandlerRegistry：显式方法表
//!
//! ## 核心意图（Why）
//! - 服务端必须按名字在运行期发现一组开放式方法，而调用方与被调方不共享
//!   编译产物；这里不用运行期反射，而是在注册期构造“方法名 → 类型化
//!   invoker 闭包”的显式方法表，每个闭包捕获自身签名的参数解码与结果
//!   编码逻辑；
//! - 注册表以依赖注入的方式交给 Server Endpoint（而非进程级隐式全局），
//!   测试可以在同一进程内并存多个注册表。
//!
//! ## 行为契约（What）
//! - `register`：类型化注册，签名由 [`WireParam`]/[`WireResult`] 在编译期
//!   推导；重名返回 [`RegistryError::DuplicateMethod`]；
//! - `register_raw`：动态注册，显式给出 [`MethodSignature`]；不可编码的
//!   形状或超限的元数返回 [`RegistryError::UnsupportedSignature`]；
//! - `register_object`：把一个 handler 对象暴露的方法整体注册，先全量
//!   校验后一次性提交，失败不落任何条目；
//! - 任何注册失败都不改变注册表既有状态。
//!
//! ## 并发与生命周期（Trade-offs）
//! - 注册定位在启动期、Server Endpoint 开始收包之前；`DashMap` 保证了
//!   即便违例并发注册也不破坏内存安全，但批量提交的原子性只在启动期
//!   单线程注册的前提下成立；
//! - 分发路径对注册表只读，按名取方法为分片读锁，无全局热点。

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;

use crate::error::{ApplicationError, InvokeFault, RegistryError};
use crate::wire::{WireParam, WireResult, WireShape};

/// 类型化注册支持的最大参数个数。
pub const MAX_ARITY: usize = 4;

/// 一次方法调用的异步结果。
pub type InvokeFuture = Pin<Box<dyn Future<Output = Result<Value, InvokeFault>> + Send>>;

/// 对象层 invoker：有序实参 → 异步结果。
///
/// - **契约 (What)**：实参数量由分发器依签名预先校验；闭包内部仍需对
///   每个实参做形状解码，失败以 [`InvokeFault::ArgumentDecode`] 报告。
pub type RawInvoker = Arc<dyn Fn(Vec<Value>) -> InvokeFuture + Send + Sync>;

/// 方法签名：有序参数形状与结果形状。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodSignature {
    params: Vec<WireShape>,
    result: WireShape,
}

impl MethodSignature {
    /// 以参数形状序列与结果形状构造签名。
    pub fn new(params: Vec<WireShape>, result: WireShape) -> Self {
        Self { params, result }
    }

    /// 有序参数形状。
    pub fn params(&self) -> &[WireShape] {
        &self.params
    }

    /// 结果形状。
    pub fn result(&self) -> WireShape {
        self.result
    }

    /// 参数个数。
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// 校验签名可在线格式中表达。
    ///
    /// # 契约说明（What）
    /// - 元数超过 [`MAX_ARITY`]、或任一形状不可编码，均判为不支持的签名；
    /// - 类型化注册路径构造的签名恒为合法，本校验主要拦截动态注册。
    pub(crate) fn validate(&self, name: &str) -> Result<(), RegistryError> {
        if self.params.len() > MAX_ARITY {
            return Err(RegistryError::UnsupportedSignature {
                name: name.to_owned(),
                reason: format!(
                    "arity {} exceeds the supported maximum of {MAX_ARITY}",
                    self.params.len()
                ),
            });
        }
        for (index, shape) in self.params.iter().enumerate() {
            if !shape.is_encodable() {
                return Err(RegistryError::UnsupportedSignature {
                    name: name.to_owned(),
                    reason: format!("parameter {index} has shape `{shape}` with no wire serialization"),
                });
            }
        }
        if !self.result.is_encodable() {
            return Err(RegistryError::UnsupportedSignature {
                name: name.to_owned(),
                reason: format!(
                    "result has shape `{}` with no wire serialization",
                    self.result
                ),
            });
        }
        Ok(())
    }
}

/// 注册完成后的单个可分发方法。
///
/// - **契约 (What)**：注册期创建，之后不可变；`invoke` 不校验实参数量，
///   该职责在分发器；
/// - **架构位置 (Where)**：始终以 `Arc` 形态被注册表与在途调用共享。
pub struct HandlerMethod {
    name: Arc<str>,
    signature: MethodSignature,
    invoker: RawInvoker,
}

impl HandlerMethod {
    /// 方法名。
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 方法签名。
    pub fn signature(&self) -> &MethodSignature {
        &self.signature
    }

    /// 以有序实参发起一次调用。
    pub fn invoke(&self, args: Vec<Value>) -> InvokeFuture {
        (self.invoker)(args)
    }
}

impl fmt::Debug for HandlerMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerMethod")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// 可被类型化注册的处理函数。
///
/// # 教案式注释
/// - **意图 (Why)**：把“参数怎么解码、结果怎么编码”固化进注册期生成的
///   invoker 闭包，分发器只面对统一的对象层接口；
/// - **契约 (What)**：`Args` 是参数类型元组；同一个闭包类型只会命中一个
///   元数实现，注册入口按此推导签名；
/// - **风险 (Trade-offs)**：处理函数必须是 `Fn`（而非 `FnOnce`）——捕获
///   状态的处理器应持有 `Arc` 并在闭包体内克隆后再进入 `async move`。
pub trait HandlerFn<Args>: Send + Sync + 'static {
    /// 推导方法签名。
    fn signature(&self) -> MethodSignature;

    /// 转换为对象层 invoker。
    fn into_invoker(self) -> RawInvoker;
}

fn decode_arg<T: WireParam>(index: usize, value: Value) -> Result<T, InvokeFault> {
    serde_json::from_value(value).map_err(|err| InvokeFault::ArgumentDecode {
        index,
        expected: T::SHAPE,
        detail: err.to_string(),
    })
}

fn encode_result<R: WireResult>(value: R) -> Result<Value, InvokeFault> {
    serde_json::to_value(value).map_err(|err| InvokeFault::ResultEncode {
        detail: err.to_string(),
    })
}

impl<F, Fut, R, E> HandlerFn<()> for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    R: WireResult,
    E: fmt::Display,
{
    fn signature(&self) -> MethodSignature {
        MethodSignature::new(Vec::new(), <R as WireResult>::SHAPE)
    }

    fn into_invoker(self) -> RawInvoker {
        let handler = Arc::new(self);
        Arc::new(move |_args: Vec<Value>| -> InvokeFuture {
            let handler = Arc::clone(&handler);
            Box::pin(async move {
                match (*handler)().await {
                    Ok(value) => encode_result(value),
                    Err(err) => Err(InvokeFault::Application(ApplicationError::new(
                        err.to_string(),
                    ))),
                }
            })
        })
    }
}

macro_rules! impl_handler_fn {
    ($(($index:tt, $ty:ident, $var:ident)),+) => {
        impl<F, Fut, R, E, $($ty,)+> HandlerFn<($($ty,)+)> for F
        where
            F: Fn($($ty),+) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = Result<R, E>> + Send + 'static,
            R: WireResult,
            E: fmt::Display,
            $($ty: WireParam,)+
        {
            fn signature(&self) -> MethodSignature {
                MethodSignature::new(
                    vec![$(<$ty as WireParam>::SHAPE),+],
                    <R as WireResult>::SHAPE,
                )
            }

            fn into_invoker(self) -> RawInvoker {
                let handler = Arc::new(self);
                Arc::new(move |args: Vec<Value>| -> InvokeFuture {
                    let handler = Arc::clone(&handler);
                    Box::pin(async move {
                        let mut args = args.into_iter();
                        $(
                            let $var = decode_arg::<$ty>(
                                $index,
                                args.next().unwrap_or(Value::Null),
                            )?;
                        )+
                        drop(args);
                        match (*handler)($($var),+).await {
                            Ok(value) => encode_result(value),
                            Err(err) => Err(InvokeFault::Application(
                                ApplicationError::new(err.to_string()),
                            )),
                        }
                    })
                })
            }
        }
    };
}

impl_handler_fn!((0, P1, p1));
impl_handler_fn!((0, P1, p1), (1, P2, p2));
impl_handler_fn!((0, P1, p1), (1, P2, p2), (2, P3, p3));
impl_handler_fn!((0, P1, p1), (1, P2, p2), (2, P3, p3), (3, P4, p4));

struct StagedMethod {
    name: Arc<str>,
    signature: MethodSignature,
    invoker: RawInvoker,
}

/// handler 对象暴露方法时使用的暂存集。
///
/// - **意图 (Why)**：对象注册是“多方法批量”操作，先在暂存集内完成签名
///   校验与集内查重，再由注册表整体提交，换取失败时的原子回退；
/// - **契约 (What)**：暂存集内重名立即失败；与注册表既有方法的冲突在
///   提交时裁决。
#[derive(Default)]
pub struct MethodSet {
    staged: Vec<StagedMethod>,
}

impl MethodSet {
    /// 暂存一个类型化方法。
    pub fn method<Args, F>(&mut self, name: &str, handler: F) -> Result<(), RegistryError>
    where
        F: HandlerFn<Args>,
    {
        let signature = handler.signature();
        self.raw_method(name, signature, handler.into_invoker())
    }

    /// 暂存一个带显式签名的动态方法。
    pub fn raw_method(
        &mut self,
        name: &str,
        signature: MethodSignature,
        invoker: RawInvoker,
    ) -> Result<(), RegistryError> {
        signature.validate(name)?;
        if self.staged.iter().any(|staged| staged.name.as_ref() == name) {
            return Err(RegistryError::DuplicateMethod {
                name: name.to_owned(),
            });
        }
        self.staged.push(StagedMethod {
            name: Arc::from(name),
            signature,
            invoker,
        });
        Ok(())
    }

    /// 已暂存的方法数。
    pub fn len(&self) -> usize {
        self.staged.len()
    }

    /// 暂存集是否为空。
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }
}

/// 把一组方法暴露给注册表的服务端对象。
///
/// # 教案式注释
/// - **意图 (Why)**：对应“注册一个 handler 对象，其方法整体变为远程可调”
///   的服务端注册面；对象以 `Arc<Self>` 接收自身，便于把共享状态克隆进
///   每个方法闭包；
/// - **契约 (What)**：`expose` 只应向暂存集声明方法，不得假设声明即生效
///   ——批量提交由注册表在校验后执行；
/// - **风险 (Trade-offs)**：方法名由对象自报，跨对象的命名冲突在注册期
///   而非编译期暴露，属本设计的已接受代价。
pub trait HandlerObject: Send + Sync + 'static {
    /// 向暂存集声明本对象暴露的全部方法。
    fn expose(self: Arc<Self>, methods: &mut MethodSet) -> Result<(), RegistryError>;
}

/// 进程内的可分发方法表。
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    methods: DashMap<Arc<str>, Arc<HandlerMethod>>,
}

impl HandlerRegistry {
    /// 创建空注册表。
    pub fn new() -> Self {
        Self::default()
    }

    /// 类型化注册单个方法。
    pub fn register<Args, F>(&self, name: &str, handler: F) -> Result<(), RegistryError>
    where
        F: HandlerFn<Args>,
    {
        let signature = handler.signature();
        self.register_raw(name, signature, handler.into_invoker())
    }

    /// 以显式签名注册单个动态方法。
    ///
    /// # 契约说明（What）
    /// - **前置条件**：`signature` 如实描述 `invoker` 的解码/编码行为；
    /// - **后置条件**：成功时方法立即可分发；失败时注册表保持原状。
    pub fn register_raw(
        &self,
        name: &str,
        signature: MethodSignature,
        invoker: RawInvoker,
    ) -> Result<(), RegistryError> {
        signature.validate(name)?;
        let key: Arc<str> = Arc::from(name);
        match self.methods.entry(Arc::clone(&key)) {
            Entry::Occupied(_) => Err(RegistryError::DuplicateMethod {
                name: name.to_owned(),
            }),
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(HandlerMethod {
                    name: key,
                    signature,
                    invoker,
                }));
                Ok(())
            }
        }
    }

    /// 批量注册一个 handler 对象暴露的全部方法。
    ///
    /// # 执行逻辑（How）
    /// 1. 让对象向暂存集声明方法（签名校验与集内查重在此完成）；
    /// 2. 将暂存名单与注册表既有方法全量比对，任一冲突即整体失败；
    /// 3. 校验通过后一次性提交。
    ///
    /// # 风险提示（Trade-offs）
    /// - 第 2、3 步之间不持全局锁，原子性依赖“启动期单线程注册”的部署
    ///   契约；违例的并发注册不会破坏内存安全，但可能部分提交。
    pub fn register_object<H>(&self, object: Arc<H>) -> Result<(), RegistryError>
    where
        H: HandlerObject,
    {
        let mut set = MethodSet::default();
        object.expose(&mut set)?;

        for staged in &set.staged {
            if self.methods.contains_key(staged.name.as_ref()) {
                return Err(RegistryError::DuplicateMethod {
                    name: staged.name.as_ref().to_owned(),
                });
            }
        }

        for staged in set.staged {
            self.methods.insert(
                Arc::clone(&staged.name),
                Arc::new(HandlerMethod {
                    name: staged.name,
                    signature: staged.signature,
                    invoker: staged.invoker,
                }),
            );
        }
        Ok(())
    }

    /// 按名取方法。
    pub fn get(&self, name: &str) -> Option<Arc<HandlerMethod>> {
        self.methods.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// 已注册方法名快照，按字典序排序，供启动日志使用。
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .methods
            .iter()
            .map(|entry| entry.key().as_ref().to_owned())
            .collect();
        names.sort();
        names
    }

    /// 已注册的方法数。
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// 注册表是否为空。
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn greet_handler() -> impl HandlerFn<(String,)> {
        |name: String| async move { Ok::<_, ApplicationError>(format!("Hello, {name}!")) }
    }

    /// 类型化注册应从处理函数推导出正确的签名。
    #[test]
    fn typed_registration_infers_the_signature() {
        let registry = HandlerRegistry::new();
        registry
            .register("say_hello", greet_handler())
            .expect("首次注册应成功");

        let method = registry.get("say_hello").expect("方法应可按名取出");
        assert_eq!(method.signature().params(), &[WireShape::Text]);
        assert_eq!(method.signature().result(), WireShape::Text);
        assert_eq!(method.signature().arity(), 1);
    }

    /// 重名注册失败后，既有方法必须原样可用（注册失败的原子性）。
    #[tokio::test]
    async fn duplicate_registration_fails_and_keeps_prior_state() {
        let registry = HandlerRegistry::new();
        registry
            .register("say_hello", greet_handler())
            .expect("首次注册应成功");

        let err = registry
            .register("say_hello", |_flag: bool| async move {
                Ok::<_, ApplicationError>(0_i64)
            })
            .expect_err("重名注册应失败");
        assert_eq!(
            err,
            RegistryError::DuplicateMethod {
                name: "say_hello".to_owned()
            }
        );

        let method = registry.get("say_hello").expect("原方法应仍然在表");
        let result = method
            .invoke(vec![json!("world")])
            .await
            .expect("原 invoker 应未被覆盖");
        assert_eq!(result, json!("Hello, world!"), "语义应保持首个注册版本");
        assert_eq!(registry.len(), 1);
    }

    /// 动态注册路径必须拒绝不可编码的签名与超限元数。
    #[test]
    fn raw_registration_rejects_unsupported_signatures() {
        let registry = HandlerRegistry::new();
        let noop: RawInvoker =
            Arc::new(|_args: Vec<Value>| -> InvokeFuture { Box::pin(async { Ok(Value::Null) }) });

        let opaque = registry
            .register_raw(
                "bad_shape",
                MethodSignature::new(vec![WireShape::Opaque], WireShape::Null),
                Arc::clone(&noop),
            )
            .expect_err("Opaque 参数应被拒绝");
        assert_eq!(
            opaque.code(),
            crate::error::codes::REGISTRY_UNSUPPORTED_SIGNATURE
        );

        let wide = registry
            .register_raw(
                "too_wide",
                MethodSignature::new(vec![WireShape::Text; MAX_ARITY + 1], WireShape::Null),
                noop,
            )
            .expect_err("超限元数应被拒绝");
        assert!(matches!(wide, RegistryError::UnsupportedSignature { .. }));
        assert!(registry.is_empty(), "失败的注册不得留下条目");
    }

    struct SplitHandler;

    impl HandlerObject for SplitHandler {
        fn expose(self: Arc<Self>, methods: &mut MethodSet) -> Result<(), RegistryError> {
            methods.method("fresh_method", || async {
                Ok::<_, ApplicationError>(true)
            })?;
            methods.method("say_hello", greet_handler())?;
            Ok(())
        }
    }

    /// 对象批量注册遇到冲突时必须整体失败，不留部分条目。
    #[test]
    fn object_registration_commits_all_or_nothing() {
        let registry = HandlerRegistry::new();
        registry
            .register("say_hello", greet_handler())
            .expect("预置方法应注册成功");

        let err = registry
            .register_object(Arc::new(SplitHandler))
            .expect_err("批量中的重名应让整批失败");
        assert!(matches!(err, RegistryError::DuplicateMethod { name } if name == "say_hello"));
        assert!(
            registry.get("fresh_method").is_none(),
            "批量失败后不得出现半提交的方法"
        );
        assert_eq!(registry.len(), 1, "注册表应保持批量前的状态");
    }
}
