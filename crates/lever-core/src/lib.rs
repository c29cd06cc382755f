//! # lever-core
//!
//! ## 定位与职责（Why）
//! - 作为 Lever 调用运行时的契约层，集中定义寻址类型、线格式、方法注册表与
//!   分发器，让传输实现与门面 crate 共享同一套稳定语义。
//! - 调用路径的两端（Invocation Client 与 Server Endpoint）分别编译、独立部署，
//!   因此“请求命名的方法是否存在”只能在运行期裁决；本 crate 把这类裁决统一
//!   收敛为带稳定错误码的带内响应，而非传输层故障。
//!
//! ## 架构嵌入（Where）
//! - `address` 模块承载 {environment, service} 逻辑地址与 host:port 物理端点；
//! - `wire` 模块定义 CallRequest/CallResponse 的 JSON 线格式与形状模型；
//! - `registry` 模块实现“方法名 → 类型化 invoker 闭包”的显式方法表；
//! - `dispatch` 模块把原始请求字节裁决为带内响应或协议故障；
//! - `error` 模块集中声明各层错误域与稳定错误码。
//!
//! ## 设计边界（Trade-offs）
//! - 本 crate 不触碰套接字：帧边界（长度前缀）由 `lever-transport-tcp` 负责，
//!   这里只处理帧内载荷，保持与具体传输解耦；
//! - 注册表假定“启动期注册、服务期只读”，不为并发注册提供原子批量以外的
//!   更强保证，换取分发路径上的零锁读。

/// 逻辑服务地址与物理端点的结构化表示。
///
/// - **意图说明 (Why)**：把“{环境, 服务} → host:port”的两级寻址显式拆开，
///   使强制主机（forced host）与发现（discovery）两种解析路径共享类型；
/// - **契约定位 (What)**：均为不可变值类型，可安全跨线程复制与哈希。
pub mod address;

/// 请求分发器：原始载荷 → 带内响应或协议故障。
///
/// - **意图说明 (Why)**：集中实现“应用错误带内化、协议错误传输化”的裁决规则；
/// - **契约定位 (What)**：`Dispatcher` 对 `&self` 并发安全，调用之间无共享可变状态。
pub mod dispatch;

/// 错误域与稳定错误码的集中声明处。
///
/// - **意图说明 (Why)**：注册、分发、线格式三类失败各有独立错误域，
///   统一使用 `<域>.<语义>` 稳定码，便于远端与日志侧机读归类；
/// - **风险提示 (Trade-offs)**：跨进程传播的只有 [`error::RemoteError`]，
///   其余错误类型不承诺序列化稳定性。
pub mod error;

/// 方法注册表：显式方法表与类型化注册入口。
///
/// - **意图说明 (Why)**：以“注册期构造 invoker 闭包”替代运行期反射，
///   每个闭包捕获自身签名的参数解码与结果编码逻辑；
/// - **契约定位 (What)**：重复方法名与不可编码签名在注册期即失败，
///   注册失败不改变注册表既有状态。
pub mod registry;

/// 线格式：CallRequest/CallResponse 与形状模型。
pub mod wire;

pub use address::{ResolvedEndpoint, ServiceAddress};
pub use dispatch::Dispatcher;
pub use error::{
    ApplicationError, EndpointParseError, InvokeFault, ProtocolError, RegistryError, RemoteError,
    WireError, codes,
};
pub use registry::{
    HandlerMethod, HandlerObject, HandlerRegistry, MethodSet, MethodSignature, RawInvoker,
};
pub use wire::{
    CallRequest, CallResponse, DEFAULT_MAX_FRAME_LEN, WireParam, WireResult, WireShape,
    decode_payload, encode_payload,
};
