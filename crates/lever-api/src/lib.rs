//! # lever-api
//!
//! ## 定位与职责（Why）
//! - Lever 调用运行时的用户门面：服务端进程在此注册 handler 并启动
//!   Server Endpoint，客户端进程在此构造 Client、定位服务并发起调用；
//! - 组合 `lever-core` 的契约与 `lever-transport-tcp` 的帧通道，对外隐藏
//!   线格式与连接管理细节。
//!
//! ## 使用方式（How）
//! - 服务端：`Server::new(config)` → `register*` → `serve()`；
//! - 客户端：`Client::new(config)`（本地开发配合
//!   `ClientConfig::with_force_host_literal` 注入 `LEVEROS_IP_PORT` 取值）
//!   或 `Client::with_discovery(config, directory)` → `service(env, name)`
//!   → `invoke(method, args)`。
//!
//! ## 架构嵌入（Where）
//! - `config` 承载两端的显式配置与默认值；
//! - `locator` 定义发现契约与 TTL 缓存解析器；
//! - `client`/`server` 分别实现调用与分发两侧的门面；
//! - `error` 集中门面层错误域。

/// 调用侧门面：客户端、服务句柄与实参编码。
pub mod client;

/// 两端配置与默认值。
pub mod config;

/// 门面层错误域。
///
/// - **意图说明 (Why)**：调用方的重试与告警策略依赖互斥的错误分类；
/// - **契约定位 (What)**：与 `lever-core` 稳定码对齐，另含客户端侧专属码。
pub mod error;

/// 服务定位：发现契约、静态目录与 TTL 缓存。
pub mod locator;

/// 分发侧门面：注册面与服务循环。
pub mod server;

pub use client::{Client, IntoWireArgs, ServiceHandle};
pub use config::{
    ClientConfig, DEFAULT_INVOKE_TIMEOUT, DEFAULT_MAX_IN_FLIGHT, DEFAULT_RESOLVE_TTL, ServerConfig,
};
pub use error::{InvokeError, ResolveError, ServeError};
pub use locator::{Discovery, ServiceLocator, StaticDiscovery};
pub use server::{BoundServer, Server};

// 把最常用的核心契约一并再导出，使用方通常只需依赖本 crate。
pub use lever_core::{
    ApplicationError, HandlerObject, MethodSet, RegistryError, RemoteError, ResolvedEndpoint,
    ServiceAddress,
};
