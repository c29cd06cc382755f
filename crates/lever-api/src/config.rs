//! 客户端与服务端配置：显式字段加链式 `with_*` 构建。
//!
//! # 设计目标（Why）
//! - 强制主机等外部输入（例如环境变量 `LEVEROS_IP_PORT`）由调用方代码
//!   读取后显式注入，核心不隐藏任何隐式配置来源；
//! - 所有默认值集中为常量，测试与文档引用同一处数字。

use std::time::Duration;

use lever_core::address::ResolvedEndpoint;
use lever_core::error::EndpointParseError;
use lever_core::wire::DEFAULT_MAX_FRAME_LEN;

/// 服务端默认监听地址。
pub const DEFAULT_BIND_HOST: &str = "127.0.0.1";
/// 服务端默认监听端口。
pub const DEFAULT_BIND_PORT: u16 = 8080;
/// 单进程默认的在途分发上限。
pub const DEFAULT_MAX_IN_FLIGHT: usize = 256;
/// 客户端单次调用的默认超时。
pub const DEFAULT_INVOKE_TIMEOUT: Duration = Duration::from_secs(10);
/// 发现结果的默认缓存时效。
pub const DEFAULT_RESOLVE_TTL: Duration = Duration::from_secs(5);

/// Server Endpoint 的启动配置。
///
/// # 教案式注释
/// - **契约 (What)**：`max_in_flight` 限制同时在途的分发任务数，超出的
///   请求在信号量上排队；`max_frame_len` 约束单帧载荷；
/// - **风险 (Trade-offs)**：排队发生在帧已读入之后，极端情况下单连接
///   仍可能囤积待处理帧，上限取值应结合方法体的资源占用评估。
#[derive(Clone, Debug)]
pub struct ServerConfig {
    bind: ResolvedEndpoint,
    max_in_flight: usize,
    max_frame_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: ResolvedEndpoint::new(DEFAULT_BIND_HOST, DEFAULT_BIND_PORT),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

impl ServerConfig {
    /// 默认配置。
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定监听地址（`host:0` 表示随机端口，测试常用）。
    pub fn with_bind(mut self, bind: ResolvedEndpoint) -> Self {
        self.bind = bind;
        self
    }

    /// 指定在途分发上限。
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    /// 指定单帧载荷上限。
    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    /// 监听地址。
    pub fn bind(&self) -> &ResolvedEndpoint {
        &self.bind
    }

    /// 在途分发上限。
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// 单帧载荷上限。
    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }
}

/// Invocation Client 的构造配置。
///
/// # 教案式注释
/// - **契约 (What)**：设置了强制主机后，所有解析无条件返回该端点，
///   发现与缓存均被旁路；`resolve_ttl` 为零时关闭发现缓存；
/// - **风险 (Trade-offs)**：`invoke_timeout` 覆盖“解析之后建连到收响应”
///   的整个往返，调用方若需要分阶段计时应自行包装。
#[derive(Clone, Debug)]
pub struct ClientConfig {
    force_host: Option<ResolvedEndpoint>,
    invoke_timeout: Duration,
    resolve_ttl: Duration,
    max_frame_len: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            force_host: None,
            invoke_timeout: DEFAULT_INVOKE_TIMEOUT,
            resolve_ttl: DEFAULT_RESOLVE_TTL,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

impl ClientConfig {
    /// 默认配置。
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置强制主机，旁路发现。
    pub fn with_force_host(mut self, endpoint: ResolvedEndpoint) -> Self {
        self.force_host = Some(endpoint);
        self
    }

    /// 以 `host:port` 字面量设置强制主机（环境变量取值的典型入口）。
    pub fn with_force_host_literal(self, literal: &str) -> Result<Self, EndpointParseError> {
        Ok(self.with_force_host(literal.parse()?))
    }

    /// 设置单次调用超时。
    pub fn with_invoke_timeout(mut self, invoke_timeout: Duration) -> Self {
        self.invoke_timeout = invoke_timeout;
        self
    }

    /// 设置发现缓存时效；零时长关闭缓存。
    pub fn with_resolve_ttl(mut self, resolve_ttl: Duration) -> Self {
        self.resolve_ttl = resolve_ttl;
        self
    }

    /// 设置单帧载荷上限。
    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    /// 强制主机。
    pub fn force_host(&self) -> Option<&ResolvedEndpoint> {
        self.force_host.as_ref()
    }

    /// 单次调用超时。
    pub fn invoke_timeout(&self) -> Duration {
        self.invoke_timeout
    }

    /// 发现缓存时效。
    pub fn resolve_ttl(&self) -> Duration {
        self.resolve_ttl
    }

    /// 单帧载荷上限。
    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 强制主机字面量入口应透传解析错误，而不是静默忽略。
    #[test]
    fn force_host_literal_propagates_parse_failures() {
        let ok = ClientConfig::new()
            .with_force_host_literal("127.0.0.1:8080")
            .expect("合法字面量应被接受");
        assert_eq!(
            ok.force_host().expect("强制主机应已设置").authority(),
            "127.0.0.1:8080"
        );

        assert!(
            ClientConfig::new().with_force_host_literal("no-port").is_err(),
            "非法字面量应报错"
        );
    }
}
