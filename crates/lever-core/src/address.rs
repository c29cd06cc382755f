//! 寻址类型：逻辑服务地址与物理端点。
//!
//! # 设计目标（Why）
//! - 调用方只面对 {environment, service} 这一位置无关的逻辑标识；
//!   它何时、如何落到某个 host:port 是 Service Locator 的职责；
//! - 把两级寻址各自收敛为值类型后，强制主机覆盖、发现缓存与配置
//!   均可直接以这两个类型为键或载荷，无需裸字符串约定。

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EndpointParseError;

/// 逻辑服务地址：{环境, 服务} 二元组。
///
/// # 教案式注释
/// - **意图 (Why)**：环境名（如 `dev.lever`）以点分层映射到外部发现域，
///   服务名在环境内唯一；两者合并即为一次调用的寻址输入；
/// - **契约 (What)**：不可变值类型，`Eq + Hash` 以便直接作为缓存键；
///   `Display` 渲染为 `environment/service`；
/// - **风险 (Trade-offs)**：本类型不校验环境名的点分语法——解析语义属于
///   外部发现域，核心层保持透传。
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceAddress {
    environment: String,
    service: String,
}

impl ServiceAddress {
    /// 以环境名与服务名构造逻辑地址。
    pub fn new(environment: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            service: service.into(),
        }
    }

    /// 环境名，例如 `dev.lever`。
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// 环境内的服务名，例如 `helloService`。
    pub fn service(&self) -> &str {
        &self.service
    }
}

impl fmt::Display for ServiceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.environment, self.service)
    }
}

/// 某一时刻支撑逻辑地址的物理端点。
///
/// # 教案式注释
/// - **意图 (Why)**：解析结果与强制主机覆盖共享同一表示；核心层不持久化
///   该值，时效性由 Locator 的 TTL 策略管理；
/// - **契约 (What)**：`FromStr` 接受 `host:port` 字面量（强制主机来源，
///   例如环境变量 `LEVEROS_IP_PORT` 的取值），`Display` 与 [`authority`]
///   渲染回同一形态；
/// - **风险 (Trade-offs)**：`host` 保留原始文本（域名或 IP），DNS 解析
///   推迟到传输层建连时进行。
///
/// [`authority`]: ResolvedEndpoint::authority
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedEndpoint {
    host: String,
    port: u16,
}

impl ResolvedEndpoint {
    /// 以主机与端口构造端点。
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// 主机名或 IP 文本。
    pub fn host(&self) -> &str {
        &self.host
    }

    /// 端口号。
    pub fn port(&self) -> u16 {
        self.port
    }

    /// 渲染为传输层可直接建连的 `host:port` 文本。
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for ResolvedEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for ResolvedEndpoint {
    type Err = EndpointParseError;

    /// 解析 `host:port` 字面量。
    ///
    /// # 执行逻辑（How）
    /// - 以最后一个 `:` 切分，容忍主机片段自身含冒号以外的任意文本；
    /// - 端口必须落在 `u16` 值域；主机片段不得为空。
    fn from_str(literal: &str) -> Result<Self, Self::Err> {
        let (host, port_text) = literal
            .rsplit_once(':')
            .ok_or_else(|| EndpointParseError::MissingPort(literal.to_owned()))?;
        if host.is_empty() {
            return Err(EndpointParseError::EmptyHost(literal.to_owned()));
        }
        let port = port_text
            .parse::<u16>()
            .map_err(|err| EndpointParseError::InvalidPort {
                literal: literal.to_owned(),
                detail: err.to_string(),
            })?;
        Ok(Self::new(host, port))
    }
}
