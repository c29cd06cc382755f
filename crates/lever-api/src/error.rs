//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 门面层错误域：把解析、传输、应用三类失败以互斥的枚举臂暴露给
//!   调用方，支撑“我的调用执行了但失败”与“我的调用根本没送达”的区分；
//! - 与 `lever-core` 的稳定码体系对齐，本地补充客户端侧专属码值。
//!
//! ## 设计要求（What）
//! - 所有错误实现 `thiserror::Error` 并可经 `?` 从底层域直接提升；
//! - 调用方的重试/退避策略只应依赖 [`InvokeError::is_transport`] 一类
//!   谓词与稳定码，不应解析消息文本。

use thiserror::Error;

use lever_core::address::ServiceAddress;
use lever_core::error::{RegistryError, RemoteError};
use lever_transport_tcp::TransportError;

const CODE_CLIENT_ARGUMENT_ENCODE: &str = "client.argument_encode";
const CODE_CLIENT_MALFORMED_RESPONSE: &str = "client.malformed_response";
const CODE_CLIENT_RESULT_DECODE: &str = "client.result_decode";

/// 服务定位失败。
///
/// - **契约 (What)**：强制主机模式不会产生本错误；发现模式下三个臂
///   分别对应“无指派”“未配置发现”“目录自身失败”；
/// - **风险 (Trade-offs)**：定位失败不会被自动重试，策略留给调用方。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// 服务在目录中没有指派（未部署或环境未知）。
    #[error("service `{address}` has no assignment in discovery")]
    ServiceUnresolved { address: ServiceAddress },
    /// 既未配置发现后端，也未设置强制主机。
    #[error("no discovery backend configured and no forced host set")]
    NoDiscovery,
    /// 目录查询自身失败（不可达等）。
    #[error("discovery lookup for `{address}` failed: {detail}")]
    Directory {
        address: ServiceAddress,
        detail: String,
    },
}

impl ResolveError {
    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            Self::ServiceUnresolved { .. } => lever_core::codes::RESOLVE_SERVICE_UNRESOLVED,
            Self::NoDiscovery => lever_core::codes::RESOLVE_NO_DISCOVERY,
            Self::Directory { .. } => lever_core::codes::RESOLVE_DIRECTORY_FAILURE,
        }
    }
}

/// 一次调用可能的全部失败形态。
///
/// # 教案式注释
/// - **意图 (Why)**：错误分类即重试语义——应用错误代表方法已执行，盲目
///   重试可能造成重复副作用；传输类错误则代表调用未被（可观察地）送达；
/// - **契约 (What)**：[`Application`](Self::Application) 携带远端的带内
///   错误原文；其余各臂均属传输/解析/编解码类；
/// - **风险 (Trade-offs)**：超时场景下服务端可能仍在执行并最终完成，
///   结果被丢弃——本错误无法证明“方法未执行”。
#[derive(Debug, Error)]
pub enum InvokeError {
    /// 远端处理器报告的业务失败（调用已执行）。
    #[error("remote handler reported failure: {0}")]
    Application(RemoteError),
    /// 传输层失败（建连、读写、超时、帧越界）。
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// 服务定位失败。
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// 第 `index` 个实参无法编码进请求。
    #[error("argument {index} failed to encode: {detail}")]
    ArgumentEncode { index: usize, detail: String },
    /// 响应载荷不可解码或请求/响应标识不匹配。
    #[error("response could not be decoded: {detail}")]
    MalformedResponse { detail: String },
    /// 结果值与调用方要求的类型不符。
    #[error("call result does not fit the requested type: {detail}")]
    ResultDecode { detail: String },
}

impl InvokeError {
    /// 是否属于传输类失败（调用未被可观察地送达）。
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::MalformedResponse { .. })
    }

    /// 是否为远端应用错误（调用已执行）。
    pub fn is_application(&self) -> bool {
        matches!(self, Self::Application(_))
    }

    /// 是否为超时。
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(err) if err.is_timeout())
    }

    /// 稳定错误码。
    pub fn code(&self) -> &str {
        match self {
            Self::Application(remote) => &remote.code,
            Self::Transport(err) => err.code(),
            Self::Resolve(err) => err.code(),
            Self::ArgumentEncode { .. } => CODE_CLIENT_ARGUMENT_ENCODE,
            Self::MalformedResponse { .. } => CODE_CLIENT_MALFORMED_RESPONSE,
            Self::ResultDecode { .. } => CODE_CLIENT_RESULT_DECODE,
        }
    }
}

/// 服务端启动与服务循环的失败形态。
#[derive(Debug, Error)]
pub enum ServeError {
    /// 注册期失败：启动必须中止。
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// 监听或接受连接失败。
    #[error(transparent)]
    Transport(#[from] TransportError),
}
