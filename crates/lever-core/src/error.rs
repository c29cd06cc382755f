//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 为调用运行时的四类故障（注册、协议、传输、应用）提供集中定义，
//!   保证每一类失败都映射到可检视的错误值，而不是未捕获的 panic；
//! - 稳定错误码跨进程传播（见 [`RemoteError`]），让远端调用方无需解析
//!   自然语言消息即可分类处置。
//!
//! ## 设计要求（What）
//! - 所有错误类型实现 `thiserror::Error`，携带 `source` 链以保留底层原因；
//! - 错误码遵循 `<域>.<语义>` 约定，集中登记在 [`codes`] 模块，新增码值
//!   必须同步更新文档与测试；
//! - 应用错误（处理器自身报告的失败）与协议/传输错误必须可区分：前者
//!   以带内 [`RemoteError`] 的形式出现在成功送达的响应里。
//!
//! ## 扩展建议（How）
//! - 客户端与服务端 crate 可在各自错误域中包装本模块类型，再通过 `?`
//!   传播；切勿在中途把应用错误折叠进传输错误，这会破坏调用方的
//!   重试决策依据。

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::wire::WireShape;

/// 稳定错误码登记处。
///
/// # 教案式注释
/// - **意图 (Why)**：机读错误码是远端调用方、日志管道与告警规则共同依赖的
///   契约，集中声明可避免散落字符串导致的语义漂移；
/// - **契约 (What)**：码值一经发布不得改动含义；废弃时保留常量并在文档中
///   标注替代项；
/// - **风险 (Trade-offs)**：码值粒度刻意保持在“调用方能据此决策”的层面，
///   更细的根因信息放在 `message` 与 `source` 链里。
pub mod codes {
    /// 注册期：方法名与已注册方法冲突。
    pub const REGISTRY_DUPLICATE_METHOD: &str = "registry.duplicate_method";
    /// 注册期：方法签名无法在线格式中表达。
    pub const REGISTRY_UNSUPPORTED_SIGNATURE: &str = "registry.unsupported_signature";
    /// 分发期：请求命名的方法不存在于目标注册表。
    pub const DISPATCH_METHOD_NOT_FOUND: &str = "dispatch.method_not_found";
    /// 分发期：实参与声明的参数形状不符或数量不符。
    pub const DISPATCH_ARGUMENT_DECODE: &str = "dispatch.argument_decode";
    /// 分发期：处理器返回值无法编码进响应。
    pub const DISPATCH_RESULT_ENCODE: &str = "dispatch.result_encode";
    /// 应用层：处理器主动报告的业务失败。
    pub const APP_HANDLER_FAILURE: &str = "app.handler_failure";
    /// 协议层：请求帧载荷无法解码为 CallRequest。
    pub const PROTOCOL_MALFORMED_REQUEST: &str = "protocol.malformed_request";
    /// 协议层：响应编码失败（服务端内部异常）。
    pub const PROTOCOL_RESPONSE_ENCODE: &str = "protocol.response_encode";
    /// 解析层：发现服务在目录中无指派。
    pub const RESOLVE_SERVICE_UNRESOLVED: &str = "resolve.service_unresolved";
    /// 解析层：既无强制主机也未配置发现后端。
    pub const RESOLVE_NO_DISCOVERY: &str = "resolve.no_discovery";
    /// 解析层：目录查询自身失败（不可达等）。
    pub const RESOLVE_DIRECTORY_FAILURE: &str = "resolve.directory_failure";
    /// 传输层：IO 操作失败。
    pub const TRANSPORT_IO: &str = "transport.io";
    /// 传输层：等待响应超时。
    pub const TRANSPORT_TIMEOUT: &str = "transport.timeout";
    /// 传输层：对端在消息边界外关闭连接。
    pub const TRANSPORT_CLOSED: &str = "transport.closed";
    /// 传输层：帧超出尺寸上限或线格式损坏。
    pub const TRANSPORT_FRAME: &str = "transport.frame";
}

/// 跨进程传播的带内错误描述。
///
/// # 教案式注释
/// - **意图 (Why)**：CallResponse 的错误臂需要一个序列化稳定、自带分类码的
///   载体，让客户端把“方法执行了但失败”与传输故障区分开；
/// - **契约 (What)**：`code` 取自 [`codes`] 登记的稳定码；`message` 面向排障
///   人员，不应包含敏感信息；
/// - **风险 (Trade-offs)**：字段公开且可构造，服务端以外的代码也能伪造该
///   类型——信任边界由传输层鉴权解决，不在本类型职责内。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("[{code}] {message}")]
pub struct RemoteError {
    /// 稳定错误码，`<域>.<语义>` 约定。
    pub code: String,
    /// 人类可读描述。
    pub message: String,
}

impl RemoteError {
    /// 以稳定码与描述构造带内错误。
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// 处理器主动报告的业务失败。
///
/// - **意图 (Why)**：为处理器的错误通道提供统一落点；任何 `Display` 错误
///   都可以在注册表的 invoker 闭包里折叠为本类型；
/// - **契约 (What)**：分发器会把它包装为 `app.handler_failure` 的带内响应，
///   对调用方呈现为“调用送达且执行、但业务报告失败”。
#[derive(Clone, Debug, Error)]
#[error("{message}")]
pub struct ApplicationError {
    message: String,
}

impl ApplicationError {
    /// 以描述文本构造应用错误。
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// 读取描述文本。
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for ApplicationError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ApplicationError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// invoker 闭包在一次调用内可能产生的三类失败。
///
/// # 教案式注释
/// - **意图 (Why)**：参数解码失败、结果编码失败与处理器业务失败需要映射到
///   不同的稳定码，因此 invoker 的错误通道必须保留三者的区分；
/// - **契约 (What)**：分发器是本类型唯一的消费方，负责把各臂翻译成
///   [`RemoteError`] 并写入带内响应；
/// - **风险 (Trade-offs)**：`detail` 直接携带 serde 的诊断文本，可能较长，
///   但换来排障时的直接可读性。
#[derive(Debug, Error)]
pub enum InvokeFault {
    /// 第 `index` 个实参与声明形状不符。
    #[error("argument {index} does not match shape `{expected}`: {detail}")]
    ArgumentDecode {
        index: usize,
        expected: WireShape,
        detail: String,
    },
    /// 处理器返回值无法编码为线格式。
    #[error("result value failed to encode: {detail}")]
    ResultEncode { detail: String },
    /// 处理器主动报告的失败。
    #[error(transparent)]
    Application(#[from] ApplicationError),
}

/// 注册期错误：启动即失败，禁止带病开始服务。
///
/// - **意图 (Why)**：重复方法名或不可编码签名意味着部署物自身不一致，
///   必须在 Server Endpoint 接受请求之前暴露；
/// - **契约 (What)**：任何注册失败都不会改变注册表的既有状态（原子性）。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// 方法名与已注册方法冲突。
    #[error("method `{name}` is already registered")]
    DuplicateMethod { name: String },
    /// 参数或结果形状无法在线格式中表达。
    #[error("method `{name}` has an unsupported signature: {reason}")]
    UnsupportedSignature { name: String, reason: String },
}

impl RegistryError {
    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateMethod { .. } => codes::REGISTRY_DUPLICATE_METHOD,
            Self::UnsupportedSignature { .. } => codes::REGISTRY_UNSUPPORTED_SIGNATURE,
        }
    }
}

/// 线格式层错误：JSON 编解码失败或帧尺寸越界。
#[derive(Debug, Error)]
pub enum WireError {
    /// 载荷不是合法 JSON，或与目标类型不符。
    #[error("payload is not valid JSON for the expected shape: {0}")]
    Json(#[from] serde_json::Error),
    /// 帧长度超出协商上限。
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameOverflow { len: usize, max: usize },
}

/// 协议层错误：请求本身不可解码，属传输级故障而非带内错误。
///
/// - **契约 (What)**：服务端遇到本错误应关闭当前连接，但不得影响其他
///   连接与在途请求；
/// - **风险 (Trade-offs)**：无法解码的请求没有可信的请求 ID，因而无法
///   构造带内响应，只能以连接级失败收场。
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// 请求帧载荷无法解码为 CallRequest。
    #[error("malformed call request: {0}")]
    MalformedRequest(#[source] WireError),
    /// 响应编码失败。
    #[error("call response failed to encode: {0}")]
    ResponseEncode(#[source] WireError),
}

impl ProtocolError {
    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedRequest(_) => codes::PROTOCOL_MALFORMED_REQUEST,
            Self::ResponseEncode(_) => codes::PROTOCOL_RESPONSE_ENCODE,
        }
    }
}

/// 强制主机字面量（`host:port`）解析失败。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EndpointParseError {
    /// 字面量缺少 `:port` 片段。
    #[error("endpoint literal `{0}` must look like host:port")]
    MissingPort(String),
    /// 端口片段不是合法的 16 位无符号整数。
    #[error("endpoint literal `{literal}` carries an invalid port: {detail}")]
    InvalidPort { literal: String, detail: String },
    /// 主机片段为空。
    #[error("endpoint literal `{0}` has an empty host")]
    EmptyHost(String),
}
