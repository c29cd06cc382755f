//! 传输层错误域：IO 失败的结构化映射。

use std::io;
use std::time::Duration;

use thiserror::Error;

use lever_core::error::{WireError, codes};

/// IO 操作标签，进入错误消息与日志字段。
pub(crate) mod op {
    pub const BIND: &str = "bind";
    pub const ACCEPT: &str = "accept";
    pub const CONNECT: &str = "connect";
    pub const READ: &str = "read";
    pub const WRITE: &str = "write";
    pub const SHUTDOWN: &str = "shutdown";
}

/// 传输层错误：连接、读写、超时与帧格式失败的统一表示。
///
/// # 教案式注释
/// - **意图 (Why)**：调用方（Invocation Client）必须能把“调用根本没送达”
///   与“调用送达但业务失败”区分开；本类型覆盖前者的全部形态；
/// - **契约 (What)**：`operation` 标签标记失败发生的 IO 阶段；`code()`
///   输出稳定错误码供日志与告警归类；
/// - **风险 (Trade-offs)**：`Timeout` 的计时由上层（客户端整次调用的
///   截止时间）驱动，本 crate 自身不内置定时器。
#[derive(Debug, Error)]
pub enum TransportError {
    /// 底层 IO 操作失败。
    #[error("tcp {operation} failed: {source}")]
    Io {
        operation: &'static str,
        #[source]
        source: io::Error,
    },
    /// 等待超过上限。
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
    /// 对端在帧边界之内断开连接。
    #[error("connection closed inside a frame boundary")]
    Closed,
    /// 帧尺寸越界或载荷线格式损坏。
    #[error(transparent)]
    Frame(#[from] WireError),
}

impl TransportError {
    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io { .. } => codes::TRANSPORT_IO,
            Self::Timeout { .. } => codes::TRANSPORT_TIMEOUT,
            Self::Closed => codes::TRANSPORT_CLOSED,
            Self::Frame(_) => codes::TRANSPORT_FRAME,
        }
    }

    /// 是否为超时失败。
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// 把 `io::Error` 包装为带操作标签的传输错误。
pub(crate) fn map_io_error(operation: &'static str, source: io::Error) -> TransportError {
    TransportError::Io { operation, source }
}
