//! 监听器：入站连接的语义封装。

use std::net::SocketAddr;

use tokio::net::TcpListener as TokioTcpListener;
use tracing::debug;

use crate::connection::FrameConnection;
use crate::error::{TransportError, map_io_error, op};

/// 对 Tokio `TcpListener` 的帧化封装。
///
/// # 教案式注释
///
/// ## 意图 (Why)
/// - 在不暴露 Tokio 具体类型的前提下提供“监听 → 接受连接”的最小能力，
///   并让接受到的连接直接以 [`FrameConnection`] 形态交给上层；
/// - `bind("…:0", …)` 配合 [`local_addr`](Self::local_addr) 支撑测试中
///   的随机端口部署。
///
/// ## 契约 (What)
/// - **前置条件**：调用方必须在 Tokio 运行时中使用；
/// - **后置条件**：`accept` 成功返回的连接已携带双端地址并可立即读写；
/// - **错误语义**：绑定与接受失败映射为带操作标签的 [`TransportError`]。
#[derive(Debug)]
pub struct FrameListener {
    inner: TokioTcpListener,
    local_addr: SocketAddr,
    max_frame_len: usize,
}

impl FrameListener {
    /// 绑定到 `host:port` 并返回监听器。
    pub async fn bind(authority: &str, max_frame_len: usize) -> Result<Self, TransportError> {
        let listener = TokioTcpListener::bind(authority)
            .await
            .map_err(|err| map_io_error(op::BIND, err))?;
        let local_addr = listener
            .local_addr()
            .map_err(|err| map_io_error(op::BIND, err))?;
        debug!(target: "lever::transport", %local_addr, "监听器已就绪");
        Ok(Self {
            inner: listener,
            local_addr,
            max_frame_len,
        })
    }

    /// 实际绑定的地址。
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// 接受一个入站连接。
    pub async fn accept(&self) -> Result<(FrameConnection, SocketAddr), TransportError> {
        let (stream, peer_addr) = self
            .inner
            .accept()
            .await
            .map_err(|err| map_io_error(op::ACCEPT, err))?;
        let connection = FrameConnection::from_stream(stream, self.max_frame_len, op::ACCEPT)?;
        Ok((connection, peer_addr))
    }
}
