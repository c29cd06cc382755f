//! 帧通道：建连、帧读写与读写半部拆分。

use std::net::SocketAddr;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::debug;

use crate::error::{TransportError, map_io_error, op};
use crate::frame;

const READ_CHUNK_CAPACITY: usize = 8 * 1024;

async fn read_frame_from<R>(
    reader: &mut R,
    buf: &mut BytesMut,
    max_frame_len: usize,
) -> Result<Option<Bytes>, TransportError>
where
    R: AsyncRead + Unpin,
{
    loop {
        if let Some(payload) = frame::split_frame(buf, max_frame_len)? {
            return Ok(Some(payload));
        }
        let read = reader
            .read_buf(buf)
            .await
            .map_err(|err| map_io_error(op::READ, err))?;
        if read == 0 {
            return if buf.is_empty() {
                Ok(None)
            } else {
                Err(TransportError::Closed)
            };
        }
    }
}

async fn write_frame_to<W>(
    writer: &mut W,
    payload: &[u8],
    max_frame_len: usize,
) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    let framed = frame::frame_payload(payload, max_frame_len)?;
    writer
        .write_all(&framed)
        .await
        .map_err(|err| map_io_error(op::WRITE, err))?;
    writer
        .flush()
        .await
        .map_err(|err| map_io_error(op::WRITE, err))
}

/// 单任务顺序使用的帧通道。
///
/// # 教案式注释
///
/// ## 意图 (Why)
/// - 客户端一次调用即一次“写请求帧、读响应帧”的往返，顺序语义足够；
/// - 把帧边界与缓冲管理封在通道内，上层只见完整载荷。
///
/// ## 契约 (What)
/// - `connect`：按 `host:port` 文本建连（DNS 由 Tokio 解析）；
/// - `read_frame`：`Ok(None)` 为帧边界上的干净关闭；
/// - `write_frame`：写入完整帧并 flush；
/// - `into_split`：移交所有权换取可并行的读写半部，读缓冲随读半部迁移。
///
/// ## 注意事项 (Trade-offs)
/// - 通道不内置超时：每次调用的截止时间由上层统一裁决，避免两层计时
///   语义叠加。
#[derive(Debug)]
pub struct FrameConnection {
    stream: TcpStream,
    buf: BytesMut,
    max_frame_len: usize,
    local_addr: SocketAddr,
    peer_addr: SocketAddr,
}

impl FrameConnection {
    /// 建立到 `host:port` 的连接。
    pub async fn connect(authority: &str, max_frame_len: usize) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(authority)
            .await
            .map_err(|err| map_io_error(op::CONNECT, err))?;
        let connection = Self::from_stream(stream, max_frame_len, op::CONNECT)?;
        debug!(
            target: "lever::transport",
            peer = %connection.peer_addr,
            "已建立出站连接"
        );
        Ok(connection)
    }

    /// 把已接受的流包装为帧通道。
    pub(crate) fn from_stream(
        stream: TcpStream,
        max_frame_len: usize,
        operation: &'static str,
    ) -> Result<Self, TransportError> {
        let local_addr = stream
            .local_addr()
            .map_err(|err| map_io_error(operation, err))?;
        let peer_addr = stream
            .peer_addr()
            .map_err(|err| map_io_error(operation, err))?;
        Ok(Self {
            stream,
            buf: BytesMut::with_capacity(READ_CHUNK_CAPACITY),
            max_frame_len,
            local_addr,
            peer_addr,
        })
    }

    /// 本地地址。
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// 对端地址。
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// 读取下一帧载荷。
    pub async fn read_frame(&mut self) -> Result<Option<Bytes>, TransportError> {
        read_frame_from(&mut self.stream, &mut self.buf, self.max_frame_len).await
    }

    /// 写出一帧载荷。
    pub async fn write_frame(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        write_frame_to(&mut self.stream, payload, self.max_frame_len).await
    }

    /// 关闭写方向，通知对端不再有后续帧。
    pub async fn shutdown(&mut self) -> Result<(), TransportError> {
        self.stream
            .shutdown()
            .await
            .map_err(|err| map_io_error(op::SHUTDOWN, err))
    }

    /// 拆分为独立的读写半部，供服务端并行处理。
    pub fn into_split(self) -> (FrameReader, FrameWriter) {
        let (read_half, write_half) = self.stream.into_split();
        (
            FrameReader {
                half: read_half,
                buf: self.buf,
                max_frame_len: self.max_frame_len,
                peer_addr: self.peer_addr,
            },
            FrameWriter {
                half: write_half,
                max_frame_len: self.max_frame_len,
                peer_addr: self.peer_addr,
            },
        )
    }
}

/// 连接的读半部：独占帧读缓冲。
#[derive(Debug)]
pub struct FrameReader {
    half: OwnedReadHalf,
    buf: BytesMut,
    max_frame_len: usize,
    peer_addr: SocketAddr,
}

impl FrameReader {
    /// 对端地址。
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// 读取下一帧载荷。
    pub async fn read_frame(&mut self) -> Result<Option<Bytes>, TransportError> {
        read_frame_from(&mut self.half, &mut self.buf, self.max_frame_len).await
    }
}

/// 连接的写半部。
#[derive(Debug)]
pub struct FrameWriter {
    half: OwnedWriteHalf,
    max_frame_len: usize,
    peer_addr: SocketAddr,
}

impl FrameWriter {
    /// 对端地址。
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// 写出一帧载荷。
    pub async fn write_frame(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        write_frame_to(&mut self.half, payload, self.max_frame_len).await
    }

    /// 关闭写方向。
    pub async fn shutdown(&mut self) -> Result<(), TransportError> {
        self.half
            .shutdown()
            .await
            .map_err(|err| map_io_error(op::SHUTDOWN, err))
    }
}
