#![doc = r#"
# lever-transport-tcp

## 设计动机（Why）
- **定位**：为 Lever 调用运行时提供 Tokio 上的最小 TCP 通道实现，封装
  监听、建连与帧边界处理等底层细节。
- **架构角色**：调用核心（`lever-core`）只面对帧内载荷；本 crate 负责把
  字节流切成帧、把帧写回字节流，是客户端与服务端共用的传输积木。
- **设计理念**：所有网络失败都映射为携带操作标签与稳定错误码的
  [`TransportError`]，让上层无需解析 `io::Error` 文本即可分类处置。

## 核心契约（What）
- **帧格式**：4 字节大端长度前缀 + JSON 载荷；超出配置上限的帧在读写
  两侧都会被拒绝；
- **读语义**：`read_frame` 返回 `Ok(None)` 表示对端在帧边界上干净关闭；
  帧中途断流则是 [`TransportError::Closed`]；
- **并发**：`FrameConnection` 面向单任务顺序使用；服务端需要读写并行时
  以 `into_split` 拆出独立的读写半部。

## 风险与考量（Trade-offs）
- 未提供半关闭与套接字选项调优（对应场景尚未出现）；
- DNS 解析推迟到 `connect` 时由 Tokio 完成，主机名文本原样透传。
"#]

mod connection;
mod error;
mod frame;
mod listener;

pub use connection::{FrameConnection, FrameReader, FrameWriter};
pub use error::TransportError;
pub use frame::LENGTH_PREFIX_LEN;
pub use listener::FrameListener;
