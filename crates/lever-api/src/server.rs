//! # Server Endpoint：注册面与服务循环
//!
//! ## 核心意图（Why）
//! - 把“注册期”与“服务期”在类型上分开：[`Server`] 只提供注册与配置，
//!   [`Server::bind`] 消耗自身换取 [`BoundServer`]，后者没有注册入口——
//!   “注册必须发生在端点收包之前”由所有权规则背书；
//! - 每个入站请求独立分发：同一连接上的多个帧、不同连接上的请求互不
//!   阻塞，在途总量由信号量约束。
//!
//! ## 行为契约（What）
//! - 每连接拆出读写半部：读循环顺序解帧，分发任务并发执行，响应统一
//!   经写任务串行写回，并发分发不会交错字节；
//! - 请求不可解码时关闭当前连接（协议故障），其余连接与在途请求不受
//!   影响；单个请求的带内错误只影响该请求。
//!
//! ## 风险提示（Trade-offs）
//! - 信号量在帧解码之后申请：恶意连接仍可囤积已读帧的内存，上限由
//!   `max_frame_len` 与连接数共同约束；
//! - 无服务端取消机制：客户端超时放弃后，在途分发仍会跑完，结果写入
//!   已关闭的连接时被丢弃。

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, info, warn};

use lever_core::dispatch::Dispatcher;
use lever_core::error::{RegistryError, RemoteError, codes};
use lever_core::registry::{HandlerFn, HandlerObject, HandlerRegistry, MethodSignature, RawInvoker};
use lever_core::wire::{CallResponse, encode_payload};
use lever_transport_tcp::{FrameConnection, FrameListener};

use crate::config::ServerConfig;
use crate::error::ServeError;

const RESPONSE_QUEUE_DEPTH: usize = 32;

/// 注册期的服务端：收集方法，尚未触网。
///
/// # 教案式注释
/// - **契约 (What)**：注册失败即启动失败，调用方应以 `?` 中止进程；
/// - **风险 (Trade-offs)**：注册入口接受 `&self`（注册表内部分片加锁），
///   但批量注册的原子性只在启动期单线程注册的部署契约下成立。
#[derive(Debug)]
pub struct Server {
    registry: Arc<HandlerRegistry>,
    config: ServerConfig,
}

impl Server {
    /// 以配置构造空服务端。
    pub fn new(config: ServerConfig) -> Self {
        Self {
            registry: Arc::new(HandlerRegistry::new()),
            config,
        }
    }

    /// 类型化注册单个方法。
    pub fn register<Args, F>(&self, name: &str, handler: F) -> Result<(), RegistryError>
    where
        F: HandlerFn<Args>,
    {
        self.registry.register(name, handler)
    }

    /// 批量注册一个 handler 对象暴露的全部方法。
    pub fn register_object<H>(&self, object: Arc<H>) -> Result<(), RegistryError>
    where
        H: HandlerObject,
    {
        self.registry.register_object(object)
    }

    /// 以显式签名注册动态方法。
    pub fn register_raw(
        &self,
        name: &str,
        signature: MethodSignature,
        invoker: RawInvoker,
    ) -> Result<(), RegistryError> {
        self.registry.register_raw(name, signature, invoker)
    }

    /// 注册表只读视图。
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// 绑定监听地址，进入服务期。
    pub async fn bind(self) -> Result<BoundServer, ServeError> {
        let listener = FrameListener::bind(
            &self.config.bind().authority(),
            self.config.max_frame_len(),
        )
        .await?;
        info!(
            target: "lever::server",
            addr = %listener.local_addr(),
            methods = ?self.registry.names(),
            "服务端点已绑定"
        );
        Ok(BoundServer {
            listener,
            dispatcher: Arc::new(Dispatcher::new(self.registry)),
            limiter: Arc::new(Semaphore::new(self.config.max_in_flight())),
        })
    }

    /// 绑定并立即进入服务循环的便捷入口。
    pub async fn serve(self) -> Result<(), ServeError> {
        self.bind().await?.serve().await
    }
}

/// 服务期的端点：只接受连接与分发，不再接受注册。
#[derive(Debug)]
pub struct BoundServer {
    listener: FrameListener,
    dispatcher: Arc<Dispatcher>,
    limiter: Arc<Semaphore>,
}

impl BoundServer {
    /// 实际监听地址（`…:0` 绑定后由此取回真实端口）。
    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    /// 服务循环：逐连接派生处理任务，循环自身不阻塞于任何单个连接。
    pub async fn serve(self) -> Result<(), ServeError> {
        loop {
            let (connection, peer) = self.listener.accept().await?;
            debug!(target: "lever::server", %peer, "接受入站连接");
            let dispatcher = Arc::clone(&self.dispatcher);
            let limiter = Arc::clone(&self.limiter);
            tokio::spawn(serve_connection(connection, peer, dispatcher, limiter));
        }
    }
}

/// 单连接的读循环与响应写回。
///
/// # 执行逻辑（How）
/// 1. 拆分读写半部；写半部由独立任务独占，响应经 mpsc 队列串行化；
/// 2. 读循环逐帧解码请求：解码失败关闭连接，成功则在信号量额度内
///    派生独立的分发任务；
/// 3. 读循环结束（对端关闭或协议故障）后丢弃发送端，写任务随队列
///    排空自然退出。
async fn serve_connection(
    connection: FrameConnection,
    peer: SocketAddr,
    dispatcher: Arc<Dispatcher>,
    limiter: Arc<Semaphore>,
) {
    let (mut reader, mut writer) = connection.into_split();
    let (response_tx, mut response_rx) = mpsc::channel::<Vec<u8>>(RESPONSE_QUEUE_DEPTH);

    let writer_task = tokio::spawn(async move {
        while let Some(payload) = response_rx.recv().await {
            if let Err(err) = writer.write_frame(&payload).await {
                warn!(
                    target: "lever::server",
                    peer = %writer.peer_addr(),
                    error = %err,
                    "响应写回失败，停止该连接的写任务"
                );
                break;
            }
        }
    });

    loop {
        let payload = match reader.read_frame().await {
            Ok(Some(payload)) => payload,
            Ok(None) => break,
            Err(err) => {
                warn!(
                    target: "lever::server",
                    %peer,
                    error = %err,
                    code = err.code(),
                    "连接读取失败，关闭该连接"
                );
                break;
            }
        };

        let request = match dispatcher.decode_request(&payload) {
            Ok(request) => request,
            Err(err) => {
                // 没有可信的请求 ID，无法带内回错，只能按协议故障关闭连接。
                warn!(
                    target: "lever::server",
                    %peer,
                    error = %err,
                    code = err.code(),
                    "请求不可解码，关闭该连接"
                );
                break;
            }
        };

        let permit = match Arc::clone(&limiter).acquire_owned().await {
            Ok(permit) => permit,
            Err(_closed) => break,
        };
        let dispatcher = Arc::clone(&dispatcher);
        let response_tx = response_tx.clone();
        tokio::spawn(async move {
            let _permit = permit;
            let response = dispatcher.dispatch_request(request).await;
            let id = response.id;
            let payload = match encode_payload(&response) {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(
                        target: "lever::server",
                        id,
                        error = %err,
                        "响应编码失败，降级为带内错误"
                    );
                    let fallback = CallResponse::failure(
                        id,
                        RemoteError::new(
                            codes::PROTOCOL_RESPONSE_ENCODE,
                            "call response failed to encode",
                        ),
                    );
                    match encode_payload(&fallback) {
                        Ok(payload) => payload,
                        Err(_) => return,
                    }
                }
            };
            // 发送失败说明连接已收尾，结果按取消语义丢弃。
            let _ = response_tx.send(payload).await;
        });
    }

    drop(response_tx);
    let _ = writer_task.await;
}
