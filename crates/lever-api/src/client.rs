//! # Invocation Client：远程方法的本地调用门面
//!
//! ## 核心意图（Why）
//! - 复刻“像调用本地函数一样调用远端方法”的使用面：构造客户端、按
//!   {环境, 服务} 取句柄、以方法名加位置实参发起调用、把结果绑定进
//!   调用方给定的类型；
//! - 错误映射是本模块的第二职责：应用错误、传输失败与解析失败必须以
//!   互斥的 [`InvokeError`] 臂到达调用方。
//!
//! ## 行为契约（What）
//! - `invoke` 从调用方视角是阻塞语义（`async fn` 等待完成）；并发调用方
//!   可以各自持有克隆的句柄同时发起调用，互不影响；
//! - 单次调用独占一条连接，超时后放弃等待——服务端可能仍在执行，结果
//!   被丢弃；
//! - 客户端不做任何自动重试。
//!
//! ## 风险提示（Trade-offs）
//! - 连接不复用，吞吐敏感场景的连接池属于上层扩展，不在本门面承诺内。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::timeout;
use tracing::debug;

use lever_core::address::{ResolvedEndpoint, ServiceAddress};
use lever_core::wire::{CallRequest, CallResponse, decode_payload, encode_payload};
use lever_transport_tcp::{FrameConnection, TransportError};

use crate::config::ClientConfig;
use crate::error::InvokeError;
use crate::locator::{Discovery, ServiceLocator};

struct ClientInner {
    config: ClientConfig,
    locator: ServiceLocator,
    next_call_id: AtomicU64,
}

/// Lever 客户端：句柄工厂与调用执行器。
///
/// # 教案式注释
/// - **契约 (What)**：克隆成本为一次 `Arc` 引用计数；所有克隆共享定位器
///   缓存与调用序号；
/// - **风险 (Trade-offs)**：未设置强制主机且未注入发现后端时，客户端可以
///   构造成功，但所有调用都会以
///   [`ResolveError::NoDiscovery`](crate::error::ResolveError::NoDiscovery)
///   失败——配置错误在首个调用点暴露。
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// 构造无发现后端的客户端（配合强制主机用于本地开发）。
    pub fn new(config: ClientConfig) -> Self {
        Self::build(config, None)
    }

    /// 构造带发现后端的客户端。
    pub fn with_discovery(config: ClientConfig, discovery: Arc<dyn Discovery>) -> Self {
        Self::build(config, Some(discovery))
    }

    fn build(config: ClientConfig, discovery: Option<Arc<dyn Discovery>>) -> Self {
        let locator = ServiceLocator::new(
            config.force_host().cloned(),
            discovery,
            config.resolve_ttl(),
        );
        Self {
            inner: Arc::new(ClientInner {
                config,
                locator,
                next_call_id: AtomicU64::new(1),
            }),
        }
    }

    /// 取 {environment, service} 的调用句柄。
    pub fn service(&self, environment: &str, service: &str) -> ServiceHandle {
        ServiceHandle {
            client: self.clone(),
            address: ServiceAddress::new(environment, service),
        }
    }

    /// 解析器视图（测试与诊断用）。
    pub fn locator(&self) -> &ServiceLocator {
        &self.inner.locator
    }

    async fn invoke_value(
        &self,
        address: &ServiceAddress,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, InvokeError> {
        let endpoint = self.inner.locator.resolve(address).await?;
        let id = self.inner.next_call_id.fetch_add(1, Ordering::Relaxed);
        let request = CallRequest {
            id,
            method: method.to_owned(),
            args,
        };
        let limit = self.inner.config.invoke_timeout();
        debug!(
            target: "lever::client",
            %address,
            method,
            id,
            endpoint = %endpoint,
            "发起调用"
        );
        match timeout(limit, self.round_trip(&endpoint, &request)).await {
            Ok(outcome) => outcome,
            Err(_elapsed) => Err(InvokeError::Transport(TransportError::Timeout {
                operation: "invoke",
                after: limit,
            })),
        }
    }

    /// 一次“建连 → 写请求 → 读响应”的完整往返。
    async fn round_trip(
        &self,
        endpoint: &ResolvedEndpoint,
        request: &CallRequest,
    ) -> Result<Value, InvokeError> {
        let max_frame_len = self.inner.config.max_frame_len();
        let payload =
            encode_payload(request).map_err(|err| InvokeError::Transport(err.into()))?;

        let mut connection =
            FrameConnection::connect(&endpoint.authority(), max_frame_len).await?;
        connection.write_frame(&payload).await?;

        let response_payload = connection
            .read_frame()
            .await?
            .ok_or(InvokeError::Transport(TransportError::Closed))?;
        let response: CallResponse =
            decode_payload(&response_payload).map_err(|err| InvokeError::MalformedResponse {
                detail: err.to_string(),
            })?;
        if response.id != request.id {
            return Err(InvokeError::MalformedResponse {
                detail: format!(
                    "response id {} does not match request id {}",
                    response.id, request.id
                ),
            });
        }
        response.into_outcome().map_err(InvokeError::Application)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// 绑定到单个逻辑地址的调用句柄。
#[derive(Clone, Debug)]
pub struct ServiceHandle {
    client: Client,
    address: ServiceAddress,
}

impl ServiceHandle {
    /// 句柄绑定的逻辑地址。
    pub fn address(&self) -> &ServiceAddress {
        &self.address
    }

    /// 以方法名与位置实参发起调用，把结果绑定为 `R`。
    ///
    /// # 契约说明（What）
    /// - `args` 为实参元组（零到四元）或显式的 `Vec<Value>`；
    /// - 成功时结果经 serde 解码进 `R`；解码失败以
    ///   [`InvokeError::ResultDecode`] 报告——此时方法已经执行；
    /// - 带内错误映射为 [`InvokeError::Application`]，其余失败均属
    ///   传输/解析类。
    pub async fn invoke<A, R>(&self, method: &str, args: A) -> Result<R, InvokeError>
    where
        A: IntoWireArgs,
        R: DeserializeOwned,
    {
        let value = self
            .client
            .invoke_value(&self.address, method, args.into_wire_args()?)
            .await?;
        serde_json::from_value(value).map_err(|err| InvokeError::ResultDecode {
            detail: err.to_string(),
        })
    }
}

/// 实参集合到线格式的转换。
///
/// - **意图 (Why)**：位置实参在调用点以元组书写最自然；动态场景可直接
///   给 `Vec<Value>`；
/// - **契约 (What)**：编码失败以 [`InvokeError::ArgumentEncode`] 报告，
///   调用不会发出。
pub trait IntoWireArgs {
    /// 转换为有序的线格式实参。
    fn into_wire_args(self) -> Result<Vec<Value>, InvokeError>;
}

impl IntoWireArgs for Vec<Value> {
    fn into_wire_args(self) -> Result<Vec<Value>, InvokeError> {
        Ok(self)
    }
}

impl IntoWireArgs for () {
    fn into_wire_args(self) -> Result<Vec<Value>, InvokeError> {
        Ok(Vec::new())
    }
}

macro_rules! impl_into_wire_args {
    ($(($index:tt, $ty:ident)),+) => {
        impl<$($ty: Serialize),+> IntoWireArgs for ($($ty,)+) {
            fn into_wire_args(self) -> Result<Vec<Value>, InvokeError> {
                Ok(vec![
                    $(
                        serde_json::to_value(self.$index).map_err(|err| {
                            InvokeError::ArgumentEncode {
                                index: $index,
                                detail: err.to_string(),
                            }
                        })?,
                    )+
                ])
            }
        }
    };
}

impl_into_wire_args!((0, A1));
impl_into_wire_args!((0, A1), (1, A2));
impl_into_wire_args!((0, A1), (1, A2), (2, A3));
impl_into_wire_args!((0, A1), (1, A2), (2, A3), (3, A4));

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// 元组实参按位置编码为有序 JSON 数组。
    #[test]
    fn tuple_args_encode_in_positional_order() {
        let args = ("world", 42_i64, true)
            .into_wire_args()
            .expect("元组应可编码");
        assert_eq!(args, vec![json!("world"), json!(42), json!(true)]);

        assert!(
            ().into_wire_args().expect("空元组应可编码").is_empty(),
            "零实参应编码为空数组"
        );
    }
}
