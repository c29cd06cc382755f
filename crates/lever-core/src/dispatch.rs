//! # Dispatcher：入站请求的裁决器
//!
//! ## 核心意图（Why）
//! - 把“应用错误”与“协议/传输错误”的分界固化在一个位置：方法缺失、实参
//!   形状不符、处理器业务失败都以带内 CallResponse 返回给远端调用方；只有
//!   请求本身不可解码时才升级为连接级的 [`ProtocolError`]；
//! - 分发器跨调用无状态，唯一依赖是只读的 [`HandlerRegistry`]，因此天然
//!   支持任意并发调用。
//!
//! ## 行为契约（What）
//! - [`Dispatcher::dispatch`]：原始载荷 → 响应载荷，内部依次完成请求解码、
//!   方法查找、实参裁决、调用与结果编码；
//! - 单个请求的失败只影响该请求（或该连接），绝不波及其他在途分发。
//!
//! ## 风险提示（Trade-offs）
//! - 响应编码失败（理论上仅在结果含非法浮点等极端情形出现）同样升级为
//!   [`ProtocolError`]，由传输层决定关闭策略。

use std::sync::Arc;

use tracing::debug;

use crate::error::{InvokeFault, ProtocolError, RemoteError, codes};
use crate::registry::HandlerRegistry;
use crate::wire::{CallRequest, CallResponse, decode_payload, encode_payload};

/// 将原始请求载荷裁决为响应载荷的无状态分发器。
#[derive(Clone, Debug)]
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
}

impl Dispatcher {
    /// 以只读注册表构造分发器。
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }

    /// 共享的注册表视图。
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// 解码请求帧载荷。
    ///
    /// - **契约 (What)**：失败即 [`ProtocolError::MalformedRequest`]——此时
    ///   没有可信的请求 ID，无法构造带内响应，调用方应关闭当前连接。
    pub fn decode_request(&self, payload: &[u8]) -> Result<CallRequest, ProtocolError> {
        decode_payload(payload).map_err(ProtocolError::MalformedRequest)
    }

    /// 裁决一个已解码的请求，恒产出带内响应。
    ///
    /// # 执行逻辑（How）
    /// 1. 按名查方法，缺失 → `dispatch.method_not_found`；
    /// 2. 比对实参数量与签名元数，不符 → `dispatch.argument_decode`；
    /// 3. 交给 invoker 闭包：形状解码失败、结果编码失败、处理器业务失败
    ///    分别映射到各自稳定码；
    /// 4. 成功结果装入响应的结果臂。
    pub async fn dispatch_request(&self, request: CallRequest) -> CallResponse {
        let CallRequest { id, method, args } = request;

        let Some(handler) = self.registry.get(&method) else {
            debug!(target: "lever::dispatch", %method, id, "请求命中未注册的方法");
            return CallResponse::failure(
                id,
                RemoteError::new(
                    codes::DISPATCH_METHOD_NOT_FOUND,
                    format!("method `{method}` is not registered"),
                ),
            );
        };

        let expected = handler.signature().arity();
        if args.len() != expected {
            return CallResponse::failure(
                id,
                RemoteError::new(
                    codes::DISPATCH_ARGUMENT_DECODE,
                    format!(
                        "method `{method}` expects {expected} arguments, received {}",
                        args.len()
                    ),
                ),
            );
        }

        match handler.invoke(args).await {
            Ok(result) => CallResponse::success(id, result),
            Err(InvokeFault::ArgumentDecode {
                index,
                expected,
                detail,
            }) => CallResponse::failure(
                id,
                RemoteError::new(
                    codes::DISPATCH_ARGUMENT_DECODE,
                    format!(
                        "method `{method}` argument {index} does not match shape `{expected}`: {detail}"
                    ),
                ),
            ),
            Err(InvokeFault::ResultEncode { detail }) => CallResponse::failure(
                id,
                RemoteError::new(
                    codes::DISPATCH_RESULT_ENCODE,
                    format!("method `{method}` produced an unencodable result: {detail}"),
                ),
            ),
            Err(InvokeFault::Application(err)) => {
                debug!(target: "lever::dispatch", %method, id, error = %err, "处理器报告业务失败");
                CallResponse::failure(
                    id,
                    RemoteError::new(codes::APP_HANDLER_FAILURE, err.message().to_owned()),
                )
            }
        }
    }

    /// 原始请求载荷 → 原始响应载荷的一站式入口。
    pub async fn dispatch(&self, payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        let request = self.decode_request(payload)?;
        let response = self.dispatch_request(request).await;
        encode_payload(&response).map_err(ProtocolError::ResponseEncode)
    }
}
