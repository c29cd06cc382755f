//! 线格式契约：CallRequest/CallResponse 的 JSON 表示与形状模型。
//!
//! # 设计目标（Why）
//! - Invocation Client 与 Dispatcher 分属不同进程，线格式是双方唯一共享的
//!   契约：一方编码的内容另一方必须无歧义解码；
//! - 选择 JSON 载荷（serde_json）换取跨语言可读性与演进弹性，帧边界交由
//!   传输层的长度前缀解决，本模块只负责帧内载荷。
//!
//! # 使用方式（How）
//! - 客户端以 [`encode_payload`] 序列化 [`CallRequest`]，服务端以
//!   [`decode_payload`] 还原；响应方向对称；
//! - 注册表通过 [`WireParam`]/[`WireResult`] 在编译期固化每个方法的形状，
//!   [`WireShape`] 则作为形状的运行期投影，供动态注册与错误消息使用。
//!
//! # 风险与权衡（Trade-offs）
//! - `f64` 承载整数会丢失超出 2^53 的精度，与 JSON 的数值模型一致；
//! - 响应同时携带 `result` 与 `error` 属于协议违规，解码侧以错误臂优先，
//!   保证“带内错误不可能被误读为成功”。

use core::fmt;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::{RemoteError, WireError};

/// 单帧载荷的默认上限（4 MiB）。
///
/// - **意图 (Why)**：没有上限的帧会让单个恶意或异常调用吃掉服务端内存；
/// - **契约 (What)**：客户端与服务端各自持有配置值，双方不要求一致，
///   超限的一侧先失败。
pub const DEFAULT_MAX_FRAME_LEN: usize = 4 * 1024 * 1024;

/// 一次调用的请求载荷。
///
/// # 教案式注释
/// - **意图 (Why)**：方法名 + 有序位置实参即可完整描述一次调用；`id` 用于
///   在多路复用连接与日志两侧关联请求与响应；
/// - **契约 (What)**：`args` 的顺序即方法声明的参数顺序；本类型构造后
///   不再修改，往返于线格式时字段一一对应；
/// - **风险 (Trade-offs)**：`id` 由客户端分配，仅要求在单连接内不重复，
///   不承担全局唯一职责。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallRequest {
    /// 连接内唯一的请求标识。
    pub id: u64,
    /// 目标方法名。
    pub method: String,
    /// 有序位置实参。
    pub args: Vec<Value>,
}

/// 一次调用的响应载荷：结果值或带内错误，二选一。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallResponse {
    /// 对应请求的标识。
    pub id: u64,
    /// 成功结果；与 `error` 互斥。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// 带内错误；与 `result` 互斥。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RemoteError>,
}

impl CallResponse {
    /// 构造成功响应。
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    /// 构造带内错误响应。
    pub fn failure(id: u64, error: RemoteError) -> Self {
        Self {
            id,
            result: None,
            error: Some(error),
        }
    }

    /// 把响应裁决为结果或带内错误。
    ///
    /// # 契约说明（What）
    /// - 错误臂优先：若两个字段同时出现（协议违规），以错误为准；
    /// - 两者皆缺省时视为 `null` 结果，对应“无返回值方法”的线格式。
    pub fn into_outcome(self) -> Result<Value, RemoteError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// 线格式可表达的形状集合。
///
/// # 教案式注释
/// - **意图 (Why)**：注册表需要在运行期描述每个方法的参数与结果形状，
///   既用于签名校验（拒绝不可编码的声明），也用于实参解码失败时的
///   错误消息；
/// - **契约 (What)**：除 [`Opaque`](WireShape::Opaque) 外均可编码；
///   `Opaque` 表示“声明了但没有定义序列化”的形状，注册期即拒绝；
/// - **风险 (Trade-offs)**：形状模型刻意比 JSON 类型系统粗——`Integer`
///   与 `Float` 不在解码层强制区分，最终裁决交给 serde 的目标类型。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WireShape {
    /// 显式空值。
    Null,
    /// 布尔。
    Bool,
    /// 整数。
    Integer,
    /// 浮点数。
    Float,
    /// 文本。
    Text,
    /// 有序列表。
    List,
    /// 字符串键记录。
    Record,
    /// 任意 JSON 值，透传不校验。
    Any,
    /// 无序列化定义的形状，注册期拒绝。
    Opaque,
}

impl WireShape {
    /// 形状的稳定文本名。
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Text => "text",
            Self::List => "list",
            Self::Record => "record",
            Self::Any => "any",
            Self::Opaque => "opaque",
        }
    }

    /// 该形状是否可在线格式中编码。
    pub const fn is_encodable(self) -> bool {
        !matches!(self, Self::Opaque)
    }
}

impl fmt::Display for WireShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 可作为方法参数的类型：自带解码逻辑与形状描述。
pub trait WireParam: DeserializeOwned + Send + 'static {
    /// 该类型在线格式中的形状。
    const SHAPE: WireShape;
}

/// 可作为方法结果的类型：自带编码逻辑与形状描述。
pub trait WireResult: Serialize + Send + 'static {
    /// 该类型在线格式中的形状。
    const SHAPE: WireShape;
}

macro_rules! impl_wire_scalar {
    ($($ty:ty => $shape:expr,)*) => {
        $(
            impl WireParam for $ty {
                const SHAPE: WireShape = $shape;
            }
            impl WireResult for $ty {
                const SHAPE: WireShape = $shape;
            }
        )*
    };
}

impl_wire_scalar! {
    bool => WireShape::Bool,
    i32 => WireShape::Integer,
    i64 => WireShape::Integer,
    u32 => WireShape::Integer,
    u64 => WireShape::Integer,
    f64 => WireShape::Float,
    String => WireShape::Text,
    Value => WireShape::Any,
}

impl WireResult for () {
    const SHAPE: WireShape = WireShape::Null;
}

impl<T: WireParam> WireParam for Vec<T> {
    const SHAPE: WireShape = WireShape::List;
}

impl<T: WireResult> WireResult for Vec<T> {
    const SHAPE: WireShape = WireShape::List;
}

impl<T: WireParam> WireParam for std::collections::HashMap<String, T> {
    const SHAPE: WireShape = WireShape::Record;
}

impl<T: WireResult> WireResult for std::collections::HashMap<String, T> {
    const SHAPE: WireShape = WireShape::Record;
}

// 可缺省参数：形状沿用内层类型，`null` 解码为 `None`。
impl<T: WireParam> WireParam for Option<T> {
    const SHAPE: WireShape = T::SHAPE;
}

impl<T: WireResult> WireResult for Option<T> {
    const SHAPE: WireShape = T::SHAPE;
}

/// 把消息序列化为帧内载荷字节。
pub fn encode_payload<T: Serialize>(message: &T) -> Result<Vec<u8>, WireError> {
    Ok(serde_json::to_vec(message)?)
}

/// 把帧内载荷字节还原为消息。
pub fn decode_payload<T: DeserializeOwned>(payload: &[u8]) -> Result<T, WireError> {
    Ok(serde_json::from_slice(payload)?)
}
