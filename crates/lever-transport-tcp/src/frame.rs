//! 帧边界处理：长度前缀的增量切分与封装。
//!
//! # 设计目标（Why）
//! - 切分逻辑是纯字节运算，独立于套接字便于穷举测试；
//! - 读写两侧共用同一个上限判断，保证“先失败的一侧”行为对称。

use bytes::{Buf, BufMut, Bytes, BytesMut};

use lever_core::error::WireError;

/// 长度前缀字节数（大端 `u32`）。
pub const LENGTH_PREFIX_LEN: usize = 4;

/// 从累积缓冲中切出一个完整帧的载荷。
///
/// # 契约说明（What）
/// - 返回 `Ok(None)` 表示数据尚不完整，调用方应继续读取；
/// - 声明长度超过 `max_frame_len` 立即返回 [`WireError::FrameOverflow`]，
///   不等待载荷到齐——这是对超限帧的快速拒绝路径；
/// - 成功切出时长度前缀一并从缓冲中消费。
pub(crate) fn split_frame(
    buf: &mut BytesMut,
    max_frame_len: usize,
) -> Result<Option<Bytes>, WireError> {
    if buf.len() < LENGTH_PREFIX_LEN {
        return Ok(None);
    }
    let mut prefix = [0_u8; LENGTH_PREFIX_LEN];
    prefix.copy_from_slice(&buf[..LENGTH_PREFIX_LEN]);
    let declared = u32::from_be_bytes(prefix) as usize;
    if declared > max_frame_len {
        return Err(WireError::FrameOverflow {
            len: declared,
            max: max_frame_len,
        });
    }
    if buf.len() < LENGTH_PREFIX_LEN + declared {
        return Ok(None);
    }
    buf.advance(LENGTH_PREFIX_LEN);
    Ok(Some(buf.split_to(declared).freeze()))
}

/// 把载荷封装为“长度前缀 + 载荷”的完整帧。
pub(crate) fn frame_payload(payload: &[u8], max_frame_len: usize) -> Result<Bytes, WireError> {
    if payload.len() > max_frame_len || payload.len() > u32::MAX as usize {
        return Err(WireError::FrameOverflow {
            len: payload.len(),
            max: max_frame_len,
        });
    }
    let mut framed = BytesMut::with_capacity(LENGTH_PREFIX_LEN + payload.len());
    framed.put_u32(payload.len() as u32);
    framed.put_slice(payload);
    Ok(framed.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 64;

    /// 封帧后再切分应还原原始载荷，且缓冲被完整消费。
    #[test]
    fn framing_round_trips_and_consumes_the_buffer() {
        let framed = frame_payload(b"hello", MAX).expect("载荷应可封帧");
        let mut buf = BytesMut::from(&framed[..]);
        let payload = split_frame(&mut buf, MAX)
            .expect("切分应成功")
            .expect("帧应完整");
        assert_eq!(&payload[..], b"hello");
        assert!(buf.is_empty(), "前缀与载荷应被一并消费");
    }

    /// 不完整数据返回 `None`，且不消费任何字节。
    #[test]
    fn partial_frames_wait_for_more_bytes() {
        let framed = frame_payload(b"hello", MAX).expect("载荷应可封帧");
        let mut buf = BytesMut::from(&framed[..framed.len() - 2]);
        let before = buf.len();
        assert!(
            split_frame(&mut buf, MAX).expect("切分应成功").is_none(),
            "载荷未到齐时应继续等待"
        );
        assert_eq!(buf.len(), before, "等待期间不得消费缓冲");
    }

    /// 一个缓冲内的多个帧可以被依次切出。
    #[test]
    fn back_to_back_frames_split_in_order() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&frame_payload(b"first", MAX).expect("封帧应成功"));
        buf.extend_from_slice(&frame_payload(b"second", MAX).expect("封帧应成功"));

        let first = split_frame(&mut buf, MAX).expect("切分应成功").expect("应有帧");
        let second = split_frame(&mut buf, MAX).expect("切分应成功").expect("应有帧");
        assert_eq!(&first[..], b"first");
        assert_eq!(&second[..], b"second");
        assert!(split_frame(&mut buf, MAX).expect("切分应成功").is_none());
    }

    /// 声明长度超限应立即拒绝，不等待载荷到齐。
    #[test]
    fn oversized_declarations_fail_fast() {
        let mut buf = BytesMut::new();
        buf.put_u32((MAX as u32) + 1);
        assert!(
            matches!(
                split_frame(&mut buf, MAX),
                Err(WireError::FrameOverflow { .. })
            ),
            "超限声明应直接失败"
        );
        assert!(
            matches!(
                frame_payload(&[0_u8; MAX + 1], MAX),
                Err(WireError::FrameOverflow { .. })
            ),
            "写侧同样拒绝超限载荷"
        );
    }
}
