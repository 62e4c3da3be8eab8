//! 事件记录的序列化边界。
//!
//! 环形缓冲区本身由追踪器提供；本模块只描述上下文字段所依赖的最小契约：
//! 在给定偏移写入若干字节，并按对齐要求推进游标。

/// 事件通道的写入原语。
///
/// # 契约（What）
/// - `event_write` 把 `payload` 原样写入当前事件记录中从 `offset` 开始的区域；
/// - 实现不得改写字节序，也不得在 `payload` 之外写入额外字节；
/// - 对齐填充区的内容由实现自行决定，读端不会解释它们。
pub trait EventChannel: Send + Sync {
    fn event_write(&self, offset: usize, payload: &[u8]);
}

/// 使 `offset + padding` 成为 `alignment` 整数倍的最小非负填充字节数。
///
/// `alignment` 必须是 2 的幂；`0` 与 `1` 都视为无对齐要求。
#[inline]
pub const fn align_padding(offset: usize, alignment: usize) -> usize {
    if alignment <= 1 {
        return 0;
    }
    offset.wrapping_neg() & (alignment - 1)
}

/// 单个事件的写入游标。
///
/// 由注册表在事件发射时构造，按字段顺序依次交给各字段的 `record` 钩子。
pub struct RecordContext<'a> {
    channel: &'a dyn EventChannel,
    offset: usize,
}

impl<'a> RecordContext<'a> {
    /// 从 `offset` 开始向 `channel` 写入。
    pub fn new(channel: &'a dyn EventChannel, offset: usize) -> Self {
        Self { channel, offset }
    }

    /// 当前写入偏移。
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// 推进游标到下一个 `alignment` 的整数倍。
    pub fn align(&mut self, alignment: usize) {
        self.offset += align_padding(self.offset, alignment);
    }

    /// 在当前偏移写入并推进游标。
    pub fn write(&mut self, payload: &[u8]) {
        self.channel.event_write(self.offset, payload);
        self.offset += payload.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_reaches_next_multiple() {
        assert_eq!(align_padding(0, 8), 0);
        assert_eq!(align_padding(3, 8), 5);
        assert_eq!(align_padding(8, 8), 0);
        assert_eq!(align_padding(9, 4), 3);
        assert_eq!(align_padding(5, 1), 0);
        assert_eq!(align_padding(5, 0), 0);
    }

    struct Discard;

    impl EventChannel for Discard {
        fn event_write(&self, _offset: usize, _payload: &[u8]) {}
    }

    #[test]
    fn cursor_aligns_then_advances_by_payload() {
        let mut ctx = RecordContext::new(&Discard, 3);
        ctx.align(8);
        assert_eq!(ctx.offset(), 8);
        ctx.write(&[0; 4]);
        assert_eq!(ctx.offset(), 12);
        ctx.align(4);
        assert_eq!(ctx.offset(), 12);
    }
}
