use crate::error::ContextError;
use crate::record::{RecordContext, align_padding};

use super::field::ContextField;

/// 追踪上下文集合：按顺序排列、随每个事件序列化的字段列表。
///
/// # 教案式说明
/// - **意图（Why）**：以显式拥有的集合代替进程级全局表，注册逻辑可以在测试中独立构造、独立断言。
/// - **逻辑（How）**：
///   - 增长走 [`ContextSet::reserve_slot`]，先 `try_reserve` 再交由调用方决定提交或回滚；
///   - 每次结构变化后调用 [`ContextSet::update`]，刷新最大对齐并推进布局代数，
///     事件侧据此判断缓存的偏移表是否过期。
/// - **契约（What）**：字段名在集合内唯一；集合只通过 `&mut` 修改，共享策略由持有者决定。
#[derive(Debug, Default)]
pub struct ContextSet {
    fields: Vec<ContextField>,
    capacity_limit: Option<usize>,
    largest_align: usize,
    layout_generation: u64,
}

impl ContextSet {
    /// 空集合，不限容量。
    pub fn new() -> Self {
        Self::default()
    }

    /// 限制集合最多容纳 `limit` 个字段，超出时注册返回 [`ContextError::OutOfMemory`]。
    pub fn with_capacity_limit(limit: usize) -> Self {
        Self {
            capacity_limit: Some(limit),
            ..Self::default()
        }
    }

    /// 容量上限；`None` 表示只受分配器约束。
    pub fn capacity_limit(&self) -> Option<usize> {
        self.capacity_limit
    }

    /// 已注册字段数。
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// 是否尚无字段。
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 按注册顺序排列的全部字段。
    pub fn fields(&self) -> &[ContextField] {
        &self.fields
    }

    /// 按名称查找字段。
    pub fn find(&self, name: &str) -> Option<&ContextField> {
        self.fields.iter().find(|field| field.name() == name)
    }

    /// 为一个新字段预留位置。
    ///
    /// 返回的 [`SlotReservation`] 被丢弃而未提交时，集合内容保持不变。
    pub fn reserve_slot(&mut self) -> Result<SlotReservation<'_>, ContextError> {
        let requested = self.fields.len() + 1;
        if self.capacity_limit.is_some_and(|limit| requested > limit) {
            return Err(ContextError::OutOfMemory { requested });
        }
        self.fields
            .try_reserve(1)
            .map_err(|_| ContextError::OutOfMemory { requested })?;
        Ok(SlotReservation { set: self })
    }

    /// 按名称移除字段并刷新布局；返回被移除的字段。
    pub fn remove(&mut self, name: &str) -> Option<ContextField> {
        let position = self.fields.iter().position(|field| field.name() == name)?;
        let removed = self.fields.remove(position);
        self.update();
        Some(removed)
    }

    /// 重新计算布局相关的派生状态。
    ///
    /// 每次调用都会推进 [`ContextSet::layout_generation`]，即便字段集合未变。
    pub fn update(&mut self) {
        self.largest_align = self
            .fields
            .iter()
            .map(|field| field.field_type().alignment_bytes())
            .max()
            .unwrap_or(1)
            .max(1);
        self.layout_generation = self.layout_generation.wrapping_add(1);
    }

    /// 全部字段中最大的对齐要求（字节），事件头据此对齐上下文区。
    pub fn largest_align(&self) -> usize {
        self.largest_align.max(1)
    }

    /// 布局代数，每次 [`ContextSet::update`] 递增。
    pub fn layout_generation(&self) -> u64 {
        self.layout_generation
    }

    /// 从 `start` 开始依次排布全部字段，得到各字段起始偏移与总长度。
    pub fn layout(&self, start: usize) -> ContextLayout {
        let mut offsets = Vec::with_capacity(self.fields.len());
        let mut cursor = start;
        for field in &self.fields {
            let size = field.size(cursor);
            let padding = align_padding(cursor, field.field_type().alignment_bytes());
            offsets.push(cursor + padding);
            cursor += size;
        }
        ContextLayout {
            start,
            offsets,
            end: cursor,
            generation: self.layout_generation,
        }
    }

    /// 按注册顺序记录全部字段。
    pub fn record_all(&self, ctx: &mut RecordContext<'_>) {
        for field in &self.fields {
            field.record(ctx);
        }
    }
}

/// 集合中一个已预留但尚未填充的字段槽位。
///
/// 提交前可通过 [`SlotReservation::set`] 查询集合现状；丢弃即回滚。
#[must_use = "未提交的槽位在丢弃时自动释放"]
pub struct SlotReservation<'a> {
    set: &'a mut ContextSet,
}

impl SlotReservation<'_> {
    /// 提交前的集合现状。
    pub fn set(&self) -> &ContextSet {
        self.set
    }

    /// 填充槽位；不会触发布局刷新，调用方需随后调用 [`ContextSet::update`]。
    pub fn commit(self, field: ContextField) {
        self.set.fields.push(field);
    }
}

/// 一次布局计算的结果。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextLayout {
    pub start: usize,
    /// 各字段对齐后的起始偏移，顺序与集合一致。
    pub offsets: Vec<usize>,
    pub end: usize,
    /// 计算时集合的布局代数。
    pub generation: u64,
}

impl ContextLayout {
    /// 上下文区总字节数（含填充）。
    pub fn total_size(&self) -> usize {
        self.end - self.start
    }

    /// 集合在本次计算之后是否又经历过 [`ContextSet::update`]。
    pub fn is_stale(&self, set: &ContextSet) -> bool {
        self.generation != set.layout_generation()
    }
}
