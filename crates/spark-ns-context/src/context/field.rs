use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::record::RecordContext;

/// 整数字段在元数据中声明的文本编码。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StringEncoding {
    /// 纯数值，不按字符解释。
    None,
    Utf8,
    Ascii,
}

/// 定宽整数字段的序列化形状。
///
/// # 教案式说明
/// - **意图（Why）**：读端（例如元数据解析器）只依赖这份描述就能解码记录，不需要知道字段来自哪里。
/// - **契约（What）**：`size_bits`、`alignment_bits` 以位为单位；`reverse_byte_order` 为 `false`
///   表示按写入端原生字节序；`base` 只影响展示。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntegerLayout {
    pub size_bits: u32,
    pub alignment_bits: u32,
    pub signed: bool,
    pub reverse_byte_order: bool,
    pub base: u8,
    pub encoding: StringEncoding,
}

impl IntegerLayout {
    /// 对齐要求（字节）。
    pub const fn alignment_bytes(&self) -> usize {
        (self.alignment_bits / 8) as usize
    }

    /// 宽度（字节）。
    pub const fn size_bytes(&self) -> usize {
        (self.size_bits / 8) as usize
    }
}

/// 字段类型。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum FieldType {
    Integer(IntegerLayout),
}

impl FieldType {
    /// 类型的对齐要求（字节）。
    pub const fn alignment_bytes(&self) -> usize {
        match self {
            FieldType::Integer(layout) => layout.alignment_bytes(),
        }
    }
}

/// 非序列化消费者（实时过滤、内省）读取到的标量值。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ContextValue {
    S64(i64),
}

impl ContextValue {
    /// 取出有符号 64 位值。
    pub fn as_s64(&self) -> Option<i64> {
        match self {
            ContextValue::S64(value) => Some(*value),
        }
    }
}

/// 上下文字段的行为钩子，由注册表在事件发射时调用。
///
/// # 教案式说明
/// - **意图（Why）**：注册表只通过这三个钩子与字段交互，字段内部（缓存、内核查询）对它完全不透明。
/// - **契约（What）**：
///   - `size(offset)`：从 `offset` 开始序列化本字段所需字节数，含对齐填充；必须是纯函数；
///   - `record(ctx)`：对齐游标并写入字段值，每个事件至多调用一次；
///   - `value()`：与 `record` 写入的值一致的标量视图。
pub trait ContextFieldProvider: Send + Sync {
    fn size(&self, offset: usize) -> usize;

    fn record(&self, ctx: &mut RecordContext<'_>);

    fn value(&self) -> ContextValue;
}

/// 注册进上下文集合的字段描述符，注册后不可变。
#[derive(Clone)]
pub struct ContextField {
    name: Cow<'static, str>,
    field_type: FieldType,
    provider: Arc<dyn ContextFieldProvider>,
}

impl ContextField {
    /// 组装字段描述。
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        field_type: FieldType,
        provider: Arc<dyn ContextFieldProvider>,
    ) -> Self {
        Self {
            name: name.into(),
            field_type,
            provider,
        }
    }

    /// 字段名，集合内唯一。
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 线格式描述。
    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    /// 从 `offset` 起记录本字段所需的字节数（含填充）。
    pub fn size(&self, offset: usize) -> usize {
        self.provider.size(offset)
    }

    /// 把字段值写入事件记录。
    pub fn record(&self, ctx: &mut RecordContext<'_>) {
        self.provider.record(ctx);
    }

    /// 字段的标量值。
    pub fn value(&self) -> ContextValue {
        self.provider.value()
    }
}

impl fmt::Debug for ContextField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextField")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .finish_non_exhaustive()
    }
}
