use std::sync::Arc;

use crate::error::ContextError;
use crate::namespace::{
    INODE_ALIGN, INODE_SIGNED, INODE_SIZE, NamespaceCache, NamespaceKind, NamespaceResolver,
    ProcfsResolver,
};
use crate::record::{RecordContext, align_padding};

use super::field::{
    ContextField, ContextFieldProvider, ContextValue, FieldType, IntegerLayout, StringEncoding,
};
use super::set::ContextSet;

/// 命名空间标识在事件记录中的线格式：`ino_t` 原生宽度、原生对齐、平台符号约定、
/// 不反转字节序、十进制展示、无文本编码。
pub const NAMESPACE_INODE_LAYOUT: IntegerLayout = IntegerLayout {
    size_bits: (INODE_SIZE * 8) as u32,
    alignment_bits: (INODE_ALIGN * 8) as u32,
    signed: INODE_SIGNED,
    reverse_byte_order: false,
    base: 10,
    encoding: StringEncoding::None,
};

/// 把线程级命名空间缓存适配为上下文字段。
///
/// # 教案式说明
/// - **意图（Why）**：注册表只认识 [`ContextFieldProvider`] 的三个钩子；本适配器把它们接到
///   [`NamespaceCache::get`] 上，使任意事件都能携带命名空间标识。
/// - **逻辑（How）**：`size` 只依赖偏移与固定宽度/对齐；`record` 与 `value` 走缓存，因而同一
///   线程在两次失效之间看到的值完全一致。
/// - **契约（What）**：解析失败时写入与返回的都是 `UNAVAILABLE`（`0`），读端将其渲染为“未知”，
///   而不是缺失或损坏的字段。
#[derive(Debug)]
pub struct NamespaceContextField<R> {
    cache: NamespaceCache<R>,
}

impl<R> NamespaceContextField<R>
where
    R: NamespaceResolver,
{
    /// 以 `resolver` 作为未命中时的解析器。
    pub fn new(kind: NamespaceKind, resolver: R) -> Self {
        Self {
            cache: NamespaceCache::new(kind, resolver),
        }
    }

    /// 底层缓存访问器。
    pub fn cache(&self) -> &NamespaceCache<R> {
        &self.cache
    }
}

impl<R> ContextFieldProvider for NamespaceContextField<R>
where
    R: NamespaceResolver,
{
    fn size(&self, offset: usize) -> usize {
        align_padding(offset, INODE_ALIGN) + INODE_SIZE
    }

    fn record(&self, ctx: &mut RecordContext<'_>) {
        let inode = self.cache.get();
        ctx.align(INODE_ALIGN);
        ctx.write(&inode.to_ne_bytes());
    }

    fn value(&self) -> ContextValue {
        ContextValue::S64(self.cache.get().as_s64())
    }
}

/// 将 `kind` 的命名空间字段注册进上下文集合。
///
/// # 契约（What）
/// - 集合无法增长时返回 [`ContextError::OutOfMemory`]；
/// - 同名字段已存在时返回 [`ContextError::AlreadyExists`]，预留槽位被释放，字段数不变；
/// - 成功后触发 [`ContextSet::update`]，所有包含该集合的事件重新计算偏移。
pub fn register_namespace_field<R>(
    set: &mut ContextSet,
    kind: NamespaceKind,
    resolver: R,
) -> Result<(), ContextError>
where
    R: NamespaceResolver + 'static,
{
    let name = kind.field_name();
    let slot = set.reserve_slot()?;
    if slot.set().find(name).is_some() {
        return Err(ContextError::AlreadyExists {
            name: name.to_owned(),
        });
    }
    slot.commit(ContextField::new(
        name,
        FieldType::Integer(NAMESPACE_INODE_LAYOUT),
        Arc::new(NamespaceContextField::new(kind, resolver)),
    ));
    set.update();
    tracing::debug!(field = name, fields = set.len(), "namespace context field registered");
    Ok(())
}

/// 以默认 procfs 解析器注册 `uts_ns` 字段。
pub fn register_uts_ns(set: &mut ContextSet) -> Result<(), ContextError> {
    register_namespace_field(set, NamespaceKind::Uts, ProcfsResolver::default())
}

#[cfg(all(test, not(any(loom, spark_loom))))]
mod tests {
    use super::*;
    use crate::namespace::{NamespaceInode, ResolveError};

    struct Fixed(NamespaceInode);

    impl NamespaceResolver for Fixed {
        fn resolve(&self, _kind: NamespaceKind) -> Result<NamespaceInode, ResolveError> {
            Ok(self.0)
        }
    }

    #[test]
    fn layout_describes_native_inode() {
        assert_eq!(NAMESPACE_INODE_LAYOUT.size_bytes(), INODE_SIZE);
        assert_eq!(NAMESPACE_INODE_LAYOUT.alignment_bytes(), INODE_ALIGN);
        assert_eq!(NAMESPACE_INODE_LAYOUT.base, 10);
        assert!(!NAMESPACE_INODE_LAYOUT.reverse_byte_order);
        assert_eq!(NAMESPACE_INODE_LAYOUT.encoding, StringEncoding::None);
    }

    #[test]
    fn size_is_pure_in_offset() {
        crate::namespace::invalidate_all();
        let field =
            NamespaceContextField::new(NamespaceKind::Uts, Fixed(NamespaceInode::from_raw(5)));
        for offset in 0..32 {
            let expected = align_padding(offset, INODE_ALIGN) + INODE_SIZE;
            assert_eq!(field.size(offset), expected);
        }
        assert_eq!(
            field.cache().peek(),
            crate::namespace::NamespaceState::Uninitialized
        );
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn size_matches_eight_byte_examples() {
        let field =
            NamespaceContextField::new(NamespaceKind::Uts, Fixed(NamespaceInode::from_raw(5)));
        assert_eq!(field.size(0), 8);
        assert_eq!(field.size(3), 13);
    }

    #[test]
    fn registration_rolls_back_on_duplicate() {
        let mut set = ContextSet::new();
        register_namespace_field(&mut set, NamespaceKind::Uts, Fixed(NamespaceInode::from_raw(9)))
            .expect("首次注册应成功");
        let generation = set.layout_generation();
        let err = register_namespace_field(
            &mut set,
            NamespaceKind::Uts,
            Fixed(NamespaceInode::from_raw(9)),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ContextError::AlreadyExists {
                name: "uts_ns".to_owned()
            }
        );
        assert_eq!(set.len(), 1);
        assert_eq!(set.layout_generation(), generation);
    }
}
