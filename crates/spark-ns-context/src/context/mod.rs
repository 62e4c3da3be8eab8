//! 上下文字段：字段描述符、上下文集合，以及命名空间字段适配器。

mod field;
mod namespace_field;
mod set;

pub use field::{
    ContextField, ContextFieldProvider, ContextValue, FieldType, IntegerLayout, StringEncoding,
};
pub use namespace_field::{
    NAMESPACE_INODE_LAYOUT, NamespaceContextField, register_namespace_field, register_uts_ns,
};
pub use set::{ContextLayout, ContextSet, SlotReservation};
