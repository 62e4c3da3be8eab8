//! 命名空间标识：取值模型、内核解析与线程级缓存。

mod cache;
mod inode;
mod kind;
mod resolver;

pub use cache::{
    NamespaceCache, UtsNamespaceCache, invalidate, invalidate_all, invalidate_for_clone_flags,
    peek, touch_for_relocation,
};
pub use inode::{INODE_ALIGN, INODE_SIGNED, INODE_SIZE, NamespaceInode, NamespaceState, RawInode};
pub use kind::NamespaceKind;
pub use resolver::{KernelThreadId, NamespaceResolver, ProcfsResolver, ResolveError, ThreadIdSource};
