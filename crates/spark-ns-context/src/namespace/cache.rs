//! 线程级命名空间标识缓存。
//!
//! # 教案式说明
//! - **意图（Why）**：每个事件都要携带命名空间标识，但 `stat(2)` procfs 的成本远高于一次事件写入；
//!   按线程缓存后，热路径只剩一次原子读取。
//! - **逻辑（How）**：每个线程持有一组原子单元（每种 [`NamespaceKind`] 一个），初值为
//!   [`NamespaceInode::UNINITIALIZED`]。读取命中直接返回；未命中时调用解析器，把结果（有效令牌或
//!   [`NamespaceInode::UNAVAILABLE`]）写回单元后返回。失效只把单元复位为 `UNINITIALIZED`。
//! - **契约（What）**：
//!   - 单元只被所属线程读写，因此没有锁，也没有比较交换；
//!   - 写入使用 `Release`、读取使用 `Acquire`，保证线程在存储重新挂载后仍能看到自己之前的写入；
//!   - 解析失败永不以错误形式返回，只以哨兵值体现，且在下一次失效前不重试。
//! - **风险（Trade-offs）**：线程本地存储已在析构阶段被回收时（例如在其他 TLS 析构器里打点），
//!   读取退化为“每次解析、不缓存”，保证不 panic。

#[cfg(any(loom, spark_loom))]
use loom::sync::atomic::{AtomicU64, Ordering};
#[cfg(not(any(loom, spark_loom)))]
use std::sync::atomic::{AtomicU64, Ordering};

use nix::sched::CloneFlags;

use super::inode::{NamespaceInode, NamespaceState};
use super::kind::NamespaceKind;
use super::resolver::{NamespaceResolver, ProcfsResolver};

struct ThreadCells {
    cells: [AtomicU64; NamespaceKind::COUNT],
}

impl ThreadCells {
    fn new() -> Self {
        Self {
            cells: core::array::from_fn(|_| {
                AtomicU64::new(NamespaceInode::UNINITIALIZED.to_cell())
            }),
        }
    }

    fn load(&self, kind: NamespaceKind) -> NamespaceInode {
        NamespaceInode::from_cell(self.cells[kind.index()].load(Ordering::Acquire))
    }

    fn store(&self, kind: NamespaceKind, inode: NamespaceInode) {
        self.cells[kind.index()].store(inode.to_cell(), Ordering::Release);
    }
}

// 析构即线程退出：此后同一线程上的 `try_with` 返回错误，`get` 退化为不缓存的解析。
impl Drop for ThreadCells {
    fn drop(&mut self) {
        tracing::trace!("namespace cache cells released");
    }
}

#[cfg(not(any(loom, spark_loom)))]
std::thread_local! {
    static CELLS: ThreadCells = ThreadCells::new();
}

#[cfg(any(loom, spark_loom))]
loom::thread_local! {
    static CELLS: ThreadCells = ThreadCells::new();
}

/// 访问当前线程的缓存单元；存储已销毁时返回 `None`。
fn with_cells<F, T>(f: F) -> Option<T>
where
    F: FnOnce(&ThreadCells) -> T,
{
    CELLS.try_with(f).ok()
}

/// 某一命名空间种类的缓存访问器。
///
/// 访问器本身不持有缓存数据：同一线程上同一种类只有一个单元，多个访问器共享它，
/// 区别仅在于未命中时使用哪个解析器。
#[derive(Clone, Debug)]
pub struct NamespaceCache<R> {
    kind: NamespaceKind,
    resolver: R,
}

/// 以默认 procfs 布局解析 UTS 命名空间的缓存访问器。
pub type UtsNamespaceCache = NamespaceCache<ProcfsResolver>;

impl UtsNamespaceCache {
    /// 使用默认 `/proc` 布局的 UTS 访问器。
    pub fn uts() -> Self {
        NamespaceCache::new(NamespaceKind::Uts, ProcfsResolver::default())
    }
}

impl<R> NamespaceCache<R>
where
    R: NamespaceResolver,
{
    /// 绑定种类与未命中时使用的解析器；不触碰线程本地存储。
    pub const fn new(kind: NamespaceKind, resolver: R) -> Self {
        Self { kind, resolver }
    }

    /// 本访问器负责的命名空间种类。
    pub fn kind(&self) -> NamespaceKind {
        self.kind
    }

    /// 未命中时使用的解析器。
    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// 返回当前线程的命名空间标识，必要时解析并缓存。
    ///
    /// 返回值要么是有效令牌，要么是 [`NamespaceInode::UNAVAILABLE`]，绝不是
    /// `UNINITIALIZED`。
    #[inline]
    pub fn get(&self) -> NamespaceInode {
        match with_cells(|cells| cells.load(self.kind)) {
            Some(cached) if cached != NamespaceInode::UNINITIALIZED => cached,
            Some(_) => {
                let resolved = self.resolve_uncached();
                with_cells(|cells| cells.store(self.kind, resolved));
                resolved
            }
            None => self.resolve_uncached(),
        }
    }

    /// 复位当前线程本种类的单元。
    pub fn invalidate(&self) {
        invalidate(self.kind);
    }

    /// 读取当前线程本种类单元的状态，不触发解析。
    pub fn peek(&self) -> NamespaceState {
        peek(self.kind)
    }

    #[cold]
    fn resolve_uncached(&self) -> NamespaceInode {
        match self.resolver.resolve(self.kind) {
            Ok(inode) if inode.is_valid() => inode,
            Ok(inode) => {
                tracing::debug!(
                    namespace = %self.kind,
                    ?inode,
                    "resolver returned a reserved inode, caching unavailable"
                );
                NamespaceInode::UNAVAILABLE
            }
            Err(err) => {
                tracing::debug!(
                    namespace = %self.kind,
                    error = %err,
                    "namespace inode unavailable, caching sentinel until invalidated"
                );
                NamespaceInode::UNAVAILABLE
            }
        }
    }
}

/// 将当前线程 `kind` 对应的单元复位为 `UNINITIALIZED`。
///
/// 运行时在观察到以下任一事件后调用：带 `CLONE_NEW*` 的 `clone(2)`、切换到其他命名空间的
/// `setns(2)`、带 `CLONE_NEW*` 的 `unshare(2)`。本函数不检测这些事件。
pub fn invalidate(kind: NamespaceKind) {
    let reset = with_cells(|cells| cells.store(kind, NamespaceInode::UNINITIALIZED));
    if reset.is_some() {
        tracing::trace!(namespace = %kind, "namespace cache invalidated");
    }
}

/// 复位当前线程的全部单元，适用于无法得知具体变更种类的 `setns(2)` 通知。
pub fn invalidate_all() {
    for kind in NamespaceKind::ALL {
        invalidate(kind);
    }
}

/// 按 `clone(2)`/`unshare(2)` 的标志位复位受影响的单元。
pub fn invalidate_for_clone_flags(flags: CloneFlags) {
    for kind in NamespaceKind::affected_by(flags) {
        invalidate(kind);
    }
}

/// 当前线程 `kind` 单元的状态；存储已销毁时视为未初始化。
pub fn peek(kind: NamespaceKind) -> NamespaceState {
    with_cells(|cells| cells.load(kind))
        .unwrap_or(NamespaceInode::UNINITIALIZED)
        .state()
}

/// 强制物化当前线程的缓存单元。
///
/// 本组件被动态加载进已在运行的进程时，线程本地存储可能直到首次访问才被分配；
/// 每个线程在依赖 [`NamespaceCache::get`] 之前调用一次即可。读写回原值，不改变任何状态。
pub fn touch_for_relocation() {
    with_cells(|cells| {
        for cell in &cells.cells {
            let current = cell.load(Ordering::Acquire);
            cell.store(current, Ordering::Release);
        }
    });
}

#[cfg(all(test, not(any(loom, spark_loom))))]
mod tests {
    use super::*;
    use crate::namespace::resolver::ResolveError;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicUsize;

    struct Scripted {
        calls: AtomicUsize,
        outcome: fn() -> Result<NamespaceInode, ResolveError>,
    }

    impl NamespaceResolver for Scripted {
        fn resolve(&self, _kind: NamespaceKind) -> Result<NamespaceInode, ResolveError> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            (self.outcome)()
        }
    }

    fn scripted(outcome: fn() -> Result<NamespaceInode, ResolveError>) -> Scripted {
        Scripted {
            calls: AtomicUsize::new(0),
            outcome,
        }
    }

    #[test]
    fn reserved_inode_from_resolver_is_cached_as_unavailable() {
        invalidate_all();
        let resolver = scripted(|| Ok(NamespaceInode::UNINITIALIZED));
        let cache = NamespaceCache::new(NamespaceKind::Ipc, &resolver);
        assert_eq!(cache.get(), NamespaceInode::UNAVAILABLE);
        assert_eq!(cache.get(), NamespaceInode::UNAVAILABLE);
        assert_eq!(resolver.calls.load(std::sync::atomic::Ordering::Relaxed), 1);
        assert_eq!(cache.peek(), NamespaceState::Unavailable);
    }

    #[test]
    fn kinds_use_independent_cells() {
        invalidate_all();
        let resolver = scripted(|| Ok(NamespaceInode::from_raw(77)));
        let uts = NamespaceCache::new(NamespaceKind::Uts, &resolver);
        let net = NamespaceCache::new(NamespaceKind::Net, &resolver);
        uts.get();
        assert_eq!(net.peek(), NamespaceState::Uninitialized);
        net.get();
        uts.invalidate();
        assert_eq!(uts.peek(), NamespaceState::Uninitialized);
        assert_eq!(
            net.peek(),
            NamespaceState::Valid(NamespaceInode::from_raw(77))
        );
    }

    #[test]
    fn clone_flags_reset_only_named_kinds() {
        invalidate_all();
        let resolver = scripted(|| {
            Err(ResolveError::PathTooLong { len: 99, max: 40 })
        });
        let uts = NamespaceCache::new(NamespaceKind::Uts, &resolver);
        let pid = NamespaceCache::new(NamespaceKind::Pid, &resolver);
        uts.get();
        pid.get();
        invalidate_for_clone_flags(CloneFlags::CLONE_NEWUTS);
        assert_eq!(uts.peek(), NamespaceState::Uninitialized);
        assert_eq!(pid.peek(), NamespaceState::Unavailable);
    }

    #[test]
    #[tracing_test::traced_test]
    fn unavailable_resolution_is_logged() {
        invalidate_all();
        let resolver = scripted(|| Err(ResolveError::PathTooLong { len: 50, max: 40 }));
        let cache = NamespaceCache::new(NamespaceKind::User, &resolver);
        assert_eq!(cache.get(), NamespaceInode::UNAVAILABLE);
        assert!(logs_contain("caching sentinel until invalidated"));
        assert!(logs_contain("namespace=user"));
    }

    #[test]
    fn touch_keeps_cached_values() {
        invalidate_all();
        let resolver = scripted(|| {
            Err(ResolveError::Stat {
                path: PathBuf::from("/nonexistent"),
                source: nix::Error::ENOENT,
            })
        });
        let cache = NamespaceCache::new(NamespaceKind::Mnt, &resolver);
        touch_for_relocation();
        assert_eq!(cache.peek(), NamespaceState::Uninitialized);
        cache.get();
        touch_for_relocation();
        assert_eq!(cache.peek(), NamespaceState::Unavailable);
        assert_eq!(resolver.calls.load(std::sync::atomic::Ordering::Relaxed), 1);
    }
}
