#![cfg(any(loom, spark_loom))]

use loom::{model, thread};
use spark_ns_context::namespace::{NamespaceCache, NamespaceInode, NamespaceKind, NamespaceState};
use spark_ns_context::test_stubs::FixedResolver;

#[test]
fn invalidation_never_crosses_threads() {
    //
    // 教案级说明：两个线程各自解析并缓存，其中一个在任意交错点失效自己的单元。
    // - **Why**：单元按线程隔离，失效不得波及其他线程，也不需要任何跨线程同步；
    // - **How**：Loom 穷举两线程的调度顺序；
    // - **What**：未失效的线程始终读到自己的令牌，失效线程回到 `Uninitialized`。
    model(|| {
        let keeper = thread::spawn(|| {
            let cache = NamespaceCache::new(
                NamespaceKind::Uts,
                FixedResolver(NamespaceInode::from_raw(1)),
            );
            let first = cache.get();
            thread::yield_now();
            assert_eq!(cache.get(), first, "他线程的失效不得影响本线程");
            assert_eq!(cache.peek(), NamespaceState::Valid(first));
        });

        let switcher = thread::spawn(|| {
            let cache = NamespaceCache::new(
                NamespaceKind::Uts,
                FixedResolver(NamespaceInode::from_raw(2)),
            );
            assert_eq!(cache.get(), NamespaceInode::from_raw(2));
            cache.invalidate();
            assert_eq!(cache.peek(), NamespaceState::Uninitialized);
        });

        keeper.join().expect("保持线程不应 panic");
        switcher.join().expect("切换线程不应 panic");
    });
}
