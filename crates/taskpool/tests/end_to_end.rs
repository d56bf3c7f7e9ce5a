use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use taskpool::{TaskPoolConfig, ThreadPool};

fn pool(workers: usize) -> ThreadPool {
    ThreadPool::new(TaskPoolConfig::new().worker_count(workers).task_queue_size(1024)).unwrap()
}

#[test]
fn counting_sum() {
    let p = pool(4);
    let sum = Arc::new(AtomicI64::new(0));
    let s = sum.clone();
    p.for_each(0, 10_000, move |_i| {
        s.fetch_add(1, Ordering::Relaxed);
    });
    p.wait();
    assert_eq!(sum.load(Ordering::Relaxed), 10_000);
}

#[test]
fn worker_index_usage() {
    let p = pool(4);
    let hits: Arc<Vec<AtomicI64>> = Arc::new((0..4).map(|_| AtomicI64::new(0)).collect());
    let h = hits.clone();
    p.for_each(0, 100, move |_i, batch| {
        h[batch].fetch_add(1, Ordering::Relaxed);
    });
    p.wait();

    let total: i64 = hits.iter().map(|c| c.load(Ordering::Relaxed)).sum();
    assert_eq!(total, 100);
    let non_zero = hits.iter().filter(|c| c.load(Ordering::Relaxed) > 0).count();
    assert!(non_zero <= 4);
}

#[test]
fn range_reversal_visits_every_integer_once() {
    let p = pool(4);
    let observed: Arc<Mutex<Vec<i64>>> = Arc::new(Mutex::new(Vec::new()));
    let o = observed.clone();
    p.for_each(10, 0, move |i| {
        o.lock().unwrap().push(i);
    });
    p.wait();

    let mut got = observed.lock().unwrap().clone();
    got.sort_unstable();
    assert_eq!(got, (0..10).collect::<Vec<_>>());
}

#[test]
fn large_stateful_task_by_reference() {
    struct Big {
        invoked: AtomicUsize,
        _padding: [u8; 1024],
    }

    let big = Big { invoked: AtomicUsize::new(0), _padding: [0; 1024] };
    let callable = |_worker_index: usize| {
        big.invoked.fetch_add(1, Ordering::SeqCst);
    };

    let p = pool(2);
    unsafe { p.enqueue_ref(&callable) };
    p.wait();

    assert_eq!(big.invoked.load(Ordering::SeqCst), 1);
}

#[test]
fn move_only_callable_runs_once_and_drops_once() {
    struct RecordOnDrop(Arc<AtomicUsize>);
    impl Drop for RecordOnDrop {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    let drops = Arc::new(AtomicUsize::new(0));
    let invocations = Arc::new(AtomicUsize::new(0));

    let handle = RecordOnDrop(drops.clone());
    let inv = invocations.clone();

    let p = pool(2);
    p.enqueue(move || {
        let _keep_alive = &handle;
        inv.fetch_add(1, Ordering::SeqCst);
    });
    p.wait();

    assert_eq!(invocations.load(Ordering::SeqCst), 1);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn teardown_drains_pending_work_without_running_it_after_drop_returns() {
    let p = pool(2);
    let completed = Arc::new(AtomicUsize::new(0));

    for _ in 0..200 {
        let c = completed.clone();
        p.enqueue(move || {
            std::thread::sleep(Duration::from_millis(1));
            c.fetch_add(1, Ordering::SeqCst);
        });
    }

    drop(p);

    let after_drop = completed.load(Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(completed.load(Ordering::SeqCst), after_drop, "no task may run after pool destruction returns");
}

#[test]
fn empty_pool_construct_and_destroy_does_not_block() {
    let p = pool(4);
    drop(p);
}

#[test]
fn repeated_wait_with_no_submissions_returns_immediately() {
    let p = pool(2);
    p.wait();
    p.wait();
}

#[test]
fn saturation_blocks_submitter_but_completes_every_task() {
    let p = pool(2);
    let completed = Arc::new(AtomicI64::new(0));

    let total = p.capacity() * 2 + 3;
    for _ in 0..total {
        let c = completed.clone();
        p.enqueue(move || {
            c.fetch_add(1, Ordering::Relaxed);
        });
    }
    p.wait();

    assert_eq!(completed.load(Ordering::Relaxed), total as i64);
}
