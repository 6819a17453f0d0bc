/*!
 * Synchronization Primitives Integration Tests
 *
 * Mutual exclusion, reentrancy and reader/writer behavior under real threads
 */

mod common;

use lockkit::{Lenient, Mutex, RecursiveMutex, SharedMutex, Spinlock, Strict};
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

const THREADS: usize = 8;
const ITERATIONS: usize = 5_000;

/// Non-atomic counter; only sound while a lock is held
struct RacyCounter(UnsafeCell<usize>);

unsafe impl Sync for RacyCounter {}

impl RacyCounter {
    fn new() -> Self {
        Self(UnsafeCell::new(0))
    }

    /// # Safety
    /// Caller holds the lock protecting this counter.
    unsafe fn bump(&self) {
        let value = std::ptr::read_volatile(self.0.get());
        std::ptr::write_volatile(self.0.get(), value + 1);
    }

    fn get(&self) -> usize {
        unsafe { *self.0.get() }
    }
}

/// Race THREADS threads through lock/bump/unlock and return the final count
fn hammer<L, A, R>(lock: Arc<L>, acquire: A, release: R) -> usize
where
    L: Send + Sync + 'static,
    A: Fn(&L) + Send + Sync + Copy + 'static,
    R: Fn(&L) + Send + Sync + Copy + 'static,
{
    common::init_tracing();
    let counter = Arc::new(RacyCounter::new());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let lock = lock.clone();
            let counter = counter.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..ITERATIONS {
                    acquire(&*lock);
                    unsafe { counter.bump() };
                    release(&*lock);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    counter.get()
}

#[test]
fn test_mutex_mutual_exclusion() {
    let total = hammer(Arc::new(Mutex::new()), Mutex::lock, Mutex::unlock);
    assert_eq!(total, THREADS * ITERATIONS);
}

#[test]
fn test_spinlock_mutual_exclusion() {
    let total = hammer(Arc::new(Spinlock::new()), Spinlock::lock, Spinlock::unlock);
    assert_eq!(total, THREADS * ITERATIONS);
}

#[test]
fn test_recursive_mutex_mutual_exclusion() {
    let total = hammer(
        Arc::new(RecursiveMutex::<Strict>::new()),
        RecursiveMutex::lock,
        |lock| lock.unlock().unwrap(),
    );
    assert_eq!(total, THREADS * ITERATIONS);
}

#[test]
fn test_shared_mutex_writer_mutual_exclusion() {
    let total = hammer(
        Arc::new(SharedMutex::<Strict>::new()),
        SharedMutex::lock,
        |lock| lock.unlock().unwrap(),
    );
    assert_eq!(total, THREADS * ITERATIONS);
}

#[test]
fn test_recursive_mutex_nested_under_contention() {
    // Each cycle locks three levels deep; the count must still be exact
    let total = hammer(
        Arc::new(RecursiveMutex::<Strict>::new()),
        |lock| {
            lock.lock();
            lock.lock();
            assert!(lock.try_lock());
        },
        |lock| {
            for _ in 0..3 {
                lock.unlock().unwrap();
            }
            assert!(!lock.is_owned_by_current_thread());
        },
    );
    assert_eq!(total, THREADS * ITERATIONS);
}

#[test]
fn test_recursive_release_hands_over_to_other_thread() {
    let lock = Arc::new(RecursiveMutex::<Lenient>::new());
    let depth = 4;
    for _ in 0..depth {
        lock.lock();
    }

    let waiter = {
        let lock = lock.clone();
        thread::spawn(move || {
            let start = Instant::now();
            lock.lock();
            let waited = start.elapsed();
            lock.unlock().unwrap();
            waited
        })
    };

    thread::sleep(Duration::from_millis(50));
    for _ in 0..depth - 1 {
        lock.unlock().unwrap();
        assert!(lock.is_locked());
    }
    lock.unlock().unwrap();

    // The extra unlock is ignored under the lenient policy
    assert_eq!(lock.unlock(), Ok(()));

    let waited = waiter.join().unwrap();
    assert!(waited >= Duration::from_millis(40));
}

#[test]
fn test_reader_writer_exclusivity() {
    common::init_tracing();
    let lock = Arc::new(SharedMutex::<Strict>::new());
    let writer_inside = Arc::new(AtomicBool::new(false));
    let readers_inside = Arc::new(AtomicUsize::new(0));
    let violations = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(6));

    let mut handles = Vec::new();

    for _ in 0..4 {
        let lock = lock.clone();
        let writer_inside = writer_inside.clone();
        let readers_inside = readers_inside.clone();
        let violations = violations.clone();
        let barrier = barrier.clone();
        handles.push(thread::spawn(move || {
            barrier.wait();
            for _ in 0..2_000 {
                lock.lock_shared();
                readers_inside.fetch_add(1, Ordering::SeqCst);
                if writer_inside.load(Ordering::SeqCst) {
                    violations.fetch_add(1, Ordering::SeqCst);
                }
                readers_inside.fetch_sub(1, Ordering::SeqCst);
                lock.unlock_shared().unwrap();
            }
        }));
    }

    for _ in 0..2 {
        let lock = lock.clone();
        let writer_inside = writer_inside.clone();
        let readers_inside = readers_inside.clone();
        let violations = violations.clone();
        let barrier = barrier.clone();
        handles.push(thread::spawn(move || {
            barrier.wait();
            for _ in 0..500 {
                lock.lock();
                if writer_inside.swap(true, Ordering::SeqCst)
                    || lock.reader_count() > 0
                    || readers_inside.load(Ordering::SeqCst) > 0
                {
                    violations.fetch_add(1, Ordering::SeqCst);
                }
                writer_inside.store(false, Ordering::SeqCst);
                lock.unlock().unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(violations.load(Ordering::SeqCst), 0);
    assert_eq!(lock.reader_count(), 0);
    assert!(!lock.is_locked());
}

#[test]
fn test_second_reader_joins_without_contention() {
    let lock = Arc::new(SharedMutex::<Strict>::new());
    lock.lock_shared();
    let before = lock.flag_contentions();

    let lock_clone = lock.clone();
    let (joined, readers) = thread::spawn(move || {
        lock_clone.lock_shared();
        let readers = lock_clone.reader_count();
        lock_clone.unlock_shared().unwrap();
        (true, readers)
    })
    .join()
    .unwrap();

    assert!(joined);
    assert_eq!(readers, 2);
    assert_eq!(lock.flag_contentions(), before);
    lock.unlock_shared().unwrap();
}

#[test]
fn test_readers_overtake_waiting_writer() {
    let lock = Arc::new(SharedMutex::<Strict>::new());
    let writer_done = Arc::new(AtomicBool::new(false));
    lock.lock_shared();

    let writer = {
        let lock = lock.clone();
        let writer_done = writer_done.clone();
        thread::spawn(move || {
            lock.lock();
            writer_done.store(true, Ordering::SeqCst);
            lock.unlock().unwrap();
        })
    };

    // Writer is parked on the flag now
    thread::sleep(Duration::from_millis(50));
    assert!(!writer_done.load(Ordering::SeqCst));

    // A new reader still gets in immediately
    assert!(lock.try_lock_shared());
    assert_eq!(lock.reader_count(), 2);

    lock.unlock_shared().unwrap();
    thread::sleep(Duration::from_millis(20));
    assert!(!writer_done.load(Ordering::SeqCst));

    lock.unlock_shared().unwrap();
    writer.join().unwrap();
    assert!(writer_done.load(Ordering::SeqCst));
}

#[test]
fn test_try_lock_never_blocks() {
    let mutex = Arc::new(Mutex::new());
    let spinlock = Arc::new(Spinlock::new());
    let recursive = Arc::new(RecursiveMutex::<Strict>::new());
    let shared = Arc::new(SharedMutex::<Strict>::new());

    mutex.lock();
    spinlock.lock();
    recursive.lock();
    shared.lock();

    let handle = {
        let (mutex, spinlock, recursive, shared) =
            (mutex.clone(), spinlock.clone(), recursive.clone(), shared.clone());
        thread::spawn(move || {
            let start = Instant::now();
            let results = [
                mutex.try_lock(),
                spinlock.try_lock(),
                recursive.try_lock(),
                shared.try_lock(),
                shared.try_lock_shared(),
            ];
            (results, start.elapsed())
        })
    };

    let (results, elapsed) = handle.join().unwrap();
    assert_eq!(results, [false; 5]);
    assert!(elapsed < Duration::from_millis(50));

    mutex.unlock();
    spinlock.unlock();
    recursive.unlock().unwrap();
    shared.unlock().unwrap();
}

#[test]
fn test_many_waiters_all_get_through() {
    // Notify-all wakes every parked waiter; each must eventually win once
    let lock = Arc::new(Mutex::new());
    let entered = Arc::new(AtomicUsize::new(0));
    lock.lock();

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let lock = lock.clone();
            let entered = entered.clone();
            thread::spawn(move || {
                lock.lock();
                entered.fetch_add(1, Ordering::SeqCst);
                lock.unlock();
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(100));
    assert_eq!(entered.load(Ordering::SeqCst), 0);
    lock.unlock();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(entered.load(Ordering::SeqCst), 16);
    assert!(!lock.is_locked());
}
