//!
//! Periodic Thread Generator
//!
//! Drives a factory on its own thread: sleep for a random delay in
//! `[min_delay_ms, max_delay_ms]`, ask the factory for a fresh `Thread`,
//! start it, repeat until `stop`. Delays come from a xorshift64 generator
//! seeded with `seed` plus a process-wide offset that advances by
//! `seed_increment` per generator, so runs are reproducible while several
//! generators still draw different sequences.
//!
//! Threads the generator started are kept until the generator is joined;
//! finished ones are reaped as new ones are spawned.
//!

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use concord_core::GeneratorConfig;

use crate::errors::SyncError;
use crate::semaphore::Semaphore;
use crate::thread::{Status, Thread};

static SEED_OFFSET: AtomicU64 = AtomicU64::new(0);

struct DelaySequence {
    state: u64,
    min_ms: u64,
    max_ms: u64,
}

impl DelaySequence {
    fn new(seed: u64, min_ms: u64, max_ms: u64) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed },
            min_ms,
            max_ms,
        }
    }

    fn next_delay(&mut self) -> Duration {
        let mut s = self.state;
        s ^= s << 13;
        s ^= s >> 7;
        s ^= s << 17;
        self.state = s;

        if self.min_ms >= self.max_ms {
            return Duration::from_millis(self.min_ms);
        }
        let range = self.max_ms - self.min_ms + 1;
        Duration::from_millis(self.min_ms + s % range)
    }
}

struct Control {
    stop: AtomicBool,
    wake: Semaphore,
    started: AtomicUsize,
    spawned: Mutex<Vec<Thread>>,
}

impl Control {
    fn spawned(&self) -> MutexGuard<'_, Vec<Thread>> {
        self.spawned.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct ThreadGenerator {
    driver: Thread,
    control: Arc<Control>,
}

impl ThreadGenerator {
    pub fn new<F>(config: &GeneratorConfig, mut factory: F) -> Self
    where
        F: FnMut() -> Result<Thread, SyncError> + Send + 'static,
    {
        let offset = SEED_OFFSET.fetch_add(config.seed_increment, Ordering::Relaxed);
        let mut delays = DelaySequence::new(
            config.seed.wrapping_add(offset),
            config.min_delay_ms,
            config.max_delay_ms,
        );

        let control = Arc::new(Control {
            stop: AtomicBool::new(false),
            wake: Semaphore::new(0),
            started: AtomicUsize::new(0),
            spawned: Mutex::new(Vec::new()),
        });

        let ctl = Arc::clone(&control);
        let driver = Thread::new("thread-generator", move |_| {
            while !ctl.stop.load(Ordering::SeqCst) {
                if ctl.wake.wait_timeout(delays.next_delay()) {
                    break;
                }

                let mut thread = match factory() {
                    Ok(thread) => thread,
                    Err(err) => {
                        tracing::warn!(error = %err, "thread factory failed");
                        continue;
                    }
                };
                if let Err(err) = thread.start() {
                    tracing::warn!(error = %err, "generated thread failed to start");
                    continue;
                }
                ctl.started.fetch_add(1, Ordering::SeqCst);

                let mut spawned = ctl.spawned();
                spawned.retain(|t| t.status() != Status::Finished);
                spawned.push(thread);
            }
        });

        Self { driver, control }
    }

    pub fn start(&mut self) -> Result<bool, SyncError> {
        self.driver.start()
    }

    /// Ask the driver to stop; it exits after its current tick
    pub fn stop(&self) {
        if !self.control.stop.swap(true, Ordering::SeqCst) {
            self.control.wake.signal();
        }
    }

    /// Wait for the driver and every thread it started
    pub fn join(&mut self) -> Result<(), SyncError> {
        let mut result = self.driver.join();
        let spawned: Vec<Thread> = self.control.spawned().drain(..).collect();
        for mut thread in spawned {
            if let Err(err) = thread.join() {
                tracing::warn!(error = %err, "generated thread failed");
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }
        result
    }

    /// Number of threads started so far
    pub fn spawned(&self) -> usize {
        self.control.started.load(Ordering::SeqCst)
    }

    pub fn driver_status(&self) -> Status {
        self.driver.status()
    }
}

impl Drop for ThreadGenerator {
    fn drop(&mut self) {
        self.stop();
        let _ = self.join();
    }
}

impl std::fmt::Debug for ThreadGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadGenerator")
            .field("driver", &self.driver)
            .field("spawned", &self.spawned())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn fast_config() -> GeneratorConfig {
        GeneratorConfig {
            min_delay_ms: 1,
            max_delay_ms: 5,
            ..GeneratorConfig::default()
        }
    }

    #[test]
    fn test_delays_stay_in_range_and_are_reproducible() {
        let mut a = DelaySequence::new(836939, 1000, 3000);
        let mut b = DelaySequence::new(836939, 1000, 3000);
        for _ in 0..100 {
            let d = a.next_delay();
            assert_eq!(d, b.next_delay());
            assert!((1000..=3000).contains(&(d.as_millis() as u64)));
        }
    }

    #[test]
    fn test_degenerate_range() {
        let mut seq = DelaySequence::new(0, 7, 7);
        assert_eq!(seq.next_delay(), Duration::from_millis(7));
    }

    #[test]
    fn test_generator_spawns_until_stopped() {
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);
        let mut generator = ThreadGenerator::new(&fast_config(), move || {
            let counter = Arc::clone(&counter);
            Ok(Thread::new("generated", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
        });
        assert!(generator.start().unwrap());

        let deadline = Instant::now() + Duration::from_secs(5);
        while generator.spawned() < 3 {
            assert!(Instant::now() < deadline, "generator never spawned");
            std::thread::sleep(Duration::from_millis(2));
        }

        generator.stop();
        generator.join().unwrap();
        assert_eq!(generator.driver_status(), Status::Finished);
        assert_eq!(ran.load(Ordering::SeqCst), generator.spawned());
    }

    #[test]
    fn test_stop_before_first_tick() {
        let mut generator = ThreadGenerator::new(&GeneratorConfig::default(), || {
            Ok(Thread::new("never", |_| {}))
        });
        generator.start().unwrap();
        generator.stop();
        generator.join().unwrap();
        assert_eq!(generator.spawned(), 0);
    }
}
