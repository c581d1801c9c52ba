use std::time::Duration;
use tokio::task::JoinHandle;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// A repeating one-second tick source owned by a room.
///
/// The task never touches room state itself; `on_tick` only forwards the tick
/// to whoever owns the room. Dropping the countdown aborts the task, so a room
/// that goes away cannot leave a ticking task behind.
#[derive(Debug)]
pub struct Countdown {
    generation: u64,
    task: JoinHandle<()>,
}

impl Countdown {
    /// Starts ticking every [`TICK_PERIOD`]. The task stops on its own once
    /// `on_tick` returns `false`.
    pub fn spawn<F>(generation: u64, on_tick: F) -> Self
    where
        F: Fn(u64) -> bool + Send + 'static,
    {
        let task = tokio::spawn(async move {
            loop {
                tokio::time::sleep(TICK_PERIOD).await;
                if !on_tick(generation) {
                    break;
                }
            }
        });

        Countdown { generation, task }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period_until_dropped() {
        let ticks = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&ticks);
        let countdown = Countdown::spawn(7, move |generation| {
            assert_eq!(generation, 7);
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });

        tokio::time::sleep(TICK_PERIOD * 3 + Duration::from_millis(500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);

        drop(countdown);
        tokio::time::sleep(TICK_PERIOD * 5).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_the_receiver_is_gone() {
        let ticks = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&ticks);
        let countdown = Countdown::spawn(1, move |_| counter.fetch_add(1, Ordering::SeqCst) < 1);

        tokio::time::sleep(TICK_PERIOD * 5 + Duration::from_millis(500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        assert!(countdown.task.is_finished());
    }
}
