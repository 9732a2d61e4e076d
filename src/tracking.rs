//! Simulated real-time: driver dispatch delay, delivery progress, and the
//! driver's job feed. Each timer is a tokio task behind a `TimerHandle`.

use std::time::Duration;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

use crate::load::Load;

#[derive(Clone, Debug, PartialEq)]
pub enum TimerEvent {
    DriverAssigned,
    Progress(f64),
    /// Sent once, right after `Progress(100.0)`.
    TrackingFinished,
    OfferArrived(Load),
}

/// Timer event stamped with the generation it was started under.
/// Consumers drop events whose generation is no longer current.
#[derive(Clone, Debug, PartialEq)]
pub struct Tagged {
    pub generation: u64,
    pub event: TimerEvent,
}

/// Percent of `duration` covered after `elapsed`, capped at 100.
pub fn progress_at(elapsed: Duration, duration: Duration) -> f64 {
    if duration.is_zero() {
        return 100.0;
    }
    (elapsed.as_secs_f64() / duration.as_secs_f64() * 100.0).min(100.0)
}

/// Owns a running timer task; aborts it on `cancel` or drop.
#[derive(Debug)]
pub struct TimerHandle {
    task: JoinHandle<()>,
}

impl TimerHandle {
    fn spawn<F>(fut: F) -> Self
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        Self {
            task: tokio::spawn(fut),
        }
    }

    pub fn cancel(self) {
        // Drop aborts.
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn send(tx: &mpsc::Sender<Tagged>, generation: u64, event: TimerEvent) -> bool {
    tx.send(Tagged { generation, event }).await.is_ok()
}

/// Fires `DriverAssigned` once after `delay`.
#[derive(Clone, Copy, Debug)]
pub struct DispatchTimer {
    pub delay: Duration,
}

impl DispatchTimer {
    pub fn start(&self, generation: u64, tx: mpsc::Sender<Tagged>) -> TimerHandle {
        let delay = self.delay;
        TimerHandle::spawn(async move {
            time::sleep(delay).await;
            tracing::debug!("dispatch timer fired (generation {generation})");
            send(&tx, generation, TimerEvent::DriverAssigned).await;
        })
    }
}

/// Emits progress every `tick` until the delivery `duration` has elapsed.
#[derive(Clone, Copy, Debug)]
pub struct ProgressTicker {
    pub duration: Duration,
    pub tick: Duration,
}

impl ProgressTicker {
    pub fn start(&self, generation: u64, tx: mpsc::Sender<Tagged>) -> TimerHandle {
        let duration = self.duration;
        let tick = self.tick.max(Duration::from_millis(1));
        TimerHandle::spawn(async move {
            if duration.is_zero() {
                send(&tx, generation, TimerEvent::Progress(100.0)).await;
                send(&tx, generation, TimerEvent::TrackingFinished).await;
                return;
            }
            let started = Instant::now();
            let mut interval = time::interval_at(started + tick, tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let pct = progress_at(started.elapsed(), duration);
                if !send(&tx, generation, TimerEvent::Progress(pct)).await {
                    return;
                }
                if pct >= 100.0 {
                    break;
                }
            }
            send(&tx, generation, TimerEvent::TrackingFinished).await;
        })
    }
}

/// Releases `offers` one by one, the i-th after `(i + 1) * interval`.
#[derive(Clone, Copy, Debug)]
pub struct JobFeed {
    pub interval: Duration,
}

impl JobFeed {
    pub fn start(
        &self,
        offers: Vec<Load>,
        generation: u64,
        tx: mpsc::Sender<Tagged>,
    ) -> TimerHandle {
        let interval = self.interval;
        TimerHandle::spawn(async move {
            let started = Instant::now();
            for (i, offer) in (1u32..).zip(offers) {
                time::sleep_until(started + interval * i).await;
                if !send(&tx, generation, TimerEvent::OfferArrived(offer)).await {
                    return;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{driver::sample_offers, load::LoadStatus};

    #[test]
    fn test_progress_at() {
        let d = Duration::from_secs(15);
        assert_eq!(progress_at(Duration::ZERO, d), 0.0);
        assert_eq!(progress_at(Duration::from_millis(7500), d), 50.0);
        assert_eq!(progress_at(d, d), 100.0);
        assert_eq!(progress_at(Duration::from_secs(60), d), 100.0);
        assert_eq!(progress_at(Duration::from_secs(1), Duration::ZERO), 100.0);

        let mut last = 0.0;
        for ms in (0..20_000).step_by(37) {
            let p = progress_at(Duration::from_millis(ms), d);
            assert!(p >= last);
            last = p;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_fires_after_delay() {
        let (tx, mut rx) = mpsc::channel(8);
        let started = Instant::now();
        let _handle = DispatchTimer {
            delay: Duration::from_secs(3),
        }
        .start(4, tx);

        let got = rx.recv().await.unwrap();
        assert_eq!(
            got,
            Tagged {
                generation: 4,
                event: TimerEvent::DriverAssigned
            }
        );
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_dispatch_never_fires() {
        let (tx, mut rx) = mpsc::channel(8);
        let handle = DispatchTimer {
            delay: Duration::from_secs(3),
        }
        .start(1, tx);
        time::sleep(Duration::from_secs(1)).await;
        handle.cancel();
        time::sleep(Duration::from_secs(10)).await;
        // Sender was dropped with the aborted task.
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_reaches_exactly_100_then_finishes() {
        let (tx, mut rx) = mpsc::channel(256);
        let handle = ProgressTicker {
            duration: Duration::from_secs(15),
            tick: Duration::from_millis(100),
        }
        .start(2, tx);

        let mut values = vec![];
        let mut finished = 0;
        while let Some(Tagged { generation, event }) = rx.recv().await {
            assert_eq!(generation, 2);
            match event {
                TimerEvent::Progress(p) => values.push(p),
                TimerEvent::TrackingFinished => finished += 1,
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(finished, 1);
        assert_eq!(values.len(), 150);
        assert_eq!(values.last(), Some(&100.0));
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
        assert!(handle.task.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_duration_completes_immediately() {
        let (tx, mut rx) = mpsc::channel(8);
        let _handle = ProgressTicker {
            duration: Duration::ZERO,
            tick: Duration::from_millis(100),
        }
        .start(0, tx);
        assert_eq!(rx.recv().await.unwrap().event, TimerEvent::Progress(100.0));
        assert_eq!(rx.recv().await.unwrap().event, TimerEvent::TrackingFinished);
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_feed_is_staggered() {
        let (tx, mut rx) = mpsc::channel(8);
        let offers = sample_offers();
        let started = Instant::now();
        let _handle = JobFeed {
            interval: Duration::from_secs(6),
        }
        .start(offers.clone(), 9, tx);

        for (i, expected) in offers.iter().enumerate() {
            let got = rx.recv().await.unwrap();
            assert_eq!(got.event, TimerEvent::OfferArrived(expected.clone()));
            assert_eq!(started.elapsed(), Duration::from_secs(6 * (i as u64 + 1)));
            assert_eq!(expected.status, LoadStatus::Pending);
        }
        assert_eq!(rx.recv().await, None);
    }
}
