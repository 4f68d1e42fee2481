use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

use crate::TbObj;

struct ClockInner {
    // number of rising edges seen so far
    edges: u64,
    waiters: Vec<Waker>,
}

/// Handle to the simulation clock. Tasks await [`Clock::rising_edge`]; only the
/// scheduler advances it.
#[derive(Clone)]
pub struct Clock(TbObj<ClockInner>);

impl Clock {
    pub(crate) fn new() -> Self {
        Clock(TbObj::new(ClockInner {
            edges: 0,
            waiters: Vec::new(),
        }))
    }

    /// Index of the current rising edge, 0 before the first one.
    pub fn edge(&self) -> u64 {
        self.0.get().edges
    }

    pub fn rising_edge(&self) -> RisingEdge {
        RisingEdge {
            clock: self.clone(),
            target: None,
        }
    }

    pub async fn clock_cycles(&self, n_cycles: u64) -> u64 {
        let mut edge = self.edge();
        for _ in 0..n_cycles {
            edge = self.rising_edge().await;
        }
        edge
    }

    // Wakes every task waiting on the next edge. Tasks that await again while
    // this edge is being processed register for the following one.
    pub(crate) fn advance(&self) -> u64 {
        let (edge, waiters) = self.0.with_mut(|c| {
            c.edges += 1;
            (c.edges, std::mem::take(&mut c.waiters))
        });
        for waker in waiters {
            waker.wake();
        }
        edge
    }
}

/// Resolves on the first rising edge after it was first polled, yielding the
/// edge index.
pub struct RisingEdge {
    clock: Clock,
    target: Option<u64>,
}

impl Future for RisingEdge {
    type Output = u64;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let now = self.clock.edge();
        let target = *self.target.get_or_insert(now + 1);
        if now >= target {
            Poll::Ready(now)
        } else {
            self.clock.0.get_mut().waiters.push(cx.waker().clone());
            Poll::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Executor;
    use crate::Val;

    #[test]
    fn tasks_resume_once_per_edge() {
        let mut exec = Executor::new();
        let clock = Clock::new();
        let seen = TbObj::new(Vec::new());
        {
            let clock = clock.clone();
            let seen = seen.clone();
            exec.spawner().spawn("watch", async move {
                for _ in 0..3 {
                    let edge = clock.rising_edge().await;
                    seen.get_mut().push(edge);
                }
                Ok(Val::None)
            });
        }
        exec.run_once();
        for _ in 0..3 {
            clock.advance();
            exec.run_once();
        }
        assert_eq!(*seen.get(), vec![1, 2, 3]);
    }

    #[test]
    fn clock_cycles_counts_edges() {
        let mut exec = Executor::new();
        let clock = Clock::new();
        let mut handle = {
            let clock = clock.clone();
            exec.spawner().spawn("wait", async move {
                let edge = clock.clock_cycles(4).await;
                Ok(Val::Int(edge as i64))
            })
        };
        exec.run_once();
        for _ in 0..3 {
            clock.advance();
            exec.run_once();
            assert!(handle.try_join().is_none());
        }
        clock.advance();
        exec.run_once();
        assert_eq!(handle.try_join().unwrap().unwrap(), Val::Int(4));
    }

    #[test]
    fn spurious_poll_does_not_complete_early() {
        let clock = Clock::new();
        let mut edge = clock.rising_edge();
        let waker = futures::task::noop_waker();
        let mut cx = Context::from_waker(&waker);
        assert!(Pin::new(&mut edge).poll(&mut cx).is_pending());
        assert!(Pin::new(&mut edge).poll(&mut cx).is_pending());
        clock.advance();
        assert_eq!(Pin::new(&mut edge).poll(&mut cx), Poll::Ready(1));
    }
}
