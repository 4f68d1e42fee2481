use futures::{
    future::{FutureExt, LocalBoxFuture},
    task::{waker_ref, ArcWake, Context, Poll},
};
use futures_channel::oneshot;
use intmap::IntMap;
use log::trace;
use queues::{IsQueue, Queue};
use std::{
    cell::{Cell, RefCell},
    future::Future,
    pin::Pin,
    rc::Rc,
    sync::{Arc, Mutex},
};

use crate::{TaskResult, TbError};

type TaskId = u64;
type ReadyQueue = Arc<Mutex<Queue<TaskId>>>;

fn schedule_task(ready: &ReadyQueue, id: TaskId) {
    if let Ok(mut queue) = ready.lock() {
        let _ = queue.add(id);
    }
}

// Wakers only carry the task id, so the futures themselves can stay !Send.
struct TaskWaker {
    id: TaskId,
    ready: ReadyQueue,
}

impl ArcWake for TaskWaker {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        schedule_task(&arc_self.ready, arc_self.id);
    }
}

struct Task {
    name: String,
    future: LocalBoxFuture<'static, TaskResult>,
    waker: Arc<TaskWaker>,
    join_tx: Option<oneshot::Sender<TaskResult>>,
}

/// Cloneable handle for spawning tasks, also from inside running tasks.
#[derive(Clone)]
pub struct Spawner {
    ready: ReadyQueue,
    spawned: Rc<RefCell<Vec<(TaskId, Task)>>>,
    next_id: Rc<Cell<TaskId>>,
}

impl Spawner {
    pub fn spawn(
        &self,
        name: &str,
        future: impl Future<Output = TaskResult> + 'static,
    ) -> JoinHandle {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let (tx, rx) = oneshot::channel();
        let task = Task {
            name: name.to_string(),
            future: future.boxed_local(),
            waker: Arc::new(TaskWaker {
                id,
                ready: self.ready.clone(),
            }),
            join_tx: Some(tx),
        };
        self.spawned.borrow_mut().push((id, task));
        schedule_task(&self.ready, id);
        JoinHandle {
            name: name.to_string(),
            join_rx: Some(rx),
        }
    }
}

/// Single threaded executor. `run_once` polls every ready task until nothing
/// is left to do; the scheduler calls it once per clock edge.
pub struct Executor {
    tasks: IntMap<Task>,
    spawner: Spawner,
}

impl Executor {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            tasks: IntMap::new(),
            spawner: Spawner {
                ready: Arc::new(Mutex::new(Queue::new())),
                spawned: Rc::new(RefCell::new(Vec::new())),
                next_id: Rc::new(Cell::new(0)),
            },
        }
    }

    pub fn spawner(&self) -> Spawner {
        self.spawner.clone()
    }

    /// Number of tasks that have not completed yet.
    pub fn live_tasks(&self) -> usize {
        self.tasks.len() + self.spawner.spawned.borrow().len()
    }

    pub fn run_once(&mut self) {
        loop {
            self.adopt_spawned();
            match self.next_task() {
                Some(id) => self.process_task(id),
                None => break,
            }
        }
    }

    fn adopt_spawned(&mut self) {
        let spawned: Vec<_> = self.spawner.spawned.borrow_mut().drain(..).collect();
        for (id, task) in spawned {
            self.tasks.insert(id, task);
        }
    }

    fn next_task(&self) -> Option<TaskId> {
        self.spawner.ready.lock().ok()?.remove().ok()
    }

    fn process_task(&mut self, id: TaskId) {
        // duplicate wake-ups of a finished task end up here
        let mut task = match self.tasks.remove(id) {
            Some(task) => task,
            None => return,
        };
        let poll = {
            let waker = waker_ref(&task.waker);
            let mut context = Context::from_waker(&waker);
            task.future.as_mut().poll(&mut context)
        };
        match poll {
            Poll::Pending => {
                self.tasks.insert(id, task);
            }
            Poll::Ready(result) => {
                trace!("task '{}' finished: {:?}", task.name, result);
                if let Some(tx) = task.join_tx.take() {
                    let _ = tx.send(result);
                }
            }
        }
    }
}

/// The task's result is handed out exactly once; the receiver is dropped
/// when it is taken.
pub struct JoinHandle {
    name: String,
    join_rx: Option<oneshot::Receiver<TaskResult>>,
}

impl JoinHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True once the result has been taken through `try_join` or `.await`.
    pub fn is_joined(&self) -> bool {
        self.join_rx.is_none()
    }

    /// Result of the task if it has finished, without suspending. Yields
    /// `None` while the task runs and on every call after the result was
    /// taken.
    pub fn try_join(&mut self) -> Option<TaskResult> {
        let result = match self.join_rx.as_mut()?.try_recv() {
            Ok(None) => return None,
            Ok(Some(result)) => result,
            Err(_) => Err(TbError::TaskDropped(self.name.clone())),
        };
        self.join_rx = None;
        Some(result)
    }
}

impl Future for JoinHandle {
    type Output = TaskResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        let rx = match this.join_rx.as_mut() {
            Some(rx) => rx,
            None => return Poll::Ready(Err(TbError::TaskDropped(this.name.clone()))),
        };
        let result = match rx.poll_unpin(cx) {
            Poll::Ready(Ok(result)) => result,
            Poll::Ready(Err(_)) => Err(TbError::TaskDropped(this.name.clone())),
            Poll::Pending => return Poll::Pending,
        };
        this.join_rx = None;
        Poll::Ready(result)
    }
}
