//! Cooperative scheduler for periodic run-to-completion tasks.
//!
//! The scheduler owns a context value and hands `&mut` access to it to each
//! task body in turn. Tasks never preempt each other: a body that blocks
//! delays every task registered after it by the same amount, so task bodies
//! must return promptly.

use core::fmt;

use heapless::Vec;

use crate::clock::Millis;
use crate::timer::TaskTimer;

/// Default number of task slots.
pub const MAX_TASKS: usize = 8;

/// Body executed when a task's interval has elapsed.
pub type TaskFn<Ctx> = fn(&mut Ctx, Millis);

/// Handle returned by [`Scheduler::register`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TaskId(usize);

impl TaskId {
    /// Position of the task in registration order.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Errors reported by the scheduler registry.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SchedulerError {
    /// Every task slot is already taken.
    Full,
    /// The handle does not name a registered task.
    UnknownTask(TaskId),
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::Full => f.write_str("task table full"),
            SchedulerError::UnknownTask(id) => write!(f, "unknown task #{}", id.0),
        }
    }
}

struct TaskSlot<Ctx> {
    name: &'static str,
    timer: TaskTimer,
    body: TaskFn<Ctx>,
    runs: u32,
}

/// Read-only view of a registered task.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TaskInfo {
    pub id: TaskId,
    pub name: &'static str,
    pub interval_ms: u32,
    pub last_run: Millis,
    pub runs: u32,
}

/// Tasks executed by a single [`Scheduler::tick`], in execution order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TickReport<const N: usize = MAX_TASKS> {
    ran: Vec<TaskId, N>,
}

impl<const N: usize> TickReport<N> {
    /// Returns `true` when the task ran during the tick.
    #[must_use]
    pub fn ran(&self, id: TaskId) -> bool {
        self.ran.contains(&id)
    }

    /// Number of task bodies executed.
    #[must_use]
    pub fn count(&self) -> usize {
        self.ran.len()
    }

    /// Returns `true` when nothing was due.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.ran.is_empty()
    }

    /// Executed tasks in registration order.
    #[must_use]
    pub fn as_slice(&self) -> &[TaskId] {
        &self.ran
    }
}

/// Fixed-capacity table of periodic tasks sharing one context.
pub struct Scheduler<Ctx, const N: usize = MAX_TASKS> {
    context: Ctx,
    tasks: Vec<TaskSlot<Ctx>, N>,
}

impl<Ctx, const N: usize> Scheduler<Ctx, N> {
    /// Creates an empty scheduler around `context`.
    pub const fn new(context: Ctx) -> Self {
        Self {
            context,
            tasks: Vec::new(),
        }
    }

    /// Registers a task. Ties between tasks due on the same tick run in
    /// registration order.
    pub fn register(
        &mut self,
        name: &'static str,
        interval_ms: u32,
        body: TaskFn<Ctx>,
    ) -> Result<TaskId, SchedulerError> {
        let id = TaskId(self.tasks.len());
        self.tasks
            .push(TaskSlot {
                name,
                timer: TaskTimer::new(interval_ms),
                body,
                runs: 0,
            })
            .map_err(|_| SchedulerError::Full)?;
        Ok(id)
    }

    /// Runs every task whose interval has elapsed at `now`.
    pub fn tick(&mut self, now: Millis) -> TickReport<N> {
        let mut report = TickReport::default();
        for (index, slot) in self.tasks.iter_mut().enumerate() {
            if slot.timer.poll(now) {
                (slot.body)(&mut self.context, now);
                slot.runs = slot.runs.wrapping_add(1);
                // Capacity matches the task table, so this never fails.
                let _ = report.ran.push(TaskId(index));
            }
        }
        report
    }

    /// Changes a task's interval.
    pub fn set_interval(&mut self, id: TaskId, interval_ms: u32) -> Result<(), SchedulerError> {
        let slot = self
            .tasks
            .get_mut(id.0)
            .ok_or(SchedulerError::UnknownTask(id))?;
        slot.timer.set_interval(interval_ms);
        Ok(())
    }

    /// Looks up a task by handle.
    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<TaskInfo> {
        self.tasks.get(id.0).map(|slot| info(id.0, slot))
    }

    /// Looks up a task by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<TaskInfo> {
        self.tasks()
            .find(|task| task.name.eq_ignore_ascii_case(name))
    }

    /// Iterates over registered tasks in registration order.
    pub fn tasks(&self) -> impl Iterator<Item = TaskInfo> + '_ {
        self.tasks
            .iter()
            .enumerate()
            .map(|(index, slot)| info(index, slot))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Shared context handed to task bodies.
    pub fn context(&self) -> &Ctx {
        &self.context
    }

    /// Mutable access to the shared context between ticks.
    pub fn context_mut(&mut self) -> &mut Ctx {
        &mut self.context
    }

    /// Consumes the scheduler and yields the context.
    pub fn into_context(self) -> Ctx {
        self.context
    }
}

fn info<Ctx>(index: usize, slot: &TaskSlot<Ctx>) -> TaskInfo {
    TaskInfo {
        id: TaskId(index),
        name: slot.name,
        interval_ms: slot.timer.interval_ms(),
        last_run: slot.timer.last_run(),
        runs: slot.runs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Trace {
        order: Vec<&'static str, 16>,
    }

    fn blink(trace: &mut Trace, _: Millis) {
        let _ = trace.order.push("blink");
    }

    fn sensor(trace: &mut Trace, _: Millis) {
        let _ = trace.order.push("sensor");
    }

    #[test]
    fn runs_due_tasks_in_registration_order() {
        let mut scheduler: Scheduler<Trace, 4> = Scheduler::new(Trace::default());
        let blink_id = scheduler.register("blink", 500, blink).unwrap();
        let sensor_id = scheduler.register("sensor", 100, sensor).unwrap();

        let report = scheduler.tick(Millis::from_millis(100));
        assert!(!report.ran(blink_id));
        assert!(report.ran(sensor_id));

        let report = scheduler.tick(Millis::from_millis(500));
        assert_eq!(report.as_slice(), &[blink_id, sensor_id]);
        assert_eq!(scheduler.context().order.as_slice(), &["sensor", "blink", "sensor"]);
    }

    #[test]
    fn same_reading_never_reruns() {
        let mut scheduler: Scheduler<Trace, 2> = Scheduler::new(Trace::default());
        let id = scheduler.register("sensor", 1, sensor).unwrap();

        assert_eq!(scheduler.tick(Millis::from_millis(7)).count(), 1);
        assert!(scheduler.tick(Millis::from_millis(7)).is_idle());
        assert_eq!(scheduler.task(id).unwrap().runs, 1);
    }

    #[test]
    fn registry_rejects_overflow() {
        let mut scheduler: Scheduler<Trace, 1> = Scheduler::new(Trace::default());
        scheduler.register("blink", 10, blink).unwrap();
        assert_eq!(
            scheduler.register("sensor", 10, sensor),
            Err(SchedulerError::Full)
        );
    }

    #[test]
    fn interval_can_be_retuned() {
        let mut scheduler: Scheduler<Trace, 2> = Scheduler::new(Trace::default());
        let id = scheduler.register("blink", 500, blink).unwrap();
        scheduler.set_interval(id, 50).unwrap();

        assert_eq!(scheduler.tick(Millis::from_millis(50)).count(), 1);
        assert_eq!(scheduler.find("BLINK").unwrap().interval_ms, 50);
        assert_eq!(
            scheduler.set_interval(TaskId(3), 10),
            Err(SchedulerError::UnknownTask(TaskId(3)))
        );
    }
}
