use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Periodic maintenance jobs run between decisions.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    CategoryWeights,
    OpponentPatterns,
    PhaseTuning,
}

/// Next-due timestamp per task, driven by match time.
///
/// A task is due the first time it is polled and then once per interval.
/// Time moving backwards (a new match without `reset`) re-arms every task.
#[derive(Clone, Debug, Default)]
pub struct Scheduler {
    intervals: BTreeMap<Task, f32>,
    next_due: BTreeMap<Task, f32>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_task(mut self, task: Task, interval: f32) -> Self {
        self.intervals.insert(task, interval.max(0.0));
        self
    }

    pub fn interval(&self, task: Task) -> Option<f32> {
        self.intervals.get(&task).copied()
    }

    /// Returns whether `task` should run at `now`, and if so books its next slot.
    pub fn due(&mut self, task: Task, now: f32) -> bool {
        let Some(interval) = self.intervals.get(&task).copied() else {
            return false;
        };
        match self.next_due.get(&task).copied() {
            Some(next) if now < next && next - now <= interval => false,
            _ => {
                self.next_due.insert(task, now + interval);
                true
            }
        }
    }

    pub fn next_due(&self, task: Task) -> Option<f32> {
        self.next_due.get(&task).copied()
    }

    pub fn reset(&mut self) {
        self.next_due.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_once_per_interval() {
        let mut s = Scheduler::new().with_task(Task::CategoryWeights, 10.0);
        assert!(s.due(Task::CategoryWeights, 0.0));
        assert!(!s.due(Task::CategoryWeights, 5.0));
        assert!(!s.due(Task::CategoryWeights, 9.9));
        assert!(s.due(Task::CategoryWeights, 10.0));
        assert_eq!(s.next_due(Task::CategoryWeights), Some(20.0));
    }

    #[test]
    fn unknown_tasks_never_run() {
        let mut s = Scheduler::new().with_task(Task::PhaseTuning, 1.0);
        assert!(!s.due(Task::OpponentPatterns, 0.0));
    }

    #[test]
    fn clock_rewind_rearms() {
        let mut s = Scheduler::new().with_task(Task::OpponentPatterns, 10.0);
        assert!(s.due(Task::OpponentPatterns, 100.0));
        assert!(s.due(Task::OpponentPatterns, 3.0));
        assert!(!s.due(Task::OpponentPatterns, 4.0));
    }

    #[test]
    fn reset_clears_slots() {
        let mut s = Scheduler::new().with_task(Task::PhaseTuning, 10.0);
        assert!(s.due(Task::PhaseTuning, 0.0));
        s.reset();
        assert!(s.due(Task::PhaseTuning, 1.0));
    }
}
