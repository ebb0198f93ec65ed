use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// Cancellable year-advance schedule
// ---------------------------------------------------------------------------

/// Identifies one animation run. Becomes stale as soon as the schedule is
/// restarted or cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskHandle {
    generation: u64,
}

/// A due animation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub handle: TaskHandle,
    pub year: i32,
}

#[derive(Debug, Clone)]
struct ActiveRun {
    years: Vec<i32>,
    cursor: usize,
    next_due: Instant,
}

/// Steps cyclically through a chart's years at a fixed interval.
///
/// Owned by one chart. Rebuilding the chart restarts the schedule, which
/// invalidates every handle issued before.
#[derive(Debug, Clone)]
pub struct AnimationSchedule {
    interval: Duration,
    generation: u64,
    active: Option<ActiveRun>,
}

impl AnimationSchedule {
    pub fn new(interval: Duration) -> Self {
        AnimationSchedule {
            interval,
            generation: 0,
            active: None,
        }
    }

    /// Cancel the current run and start a new one over `years`, first tick
    /// due immediately. Returns `None` (and stays cancelled) when there is
    /// nothing to animate.
    pub fn restart(&mut self, years: Vec<i32>, now: Instant) -> Option<TaskHandle> {
        self.cancel();
        if years.is_empty() {
            return None;
        }
        self.active = Some(ActiveRun {
            years,
            cursor: 0,
            next_due: now,
        });
        Some(self.handle())
    }

    pub fn cancel(&mut self) {
        self.generation += 1;
        self.active = None;
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_current(&self, handle: TaskHandle) -> bool {
        self.active.is_some() && handle.generation == self.generation
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.active.as_ref().map(|run| run.next_due)
    }

    /// The step due at `now`, if any. Wraps around after the last year.
    pub fn poll(&mut self, now: Instant) -> Option<Tick> {
        let handle = self.handle();
        let interval = self.interval;
        let run = self.active.as_mut()?;
        if now < run.next_due {
            return None;
        }
        let year = run.years[run.cursor];
        run.cursor = (run.cursor + 1) % run.years.len();
        run.next_due = now + interval;
        Some(Tick { handle, year })
    }

    fn handle(&self) -> TaskHandle {
        TaskHandle {
            generation: self.generation,
        }
    }
}
