//! Deterministic stand-ins for the two host scheduling primitives: the
//! display-frame callback and the zero-delay deferred task

use crate::component::ComponentId;
use indexmap::IndexSet;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// First-time setup of an instance
    Initialize(ComponentId),
    /// One steady-state pass: re-render if anything changed
    Run(ComponentId),
}

#[derive(Debug, Default)]
pub struct Scheduler {
    deferred: VecDeque<Task>,
    frames: IndexSet<ComponentId>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn defer(&mut self, task: Task) {
        self.deferred.push_back(task);
    }

    /// Ask for a pass on the next display frame; one request per component
    pub fn request_frame(&mut self, id: ComponentId) {
        self.frames.insert(id);
    }

    /// Start a display frame: every frame request becomes a deferred pass
    pub fn animation_frame(&mut self) -> usize {
        let count = self.frames.len();
        for id in self.frames.drain(..) {
            self.deferred.push_back(Task::Run(id));
        }
        count
    }

    /// Tasks queued so far; anything deferred while they run waits for the
    /// next tick
    pub fn take_deferred(&mut self) -> Vec<Task> {
        self.deferred.drain(..).collect()
    }

    pub fn cancel(&mut self, id: ComponentId) {
        self.frames.shift_remove(&id);
        self.deferred.retain(|task| match task {
            Task::Initialize(t) | Task::Run(t) => *t != id,
        });
    }

    pub fn pending_tasks(&self) -> usize {
        self.deferred.len()
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn is_idle(&self) -> bool {
        self.deferred.is_empty() && self.frames.is_empty()
    }
}
