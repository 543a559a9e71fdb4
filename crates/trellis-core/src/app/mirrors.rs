//! MirrorViews - tracker と calendar の読み取り専用スナップショット
//!
//! ダッシュボード上の表示用。正本ではないので reconcile はしません。

use std::sync::Arc;

use tokio::sync::watch;

use crate::domain::Collaborator;
use crate::ports::{CalendarEvent, EventWindow, TrackerTask};

use super::context::ServiceContext;

pub struct MirrorViews {
    ctx: Arc<ServiceContext>,
    tracker_tasks: watch::Sender<Vec<TrackerTask>>,
    events: watch::Sender<Vec<CalendarEvent>>,
}

impl MirrorViews {
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self {
            ctx,
            tracker_tasks: watch::channel(Vec::new()).0,
            events: watch::channel(Vec::new()).0,
        }
    }

    pub fn tracker_tasks(&self) -> Vec<TrackerTask> {
        self.tracker_tasks.borrow().clone()
    }

    pub fn watch_tracker_tasks(&self) -> watch::Receiver<Vec<TrackerTask>> {
        self.tracker_tasks.subscribe()
    }

    pub fn events(&self) -> Vec<CalendarEvent> {
        self.events.borrow().clone()
    }

    pub fn watch_events(&self) -> watch::Receiver<Vec<CalendarEvent>> {
        self.events.subscribe()
    }

    /// No-op unless the tracker is connected.
    pub async fn load_tracker_tasks(&self) {
        if !self.ctx.is_connected(Collaborator::Tracker) {
            return;
        }
        let tasks = self.ctx.tracker.list_tasks().await;
        tracing::debug!(count = tasks.len(), "tracker tasks loaded");
        self.tracker_tasks.send_replace(tasks);
    }

    /// No-op unless the calendar is connected.
    pub async fn load_events(&self, window: EventWindow) {
        if !self.ctx.is_connected(Collaborator::Calendar) {
            return;
        }
        let events = self.ctx.calendar.list_events(window).await;
        tracing::debug!(count = events.len(), "calendar events loaded");
        self.events.send_replace(events);
    }
}
