// src/dispatch.rs
use crate::client::ControlClient;
use crate::command::{ControlCommand, GestureEvent};
use crate::jump::LegSide;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct QueueState {
    commands: VecDeque<ControlCommand>,
    closed: bool,
    dropped: u64,
}

/// Bounded hand-off between the recognition thread and the dispatch worker.
///
/// Pushing never blocks. When full, the oldest queued command is discarded:
/// commands describe current state, so the newest one wins.
pub struct CommandQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    capacity: usize,
}

impl CommandQueue {
    pub fn new(capacity: usize) -> Arc<Self> {
        let capacity = capacity.max(1);
        Arc::new(Self {
            state: Mutex::new(QueueState {
                commands: VecDeque::with_capacity(capacity),
                closed: false,
                dropped: 0,
            }),
            notify: Notify::new(),
            capacity,
        })
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // A panic while holding the lock cannot leave the deque inconsistent
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns false once the queue has been closed.
    pub fn push(&self, command: ControlCommand) -> bool {
        {
            let mut state = self.lock();
            if state.closed {
                return false;
            }
            if state.commands.len() >= self.capacity {
                if let Some(oldest) = state.commands.pop_front() {
                    state.dropped += 1;
                    if overflow_warrants_warning(state.dropped) {
                        warn!(
                            "Dispatch queue full, dropping {} ({} dropped so far)",
                            oldest, state.dropped
                        );
                    } else {
                        debug!("Dispatch queue full, dropping {}", oldest);
                    }
                }
            }
            state.commands.push_back(command);
        }
        self.notify.notify_one();
        true
    }

    /// Stops accepting commands. Already queued ones are still delivered.
    pub fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_one();
    }

    pub fn len(&self) -> usize {
        self.lock().commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }

    /// Waits for the next command; `None` once closed and drained.
    pub async fn next(&self) -> Option<ControlCommand> {
        loop {
            {
                let mut state = self.lock();
                if let Some(command) = state.commands.pop_front() {
                    return Some(command);
                }
                if state.closed {
                    return None;
                }
            }
            self.notify.notified().await;
        }
    }
}

/// Overflow warns on the first drop and then once per hundred.
fn overflow_warrants_warning(dropped: u64) -> bool {
    dropped == 1 || dropped % 100 == 0
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub delivered: u64,
    pub failed: u64,
}

/// Delivers queued commands one at a time until the queue is closed.
///
/// Failures are logged and forgotten; nothing is retried.
pub async fn run_worker<C: ControlClient>(queue: Arc<CommandQueue>, client: C) -> DispatchStats {
    let mut stats = DispatchStats::default();
    while let Some(command) = queue.next().await {
        match client.send(&command).await {
            Ok(()) => stats.delivered += 1,
            Err(e) => {
                stats.failed += 1;
                warn!("Dropping '{}': {}", command, e);
            }
        }
    }
    debug!(
        "Dispatch worker stopped ({} delivered, {} failed)",
        stats.delivered, stats.failed
    );
    stats
}

pub fn spawn_worker<C: ControlClient>(
    runtime: &tokio::runtime::Handle,
    queue: Arc<CommandQueue>,
    client: C,
) -> JoinHandle<DispatchStats> {
    runtime.spawn(run_worker(queue, client))
}

/// Optional commands bound to the jump and rip gestures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventCues {
    pub jump_right: Option<ControlCommand>,
    pub jump_left: Option<ControlCommand>,
    pub rip: Option<ControlCommand>,
}

impl EventCues {
    fn jump(&self, side: LegSide) -> Option<&ControlCommand> {
        match side {
            LegSide::Right => self.jump_right.as_ref(),
            LegSide::Left => self.jump_left.as_ref(),
        }
    }
}

/// Turns recognizer output into control commands for the worker.
pub struct EventDispatcher {
    queue: Arc<CommandQueue>,
    cues: EventCues,
}

impl EventDispatcher {
    pub fn new(queue: Arc<CommandQueue>, cues: EventCues) -> Self {
        Self { queue, cues }
    }

    pub fn command_for(&self, event: &GestureEvent) -> Option<ControlCommand> {
        match event {
            GestureEvent::ZoneChanged { zone, .. } => Some(zone.entry_command()),
            GestureEvent::Volume { zone, level, .. } => {
                Some(ControlCommand::set_volume(*zone, *level))
            }
            GestureEvent::Jump { side, .. } => self.cues.jump(*side).cloned(),
            GestureEvent::Rip { .. } => self.cues.rip.clone(),
        }
    }

    /// Enqueues the command for `event`, if any. Never blocks.
    pub fn dispatch(&self, event: &GestureEvent) {
        if event.is_discrete() {
            info!("Gesture: {:?}", event);
        }

        if let Some(command) = self.command_for(event) {
            if !self.queue.push(command) {
                debug!("Dispatch queue closed, ignoring {:?}", event);
            }
        }
    }

    pub fn dispatch_all(&self, events: &[GestureEvent]) {
        for event in events {
            self.dispatch(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::zone::Zone;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct RecordingClient {
        sent: Arc<Mutex<Vec<ControlCommand>>>,
    }

    impl ControlClient for RecordingClient {
        async fn send(&self, command: &ControlCommand) -> Result<(), ClientError> {
            self.sent.lock().unwrap().push(command.clone());
            Ok(())
        }
    }

    /// Rejects everything with a transport-free error.
    #[derive(Clone)]
    struct FailingClient;

    impl ControlClient for FailingClient {
        async fn send(&self, _command: &ControlCommand) -> Result<(), ClientError> {
            Err(ClientError::BaseUrl("unreachable".into()))
        }
    }

    fn volume(value: &str) -> ControlCommand {
        ControlCommand::SetVolume("0".into(), value.into())
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let queue = CommandQueue::new(2);
        queue.push(volume("0.10"));
        queue.push(volume("0.20"));
        queue.push(volume("0.30"));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.dropped(), 1);

        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        queue.close();
        let drained: Vec<ControlCommand> = rt.block_on(async {
            let mut out = Vec::new();
            while let Some(cmd) = queue.next().await {
                out.push(cmd);
            }
            out
        });
        assert_eq!(drained, vec![volume("0.20"), volume("0.30")]);
    }

    #[test]
    fn test_overflow_warning_is_rate_limited() {
        let warned: Vec<u64> = (1..=250).filter(|n| overflow_warrants_warning(*n)).collect();
        assert_eq!(warned, vec![1, 100, 200]);

        let queue = CommandQueue::new(1);
        for i in 0..150 {
            queue.push(volume(&format!("0.{:02}", i % 100)));
        }
        assert_eq!(queue.dropped(), 149);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_closed_queue_rejects() {
        let queue = CommandQueue::new(4);
        queue.close();
        assert!(!queue.push(volume("0.10")));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_worker_delivers_in_order() {
        let queue = CommandQueue::new(16);
        let client = RecordingClient::default();
        let worker = tokio::spawn(run_worker(queue.clone(), client.clone()));

        queue.push(ControlCommand::StartLoop("0".into()));
        queue.push(volume("0.40"));
        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.push(ControlCommand::Play("1".into()));
        queue.close();

        let stats = worker.await.unwrap();
        assert_eq!(stats, DispatchStats { delivered: 3, failed: 0 });
        assert_eq!(
            *client.sent.lock().unwrap(),
            vec![
                ControlCommand::StartLoop("0".into()),
                volume("0.40"),
                ControlCommand::Play("1".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_worker_swallows_failures() {
        let queue = CommandQueue::new(16);
        let worker = tokio::spawn(run_worker(queue.clone(), FailingClient));

        queue.push(ControlCommand::StartLoop("0".into()));
        queue.push(volume("0.40"));
        queue.close();

        let stats = worker.await.unwrap();
        assert_eq!(stats, DispatchStats { delivered: 0, failed: 2 });
    }

    #[test]
    fn test_event_translation() {
        let queue = CommandQueue::new(16);
        let cues = EventCues {
            jump_right: Some(ControlCommand::StartLoop("6".into())),
            ..EventCues::default()
        };
        let dispatcher = EventDispatcher::new(queue.clone(), cues);

        dispatcher.dispatch_all(&[
            GestureEvent::ZoneChanged { body: 1, zone: Zone::Zone0 },
            GestureEvent::ZoneChanged { body: 1, zone: Zone::Zone2 },
            GestureEvent::Volume { body: 1, zone: Zone::Zone2, level: 0.4 },
            GestureEvent::Jump { body: 1, side: LegSide::Right },
            GestureEvent::Jump { body: 1, side: LegSide::Left },
            GestureEvent::Rip { body: 1 },
        ]);

        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        queue.close();
        let queued: Vec<ControlCommand> = rt.block_on(async {
            let mut out = Vec::new();
            while let Some(cmd) = queue.next().await {
                out.push(cmd);
            }
            out
        });

        // Uncued left jump and rip produce nothing
        assert_eq!(
            queued,
            vec![
                ControlCommand::StartLoop("0".into()),
                ControlCommand::Play("2".into()),
                ControlCommand::SetVolume("2".into(), "0.40".into()),
                ControlCommand::StartLoop("6".into()),
            ]
        );
    }
}
