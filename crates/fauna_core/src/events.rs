//! Typed publish/subscribe notifications and fire-and-forget effects.

use fauna_data::{AgentId, EventKind, SimEvent};
use std::fmt;
use std::io::Write;

/// Callback invoked for each delivered event. Errors are logged, never
/// propagated back into the simulation.
pub type Subscriber = Box<dyn FnMut(&SimEvent) -> anyhow::Result<()>>;

/// Event dispatcher owned by the population manager.
///
/// Delivery happens synchronously on publish. The bus also keeps the events
/// of the running tick so the tick can hand them back to its caller.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<(Option<EventKind>, Subscriber)>,
    pending: Vec<SimEvent>,
    failures: u64,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .field("pending", &self.pending.len())
            .field("failures", &self.failures)
            .finish()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `subscriber` for one kind of event.
    pub fn subscribe(&mut self, kind: EventKind, subscriber: Subscriber) {
        self.subscribers.push((Some(kind), subscriber));
    }

    /// Registers `subscriber` for every event.
    pub fn subscribe_all(&mut self, subscriber: Subscriber) {
        self.subscribers.push((None, subscriber));
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn publish(&mut self, event: SimEvent) {
        let kind = event.kind();
        for (filter, subscriber) in &mut self.subscribers {
            if filter.is_some_and(|wanted| wanted != kind) {
                continue;
            }
            if let Err(e) = subscriber(&event) {
                self.failures += 1;
                tracing::warn!(?kind, error = %e, "Event subscriber failed");
            }
        }
        self.pending.push(event);
    }

    pub fn publish_all<I: IntoIterator<Item = SimEvent>>(&mut self, events: I) {
        for event in events {
            self.publish(event);
        }
    }

    /// Events published since the last drain, in publication order.
    pub fn drain(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.pending)
    }

    /// Number of subscriber calls that returned an error.
    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures
    }
}

/// Writes every event as one JSON object per line.
pub fn json_lines_subscriber<W: Write + 'static>(mut writer: W) -> Subscriber {
    Box::new(move |event: &SimEvent| {
        serde_json::to_writer(&mut writer, event)?;
        writer.write_all(b"\n")?;
        Ok(())
    })
}

/// Rendering collaborator. The engine never reads anything back.
pub trait EffectSink {
    fn birth(&mut self, _x: f64, _y: f64) {}

    fn courtship_link(&mut self, _male: AgentId, _female: AgentId) {}

    fn search_pulse(&mut self, _agent: AgentId) {}
}

/// Effect sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEffects;

impl EffectSink for NoEffects {}

#[cfg(test)]
mod tests {
    use super::*;
    use fauna_data::BehaviorState;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn spawned(tick: u64) -> SimEvent {
        SimEvent::AgentSpawned {
            id: AgentId::new(0, 0),
            tick,
            x: 1.0,
            y: 2.0,
        }
    }

    fn state_changed() -> SimEvent {
        SimEvent::StateChanged {
            id: AgentId::new(0, 0),
            from: BehaviorState::Idle,
            to: BehaviorState::Seeking,
            tick: 3,
        }
    }

    #[test]
    fn test_subscribers_filter_by_kind() {
        let mut bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.subscribe(
            EventKind::AgentSpawned,
            Box::new(move |event| {
                sink.borrow_mut().push(event.tick());
                Ok(())
            }),
        );

        bus.publish(spawned(1));
        bus.publish(state_changed());
        bus.publish(spawned(2));

        assert_eq!(*seen.borrow(), vec![1, 2]);
        assert_eq!(bus.drain().len(), 3);
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn test_failing_subscriber_does_not_block_others() {
        let mut bus = EventBus::new();
        let count = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&count);
        bus.subscribe_all(Box::new(|_| anyhow::bail!("listener offline")));
        bus.subscribe_all(Box::new(move |_| {
            *counter.borrow_mut() += 1;
            Ok(())
        }));

        bus.publish(spawned(1));
        bus.publish(spawned(2));

        assert_eq!(*count.borrow(), 2);
        assert_eq!(bus.failures(), 2);
        assert_eq!(bus.drain().len(), 2);
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_json_lines_are_tagged() {
        let buf = SharedBuf::default();
        let mut bus = EventBus::new();
        bus.subscribe_all(json_lines_subscriber(buf.clone()));
        bus.publish(state_changed());
        bus.publish(spawned(4));

        let text = String::from_utf8(buf.0.borrow().clone()).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"event\":\"StateChanged\""));
        assert!(lines[0].contains("\"to\":\"SEEKING\""));

        let back: SimEvent = serde_json::from_str(lines[1]).expect("parse");
        assert_eq!(back, spawned(4));
    }
}
