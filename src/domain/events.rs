/// Observer plumbing and the controller's event vocabulary.
///
/// `EventBus` keeps subscribers in subscription order and calls them
/// synchronously. An empty bus costs nothing. The controller additionally
/// records every event of a step so callers that prefer polling can drain
/// them (`MovementController::drain_events`).

use std::fmt;

use glam::Vec2;

use super::state::{Facing, MotorState};

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SubscriptionId(u64);

pub struct EventBus<E> {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Box<dyn FnMut(&E)>)>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        EventBus { next_id: 0, subscribers: Vec::new() }
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus").field("subscribers", &self.subscribers.len()).finish()
    }
}

impl<E> EventBus<E> {
    pub fn subscribe(&mut self, callback: impl FnMut(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    pub fn emit(&mut self, event: &E) {
        for (_, callback) in self.subscribers.iter_mut() {
            callback(event);
        }
    }

    pub fn len(&self) -> usize { self.subscribers.len() }
    pub fn is_empty(&self) -> bool { self.subscribers.is_empty() }
}

/// Everything the movement controller announces.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum ControllerEvent {
    StateChanged { from: MotorState, to: MotorState },

    Jump,
    JumpEnd,
    NormalJump,
    AirJump,
    WallJump(Vec2),
    LadderJump,
    LedgeJump,

    DashStart(Facing),
    DashProgress(f32),
    DashEnd,

    WallSlidingStart(Facing),
    WallSlidingEnd,
    LedgeGrabStart(Facing),
    LedgeGrabEnd,

    Landed,
    JumpCounterReset(MotorState),
    FacingFlip(Facing),

    ActionStart(Facing),
    ActionProgress(f32),
    ActionEnd,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn subscribers_run_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus: EventBus<u32> = EventBus::default();
        let a = Rc::clone(&log);
        bus.subscribe(move |e| a.borrow_mut().push(("a", *e)));
        let b = Rc::clone(&log);
        bus.subscribe(move |e| b.borrow_mut().push(("b", *e)));
        bus.emit(&7);
        assert_eq!(*log.borrow(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn unsubscribe_removes_only_that_callback() {
        let hits = Rc::new(RefCell::new(0));
        let mut bus: EventBus<()> = EventBus::default();
        let h = Rc::clone(&hits);
        let id = bus.subscribe(move |_| *h.borrow_mut() += 1);
        let h2 = Rc::clone(&hits);
        bus.subscribe(move |_| *h2.borrow_mut() += 10);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.emit(&());
        assert_eq!(*hits.borrow(), 10);
        assert_eq!(bus.len(), 1);
    }

    #[test]
    fn empty_bus_emit_is_noop() {
        let mut bus: EventBus<ControllerEvent> = EventBus::default();
        bus.emit(&ControllerEvent::Landed);
        assert!(bus.is_empty());
    }
}
