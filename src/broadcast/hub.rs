//! Subscription table for pushed responses
//!
//! The hub keeps its own lock, separate from the session registry. Lock
//! order: the hub lock is only ever held long enough to clone the matching
//! callbacks and is never held while acquiring any other lock or while a
//! callback runs. Code holding a session lock may publish.

use ahash::AHashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::runtime::Handle;
use tracing::{debug, error};

use crate::core::types::{SessionId, WorldId};
use crate::session::protocol::GameResponse;

/// Delivery callback registered by a session
pub type Delivery = Arc<dyn Fn(GameResponse) + Send + Sync>;

#[derive(Clone)]
struct Subscriber {
    world: WorldId,
    deliver: Delivery,
}

/// Which subscribers a publish reaches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    One(SessionId),
    World(WorldId),
    /// Every subscriber except the given session
    AllExcept(SessionId),
}

impl Audience {
    fn includes(&self, id: &SessionId, world: &WorldId) -> bool {
        match self {
            Audience::One(target) => target == id,
            Audience::World(target) => target == world,
            Audience::AllExcept(skip) => skip != id,
        }
    }
}

#[derive(Default)]
pub struct BroadcastHub {
    subscribers: RwLock<AHashMap<SessionId, Subscriber>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, AHashMap<SessionId, Subscriber>> {
        self.subscribers.read().unwrap_or_else(|poisoned| {
            error!("broadcast table lock poisoned; recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, AHashMap<SessionId, Subscriber>> {
        self.subscribers.write().unwrap_or_else(|poisoned| {
            error!("broadcast table lock poisoned; recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    /// Register (or replace) the callback for a session
    pub fn subscribe(&self, session: SessionId, world: WorldId, deliver: Delivery) {
        self.write().insert(session, Subscriber { world, deliver });
        debug!(%session, "subscribed");
    }

    pub fn unsubscribe(&self, session: &SessionId) -> bool {
        let removed = self.write().remove(session).is_some();
        if removed {
            debug!(%session, "unsubscribed");
        }
        removed
    }

    pub fn is_subscribed(&self, session: &SessionId) -> bool {
        self.read().contains_key(session)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Hand `response` to every matching subscriber; returns how many
    ///
    /// Each delivery is an independent unit of work: a blocking task when
    /// a tokio runtime is available, a plain thread otherwise. This call
    /// never waits on a subscriber.
    pub fn publish(&self, audience: Audience, response: GameResponse) -> usize {
        let targets: Vec<(SessionId, Delivery)> = self
            .read()
            .iter()
            .filter(|(id, sub)| audience.includes(id, &sub.world))
            .map(|(id, sub)| (*id, Arc::clone(&sub.deliver)))
            .collect();

        let count = targets.len();
        for (session, deliver) in targets {
            dispatch(session, deliver, response.clone());
        }
        count
    }
}

fn dispatch(session: SessionId, deliver: Delivery, response: GameResponse) {
    let job = move || {
        if catch_unwind(AssertUnwindSafe(|| deliver(response))).is_err() {
            error!(%session, "subscriber panicked during delivery");
        }
    };
    match Handle::try_current() {
        Ok(handle) => {
            handle.spawn_blocking(job);
        }
        Err(_) => {
            std::thread::spawn(job);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    fn world(name: &str) -> WorldId {
        WorldId::Local(name.into())
    }

    fn channel_delivery() -> (Delivery, mpsc::Receiver<GameResponse>) {
        let (tx, rx) = mpsc::channel();
        let tx = std::sync::Mutex::new(tx);
        let deliver: Delivery = Arc::new(move |response: GameResponse| {
            if let Ok(tx) = tx.lock() {
                let _ = tx.send(response);
            }
        });
        (deliver, rx)
    }

    #[test]
    fn test_publish_reaches_world_only() {
        let hub = BroadcastHub::new();
        let (a, rx_a) = channel_delivery();
        let (b, rx_b) = channel_delivery();
        hub.subscribe(SessionId::new(), world("north"), a);
        hub.subscribe(SessionId::new(), world("south"), b);

        let sent = hub.publish(Audience::World(world("north")), GameResponse::broadcast("harvest_tick", vec![]));
        assert_eq!(sent, 1);
        let got = rx_a.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(got.screen(), "harvest_tick");
        assert!(rx_b.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn test_all_except_skips_sender() {
        let hub = BroadcastHub::new();
        let me = SessionId::new();
        let (a, rx_a) = channel_delivery();
        let (b, rx_b) = channel_delivery();
        hub.subscribe(me, world("x"), a);
        hub.subscribe(SessionId::new(), world("y"), b);

        assert_eq!(hub.publish(Audience::AllExcept(me), GameResponse::broadcast("player_joined", vec![])), 1);
        assert!(rx_b.recv_timeout(Duration::from_secs(2)).is_ok());
        assert!(rx_a.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn test_slow_and_panicking_subscribers_do_not_block() {
        let hub = BroadcastHub::new();
        hub.subscribe(
            SessionId::new(),
            world("x"),
            Arc::new(|_: GameResponse| std::thread::sleep(Duration::from_millis(500))),
        );
        hub.subscribe(SessionId::new(), world("x"), Arc::new(|_: GameResponse| panic!("bad subscriber")));
        let (fast, rx) = channel_delivery();
        hub.subscribe(SessionId::new(), world("x"), fast);

        let started = Instant::now();
        assert_eq!(hub.publish(Audience::World(world("x")), GameResponse::broadcast("tide_resolved", vec![])), 3);
        assert!(started.elapsed() < Duration::from_millis(400));
        assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
    }

    #[test]
    fn test_unsubscribe() {
        let hub = BroadcastHub::new();
        let id = SessionId::new();
        let (a, _rx) = channel_delivery();
        hub.subscribe(id, world("x"), a);
        assert!(hub.is_subscribed(&id));
        assert!(hub.unsubscribe(&id));
        assert!(!hub.unsubscribe(&id));
        assert_eq!(hub.publish(Audience::One(id), GameResponse::broadcast("x", vec![])), 0);
    }
}
