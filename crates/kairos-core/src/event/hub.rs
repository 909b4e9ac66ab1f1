// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use super::bus::EventBus;
use super::{EngineEvent, Topic};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Identifies one subscription on the [`EventHub`], for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

type Handler = Box<dyn FnMut(&EngineEvent) -> anyhow::Result<()> + Send>;

struct Subscription {
    id: SubscriptionId,
    handler: Arc<Mutex<Handler>>,
}

/// The synchronous pub/sub channel the engine and its subsystems talk over.
///
/// Handlers run on the emitting thread, inside the emitting call. An emit
/// performed from within a handler is queued and delivered after the current
/// event's handlers finish, but still before the outermost `emit` returns;
/// handlers are never invoked re-entrantly. A handler returning `Err` is
/// logged and does not stop delivery to the remaining handlers.
pub struct EventHub {
    handlers: Mutex<HashMap<Topic, Vec<Subscription>>>,
    queue: Mutex<VecDeque<EngineEvent>>,
    dispatching: AtomicBool,
    taps: Mutex<Vec<flume::Sender<EngineEvent>>>,
}

impl EventHub {
    /// Creates a hub with no subscribers.
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(HashMap::new()),
            queue: Mutex::new(VecDeque::new()),
            dispatching: AtomicBool::new(false),
            taps: Mutex::new(Vec::new()),
        }
    }

    /// Subscribes `handler` to every event published under `topic`.
    ///
    /// Handlers on the same topic run in subscription order. Subscribing from
    /// inside a handler is allowed; the new handler starts receiving events
    /// from the next dispatch.
    ///
    /// ## Arguments
    /// * `topic` - The topic to listen on.
    /// * `handler` - The callback to run for each event.
    ///
    /// ## Returns
    /// The id to pass to [`off`](Self::off) to unsubscribe.
    pub fn on<F>(&self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: FnMut(&EngineEvent) -> anyhow::Result<()> + Send + 'static,
    {
        let id = SubscriptionId::new();
        let subscription = Subscription {
            id,
            handler: Arc::new(Mutex::new(Box::new(handler))),
        };
        self.handlers
            .lock()
            .unwrap()
            .entry(topic)
            .or_default()
            .push(subscription);
        id
    }

    /// Removes a subscription.
    ///
    /// Safe to call from inside a handler; the dispatch in flight still
    /// delivers to the handlers it snapshotted.
    ///
    /// ## Returns
    /// `true` if the subscription existed.
    pub fn off(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.lock().unwrap();
        for subscriptions in handlers.values_mut() {
            if let Some(index) = subscriptions.iter().position(|s| s.id == id) {
                subscriptions.remove(index);
                return true;
            }
        }
        false
    }

    /// Publishes `event` to its topic's subscribers and to all taps.
    ///
    /// Delivery is synchronous: when this call returns, every handler has
    /// run, including handlers of events emitted from inside handlers.
    pub fn emit(&self, event: EngineEvent) {
        self.queue.lock().unwrap().push_back(event);

        // A dispatch already running up the stack delivers the queued event
        // before its own emit returns.
        if self.dispatching.swap(true, Ordering::AcqRel) {
            return;
        }
        self.drain();
    }

    /// The number of active subscriptions on `topic`.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.handlers
            .lock()
            .unwrap()
            .get(&topic)
            .map(|subs| subs.len())
            .unwrap_or(0)
    }

    /// Opens a tap that receives a copy of every event, regardless of topic.
    ///
    /// The returned bus owns the receiving end; drop it to close the tap.
    /// Closed taps are pruned on the next emit.
    pub fn add_tap(&self) -> EventBus<EngineEvent> {
        let bus = EventBus::new();
        self.taps.lock().unwrap().push(bus.sender());
        bus
    }

    /// The number of open taps.
    pub fn tap_count(&self) -> usize {
        self.taps.lock().unwrap().len()
    }

    fn drain(&self) {
        loop {
            while let Some(event) = self.pop_next() {
                self.dispatch_one(&event);
            }
            self.dispatching.store(false, Ordering::Release);
            // An emit on another thread may have queued between the last pop
            // and the flag reset; reclaim the drain if so.
            if self.queue.lock().unwrap().is_empty()
                || self.dispatching.swap(true, Ordering::AcqRel)
            {
                return;
            }
        }
    }

    fn pop_next(&self) -> Option<EngineEvent> {
        self.queue.lock().unwrap().pop_front()
    }

    fn dispatch_one(&self, event: &EngineEvent) {
        let topic = event.topic();

        // Snapshot the subscriber list so handlers can call on/off without
        // holding the map lock during their execution.
        let snapshot: Vec<(SubscriptionId, Arc<Mutex<Handler>>)> = {
            let handlers = self.handlers.lock().unwrap();
            match handlers.get(&topic) {
                Some(subs) => subs
                    .iter()
                    .map(|s| (s.id, Arc::clone(&s.handler)))
                    .collect(),
                None => Vec::new(),
            }
        };

        for (id, handler) in snapshot {
            let mut handler = handler.lock().unwrap();
            if let Err(e) = (handler)(event) {
                log::error!("Event handler {id} for '{topic}' failed: {e:#}");
            }
        }

        self.publish_to_taps(event);
    }

    fn publish_to_taps(&self, event: &EngineEvent) {
        let mut taps = self.taps.lock().unwrap();
        if taps.is_empty() {
            return;
        }
        taps.retain(|sender| sender.send(event.clone()).is_ok());
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("topics", &self.handlers.lock().unwrap().len())
            .field("taps", &self.taps.lock().unwrap().len())
            .finish()
    }
}
