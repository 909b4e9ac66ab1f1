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

use log;

/// A generic, thread-safe event channel.
///
/// The bus is generic over the event type `T` so that `kairos-core` stays
/// decoupled from event types defined in higher-level crates. The engine uses
/// one bus per tap registered on the [`EventHub`](super::EventHub): each tap
/// owns its receiver and drains at its own pace on its own thread.
#[derive(Debug)]
pub struct EventBus<T: Clone + Send + Sync + 'static> {
    sender: flume::Sender<T>,
    receiver: flume::Receiver<T>,
}

impl<T: Clone + Send + Sync + 'static> EventBus<T> {
    /// Creates a new bus backed by an unbounded channel.
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        Self { sender, receiver }
    }

    /// Sends an event, logging an error if the receiver is disconnected.
    ///
    /// ## Arguments
    /// * `event` - The event to send over the channel.
    pub fn publish(&self, event: T) {
        if let Err(e) = self.sender.send(event) {
            log::error!("Failed to send event: {e}. Receiver likely disconnected.");
        }
    }

    /// Whether the receiving end has been dropped.
    pub fn is_disconnected(&self) -> bool {
        self.sender.is_disconnected()
    }

    /// Returns a clone of the sender end of the channel.
    ///
    /// ## Returns
    /// A sender other parts of the system can use to publish events.
    pub fn sender(&self) -> flume::Sender<T> {
        self.sender.clone()
    }

    /// Returns a reference to the receiver end of the channel.
    ///
    /// ## Returns
    /// The receiver the owner of the bus drains events from.
    pub fn receiver(&self) -> &flume::Receiver<T> {
        &self.receiver
    }
}

impl<T: Clone + Send + Sync + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flume::{SendError, TryRecvError};
    use std::{thread, time::Duration};

    /// A local, self-contained event enum mirroring the shape of the engine's
    /// events without depending on them.
    #[derive(Debug, Clone, PartialEq)]
    enum TestEvent {
        TickStarted { frame: u64 },
        CommandIssued { name: String },
        ShutdownRequested,
    }

    fn dummy_command_event() -> TestEvent {
        TestEvent::CommandIssued {
            name: "pause".to_string(),
        }
    }

    #[test]
    fn event_bus_creation() {
        let bus = EventBus::<TestEvent>::new();
        let _sender = bus.sender();
        assert!(bus.receiver().is_empty());
        assert!(!bus.is_disconnected());
    }

    #[test]
    fn send_receive_single_event() {
        let bus = EventBus::<TestEvent>::new();
        let event_to_send = dummy_command_event();

        bus.publish(event_to_send.clone());

        match bus.receiver().recv_timeout(Duration::from_millis(100)) {
            Ok(received_event) => assert_eq!(received_event, event_to_send),
            Err(e) => panic!("Failed to receive event: {e:?}"),
        }
    }

    #[test]
    fn try_receive_empty() {
        let bus = EventBus::<TestEvent>::new();

        match bus.receiver().try_recv() {
            Err(TryRecvError::Empty) => { /* This is the expected outcome */ }
            Ok(event) => panic!("Received unexpected event: {event:?}"),
            Err(e) => panic!("Received unexpected error: {e:?}"),
        }
    }

    #[test]
    fn events_arrive_in_publish_order() {
        let bus = EventBus::<TestEvent>::new();
        let event1 = TestEvent::TickStarted { frame: 1 };
        let event2 = dummy_command_event();
        let event3 = TestEvent::ShutdownRequested;

        bus.publish(event1.clone());
        bus.publish(event2.clone());
        bus.publish(event3.clone());

        let receiver = bus.receiver();
        assert_eq!(receiver.recv().unwrap(), event1);
        assert_eq!(receiver.recv().unwrap(), event2);
        assert_eq!(receiver.recv().unwrap(), event3);
        assert_eq!(receiver.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn send_from_thread() {
        let bus = EventBus::<TestEvent>::new();
        let sender_clone = bus.sender();
        let event_to_send = dummy_command_event();
        let event_clone = event_to_send.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            sender_clone
                .send(event_clone)
                .expect("Send from thread failed");
        });

        match bus.receiver().recv_timeout(Duration::from_secs(1)) {
            Ok(received_event) => assert_eq!(received_event, event_to_send),
            Err(e) => panic!("Failed to receive event from thread: {e:?}"),
        }

        handle.join().expect("Thread join failed");
    }

    #[test]
    fn send_error_on_receiver_drop() {
        let bus = EventBus::<TestEvent>::new();
        let sender = bus.sender();

        drop(bus);

        match sender.send(dummy_command_event()) {
            Err(SendError(_)) => { /* This is the expected outcome */ }
            Ok(()) => panic!("Send unexpectedly succeeded after receiver drop"),
        }
    }
}
