//! Network notifications for observers such as an editor.

use crate::network::property::InvalidationLevel;
use crossbeam_channel::{Receiver, Sender};

#[derive(Debug, Clone, PartialEq)]
pub enum NetworkEvent {
    ProcessorAdded(String),
    ProcessorRemoved(String),
    ConnectionAdded {
        outport: String,
        inport: String,
    },
    ConnectionRemoved {
        outport: String,
        inport: String,
    },
    LinkAdded {
        source: String,
        destination: String,
    },
    LinkRemoved {
        source: String,
        destination: String,
    },
    ProcessorInvalidated {
        identifier: String,
        level: InvalidationLevel,
    },
    PropertyChanged {
        processor: String,
        property: String,
    },
    ProcessorFailed {
        identifier: String,
        message: String,
    },
    EvaluationFinished {
        pass: u64,
        processed: usize,
        failed: usize,
    },
    /// The network content was replaced by a loaded document.
    Loaded {
        processors: usize,
    },
}

/// Fan-out of events to any number of subscribers. Subscribers that dropped
/// their receiver are pruned on the next emit.
#[derive(Debug, Default)]
pub(crate) struct Observers {
    senders: Vec<Sender<NetworkEvent>>,
}

impl Observers {
    pub fn subscribe(&mut self) -> Receiver<NetworkEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.senders.push(tx);
        rx
    }

    pub fn emit(&mut self, event: NetworkEvent) {
        if self.senders.is_empty() {
            return;
        }
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dropped_receivers_pruned() {
        let mut observers = Observers::default();
        let rx = observers.subscribe();
        let dropped = observers.subscribe();
        drop(dropped);
        observers.emit(NetworkEvent::ProcessorAdded("a".into()));
        assert_eq!(observers.len(), 1);
        assert_eq!(
            rx.try_recv().unwrap(),
            NetworkEvent::ProcessorAdded("a".into())
        );
    }
}
