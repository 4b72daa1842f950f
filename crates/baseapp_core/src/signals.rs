//! Before/after delete notifications.
//!
//! # Responsibility
//! - Hold explicitly registered delete observers, keyed by model label.
//! - Dispatch `PreDelete`/`PostDelete` events in registration order.
//!
//! # Invariants
//! - There is no process-wide bus; callers own a `SignalBus` and hand it to
//!   the lifecycle service.
//! - Only soft delete emits signals. Undelete never does.

use crate::model::record::RecordId;

/// Delete notification kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeleteSignal {
    PreDelete,
    PostDelete,
}

/// Payload passed to every delete observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteEvent<'a> {
    pub signal: DeleteSignal,
    /// Model label of the record being deleted.
    pub label: &'a str,
    pub record_id: RecordId,
}

type Handler = Box<dyn Fn(&DeleteEvent<'_>)>;

struct Receiver {
    signal: DeleteSignal,
    /// `None` receives events for every label.
    label: Option<String>,
    handler: Handler,
}

/// Observer registry for delete signals.
#[derive(Default)]
pub struct SignalBus {
    receivers: Vec<Receiver>,
}

impl SignalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `signal` on records of `label`.
    pub fn connect(
        &mut self,
        signal: DeleteSignal,
        label: impl Into<String>,
        handler: impl Fn(&DeleteEvent<'_>) + 'static,
    ) {
        self.receivers.push(Receiver {
            signal,
            label: Some(label.into()),
            handler: Box::new(handler),
        });
    }

    /// Registers `handler` for `signal` on records of any label.
    pub fn connect_any(
        &mut self,
        signal: DeleteSignal,
        handler: impl Fn(&DeleteEvent<'_>) + 'static,
    ) {
        self.receivers.push(Receiver {
            signal,
            label: None,
            handler: Box::new(handler),
        });
    }

    /// Dispatches one event; returns how many receivers were called.
    pub fn send(&self, signal: DeleteSignal, label: &str, record_id: RecordId) -> usize {
        let event = DeleteEvent {
            signal,
            label,
            record_id,
        };
        let mut delivered = 0;
        for receiver in &self.receivers {
            if receiver.signal != signal {
                continue;
            }
            if receiver
                .label
                .as_deref()
                .is_some_and(|wanted| wanted != label)
            {
                continue;
            }
            (receiver.handler)(&event);
            delivered += 1;
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.receivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receivers.is_empty()
    }
}

impl std::fmt::Debug for SignalBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalBus")
            .field("receivers", &self.receivers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{DeleteSignal, SignalBus};
    use std::cell::RefCell;
    use std::rc::Rc;
    use uuid::Uuid;

    #[test]
    fn dispatches_by_signal_and_label() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = SignalBus::new();

        let sink = Rc::clone(&seen);
        bus.connect(DeleteSignal::PreDelete, "blog.Post", move |event| {
            sink.borrow_mut().push(format!("post:{:?}", event.signal));
        });
        let sink = Rc::clone(&seen);
        bus.connect_any(DeleteSignal::PostDelete, move |event| {
            sink.borrow_mut().push(format!("any:{}", event.label));
        });

        let id = Uuid::new_v4();
        assert_eq!(bus.send(DeleteSignal::PreDelete, "blog.Post", id), 1);
        assert_eq!(bus.send(DeleteSignal::PreDelete, "blog.Comment", id), 0);
        assert_eq!(bus.send(DeleteSignal::PostDelete, "blog.Comment", id), 1);

        assert_eq!(
            *seen.borrow(),
            vec!["post:PreDelete".to_string(), "any:blog.Comment".to_string()]
        );
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut bus = SignalBus::new();
        for index in 0..3 {
            let order = Rc::clone(&order);
            bus.connect_any(DeleteSignal::PreDelete, move |_| order.borrow_mut().push(index));
        }

        bus.send(DeleteSignal::PreDelete, "blog.Post", Uuid::new_v4());
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
        assert_eq!(bus.len(), 3);
    }
}
