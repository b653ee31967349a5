//! Registration and dispatch of events to their bound handlers.

use super::event::Event;
use super::function::{EventFunction, HandlerOutcome};
use super::signature::Signature;
use crate::error::{Error, Result};
use futures_util::future::join_all;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

struct EventGroup {
    declared: Signature,
    handlers: Vec<EventFunction>,
}

/// Routes named events to the handlers bound against them, enforcing
/// signature compliance at bind time.
pub struct EventRouter {
    groups: HashMap<String, EventGroup>,
    fail_on_missing_event: bool,
    pending: Vec<Pin<Box<dyn Future<Output = ()> + Send>>>,
}

impl EventRouter {
    pub fn new(fail_on_missing_event: bool) -> Self {
        EventRouter {
            groups: HashMap::new(),
            fail_on_missing_event,
            pending: Vec::new(),
        }
    }

    /// Declares an event name with the signature handlers must comply with.
    pub fn declare_event(&mut self, name: impl Into<String>, signature: Signature) {
        self.groups.insert(
            name.into(),
            EventGroup {
                declared: signature,
                handlers: Vec::new(),
            },
        );
    }

    /// Binds a handler to a previously declared event, rejecting it if its
    /// signature is not compatible with the declared one.
    pub fn bind(&mut self, name: &str, function: EventFunction) -> Result<()> {
        let group = self
            .groups
            .get_mut(name)
            .ok_or_else(|| Error::Lookup(format!("event '{name}' has not been declared")))?;

        if !group.declared.complies_with(function.signature()) {
            return Err(Error::Compatibility(format!(
                "handler signature does not comply with the declared signature for '{name}'"
            )));
        }

        group.handlers.push(function);
        Ok(())
    }

    /// Remaps `args` into `kwargs` for any declared parameter name (after
    /// the first, event-carrying parameter) whose keyword slot is not
    /// already occupied.
    fn remap_positional(
        declared: &Signature,
        args: Vec<Value>,
        mut kwargs: HashMap<String, Value>,
    ) -> (Vec<Value>, HashMap<String, Value>) {
        let names: Vec<&str> = declared
            .parameters
            .iter()
            .skip(1)
            .filter(|p| !p.is_variadic_positional && !p.is_variadic_keyword)
            .map(|p| p.name.as_str())
            .collect();

        let mut remaining = Vec::new();
        let mut args_iter = args.into_iter();

        for name in &names {
            match args_iter.next() {
                Some(value) if !kwargs.contains_key(*name) => {
                    kwargs.insert((*name).to_owned(), value);
                }
                Some(value) => remaining.push(value),
                None => break,
            }
        }

        remaining.extend(args_iter);
        (remaining, kwargs)
    }

    /// Dispatches `event_name` to every bound handler in registration order.
    /// Deferred futures (either an async handler's future, or one returned
    /// by a synchronous handler) are stashed for [`EventRouter::complete_active_tasks`].
    ///
    /// Returns `Ok(())` without dispatching if the event is unknown and
    /// `fail_on_missing_event` is `false`.
    pub fn trigger(
        &mut self,
        event_name: &str,
        caller: &str,
        args: Vec<Value>,
        kwargs: HashMap<String, Value>,
    ) -> Result<()> {
        let Some(group) = self.groups.get(event_name) else {
            return if self.fail_on_missing_event {
                Err(Error::Lookup(format!("unknown event '{event_name}'")))
            } else {
                Ok(())
            };
        };

        let (args, kwargs) = Self::remap_positional(&group.declared, args, kwargs);
        let event = Event::new(event_name, caller, args, kwargs);

        for handler in &group.handlers {
            if let HandlerOutcome::Deferred(future) = handler.invoke(&event) {
                self.pending.push(future);
            }
        }

        Ok(())
    }

    /// The awaitable dispatch variant: async handlers run concurrently via
    /// a gather, synchronous handlers run inline, and any future returned
    /// by a synchronous handler is awaited before moving on.
    pub async fn fire(
        &mut self,
        event_name: &str,
        caller: &str,
        args: Vec<Value>,
        kwargs: HashMap<String, Value>,
    ) -> Result<()> {
        let Some(group) = self.groups.get(event_name) else {
            return if self.fail_on_missing_event {
                Err(Error::Lookup(format!("unknown event '{event_name}'")))
            } else {
                Ok(())
            };
        };

        let (args, kwargs) = Self::remap_positional(&group.declared, args, kwargs);
        let event = Event::new(event_name, caller, args, kwargs);

        let mut async_futures = Vec::new();

        for handler in &group.handlers {
            match handler.invoke(&event) {
                HandlerOutcome::Done => {}
                HandlerOutcome::Deferred(future) => {
                    if handler.is_async() {
                        async_futures.push(future);
                    } else {
                        future.await;
                    }
                }
            }
        }

        join_all(async_futures).await;
        Ok(())
    }

    /// Awaits every future deferred by a prior [`EventRouter::trigger`] call.
    pub async fn complete_active_tasks(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        join_all(pending).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::function::EventFunction;
    use crate::events::signature::EventFunctionParameter;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;

    fn event_only_signature() -> Signature {
        Signature::new(vec![EventFunctionParameter::positional("event")])
    }

    #[test]
    fn dropped_silently_when_event_unknown_and_not_required() {
        let mut router = EventRouter::new(false);
        assert!(router.trigger("nope", "test", vec![], HashMap::new()).is_ok());
    }

    #[test]
    fn errors_on_unknown_event_when_required() {
        let mut router = EventRouter::new(true);
        assert!(router.trigger("nope", "test", vec![], HashMap::new()).is_err());
    }

    #[test]
    fn bind_rejects_an_incompatible_handler() {
        let mut router = EventRouter::new(false);
        router.declare_event(
            "thing",
            Signature::new(vec![
                EventFunctionParameter::positional("event"),
                EventFunctionParameter::positional("value"),
            ]),
        );

        let handler = EventFunction::synchronous(event_only_signature(), |_| HandlerOutcome::Done).unwrap();
        assert!(router.bind("thing", handler).is_err());
    }

    #[test]
    fn trigger_invokes_handlers_in_registration_order() {
        let mut router = EventRouter::new(false);
        router.declare_event("thing", event_only_signature());

        let calls = Arc::new(Mutex::new(Vec::new()));
        for n in 0..3 {
            let calls = calls.clone();
            let handler = EventFunction::synchronous(event_only_signature(), move |_| {
                calls.lock().push(n);
                HandlerOutcome::Done
            })
            .unwrap();
            router.bind("thing", handler).unwrap();
        }

        router.trigger("thing", "test", vec![], HashMap::new()).unwrap();
        assert_eq!(*calls.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn positional_args_remap_into_declared_keyword_names() {
        let mut router = EventRouter::new(false);
        router.declare_event(
            "thing",
            Signature::new(vec![
                EventFunctionParameter::positional("event"),
                EventFunctionParameter::positional("value"),
            ]),
        );

        let seen = Arc::new(Mutex::new(None));
        let seen2 = seen.clone();
        let handler = EventFunction::synchronous(event_only_signature(), move |event| {
            *seen2.lock() = event.kwarg("value").cloned();
            HandlerOutcome::Done
        })
        .unwrap();
        router.bind("thing", handler).unwrap();

        router
            .trigger("thing", "test", vec![json!(42)], HashMap::new())
            .unwrap();

        assert_eq!(*seen.lock(), Some(json!(42)));
    }
}
