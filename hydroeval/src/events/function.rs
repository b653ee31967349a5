//! A validated, callable handler bound to an event.

use super::event::Event;
use super::signature::Signature;
use crate::error::{Error, Result};
use std::future::Future;
use std::pin::Pin;

/// What a handler invocation returns: either it's finished, or it handed
/// back a future that must be awaited later (the handler's equivalent of a
/// Python coroutine object returned from a synchronous call site).
pub enum HandlerOutcome {
    Done,
    Deferred(Pin<Box<dyn Future<Output = ()> + Send>>),
}

type SyncHandler = Box<dyn Fn(&Event) -> HandlerOutcome + Send + Sync>;
type AsyncHandler = Box<dyn Fn(&Event) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

enum Handler {
    Sync(SyncHandler),
    Async(AsyncHandler),
}

/// A handler bound to an event, along with the signature it declared for
/// itself at registration time.
pub struct EventFunction {
    signature: Signature,
    handler: Handler,
}

impl EventFunction {
    /// Wraps a synchronous handler, validating that its first declared
    /// parameter is event-compatible: untyped with a name containing
    /// `event`/`evt`, or variadic positional.
    pub fn synchronous(
        signature: Signature,
        handler: impl Fn(&Event) -> HandlerOutcome + Send + Sync + 'static,
    ) -> Result<Self> {
        validate_first_parameter(&signature)?;
        Ok(EventFunction {
            signature,
            handler: Handler::Sync(Box::new(handler)),
        })
    }

    /// Wraps an asynchronous handler under the same first-parameter rule.
    pub fn asynchronous(
        signature: Signature,
        handler: impl Fn(&Event) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync + 'static,
    ) -> Result<Self> {
        validate_first_parameter(&signature)?;
        Ok(EventFunction {
            signature,
            handler: Handler::Async(Box::new(handler)),
        })
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn is_async(&self) -> bool {
        matches!(self.handler, Handler::Async(_))
    }

    /// Invokes the handler, returning any deferred future without polling
    /// it (used by `EventRouter::trigger`).
    pub fn invoke(&self, event: &Event) -> HandlerOutcome {
        match &self.handler {
            Handler::Sync(f) => f(event),
            Handler::Async(f) => HandlerOutcome::Deferred(f(event)),
        }
    }
}

fn validate_first_parameter(signature: &Signature) -> Result<()> {
    let Some(first) = signature.parameters.first() else {
        return Err(Error::Compatibility(
            "an event handler must declare at least one parameter".to_owned(),
        ));
    };

    if first.is_variadic_keyword {
        return Err(Error::Compatibility(
            "an event handler's first parameter cannot be variadic keyword".to_owned(),
        ));
    }

    if first.is_variadic_positional {
        return Ok(());
    }

    let name = first.name.to_lowercase();
    if name.contains("event") || name.contains("evt") {
        return Ok(());
    }

    Err(Error::Compatibility(format!(
        "first parameter '{}' must be named like an event, or be variadic positional",
        first.name
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::signature::EventFunctionParameter;

    #[test]
    fn accepts_a_named_event_parameter() {
        let sig = Signature::new(vec![EventFunctionParameter::positional("event")]);
        assert!(EventFunction::synchronous(sig, |_| HandlerOutcome::Done).is_ok());
    }

    #[test]
    fn accepts_variadic_positional_first_parameter() {
        let sig = Signature::new(vec![EventFunctionParameter::variadic_positional("args")]);
        assert!(EventFunction::synchronous(sig, |_| HandlerOutcome::Done).is_ok());
    }

    #[test]
    fn rejects_an_unrelated_first_parameter_name() {
        let sig = Signature::new(vec![EventFunctionParameter::positional("value")]);
        assert!(EventFunction::synchronous(sig, |_| HandlerOutcome::Done).is_err());
    }

    #[test]
    fn rejects_variadic_keyword_as_first_parameter() {
        let sig = Signature::new(vec![EventFunctionParameter::variadic_keyword("kwargs")]);
        assert!(EventFunction::synchronous(sig, |_| HandlerOutcome::Done).is_err());
    }
}
