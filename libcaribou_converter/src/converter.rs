use fxhash::FxHashMap;
use std::any::{Any, TypeId};
use std::collections::hash_map::Entry;

use super::config::Configuration;
use super::error::ConverterError;
use super::raw_event::RawEvent;
use super::standard_event::StandardEvent;

/// Converter is the capability shared by every detector decoder: turn one RawEvent into
/// contributions to a StandardEvent.
///
/// Converters hold no mutable state of their own. Anything that must survive from one
/// event to the next (configuration captured on first use, trigger counters, the run start
/// time) lives in the caller's StreamContext, one per event stream.
pub trait Converter: Send + Sync {
    /// Canonical detector-type name this converter is registered under
    fn name(&self) -> &'static str;

    /// Convert a raw event.
    ///
    /// `Ok(true)` means at least one plane was appended and the trigger/timing fields of
    /// `event` were set. `Ok(false)` means the event was recognized but is not part of the
    /// standardized stream (truncated data, diagnostic dump mode); this is not an error.
    /// `Err` is reserved for configuration faults and diagnostic I/O failures.
    fn convert(
        &self,
        raw: &RawEvent,
        event: &mut StandardEvent,
        conf: &Configuration,
        ctx: &mut StreamContext,
    ) -> Result<bool, ConverterError>;
}

/// StreamContext carries the cross-event state of one event stream.
///
/// Each converter keeps its state in a slot keyed by the state's type, created lazily on
/// the first event of the stream. Two streams never share a context, so streams may be
/// processed on different threads without locking.
#[derive(Debug, Default)]
pub struct StreamContext {
    states: FxHashMap<TypeId, Box<dyn Any + Send>>,
}

impl StreamContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the state of type `S`, creating it with `init` if this is the first request.
    ///
    /// `init` runs at most once per context (until reset); if it fails nothing is stored
    /// and the next call will try again.
    pub fn state_or_try_init<S, F>(&mut self, init: F) -> Result<&mut S, ConverterError>
    where
        S: Any + Send,
        F: FnOnce() -> Result<S, ConverterError>,
    {
        let slot = match self.states.entry(TypeId::of::<S>()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(Box::new(init()?)),
        };
        slot.downcast_mut::<S>().ok_or(ConverterError::ContextState)
    }

    /// Get the state of type `S` if it was already created
    pub fn state<S: Any + Send>(&self) -> Option<&S> {
        self.states
            .get(&TypeId::of::<S>())
            .and_then(|state| state.downcast_ref::<S>())
    }

    pub fn is_initialized<S: Any + Send>(&self) -> bool {
        self.states.contains_key(&TypeId::of::<S>())
    }

    /// Drop all converter state. The next event is treated as the first of a new stream
    pub fn reset(&mut self) {
        self.states.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Counter(u32);

    #[test]
    fn test_state_initialized_once() {
        let mut ctx = StreamContext::new();
        let mut calls = 0;
        for _ in 0..3 {
            let state = ctx
                .state_or_try_init(|| {
                    calls += 1;
                    Ok(Counter(0))
                })
                .unwrap();
            state.0 += 1;
        }
        assert_eq!(calls, 1);
        assert_eq!(ctx.state::<Counter>(), Some(&Counter(3)));
    }

    #[test]
    fn test_failed_init_is_retried() {
        let mut ctx = StreamContext::new();
        let failed: Result<&mut Counter, ConverterError> =
            ctx.state_or_try_init(|| Err(ConverterError::ContextState));
        assert!(failed.is_err());
        assert!(!ctx.is_initialized::<Counter>());
        assert!(ctx.state_or_try_init(|| Ok(Counter(7))).is_ok());
        assert_eq!(ctx.state::<Counter>(), Some(&Counter(7)));
    }

    #[test]
    fn test_reset() {
        let mut ctx = StreamContext::new();
        ctx.state_or_try_init(|| Ok(Counter(1))).unwrap();
        ctx.reset();
        assert!(!ctx.is_initialized::<Counter>());
    }
}
