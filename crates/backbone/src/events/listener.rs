//! Listener handles.

use std::any::{type_name, Any};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::{BoxError, DispatchError};

type Callback<T> = dyn Fn(&T) -> Result<(), BoxError> + Send + Sync;

/// A shared callback subscribed to messages of type `T`.
///
/// Cloning a listener yields another handle to the same callback. Handles
/// compare equal iff they share the callback, so the handle passed to
/// [`EventBus::subscribe`](crate::EventBus::subscribe) is the one to keep for
/// [`EventBus::unsubscribe`](crate::EventBus::unsubscribe). Two handles built
/// from identical closures are distinct listeners.
pub struct Listener<T: 'static> {
    callback: Arc<Callback<T>>,
}

impl<T: 'static> Listener<T> {
    /// Wrap an infallible callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(move |message: &T| {
                callback(message);
                Ok(())
            }),
        }
    }

    /// Wrap a callback whose errors are captured in the dispatch report.
    pub fn fallible<F, E>(callback: F) -> Self
    where
        F: Fn(&T) -> Result<(), E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self {
            callback: Arc::new(move |message: &T| callback(message).map_err(Into::into)),
        }
    }

    /// Whether both handles refer to the same callback.
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.callback, &other.callback)
    }

    /// Run the callback, turning an error return or a panic into a
    /// [`DispatchError`].
    pub(crate) fn invoke(&self, message: &T) -> Result<(), DispatchError> {
        match panic::catch_unwind(AssertUnwindSafe(|| (self.callback)(message))) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(DispatchError::Failed(e)),
            Err(payload) => Err(DispatchError::Panicked(panic_message(payload.as_ref()))),
        }
    }
}

impl<T: 'static> Clone for Listener<T> {
    fn clone(&self) -> Self {
        Self {
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<T: 'static> PartialEq for Listener<T> {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl<T: 'static> Eq for Listener<T> {}

impl<T: 'static> fmt::Debug for Listener<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("message", &type_name::<T>())
            .field("handles", &Arc::strong_count(&self.callback))
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct WordCompleted;

    #[test]
    fn clones_share_identity() {
        let listener = Listener::new(|_: &WordCompleted| {});
        let clone = listener.clone();

        assert_eq!(listener, clone);
        assert!(listener.same_as(&clone));
    }

    #[test]
    fn identical_closures_are_distinct_listeners() {
        let a = Listener::new(|_: &WordCompleted| {});
        let b = Listener::new(|_: &WordCompleted| {});

        assert_ne!(a, b);
    }

    #[test]
    fn invoke_runs_callback() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = Arc::clone(&calls);
        let listener = Listener::new(move |_: &WordCompleted| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(listener.invoke(&WordCompleted).is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn invoke_captures_returned_error() {
        let listener = Listener::fallible(|_: &WordCompleted| Err("no word list loaded"));

        let err = listener.invoke(&WordCompleted).unwrap_err();
        assert!(matches!(err, DispatchError::Failed(_)));
        assert!(err.to_string().contains("no word list loaded"));
    }

    #[test]
    fn invoke_captures_panic_message() {
        let listener = Listener::new(|_: &WordCompleted| panic!("container overflow"));

        let err = listener.invoke(&WordCompleted).unwrap_err();
        match err {
            DispatchError::Panicked(message) => assert_eq!(message, "container overflow"),
            other => panic!("expected panic, got {other:?}"),
        }
    }

    #[test]
    fn invoke_captures_formatted_panic_message() {
        let listener = Listener::new(|_: &WordCompleted| panic!("card {} missing", 3));

        let err = listener.invoke(&WordCompleted).unwrap_err();
        assert!(err.is_panic());
        assert!(err.to_string().contains("card 3 missing"));
    }
}
