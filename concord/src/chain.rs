//! Ordered handler chain.
//!
//! A [`Chain`] runs its handlers in registration order until one of them
//! reports that it handled the value. Handlers get `&mut T`, so earlier ones
//! can enrich the value for later ones.

use std::fmt;

/// Handler signature: returns `true` once the value is fully handled.
pub type Handler<T> = Box<dyn Fn(&mut T) -> bool + Send + Sync>;

/// Chain of responsibility over values of type `T`.
///
/// # Example
///
/// ```
/// use concord::chain::Chain;
///
/// let mut chain = Chain::new();
/// chain.push(|status: &mut u16| {
///     if *status == 0 {
///         *status = 200;
///     }
///     false
/// });
/// chain.push(|status: &mut u16| *status == 200);
/// chain.push(|status: &mut u16| {
///     *status = 500;
///     true
/// });
///
/// let mut status = 0;
/// chain.next(&mut status);
/// assert_eq!(status, 200);
/// ```
pub struct Chain<T> {
    handlers: Vec<Handler<T>>,
}

impl<T> Chain<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Builds a chain from already boxed handlers.
    #[must_use]
    pub fn with_handlers(handlers: impl IntoIterator<Item = Handler<T>>) -> Self {
        Self {
            handlers: handlers.into_iter().collect(),
        }
    }

    /// Appends a handler to the end of the chain.
    pub fn push<F>(&mut self, handler: F)
    where
        F: Fn(&mut T) -> bool + Send + Sync + 'static,
    {
        self.handlers.push(Box::new(handler));
    }

    /// Passes `value` down the chain, stopping at the first handler that
    /// returns `true`. Returns whether any handler did.
    pub fn next(&self, value: &mut T) -> bool {
        self.handlers.iter().any(|handler| handler(&mut *value))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<T> Default for Chain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Chain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[derive(Debug, Default)]
    struct Response {
        status: u16,
        msg: &'static str,
    }

    #[test]
    fn test_empty_chain_is_noop() {
        let chain: Chain<Response> = Chain::default();
        let mut resp = Response::default();
        assert!(!chain.next(&mut resp));
        assert_eq!(resp.status, 0);
        assert!(chain.is_empty());
    }

    #[test]
    fn test_stops_at_first_handler() {
        let mut chain = Chain::new();
        chain.push(|r: &mut Response| {
            r.status = 200;
            r.msg = "ok";
            true
        });
        chain.push(|r: &mut Response| {
            r.status = 401;
            true
        });

        let mut resp = Response::default();
        assert!(chain.next(&mut resp));
        assert_eq!(resp.status, 200);
        assert_eq!(resp.msg, "ok");
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_falls_through_unhandled() {
        let chain = Chain::with_handlers([
            Box::new(|r: &mut Response| {
                r.status += 1;
                false
            }) as Handler<Response>,
            Box::new(|r: &mut Response| {
                r.status += 10;
                false
            }),
        ]);

        let mut resp = Response::default();
        assert!(!chain.next(&mut resp));
        assert_eq!(resp.status, 11);
    }

    #[test]
    fn test_shared_across_threads() {
        let mut chain = Chain::new();
        chain.push(|n: &mut u64| {
            *n *= 2;
            *n > 100
        });
        chain.push(|n: &mut u64| {
            *n += 1;
            true
        });
        let chain = Arc::new(chain);

        let handles: Vec<_> = (0..4u64)
            .map(|i| {
                let chain = Arc::clone(&chain);
                thread::spawn(move || {
                    let mut n = i * 40;
                    chain.next(&mut n);
                    n
                })
            })
            .collect();

        let results: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results, vec![1, 81, 160, 240]);
    }
}
