//! Reactive binding seam.
//!
//! UI integrations implement [`ReactiveBinding`] to receive every value a
//! store observes. The core stays framework-agnostic: it only talks to
//! this trait, and when no integration is supplied the no-op fallback is
//! used instead of probing the host for one.

/// Receives every value the owning store observes.
pub trait ReactiveBinding<T>: Send + Sync {
    fn publish(&self, value: &T);
}

/// Fallback binding used when no UI integration is supplied.
pub struct NoopBinding;

impl<T> ReactiveBinding<T> for NoopBinding {
    fn publish(&self, _value: &T) {}
}

/// Adapter turning a closure into a binding.
pub struct FnBinding<F>(pub F);

impl<T, F> ReactiveBinding<T> for FnBinding<F>
where
    F: Fn(&T) + Send + Sync,
{
    fn publish(&self, value: &T) {
        (self.0)(value);
    }
}
