//! Request-scoped execution context.
//!
//! A [`Context`] is created when request processing starts, threaded explicitly
//! through the call chain, and dropped when the request completes. It is an
//! immutable linked chain of typed values: deriving a child with
//! [`Context::with_value`] never touches the parent, and a newer value of the
//! same type shadows older ones for the child and everything derived from it.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Per-request context carrying request-scoped values such as the tenant.
///
/// Cloning is a reference-count bump. Concurrent calls derive their own
/// children from a shared parent without coordination.
#[derive(Clone, Default)]
pub struct Context {
    head: Option<Arc<Node>>,
}

struct Node {
    key: TypeId,
    value: Box<dyn Any + Send + Sync>,
    parent: Option<Arc<Node>>,
}

impl Context {
    /// The empty root context. Holds no values.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// Returns a child context holding `value`, keyed by its type.
    ///
    /// Any value of the same type already present in `self` is shadowed in
    /// the child. `self` is left unchanged.
    #[must_use]
    pub fn with_value<T>(&self, value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self {
            head: Some(Arc::new(Node {
                key: TypeId::of::<T>(),
                value: Box::new(value),
                parent: self.head.clone(),
            })),
        }
    }

    /// Looks up the nearest value of type `T`, walking from the newest
    /// attachment towards the root.
    #[must_use]
    pub fn value<T>(&self) -> Option<&T>
    where
        T: Any + Send + Sync,
    {
        let key = TypeId::of::<T>();
        let mut cursor = self.head.as_deref();
        while let Some(node) = cursor {
            if node.key == key {
                return node.value.downcast_ref::<T>();
            }
            cursor = node.parent.as_deref();
        }
        None
    }

    /// Returns `true` if both contexts are the same derivation (not merely
    /// equal contents).
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.head, &other.head) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn depth(&self) -> usize {
        let mut depth = 0;
        let mut cursor = self.head.as_deref();
        while let Some(node) = cursor {
            depth += 1;
            cursor = node.parent.as_deref();
        }
        depth
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("depth", &self.depth())
            .finish_non_exhaustive()
    }
}
