use crate::container::resolver::{CallContext, ResolveError, Resolver};
use crate::container::Instance;
use crate::key::Key;

/// Hands a resolver to constructors and factories while keeping the trace of
/// the resolution that called them.
pub struct ContextForwardingResolverProxy<'a, R>
where
    R: Resolver + ?Sized,
{
    inner: &'a R,
    context: &'a CallContext<'a>,
}

impl<'a, R> ContextForwardingResolverProxy<'a, R>
where
    R: Resolver + ?Sized,
{
    pub fn new(inner: &'a R, context: &'a CallContext<'a>) -> Self {
        Self { inner, context }
    }
}

impl<R> Resolver for ContextForwardingResolverProxy<'_, R>
where
    R: Resolver + ?Sized,
{
    fn resolve_key(&self, key: &Key) -> Result<Instance, ResolveError> {
        self.resolve_dependency(key, self.context)
    }

    fn resolve_dependency<'a>(
        &self,
        key: &Key,
        context: &'a CallContext<'a>,
    ) -> Result<Instance, ResolveError> {
        self.inner.resolve_dependency(key, context)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::container::resolver::{MockResolver, TypedResolver};
    use crate::key;

    use super::*;

    #[test]
    fn resolve_succeeds_when_context_is_forwarded() {
        let mut inner = MockResolver::new();
        inner
            .expect_resolve_dependency()
            .withf(|key, context| {
                *key == key::of::<u32>() && *context.key() == key::of::<String>()
            })
            .times(1)
            .returning(|_, _| Ok(Instance::single(Arc::new(42u32))));

        let root = key::of::<String>();
        let context = CallContext::new(&root);
        let proxy = ContextForwardingResolverProxy::new(&inner, &context);

        assert_eq!(*proxy.resolve::<u32>().unwrap(), 42);
    }
}
