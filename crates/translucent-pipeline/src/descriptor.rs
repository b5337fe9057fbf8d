//! Middleware registrations awaiting activation.
//!
//! A [`MiddlewareDescriptor`] records which middleware to build and with what
//! explicit arguments. Nothing is validated when it is created; type checks,
//! constructor binding and dependency resolution all happen in
//! [`MiddlewareDescriptor::activate`], once the builder knows the context
//! type and the `next` delegate.

use crate::adapter;
use crate::dependencies::{Arguments, Dependencies, Parameter};
use crate::middleware::{Activate, BoxFuture, RequestDelegate};
use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::iter;
use std::sync::Arc;
use translucent_core::{Container, PipelineError, PipelineResult};

type ErasedDelegate = Box<dyn Any + Send>;

type Activator = Box<
    dyn Fn(&Arguments, ErasedDelegate, &Arc<Container>) -> PipelineResult<ErasedDelegate>
        + Send
        + Sync,
>;

/// A middleware registration: type, context and explicit arguments.
pub struct MiddlewareDescriptor {
    name: &'static str,
    context: Parameter,
    arguments: Arguments,
    activator: Activator,
}

impl MiddlewareDescriptor {
    /// Describes middleware type `M` with the given explicit arguments.
    ///
    /// Empty `arguments` means every constructor dependency is resolved from
    /// the container.
    pub fn of<M: Activate>(arguments: Arguments) -> Self {
        Self {
            name: type_name::<M>(),
            context: Parameter::of::<M::Context>(),
            arguments,
            activator: Box::new(activate_middleware::<M>),
        }
    }

    /// Describes an inline middleware given as a function of the context and
    /// the `next` delegate.
    pub fn from_fn<C, F>(name: &'static str, f: F) -> Self
    where
        C: Send + 'static,
        F: for<'a> Fn(&'a mut C, RequestDelegate<C>) -> BoxFuture<'a, PipelineResult<()>>
            + Send
            + Sync
            + 'static,
    {
        let f = Arc::new(f);
        Self {
            name,
            context: Parameter::of::<C>(),
            arguments: Arguments::new(),
            activator: Box::new(
                move |_arguments: &Arguments,
                      next: ErasedDelegate,
                      _services: &Arc<Container>|
                      -> PipelineResult<ErasedDelegate> {
                    let next = downcast_next::<C>(name, next)?;
                    let f = Arc::clone(&f);
                    let delegate = RequestDelegate::new(move |ctx| f(ctx, next.clone()));
                    Ok(Box::new(delegate))
                },
            ),
        }
    }

    /// Returns the middleware name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the name of the context type the middleware accepts.
    pub fn context_name(&self) -> &'static str {
        self.context.type_name
    }

    /// Returns the [`TypeId`] of the context type the middleware accepts.
    pub fn context_type(&self) -> TypeId {
        self.context.type_id
    }

    /// Returns the explicit arguments.
    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    /// Builds the middleware around `next` and returns its delegate.
    ///
    /// # Errors
    ///
    /// - `InvalidInvokeSignature` if the middleware accepts another context
    ///   type than `C`
    /// - `MiddlewareConstructorNotFound` if explicit arguments were given and
    ///   do not match the constructor parameters
    /// - `DependencyNotFound` if a constructor or invoke-time dependency is
    ///   not resolvable from `services`
    pub fn activate<C: Send + 'static>(
        &self,
        next: RequestDelegate<C>,
        services: &Arc<Container>,
    ) -> PipelineResult<RequestDelegate<C>> {
        if self.context.type_id != TypeId::of::<C>() {
            return Err(self.signature_mismatch::<C>());
        }

        let built = (self.activator)(&self.arguments, Box::new(next), services)?;
        built
            .downcast::<RequestDelegate<C>>()
            .map(|delegate| *delegate)
            .map_err(|_| self.signature_mismatch::<C>())
    }

    fn signature_mismatch<C>(&self) -> PipelineError {
        PipelineError::InvalidInvokeSignature {
            middleware: self.name,
            expected: type_name::<C>(),
            found: self.context.type_name,
        }
    }
}

impl fmt::Debug for MiddlewareDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareDescriptor")
            .field("name", &self.name)
            .field("context", &self.context.type_name)
            .field("arguments", &self.arguments)
            .finish_non_exhaustive()
    }
}

fn downcast_next<C: Send + 'static>(
    middleware: &'static str,
    next: ErasedDelegate,
) -> PipelineResult<RequestDelegate<C>> {
    next.downcast::<RequestDelegate<C>>()
        .map(|next| *next)
        .map_err(|_| PipelineError::InvalidInvokeSignature {
            middleware,
            expected: type_name::<C>(),
            found: "an incompatible next delegate",
        })
}

fn activate_middleware<M: Activate>(
    arguments: &Arguments,
    next: ErasedDelegate,
    services: &Arc<Container>,
) -> PipelineResult<ErasedDelegate> {
    let next = downcast_next::<M::Context>(type_name::<M>(), next)?;

    let dependencies = if arguments.is_empty() {
        M::Dependencies::resolve(services)?
    } else {
        M::Dependencies::bind(arguments).ok_or_else(|| {
            PipelineError::MiddlewareConstructorNotFound {
                middleware: type_name::<M>(),
                attempted: iter::once(type_name::<RequestDelegate<M::Context>>())
                    .chain(arguments.type_names())
                    .collect(),
            }
        })?
    };

    adapter::ensure_invocable::<M>(services)?;

    let middleware = M::activate(next, dependencies);
    Ok(Box::new(adapter::adapt(middleware, Arc::clone(services))))
}
