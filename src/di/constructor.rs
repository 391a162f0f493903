use crate::di::registry::{ConstructorFn, Registration};
use crate::di::{Container, Dependency, DependencyType, Instance, Lifetime, Parameter};
use crate::error::{Result, ScopewireError};
use std::sync::Arc;

/// A function that builds one `Output` from zero or more [`Dependency`]
/// parameters.
///
/// Implemented for every `Fn(A1, ..., An) -> T` with up to eight
/// parameters, where each `Ai` is `Arc<_>` or `ContextParams`. `Args` only
/// exists to keep the arity impls apart.
pub trait Constructor<Args>: Send + Sync + 'static {
    type Output: Send + Sync + 'static;

    fn parameters() -> Vec<Parameter>;

    fn construct(&self, container: &Container) -> Result<Self::Output>;
}

/// Like [`Constructor`], for functions returning `Result<T, E>`.
///
/// An `Err` is reported as `ConstructorFailed` for the produced type.
pub trait FallibleConstructor<Args>: Send + Sync + 'static {
    type Output: Send + Sync + 'static;

    fn parameters() -> Vec<Parameter>;

    fn try_construct(&self, container: &Container) -> Result<Self::Output>;
}

/// A function whose parameters are resolved as top-level requests by
/// [`Container::invoke`].
pub trait Invocable<Args> {
    type Output;

    fn invoke(self, container: &Container) -> Result<Self::Output>;
}

macro_rules! impl_constructor {
    ($($arg:ident),*) => {
        impl<Func, Out, $($arg,)*> Constructor<($($arg,)*)> for Func
        where
            Func: Fn($($arg),*) -> Out + Send + Sync + 'static,
            Out: Send + Sync + 'static,
            $($arg: Dependency,)*
        {
            type Output = Out;

            fn parameters() -> Vec<Parameter> {
                vec![$(<$arg as Dependency>::parameter()),*]
            }

            #[allow(unused_variables)]
            fn construct(&self, container: &Container) -> Result<Out> {
                Ok((self)($(<$arg as Dependency>::from_argument(container)?),*))
            }
        }

        impl<Func, Out, Err, $($arg,)*> FallibleConstructor<($($arg,)*)> for Func
        where
            Func: Fn($($arg),*) -> std::result::Result<Out, Err> + Send + Sync + 'static,
            Out: Send + Sync + 'static,
            Err: Into<anyhow::Error>,
            $($arg: Dependency,)*
        {
            type Output = Out;

            fn parameters() -> Vec<Parameter> {
                vec![$(<$arg as Dependency>::parameter()),*]
            }

            #[allow(unused_variables)]
            fn try_construct(&self, container: &Container) -> Result<Out> {
                (self)($(<$arg as Dependency>::from_argument(container)?),*).map_err(|err| {
                    ScopewireError::ConstructorFailed {
                        dependency: DependencyType::of::<Out>(),
                        source: err.into(),
                    }
                })
            }
        }

        impl<Func, Out, $($arg,)*> Invocable<($($arg,)*)> for Func
        where
            Func: FnOnce($($arg),*) -> Out,
            $($arg: Dependency,)*
        {
            type Output = Out;

            #[allow(unused_variables)]
            fn invoke(self, container: &Container) -> Result<Out> {
                Ok((self)($(<$arg as Dependency>::from_request(container)?),*))
            }
        }
    };
}

impl_constructor!();
impl_constructor!(A1);
impl_constructor!(A1, A2);
impl_constructor!(A1, A2, A3);
impl_constructor!(A1, A2, A3, A4);
impl_constructor!(A1, A2, A3, A4, A5);
impl_constructor!(A1, A2, A3, A4, A5, A6);
impl_constructor!(A1, A2, A3, A4, A5, A6, A7);
impl_constructor!(A1, A2, A3, A4, A5, A6, A7, A8);

pub(crate) fn registration<C, Args>(constructor: C, lifetime: Lifetime) -> Registration
where
    C: Constructor<Args>,
{
    let call: ConstructorFn = Arc::new(move |container: &Container| {
        let value = constructor.construct(container)?;
        Ok(Arc::new(value) as Instance)
    });
    Registration {
        produced: DependencyType::of::<C::Output>(),
        parameters: C::parameters(),
        lifetime,
        constructor: call,
    }
}

pub(crate) fn fallible_registration<C, Args>(constructor: C, lifetime: Lifetime) -> Registration
where
    C: FallibleConstructor<Args>,
{
    let call: ConstructorFn = Arc::new(move |container: &Container| {
        let value = constructor.try_construct(container)?;
        Ok(Arc::new(value) as Instance)
    });
    Registration {
        produced: DependencyType::of::<C::Output>(),
        parameters: C::parameters(),
        lifetime,
        constructor: call,
    }
}
