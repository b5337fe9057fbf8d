//! Dependency lists and explicit arguments.
//!
//! Constructor and invoke-time parameter lists are tuples of [`Dependency`]
//! values, usually [`Inject<T>`]. A list can describe itself
//! ([`Dependencies::parameters`]), resolve itself from a [`Container`], or
//! bind itself to explicitly supplied [`Arguments`] when their runtime types
//! line up exactly.

use std::any::{type_name, TypeId};
use std::fmt;
use std::sync::Arc;
use translucent_core::di::Service;
use translucent_core::{Container, Inject, PipelineResult};

/// Describes one parameter slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameter {
    /// Runtime identity of the expected type.
    pub type_id: TypeId,
    /// Human-readable name of the expected type.
    pub type_name: &'static str,
    /// Whether resolution may come back empty.
    pub optional: bool,
}

impl Parameter {
    /// A required parameter of type `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            optional: false,
        }
    }

    /// An optional parameter of type `T`.
    pub fn optional<T: ?Sized + 'static>() -> Self {
        Self {
            optional: true,
            ..Self::of::<T>()
        }
    }
}

/// One explicitly supplied constructor argument.
#[derive(Clone)]
pub struct Argument {
    value: Service,
    parameter: Parameter,
}

impl Argument {
    /// Wraps a value.
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self::shared(Arc::new(value))
    }

    /// Wraps an already shared value.
    pub fn shared<T: Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            value,
            parameter: Parameter::of::<T>(),
        }
    }

    /// Returns the runtime type name of the value.
    pub fn type_name(&self) -> &'static str {
        self.parameter.type_name
    }

    /// Returns the runtime type id of the value.
    pub fn type_id(&self) -> TypeId {
        self.parameter.type_id
    }

    /// Returns the value as `T` if that is its runtime type.
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Argument").field(&self.parameter.type_name).finish()
    }
}

/// An ordered list of explicit constructor arguments.
///
/// # Example
///
/// ```
/// use translucent_pipeline::{arguments, Arguments};
/// use std::time::Duration;
///
/// let args = arguments![Duration::from_secs(5), "primary".to_string()];
/// assert_eq!(args.len(), 2);
/// assert!(args.type_names()[0].ends_with("Duration"));
///
/// assert!(Arguments::new().is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    values: Vec<Argument>,
}

impl Arguments {
    /// Creates an empty argument list.
    #[must_use]
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    /// Appends a value.
    #[must_use]
    pub fn with<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.values.push(Argument::new(value));
        self
    }

    /// Appends an already shared value.
    #[must_use]
    pub fn with_shared<T: Send + Sync + 'static>(mut self, value: Arc<T>) -> Self {
        self.values.push(Argument::shared(value));
        self
    }

    /// Appends an argument.
    pub fn push(&mut self, argument: Argument) {
        self.values.push(argument);
    }

    /// Returns the number of arguments.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no arguments were supplied.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates the arguments in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Argument> {
        self.values.iter()
    }

    /// Returns the runtime type names, in order.
    pub fn type_names(&self) -> Vec<&'static str> {
        self.values.iter().map(Argument::type_name).collect()
    }
}

impl FromIterator<Argument> for Arguments {
    fn from_iter<I: IntoIterator<Item = Argument>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Arguments {
    type Item = &'a Argument;
    type IntoIter = std::slice::Iter<'a, Argument>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// Builds an [`Arguments`] list from values.
#[macro_export]
macro_rules! arguments {
    () => {
        $crate::Arguments::new()
    };
    ($($value:expr),+ $(,)?) => {
        $crate::Arguments::new()$(.with($value))+
    };
}

/// A single injectable parameter.
pub trait Dependency: Sized + Send + 'static {
    /// Describes the parameter slot.
    fn parameter() -> Parameter;

    /// Resolves the value from a container.
    fn resolve(container: &Container) -> PipelineResult<Self>;

    /// Binds the value to an explicit argument of exactly the right type.
    fn bind(argument: &Argument) -> Option<Self>;
}

impl<T: Send + Sync + 'static> Dependency for Inject<T> {
    fn parameter() -> Parameter {
        Parameter::of::<T>()
    }

    fn resolve(container: &Container) -> PipelineResult<Self> {
        Ok(Inject(container.resolve_required::<T>()?))
    }

    fn bind(argument: &Argument) -> Option<Self> {
        argument.downcast::<T>().map(Inject)
    }
}

impl<T: Send + Sync + 'static> Dependency for Option<Inject<T>> {
    fn parameter() -> Parameter {
        Parameter::optional::<T>()
    }

    fn resolve(container: &Container) -> PipelineResult<Self> {
        Ok(container.resolve::<T>().map(Inject))
    }

    fn bind(argument: &Argument) -> Option<Self> {
        argument.downcast::<T>().map(|value| Some(Inject(value)))
    }
}

/// An ordered parameter list.
///
/// Implemented for `()` and for tuples of up to eight [`Dependency`]
/// values.
pub trait Dependencies: Sized + Send + 'static {
    /// Describes every parameter slot, in order.
    fn parameters() -> Vec<Parameter>;

    /// Resolves every parameter from a container.
    fn resolve(container: &Container) -> PipelineResult<Self>;

    /// Binds explicit arguments; `None` unless count and types match exactly.
    fn bind(arguments: &Arguments) -> Option<Self>;
}

impl Dependencies for () {
    fn parameters() -> Vec<Parameter> {
        Vec::new()
    }

    fn resolve(_container: &Container) -> PipelineResult<Self> {
        Ok(())
    }

    fn bind(arguments: &Arguments) -> Option<Self> {
        arguments.is_empty().then_some(())
    }
}

macro_rules! impl_dependencies {
    ($($name:ident),+) => {
        impl<$($name: Dependency),+> Dependencies for ($($name,)+) {
            fn parameters() -> Vec<Parameter> {
                vec![$($name::parameter()),+]
            }

            fn resolve(container: &Container) -> PipelineResult<Self> {
                Ok(($($name::resolve(container)?,)+))
            }

            fn bind(arguments: &Arguments) -> Option<Self> {
                let mut values = arguments.iter();
                let bound = ($($name::bind(values.next()?)?,)+);
                values.next().is_none().then_some(bound)
            }
        }
    };
}

impl_dependencies!(A);
impl_dependencies!(A, B);
impl_dependencies!(A, B, C);
impl_dependencies!(A, B, C, D);
impl_dependencies!(A, B, C, D, E);
impl_dependencies!(A, B, C, D, E, F);
impl_dependencies!(A, B, C, D, E, F, G);
impl_dependencies!(A, B, C, D, E, F, G, H);

/// Reports the first required parameter of `D` that `container` cannot
/// satisfy.
pub(crate) fn first_unresolvable<D: Dependencies>(container: &Container) -> Option<Parameter> {
    D::parameters()
        .into_iter()
        .find(|parameter| !parameter.optional && !container.contains_type(parameter.type_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use translucent_core::PipelineError;

    #[derive(Debug, PartialEq)]
    struct Config(u32);

    #[test]
    fn test_unit_binds_only_empty_arguments() {
        assert!(<()>::bind(&Arguments::new()).is_some());
        assert!(<()>::bind(&arguments![1_u32]).is_none());
    }

    #[test]
    fn test_tuple_binds_exact_types_in_order() {
        let args = arguments![Config(3), Duration::from_secs(1)];
        let (config, timeout) = <(Inject<Config>, Inject<Duration>)>::bind(&args).unwrap();
        assert_eq!(config.inner().0, 3);
        assert_eq!(*timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_tuple_rejects_wrong_order() {
        let args = arguments![Duration::from_secs(1), Config(3)];
        assert!(<(Inject<Config>, Inject<Duration>)>::bind(&args).is_none());
    }

    #[test]
    fn test_tuple_rejects_wrong_arity() {
        let too_few = arguments![Config(3)];
        let too_many = arguments![Config(3), Duration::ZERO, 1_u8];
        assert!(<(Inject<Config>, Inject<Duration>)>::bind(&too_few).is_none());
        assert!(<(Inject<Config>, Inject<Duration>)>::bind(&too_many).is_none());
    }

    #[test]
    fn test_tuple_resolves_from_container() {
        let mut container = Container::new();
        container.register(Arc::new(Config(9)));

        let (config,) = <(Inject<Config>,)>::resolve(&container).unwrap();
        assert_eq!(config.inner().0, 9);
    }

    #[test]
    fn test_missing_dependency_is_reported() {
        let err = <(Inject<Config>,)>::resolve(&Container::new()).unwrap_err();
        match err {
            PipelineError::DependencyNotFound(inner) => {
                assert!(inner.type_name.ends_with("Config"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_optional_dependency_resolves_to_none() {
        let (config,) = <(Option<Inject<Config>>,)>::resolve(&Container::new()).unwrap();
        assert!(config.is_none());
    }

    #[test]
    fn test_parameters_describe_slots() {
        let parameters = <(Inject<Config>, Option<Inject<Duration>>)>::parameters();
        assert_eq!(parameters.len(), 2);
        assert_eq!(parameters[0], Parameter::of::<Config>());
        assert!(!parameters[0].optional);
        assert!(parameters[1].optional);
    }

    #[test]
    fn test_first_unresolvable_skips_optional() {
        let mut container = Container::new();
        container.register(Arc::new(Config(1)));

        assert!(first_unresolvable::<(Inject<Config>, Option<Inject<Duration>>)>(&container).is_none());
        let missing = first_unresolvable::<(Inject<Config>, Inject<Duration>)>(&container).unwrap();
        assert_eq!(missing.type_id, TypeId::of::<Duration>());
    }

    #[test]
    fn test_argument_shared_keeps_identity() {
        let shared = Arc::new(Config(5));
        let argument = Argument::shared(Arc::clone(&shared));
        assert!(Arc::ptr_eq(&argument.downcast::<Config>().unwrap(), &shared));
        assert!(argument.downcast::<Duration>().is_none());
    }
}
