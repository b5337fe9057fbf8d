//! Resource controllers and the collection the dispatch stage reads from.

use crate::middleware::BoxFuture;
use crate::types::{Request, Response};
use std::fmt;
use std::sync::Arc;

/// Serves requests for one kind of resource.
///
/// Controllers are shared across concurrent requests and must not hold
/// per-request state.
pub trait ResourceController: Send + Sync + 'static {
    /// Name used in logs and error context.
    fn name(&self) -> &str;

    /// Returns `true` if this controller serves `request`.
    fn can_handle(&self, request: &Request) -> bool;

    /// Produces the response for `request`.
    fn handle<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, anyhow::Result<Response>>;
}

/// An ordered set of controllers. The first one that accepts a request wins.
///
/// # Example
///
/// ```
/// use translucent_pipeline::{BoxFuture, Request, ResourceCollection, ResourceController, Response};
///
/// struct Static;
///
/// impl ResourceController for Static {
///     fn name(&self) -> &str {
///         "static"
///     }
///
///     fn can_handle(&self, request: &Request) -> bool {
///         request.scheme() == Some("static")
///     }
///
///     fn handle<'a>(&'a self, _request: &'a Request) -> BoxFuture<'a, anyhow::Result<Response>> {
///         Box::pin(async { Ok(Response::ok("fixed")) })
///     }
/// }
///
/// let resources = ResourceCollection::new().add(Static);
/// assert!(resources.find(&Request::get("static:x")).is_some());
/// assert!(resources.find(&Request::get("file:///x")).is_none());
/// ```
#[derive(Clone, Default)]
pub struct ResourceCollection {
    controllers: Vec<Arc<dyn ResourceController>>,
}

impl ResourceCollection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a controller.
    #[must_use]
    pub fn add<R: ResourceController>(mut self, controller: R) -> Self {
        self.push(Arc::new(controller));
        self
    }

    /// Appends an already shared controller.
    pub fn push(&mut self, controller: Arc<dyn ResourceController>) {
        self.controllers.push(controller);
    }

    /// Returns the first controller that accepts `request`.
    pub fn find(&self, request: &Request) -> Option<&Arc<dyn ResourceController>> {
        self.controllers
            .iter()
            .find(|controller| controller.can_handle(request))
    }

    /// Returns the number of controllers.
    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    /// Returns `true` if no controller is registered.
    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Returns the controller names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.controllers.iter().map(|c| c.name()).collect()
    }
}

impl fmt::Debug for ResourceCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceCollection")
            .field("controllers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scheme(&'static str);

    impl ResourceController for Scheme {
        fn name(&self) -> &str {
            self.0
        }

        fn can_handle(&self, request: &Request) -> bool {
            request.scheme() == Some(self.0)
        }

        fn handle<'a>(&'a self, _request: &'a Request) -> BoxFuture<'a, anyhow::Result<Response>> {
            Box::pin(async move { Ok(Response::ok(self.0)) })
        }
    }

    #[test]
    fn test_find_returns_first_match() {
        let resources = ResourceCollection::new()
            .add(Scheme("file"))
            .add(Scheme("config"))
            .add(Scheme("file"));

        assert_eq!(resources.len(), 3);
        let found = resources.find(&Request::get("file:///a")).unwrap();
        assert!(Arc::ptr_eq(found, &resources.controllers[0]));
        assert_eq!(resources.find(&Request::get("config:x")).unwrap().name(), "config");
    }

    #[test]
    fn test_empty_collection() {
        let resources = ResourceCollection::new();
        assert!(resources.is_empty());
        assert!(resources.find(&Request::get("file:///a")).is_none());
    }

    #[tokio::test]
    async fn test_controller_handles_request() {
        let resources = ResourceCollection::new().add(Scheme("mem"));
        let request = Request::get("mem:key");
        let response = resources.find(&request).unwrap().handle(&request).await.unwrap();
        assert_eq!(response.body_str(), Some("mem"));
    }

    #[test]
    fn test_ready_controller_completes_on_first_poll() {
        let controller = Scheme("mem");
        let request = Request::get("mem:key");
        let mut handled = tokio_test::task::spawn(controller.handle(&request));
        let response = tokio_test::assert_ready_ok!(handled.poll());
        assert!(response.is_success());
    }

    #[test]
    fn test_debug_lists_names() {
        let resources = ResourceCollection::new().add(Scheme("file")).add(Scheme("http"));
        assert_eq!(resources.names(), vec!["file", "http"]);
        assert!(format!("{resources:?}").contains("http"));
    }
}
