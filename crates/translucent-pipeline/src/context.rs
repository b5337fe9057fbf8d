//! The request context passed through a resource pipeline.
//!
//! A [`ResourceContext`] is created per invocation and handed by mutable
//! reference to every middleware in turn. It is never shared between
//! invocations, so middleware may mutate it freely.

use crate::types::{Request, Response};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use translucent_core::RequestId;

/// Mutable carrier for one resource request and its eventual response.
///
/// The response starts out empty; any middleware may set it, and a later
/// middleware seeing it already set may decide not to call `next`.
///
/// # Example
///
/// ```
/// use translucent_pipeline::{Request, Response, ResourceContext};
///
/// let mut ctx = ResourceContext::new(Request::get("config:app.name"));
/// assert!(!ctx.has_response());
///
/// ctx.set_response(Response::ok("demo"));
/// assert_eq!(ctx.response().and_then(Response::body_str), Some("demo"));
/// ```
#[derive(Debug)]
pub struct ResourceContext {
    request_id: RequestId,
    request: Request,
    response: Option<Response>,
    started_at: Instant,

    /// Type-erased extension data shared between middleware.
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl ResourceContext {
    /// Creates a context with a fresh request ID.
    #[must_use]
    pub fn new(request: Request) -> Self {
        Self::with_request_id(request, RequestId::new())
    }

    /// Creates a context with a caller-supplied request ID.
    #[must_use]
    pub fn with_request_id(request: Request, request_id: RequestId) -> Self {
        Self {
            request_id,
            request,
            response: None,
            started_at: Instant::now(),
            extensions: HashMap::new(),
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the request.
    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Returns the request for modification.
    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    /// Returns the response, if one has been produced.
    #[must_use]
    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    /// Returns the response for modification, if one has been produced.
    pub fn response_mut(&mut self) -> Option<&mut Response> {
        self.response.as_mut()
    }

    /// Sets the response, replacing any previous one.
    pub fn set_response(&mut self, response: Response) {
        self.response = Some(response);
    }

    /// Removes and returns the response.
    pub fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }

    /// Returns `true` once some middleware has produced a response.
    #[must_use]
    pub fn has_response(&self) -> bool {
        self.response.is_some()
    }

    /// Returns when the context was created.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the elapsed time since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Stores a typed extension value.
    ///
    /// # Example
    ///
    /// ```
    /// use translucent_pipeline::{Request, ResourceContext};
    ///
    /// #[derive(Clone)]
    /// struct Attempt(u32);
    ///
    /// let mut ctx = ResourceContext::new(Request::get("file:///a"));
    /// ctx.set_extension(Attempt(2));
    /// assert_eq!(ctx.get_extension::<Attempt>().unwrap().0, 2);
    /// ```
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }

    /// Checks if an extension of the given type exists.
    #[must_use]
    pub fn has_extension<T: Send + Sync + 'static>(&self) -> bool {
        self.extensions.contains_key(&TypeId::of::<T>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_context_has_no_response() {
        let ctx = ResourceContext::new(Request::get("file:///a"));
        assert!(!ctx.has_response());
        assert!(ctx.response().is_none());
        assert_eq!(ctx.request().uri, "file:///a");
    }

    #[test]
    fn test_with_request_id() {
        let id = RequestId::new();
        let ctx = ResourceContext::with_request_id(Request::get("file:///a"), id);
        assert_eq!(ctx.request_id(), id);
    }

    #[test]
    fn test_response_lifecycle() {
        let mut ctx = ResourceContext::new(Request::get("file:///a"));
        ctx.set_response(Response::ok("one"));
        ctx.response_mut().unwrap().body = "two".into();

        let taken = ctx.take_response().unwrap();
        assert_eq!(taken.body_str(), Some("two"));
        assert!(!ctx.has_response());
    }

    #[test]
    fn test_request_mut() {
        let mut ctx = ResourceContext::new(Request::get("file:///a"));
        ctx.request_mut().uri = "file:///b".to_string();
        assert_eq!(ctx.request().uri, "file:///b");
    }

    #[test]
    fn test_extensions() {
        #[derive(Debug, Clone, PartialEq)]
        struct Marker {
            value: i32,
        }

        let mut ctx = ResourceContext::new(Request::get("file:///a"));
        assert!(!ctx.has_extension::<Marker>());

        ctx.set_extension(Marker { value: 42 });
        assert_eq!(ctx.get_extension::<Marker>(), Some(&Marker { value: 42 }));

        assert_eq!(ctx.remove_extension::<Marker>(), Some(Marker { value: 42 }));
        assert!(!ctx.has_extension::<Marker>());
    }

    #[test]
    fn test_elapsed_time() {
        let ctx = ResourceContext::new(Request::get("file:///a"));
        std::thread::sleep(Duration::from_millis(10));
        assert!(ctx.elapsed() >= Duration::from_millis(10));
    }
}
