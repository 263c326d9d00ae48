//! Controller manager host for admission webhooks
//!
//! The manager is what handlers attach themselves to. It owns:
//! - an optional Kubernetes client (absent when running offline, e.g. to list paths)
//! - the [`Scheme`] of resource kinds the process understands
//! - the table of admission routes, turned into an axum [`Router`] once
//!   bootstrap has finished
//!
//! Route uniqueness is enforced by bootstrap, which panics on a duplicated
//! path before the router is ever built.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::routing::post;
use axum::{Json, Router};
use kube::api::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
use kube::Client;
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::handler::{CustomDefaulter, CustomValidator};
use crate::identity::ResourceIdentity;
use crate::path::{mutate_path, validate_path, WebhookPaths};
use crate::Error;

/// The set of resource kinds known to the manager
#[derive(Debug, Clone, Default)]
pub struct Scheme {
    known: BTreeSet<ResourceIdentity>,
}

impl Scheme {
    /// Create an empty scheme
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a kind to the scheme
    pub fn with(mut self, identity: ResourceIdentity) -> Self {
        self.known.insert(identity);
        self
    }

    /// Whether `identity` is registered
    pub fn recognizes(&self, identity: &ResourceIdentity) -> bool {
        self.known.contains(identity)
    }

    /// Resolve `identity` against the scheme
    pub fn resolve(&self, identity: &ResourceIdentity) -> Result<ResourceIdentity, Error> {
        if self.recognizes(identity) {
            Ok(identity.clone())
        } else {
            Err(Error::UnregisteredKind {
                identity: identity.clone(),
            })
        }
    }
}

/// Admission logic mounted at one path
#[derive(Clone)]
enum AdmissionHook {
    Mutate(Arc<dyn CustomDefaulter>),
    Validate(Arc<dyn CustomValidator>),
}

struct AdmissionRoute {
    path: String,
    identity: ResourceIdentity,
    hook: AdmissionHook,
}

/// Host controller manager that webhook handlers register with
pub struct WebhookManager {
    client: Option<Client>,
    scheme: Scheme,
    routes: Mutex<Vec<AdmissionRoute>>,
}

impl WebhookManager {
    /// Create a manager backed by a live cluster client
    pub fn new(client: Client, scheme: Scheme) -> Self {
        Self {
            client: Some(client),
            scheme,
            routes: Mutex::new(Vec::new()),
        }
    }

    /// Create a manager without cluster access
    pub fn offline(scheme: Scheme) -> Self {
        Self {
            client: None,
            scheme,
            routes: Mutex::new(Vec::new()),
        }
    }

    /// The cluster client, if this manager has one
    pub fn client(&self) -> Option<Client> {
        self.client.clone()
    }

    /// Start building webhooks for a resource kind
    pub fn webhook_for(&self, identity: ResourceIdentity) -> WebhookBuilder<'_> {
        WebhookBuilder {
            mgr: self,
            identity,
            defaulter: None,
            validator: None,
        }
    }

    /// Paths mounted so far, in registration order
    pub fn registered_paths(&self) -> Vec<String> {
        self.routes.lock().iter().map(|r| r.path.clone()).collect()
    }

    fn mount(&self, path: String, identity: ResourceIdentity, hook: AdmissionHook) {
        debug!(path = %path, kind = %identity, "Mounting admission route");
        self.routes.lock().push(AdmissionRoute {
            path,
            identity,
            hook,
        });
    }

    /// Build the admission router from every mounted route
    pub fn into_router(self) -> Router {
        self.routes
            .into_inner()
            .into_iter()
            .fold(Router::new(), |router, route| {
                let hook = route.hook;
                let identity = Arc::new(route.identity);
                router.route(
                    &route.path,
                    post(move |Json(review): Json<AdmissionReview<DynamicObject>>| {
                        let hook = hook.clone();
                        let identity = identity.clone();
                        async move { Json(admit(&hook, &identity, review).await) }
                    }),
                )
            })
    }
}

/// Builder attaching a defaulter and/or validator to one resource kind
pub struct WebhookBuilder<'a> {
    mgr: &'a WebhookManager,
    identity: ResourceIdentity,
    defaulter: Option<Arc<dyn CustomDefaulter>>,
    validator: Option<Arc<dyn CustomValidator>>,
}

impl WebhookBuilder<'_> {
    /// Serve the mutating side with `defaulter`
    pub fn with_defaulter(mut self, defaulter: Arc<dyn CustomDefaulter>) -> Self {
        self.defaulter = Some(defaulter);
        self
    }

    /// Serve the validating side with `validator`
    pub fn with_validator(mut self, validator: Arc<dyn CustomValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Resolve the kind and mount the configured sides
    ///
    /// Returns the mounted paths; a side without logic yields an empty path.
    pub fn complete(self) -> Result<WebhookPaths, Error> {
        let identity = self.mgr.scheme.resolve(&self.identity)?;
        let mut paths = WebhookPaths::default();

        if let Some(defaulter) = self.defaulter {
            paths.mutate = mutate_path(&identity);
            self.mgr.mount(
                paths.mutate.clone(),
                identity.clone(),
                AdmissionHook::Mutate(defaulter),
            );
        }
        if let Some(validator) = self.validator {
            paths.validate = validate_path(&identity);
            self.mgr.mount(
                paths.validate.clone(),
                identity,
                AdmissionHook::Validate(validator),
            );
        }

        Ok(paths)
    }
}

/// Decode a review, run the hook, and wrap the response
async fn admit(
    hook: &AdmissionHook,
    identity: &ResourceIdentity,
    review: AdmissionReview<DynamicObject>,
) -> AdmissionReview<DynamicObject> {
    let req: AdmissionRequest<DynamicObject> = match review.try_into() {
        Ok(req) => req,
        Err(e) => {
            error!(
                api_version = %identity.api_version(),
                kind = %identity.kind,
                error = %e,
                "Failed to parse admission request"
            );
            return AdmissionResponse::invalid(e.to_string()).into_review();
        }
    };
    debug!(
        uid = %req.uid,
        api_version = %identity.api_version(),
        kind = %identity.kind,
        operation = ?req.operation,
        "Admitting request"
    );

    let response = match hook {
        AdmissionHook::Mutate(defaulter) => mutate(defaulter.as_ref(), &req).await,
        AdmissionHook::Validate(validator) => validate(validator.as_ref(), &req).await,
    };
    response.into_review()
}

async fn mutate(
    defaulter: &dyn CustomDefaulter,
    req: &AdmissionRequest<DynamicObject>,
) -> AdmissionResponse {
    let Some(original) = req.object.as_ref() else {
        return AdmissionResponse::from(req);
    };

    let mut defaulted = original.clone();
    if let Err(e) = defaulter.default_object(&mut defaulted).await {
        warn!(uid = %req.uid, error = %e, "Defaulting rejected object");
        return AdmissionResponse::from(req).deny(e.to_string());
    }

    let (before, after) = match (serde_json::to_value(original), serde_json::to_value(&defaulted)) {
        (Ok(before), Ok(after)) => (before, after),
        (Err(e), _) | (_, Err(e)) => {
            return AdmissionResponse::invalid(format!("failed to serialize object: {e}"))
        }
    };

    let patch = json_patch::diff(&before, &after);
    if patch.0.is_empty() {
        return AdmissionResponse::from(req);
    }

    match AdmissionResponse::from(req).with_patch(patch) {
        Ok(response) => response,
        Err(e) => AdmissionResponse::invalid(format!("failed to serialize patch: {e}")),
    }
}

async fn validate(
    validator: &dyn CustomValidator,
    req: &AdmissionRequest<DynamicObject>,
) -> AdmissionResponse {
    let result = match (&req.operation, &req.object, &req.old_object) {
        (Operation::Create, Some(obj), _) => validator.validate_create(obj).await,
        (Operation::Update, Some(new), Some(old)) => validator.validate_update(old, new).await,
        (Operation::Delete, _, Some(old)) => validator.validate_delete(old).await,
        (Operation::Connect, _, _) => Ok(()),
        (op, _, _) => Err(Error::admission(format!(
            "{op:?} request is missing the object to validate"
        ))),
    };

    match result {
        Ok(()) => AdmissionResponse::from(req),
        Err(e) => {
            debug!(uid = %req.uid, error = %e, "Validation denied request");
            AdmissionResponse::from(req).deny(e.to_string())
        }
    }
}
