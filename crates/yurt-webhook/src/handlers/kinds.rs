//! Resource kinds served by yurt-manager webhooks

use k8s_openapi::api::core::v1::Pod;

use crate::identity::ResourceIdentity;

/// API group of raven resources
pub const RAVEN_GROUP: &str = "raven.openyurt.io";

/// API group of OpenYurt app resources
pub const APPS_GROUP: &str = "apps.openyurt.io";

/// Controller owning the raven Gateway webhook
pub const RAVEN_CONTROLLER: &str = "raven";
/// Controller owning the NodePool webhooks
pub const NODEPOOL_CONTROLLER: &str = "nodepool";
/// Controller owning the StaticPod webhook
pub const STATICPOD_CONTROLLER: &str = "staticpod";
/// Controller owning the YurtAppSet webhook
pub const YURTAPPSET_CONTROLLER: &str = "yurtappset";
/// Controller owning the YurtAppDaemon webhook
pub const YURTAPPDAEMON_CONTROLLER: &str = "yurtappdaemon";

/// Name of the independent Pod webhook
pub const POD_WEBHOOK: &str = "pod";

/// `raven.openyurt.io/v1alpha1, Kind=Gateway`
pub fn gateway_v1alpha1() -> ResourceIdentity {
    ResourceIdentity::new(RAVEN_GROUP, "v1alpha1", "Gateway")
}

/// `apps.openyurt.io/v1alpha1, Kind=NodePool`
pub fn nodepool_v1alpha1() -> ResourceIdentity {
    ResourceIdentity::new(APPS_GROUP, "v1alpha1", "NodePool")
}

/// `apps.openyurt.io/v1beta1, Kind=NodePool`
pub fn nodepool_v1beta1() -> ResourceIdentity {
    ResourceIdentity::new(APPS_GROUP, "v1beta1", "NodePool")
}

/// `apps.openyurt.io/v1alpha1, Kind=StaticPod`
pub fn staticpod_v1alpha1() -> ResourceIdentity {
    ResourceIdentity::new(APPS_GROUP, "v1alpha1", "StaticPod")
}

/// `apps.openyurt.io/v1alpha1, Kind=YurtAppSet`
pub fn yurtappset_v1alpha1() -> ResourceIdentity {
    ResourceIdentity::new(APPS_GROUP, "v1alpha1", "YurtAppSet")
}

/// `apps.openyurt.io/v1alpha1, Kind=YurtAppDaemon`
pub fn yurtappdaemon_v1alpha1() -> ResourceIdentity {
    ResourceIdentity::new(APPS_GROUP, "v1alpha1", "YurtAppDaemon")
}

/// Core `v1, Kind=Pod`
pub fn pod_v1() -> ResourceIdentity {
    ResourceIdentity::of::<Pod>()
}
