//! End-to-end backup sweeps against an in-memory cluster
//!
//! The fake API server assigns names and UIDs to created backups and the
//! fake watch makes them visible in the cache, lowering the owner's
//! expectations as a real informer handler would.

use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding, RoleRef};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::PostParams;
use parking_lot::Mutex;

use bulwark_common::crd::{BulwarkInstall, BulwarkInstallSpec, BulwarkInstallStatus};
use bulwark_rbac::annotations::{read_backup_marker, read_version_tag, write_version_tag};
use bulwark_rbac::{
    AuthorizationObject, AuthzKind, BackupConfig, BackupExecutor, Error, ExpectationStore,
    ObjectCache, RbacClient, SnapshotCache, UpgradeOwner, VersionTag,
};

const OWNER: &str = "bulwark-system/bulwark";

fn install(version: &str, generation: i64) -> BulwarkInstall {
    let mut install = BulwarkInstall::new(
        "bulwark",
        BulwarkInstallSpec {
            version: version.to_string(),
            image_registry: "reg".to_string(),
        },
    );
    install.metadata.namespace = Some("bulwark-system".to_string());
    install.metadata.generation = Some(generation);
    install.status = Some(BulwarkInstallStatus {
        target_id: Some("id1".to_string()),
        ..Default::default()
    });
    install
}

fn object_meta(name: &str, namespace: Option<&str>, tag: Option<&VersionTag>) -> ObjectMeta {
    let mut meta = ObjectMeta {
        name: Some(name.to_string()),
        namespace: namespace.map(str::to_string),
        uid: Some(format!("uid-{}", name)),
        ..Default::default()
    };
    if let Some(tag) = tag {
        write_version_tag(&mut meta, tag);
    }
    meta
}

fn role_ref(kind: &str, name: &str) -> RoleRef {
    RoleRef {
        api_group: "rbac.authorization.k8s.io".to_string(),
        kind: kind.to_string(),
        name: name.to_string(),
    }
}

/// A cluster where everything the operator deployed is on v1
fn cluster_on_v1() -> Vec<AuthorizationObject> {
    let v1 = VersionTag::new("v1", "reg", "id1", 3);
    vec![
        ClusterRole {
            metadata: object_meta("bulwark-operator", None, Some(&v1)),
            ..Default::default()
        }
        .into(),
        ClusterRole {
            metadata: object_meta("cluster-admin", None, None),
            ..Default::default()
        }
        .into(),
        ClusterRoleBinding {
            metadata: object_meta("bulwark-operator", None, Some(&v1)),
            role_ref: role_ref("ClusterRole", "bulwark-operator"),
            subjects: None,
        }
        .into(),
        Role {
            metadata: object_meta("role-a", Some("bulwark-system"), Some(&v1)),
            rules: None,
        }
        .into(),
        Role {
            metadata: object_meta("role-b", Some("bulwark-system"), Some(&v1)),
            rules: None,
        }
        .into(),
        RoleBinding {
            metadata: object_meta("role-a", Some("bulwark-system"), Some(&v1)),
            role_ref: role_ref("Role", "role-a"),
            subjects: None,
        }
        .into(),
    ]
}

/// API server + watch stand-in
struct FakeCluster {
    cache: Arc<SnapshotCache>,
    expectations: Arc<ExpectationStore>,
    created: Mutex<Vec<AuthorizationObject>>,
    fail_names: Mutex<Vec<String>>,
}

impl FakeCluster {
    fn new(objects: Vec<AuthorizationObject>) -> Arc<Self> {
        Arc::new(Self {
            cache: Arc::new(SnapshotCache::new(objects)),
            expectations: Arc::new(ExpectationStore::new()),
            created: Mutex::new(Vec::new()),
            fail_names: Mutex::new(Vec::new()),
        })
    }

    fn reject(&self, generate_name: &str) {
        self.fail_names.lock().push(generate_name.to_string());
    }

    fn heal(&self) {
        self.fail_names.lock().clear();
    }

    fn created(&self) -> Vec<AuthorizationObject> {
        self.created.lock().clone()
    }

    fn executor(self: &Arc<Self>) -> BackupExecutor {
        BackupExecutor::new(
            self.cache.clone(),
            self.clone(),
            self.expectations.clone(),
            BackupConfig::default(),
        )
    }
}

#[async_trait]
impl RbacClient for FakeCluster {
    async fn create(
        &self,
        object: &AuthorizationObject,
        _params: &PostParams,
    ) -> Result<AuthorizationObject, Error> {
        let prefix = object.meta().generate_name.clone().unwrap_or_default();
        if self.fail_names.lock().contains(&prefix) {
            return Err(Error::internal("etcdserver: request timed out"));
        }

        let mut stored = object.clone();
        let index = self.created.lock().len();
        let meta = stored.meta_mut();
        meta.name = Some(format!("{}b{:04}", prefix, index));
        meta.uid = Some(format!("backup-uid-{}", index));
        meta.generate_name = None;

        self.created.lock().push(stored.clone());
        self.cache.insert(stored.clone());
        self.expectations.observed_add(OWNER, stored.kind());
        Ok(stored)
    }
}

#[tokio::test]
async fn upgrade_sweep_backs_up_each_tracked_object_once() {
    let cluster = FakeCluster::new(cluster_on_v1());
    let executor = cluster.executor();
    let owner = install("v2", 3);

    let summary = executor
        .backup_authorization_objects(&owner)
        .await
        .expect("sweep should succeed");

    assert_eq!(summary.created(AuthzKind::ClusterRole), 1);
    assert_eq!(summary.created(AuthzKind::ClusterRoleBinding), 1);
    assert_eq!(summary.created(AuthzKind::Role), 2);
    assert_eq!(summary.created(AuthzKind::RoleBinding), 1);

    let stamp = VersionTag::new("v1", "reg", "id1", 3);
    for backup in cluster.created() {
        assert_eq!(read_version_tag(backup.meta()), Some(stamp.clone()));
        let marker = read_backup_marker(backup.meta()).expect("backup marker");
        assert!(marker.starts_with("uid-"));
        assert_ne!(marker, "uid-cluster-admin");
    }
    assert!(cluster.expectations.satisfied(OWNER));

    let again = executor
        .backup_authorization_objects(&owner)
        .await
        .expect("second sweep should succeed");
    assert_eq!(again.total(), 0);
    assert_eq!(cluster.created().len(), 5);
}

#[tokio::test]
async fn sweep_is_a_no_op_once_upgrade_is_applied() {
    let target = VersionTag::new("v2", "reg", "id1", 3);
    let objects = cluster_on_v1()
        .into_iter()
        .map(|mut o| {
            if read_version_tag(o.meta()).is_some() {
                write_version_tag(o.meta_mut(), &target);
            }
            o
        })
        .collect();
    let cluster = FakeCluster::new(objects);

    let summary = cluster
        .executor()
        .backup_authorization_objects(&install("v2", 3))
        .await
        .expect("sweep should succeed");

    assert_eq!(summary.total(), 0);
    assert!(cluster.created().is_empty());
}

#[tokio::test]
async fn new_owner_generation_takes_a_second_backup() {
    let cluster = FakeCluster::new(cluster_on_v1());
    let executor = cluster.executor();

    executor
        .backup_authorization_objects(&install("v2", 3))
        .await
        .expect("first attempt");
    assert_eq!(cluster.created().len(), 5);

    // The install was edited again before the upgrade landed: the earlier
    // backups are stamped for generation 3 and no longer count
    let summary = executor
        .backup_authorization_objects(&install("v2", 4))
        .await
        .expect("second attempt");
    assert_eq!(summary.total(), 5);

    let role_a_backups = cluster
        .cache
        .list(AuthzKind::Role)
        .into_iter()
        .filter(|o| read_backup_marker(o.meta()) == Some("uid-role-a"))
        .count();
    assert_eq!(role_a_backups, 2);
}

#[tokio::test]
async fn failed_create_leaves_earlier_backups_and_resumes() {
    let cluster = FakeCluster::new(cluster_on_v1());
    let executor = cluster.executor();
    let owner = install("v2", 3);
    cluster.reject("role-a-");

    let err = executor
        .backup_authorization_objects(&owner)
        .await
        .unwrap_err();

    // ClusterRole, ClusterRoleBinding, then the first Role fails
    assert_eq!(err.object(), Some("bulwark-system/role-a"));
    assert!(err.is_retryable());
    assert_eq!(cluster.created().len(), 2);
    assert!(cluster.expectations.satisfied(owner.owner_key().as_str()));

    cluster.heal();
    let summary = executor
        .backup_authorization_objects(&owner)
        .await
        .expect("retry should succeed");
    assert_eq!(summary.total(), 3);
    assert_eq!(cluster.created().len(), 5);
}
