use std::sync::Arc;

use tenantadmin_admin::{
    AccessRequirements, AdminConfig, AdminError, CreateCustomRoleRequest, CustomRoleService,
    RequestContext,
};
use tenantadmin_auth::{AuthzError, Permission, PermissionSet, Role, TenantRole};
use tenantadmin_core::{TenantId, UserId};
use tenantadmin_infra::InMemoryPrincipalStore;

fn service() -> CustomRoleService<Arc<InMemoryPrincipalStore>> {
    tenantadmin_observability::init_for_tests();
    CustomRoleService::new(Arc::new(InMemoryPrincipalStore::new()), AdminConfig::default())
}

fn ctx(tenant_id: TenantId, role: Role) -> RequestContext {
    RequestContext::new(tenantadmin_auth::Principal::with_role(UserId::new(), tenant_id, role))
}

fn request(name: &str, permissions: &[Permission]) -> CreateCustomRoleRequest {
    CreateCustomRoleRequest {
        name: name.to_string(),
        description: format!("{name} bundle"),
        permissions: permissions.iter().copied().collect(),
    }
}

const EDITOR: &[Permission] = &[
    Permission::DashboardView,
    Permission::ContentView,
    Permission::ContentManage,
];

#[test]
fn created_roles_are_listed_by_name() {
    let svc = service();
    let tenant_id = TenantId::new();
    let admin = ctx(tenant_id, Role::Admin);

    let created = svc.create(&admin, &request("Editor", EDITOR)).unwrap();
    assert_eq!(created.tenant_id, tenant_id);
    assert_eq!(created.created_by, Some(admin.actor().user_id));
    svc.create(&admin, &request("Billing", &[Permission::CurrenciesView]))
        .unwrap();

    let names: Vec<_> = svc
        .list(&ctx(tenant_id, Role::TeamLead))
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, vec!["Billing", "Editor"]);

    assert!(svc.list(&ctx(TenantId::new(), Role::Admin)).unwrap().is_empty());
}

#[test]
fn listing_requires_users_view() {
    let svc = service();
    let err = svc.list(&ctx(TenantId::new(), Role::TeamMember)).unwrap_err();
    assert_eq!(err, AdminError::Authz(AuthzError::Forbidden(Permission::UsersView)));
}

#[test]
fn creating_requires_roles_manage() {
    let svc = service();
    let err = svc
        .create(&ctx(TenantId::new(), Role::TeamLead), &request("Editor", EDITOR))
        .unwrap_err();
    assert_eq!(err, AdminError::Authz(AuthzError::Forbidden(Permission::RolesManage)));
}

#[test]
fn duplicate_names_conflict_within_a_tenant_only() {
    let svc = service();
    let tenant_id = TenantId::new();

    svc.create(&ctx(tenant_id, Role::Admin), &request("Editor", EDITOR))
        .unwrap();
    let err = svc
        .create(&ctx(tenant_id, Role::Admin), &request("Editor", EDITOR))
        .unwrap_err();
    assert!(matches!(err, AdminError::Conflict(_)));
    assert_eq!(err.status_code(), 409);

    assert!(svc
        .create(&ctx(TenantId::new(), Role::Admin), &request("Editor", EDITOR))
        .is_ok());
}

#[test]
fn incomplete_or_invalid_definitions_are_rejected() {
    let svc = service();
    let admin = ctx(TenantId::new(), Role::Admin);

    let mut blank = request("Editor", EDITOR);
    blank.name = "   ".to_string();
    assert!(matches!(svc.create(&admin, &blank), Err(AdminError::BadRequest(_))));

    let empty = request("Nothing", &[]);
    assert!(matches!(svc.create(&admin, &empty), Err(AdminError::BadRequest(_))));

    let err = svc
        .create(&admin, &request("Broken", &[Permission::ContentManage]))
        .unwrap_err();
    let AdminError::Validation(failures) = err else {
        panic!("expected validation error");
    };
    assert_eq!(failures[0].issue.permissions, vec![Permission::ContentManage]);
    assert_eq!(failures[0].issue.related, vec![Permission::ContentView]);
}

#[test]
fn custom_roles_are_subject_to_the_escalation_guard() {
    let svc = service();
    let tenant_id = TenantId::new();
    let permissions = [
        Permission::DashboardView,
        Permission::SettingsView,
        Permission::SettingsManage,
        Permission::SystemMaintenance,
        Permission::AuditView,
    ];

    let err = svc
        .create(&ctx(tenant_id, Role::Admin), &request("Ops", &permissions))
        .unwrap_err();
    let AdminError::Escalation(e) = err else {
        panic!("expected escalation error");
    };
    assert_eq!(e.denied, PermissionSet::from([Permission::SystemMaintenance]));

    assert!(svc
        .create(&ctx(tenant_id, Role::SuperAdmin), &request("Ops", &permissions))
        .is_ok());
}

#[test]
fn escalation_is_reported_before_validation() {
    let svc = service();
    let err = svc
        .create(
            &ctx(TenantId::new(), Role::Admin),
            &request("Maintenance", &[Permission::SystemMaintenance]),
        )
        .unwrap_err();

    let AdminError::Escalation(e) = err else {
        panic!("expected escalation error, got {err:?}");
    };
    assert_eq!(e.denied, PermissionSet::from([Permission::SystemMaintenance]));
}

#[test]
fn declared_requirements_are_checked_first() {
    let svc = service().with_requirements(AccessRequirements::tenant_admin());
    let tenant_id = TenantId::new();

    let err = svc
        .create(&ctx(tenant_id, Role::Admin), &request("Editor", EDITOR))
        .unwrap_err();
    assert!(matches!(err, AdminError::Authz(AuthzError::RequirementNotMet(_))));
    assert!(matches!(
        svc.list(&ctx(tenant_id, Role::Admin)),
        Err(AdminError::Authz(AuthzError::RequirementNotMet(_)))
    ));

    let mut owner = ctx(tenant_id, Role::Admin).actor().clone();
    owner.membership.tenant_role = Some(TenantRole::Owner);
    let owner = RequestContext::new(owner);
    assert!(svc.create(&owner, &request("Editor", EDITOR)).is_ok());
    assert_eq!(svc.list(&owner).unwrap().len(), 1);
}
