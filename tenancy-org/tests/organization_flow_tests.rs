//! End-to-end tests for organization and membership flows.
//!
//! Every test drives the public [`TenancyService`] API with in-memory stores
//! and the in-memory policy engine, then checks both the entity state and
//! the authorization state it left behind.

mod common;

use common::TestFixture;
use tenancy_org::{
    BulkErrorCode, Limits, MemberStatusFilter, NewMember, NewTeam, OrgError, OrganizationPatch,
    OrganizationStatus, TenancyConfig,
};
use tenancy_rbac::{AuthorizationClient, OverrideOptions, Permission, Scope};

// =============================================================================
// Organizations
// =============================================================================

#[tokio::test]
async fn test_create_organization_makes_creator_owner() {
    let fixture = TestFixture::new();
    let alice = fixture.user("alice");

    let org = fixture.org(&alice, "Acme Corp").await;

    assert_eq!(org.slug, "acme-corp");
    assert_eq!(org.owner_id, alice.id);
    let roles = fixture
        .engine
        .get_user_roles(alice.id, Scope::organization(org.id))
        .await
        .unwrap();
    assert_eq!(roles, vec!["owner".to_string()]);
    assert_eq!(fixture.hooks.event_types(), vec!["organization.created"]);

    let mine = fixture
        .service
        .list_my_organizations(&alice.ctx)
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert!(mine[0].is_owner);
    assert_eq!(mine[0].role, "owner");
}

#[tokio::test]
async fn test_same_name_gets_distinct_slugs() {
    let fixture = TestFixture::new();
    let alice = fixture.user("alice");

    let first = fixture.org(&alice, "Acme").await;
    let second = fixture.org(&alice, "Acme").await;

    assert_eq!(first.slug, "acme");
    assert_eq!(second.slug, "acme-2");
}

#[tokio::test]
async fn test_unauthenticated_and_outsiders_are_rejected() {
    let fixture = TestFixture::new();
    let alice = fixture.user("alice");
    let mallory = fixture.user("mallory");
    let org = fixture.org(&alice, "Acme").await;

    let err = fixture
        .service
        .get_organization(&tenancy_org::RequestContext::new(), org.id)
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::NotAuthenticated));

    // A missing organization looks exactly like one the caller is not in.
    let err = fixture
        .service
        .get_organization(&mallory.ctx, org.id)
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::Unauthorized));
    let err = fixture
        .service
        .get_organization(&mallory.ctx, uuid::Uuid::now_v7())
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::Unauthorized));
}

#[tokio::test]
async fn test_organization_limit_per_user() {
    let config = TenancyConfig::default().with_limits(Limits {
        max_organizations_per_user: Some(1),
        ..Limits::default()
    });
    let fixture = TestFixture::with_config(config);
    let alice = fixture.user("alice");
    fixture.org(&alice, "Acme").await;

    let err = fixture
        .service
        .create_organization(&alice.ctx, tenancy_org::NewOrganization::named("Globex"))
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::LimitExceeded { limit: 1, .. }));
}

#[tokio::test]
async fn test_suspended_organization_only_accepts_reactivation() {
    let fixture = TestFixture::new();
    let alice = fixture.user("alice");
    let org = fixture.org(&alice, "Acme").await;

    fixture
        .service
        .update_organization(
            &alice.ctx,
            org.id,
            OrganizationPatch::status(OrganizationStatus::Suspended),
        )
        .await
        .unwrap();

    let err = fixture
        .service
        .create_team(&alice.ctx, org.id, NewTeam::named("Eng"))
        .await
        .unwrap_err();
    match err {
        OrgError::InvalidState(msg) => assert_eq!(msg, "organization is suspended"),
        other => panic!("unexpected error: {other:?}"),
    }

    // Reads still work while suspended.
    fixture
        .service
        .get_organization(&alice.ctx, org.id)
        .await
        .unwrap();

    let org = fixture
        .service
        .update_organization(
            &alice.ctx,
            org.id,
            OrganizationPatch::status(OrganizationStatus::Active),
        )
        .await
        .unwrap();
    assert!(org.is_active());
    fixture
        .service
        .create_team(&alice.ctx, org.id, NewTeam::named("Eng"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_organization_cleans_up_authorization() {
    let fixture = TestFixture::new();
    let alice = fixture.user("alice");
    let bob = fixture.user("bob");
    let org = fixture.org(&alice, "Acme").await;
    fixture.join(&alice, &org, &bob, "admin").await;
    let team = fixture
        .service
        .create_team(&alice.ctx, org.id, NewTeam::named("Eng"))
        .await
        .unwrap();
    fixture
        .service
        .add_team_member(&alice.ctx, org.id, team.id, bob.id, Some("lead".into()))
        .await
        .unwrap();

    fixture
        .service
        .grant_permission(
            &alice.ctx,
            org.id,
            bob.id,
            Permission::parse("audit:read").unwrap(),
            Scope::team(team.id, org.id),
            OverrideOptions::default(),
        )
        .await
        .unwrap();

    let summary = fixture
        .service
        .delete_organization(&alice.ctx, org.id)
        .await
        .unwrap();

    assert_eq!(summary.members_removed, 2);
    assert!(fixture.engine.overrides_for(bob.id).await.is_empty());
    assert_eq!(summary.teams_removed, 1);
    assert_eq!(summary.team_memberships_removed, 1);
    for user in [alice.id, bob.id] {
        let roles = fixture
            .engine
            .get_user_roles(user, Scope::organization(org.id))
            .await
            .unwrap();
        assert!(roles.is_empty());
    }
    let team_roles = fixture
        .engine
        .get_user_roles(bob.id, Scope::team(team.id, org.id))
        .await
        .unwrap();
    assert!(team_roles.is_empty());

    let err = fixture
        .service
        .get_organization(&alice.ctx, org.id)
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::Unauthorized));
    assert_eq!(
        fixture.hooks.event_types().last(),
        Some(&"organization.deleted")
    );
}

// =============================================================================
// Members
// =============================================================================

#[tokio::test]
async fn test_plain_member_cannot_add_members() {
    let fixture = TestFixture::new();
    let alice = fixture.user("alice");
    let bob = fixture.user("bob");
    let carol = fixture.user("carol");
    let org = fixture.org(&alice, "Acme").await;
    fixture.join(&alice, &org, &bob, "member").await;

    let err = fixture
        .service
        .add_member(&bob.ctx, org.id, carol.id, "member")
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::Forbidden(_)));
}

#[tokio::test]
async fn test_bulk_add_reports_duplicates_per_item() {
    let fixture = TestFixture::new();
    let alice = fixture.user("alice");
    let bob = fixture.user("bob");
    let carol = fixture.user("carol");
    let org = fixture.org(&alice, "Acme").await;

    let result = fixture
        .service
        .bulk_add_members(
            &alice.ctx,
            org.id,
            vec![
                NewMember::new(bob.id, "member"),
                NewMember::new(alice.id, "member"),
                NewMember::new(carol.id, "admin"),
                NewMember::new(bob.id, "admin"),
            ],
        )
        .await
        .unwrap();

    assert_eq!(result.success, vec![bob.id, carol.id]);
    assert_eq!(result.errors.len(), 2);
    assert!(result
        .errors
        .iter()
        .all(|e| e.code == BulkErrorCode::AlreadyExists));
    assert_eq!(result.errors[0].id, alice.id.to_string());

    let count = fixture
        .service
        .count_members(&alice.ctx, org.id, MemberStatusFilter::All)
        .await
        .unwrap();
    assert_eq!(count, 3);
}

#[tokio::test]
async fn test_member_limit_counts_suspended_members() {
    let config = TenancyConfig::default().with_limits(Limits {
        max_members_per_organization: Some(2),
        ..Limits::default()
    });
    let fixture = TestFixture::with_config(config);
    let alice = fixture.user("alice");
    let bob = fixture.user("bob");
    let carol = fixture.user("carol");
    let org = fixture.org(&alice, "Acme").await;
    fixture.join(&alice, &org, &bob, "member").await;
    fixture
        .service
        .suspend_member(&alice.ctx, org.id, bob.id)
        .await
        .unwrap();

    let err = fixture
        .service
        .add_member(&alice.ctx, org.id, carol.id, "member")
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::LimitExceeded { limit: 2, .. }));
}

#[tokio::test]
async fn test_suspended_member_keeps_roles_but_cannot_write() {
    let fixture = TestFixture::new();
    let alice = fixture.user("alice");
    let bob = fixture.user("bob");
    let org = fixture.org(&alice, "Acme").await;
    fixture.join(&alice, &org, &bob, "admin").await;

    fixture
        .service
        .suspend_member(&alice.ctx, org.id, bob.id)
        .await
        .unwrap();

    let err = fixture
        .service
        .create_team(&bob.ctx, org.id, NewTeam::named("Eng"))
        .await
        .unwrap_err();
    match err {
        OrgError::InvalidState(msg) => assert_eq!(msg, "membership is suspended"),
        other => panic!("unexpected error: {other:?}"),
    }
    let roles = fixture
        .engine
        .get_user_roles(bob.id, Scope::organization(org.id))
        .await
        .unwrap();
    assert_eq!(roles, vec!["admin".to_string()]);

    let active = fixture
        .service
        .count_members(&alice.ctx, org.id, MemberStatusFilter::Active)
        .await
        .unwrap();
    let all = fixture
        .service
        .count_members(&alice.ctx, org.id, MemberStatusFilter::All)
        .await
        .unwrap();
    assert_eq!((active, all), (1, 2));

    fixture
        .service
        .unsuspend_member(&alice.ctx, org.id, bob.id)
        .await
        .unwrap();
    fixture
        .service
        .create_team(&bob.ctx, org.id, NewTeam::named("Eng"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_owner_cannot_be_suspended_removed_or_demoted() {
    let fixture = TestFixture::new();
    let alice = fixture.user("alice");
    let bob = fixture.user("bob");
    let org = fixture.org(&alice, "Acme").await;
    fixture.join(&alice, &org, &bob, "owner").await;

    let err = fixture
        .service
        .suspend_member(&alice.ctx, org.id, alice.id)
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::InvalidState(_)));
    let err = fixture
        .service
        .suspend_member(&bob.ctx, org.id, alice.id)
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::InvalidState(_)));
    let err = fixture
        .service
        .remove_member(&bob.ctx, org.id, alice.id)
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::InvalidState(_)));
    let err = fixture
        .service
        .update_member_role(&bob.ctx, org.id, alice.id, "member")
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::InvalidState(_)));
}

#[tokio::test]
async fn test_role_change_moves_authorization_role() {
    let fixture = TestFixture::new();
    let alice = fixture.user("alice");
    let bob = fixture.user("bob");
    let org = fixture.org(&alice, "Acme").await;
    fixture.join(&alice, &org, &bob, "member").await;

    let member = fixture
        .service
        .update_member_role(&alice.ctx, org.id, bob.id, "admin")
        .await
        .unwrap();

    assert_eq!(member.role, "admin");
    let roles = fixture
        .engine
        .get_user_roles(bob.id, Scope::organization(org.id))
        .await
        .unwrap();
    assert_eq!(roles, vec!["admin".to_string()]);
    assert_eq!(
        fixture.hooks.event_types().last(),
        Some(&"member.role_changed")
    );
}

#[tokio::test]
async fn test_remove_member_drops_team_memberships() {
    let fixture = TestFixture::new();
    let alice = fixture.user("alice");
    let bob = fixture.user("bob");
    let org = fixture.org(&alice, "Acme").await;
    fixture.join(&alice, &org, &bob, "member").await;
    let team = fixture
        .service
        .create_team(&alice.ctx, org.id, NewTeam::named("Eng"))
        .await
        .unwrap();
    fixture
        .service
        .add_team_member(&alice.ctx, org.id, team.id, bob.id, None)
        .await
        .unwrap();

    fixture
        .service
        .remove_member(&alice.ctx, org.id, bob.id)
        .await
        .unwrap();

    let members = fixture
        .service
        .list_team_members(&alice.ctx, org.id, team.id)
        .await
        .unwrap();
    assert!(members.is_empty());
    assert!(
        !fixture
            .engine
            .has_relation(bob.id, "member", Scope::team(team.id, org.id))
            .await
    );
    let err = fixture
        .service
        .get_organization(&bob.ctx, org.id)
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::Unauthorized));
}

// =============================================================================
// Leaving and ownership
// =============================================================================

#[tokio::test]
async fn test_removed_member_loses_direct_overrides() {
    let fixture = TestFixture::new();
    let alice = fixture.user("alice");
    let bob = fixture.user("bob");
    let org = fixture.org(&alice, "Acme").await;
    fixture.join(&alice, &org, &bob, "member").await;
    let delete_org = Permission::parse("organizations:delete").unwrap();
    let scope = Scope::organization(org.id);

    fixture
        .service
        .grant_permission(
            &alice.ctx,
            org.id,
            bob.id,
            delete_org.clone(),
            scope,
            OverrideOptions::default(),
        )
        .await
        .unwrap();
    assert!(fixture
        .service
        .check_permission(&bob.ctx, &delete_org, scope)
        .await
        .unwrap());

    fixture
        .service
        .remove_member(&alice.ctx, org.id, bob.id)
        .await
        .unwrap();
    assert!(fixture.engine.overrides_for(bob.id).await.is_empty());

    fixture.join(&alice, &org, &bob, "member").await;
    assert!(!fixture
        .service
        .check_permission(&bob.ctx, &delete_org, scope)
        .await
        .unwrap());
    let err = fixture
        .service
        .delete_organization(&bob.ctx, org.id)
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::Forbidden(_)));
}

#[tokio::test]
async fn test_last_owner_cannot_leave() {
    let fixture = TestFixture::new();
    let alice = fixture.user("alice");
    let bob = fixture.user("bob");
    let org = fixture.org(&alice, "Acme").await;
    fixture.join(&alice, &org, &bob, "admin").await;

    let err = fixture
        .service
        .leave_organization(&alice.ctx, org.id)
        .await
        .unwrap_err();
    match err {
        OrgError::InvalidState(msg) => assert_eq!(msg, "cannot leave as the last owner"),
        other => panic!("unexpected error: {other:?}"),
    }

    // A plain member can always leave.
    fixture
        .service
        .leave_organization(&bob.ctx, org.id)
        .await
        .unwrap();
    assert_eq!(fixture.hooks.event_types().last(), Some(&"member.left"));
}

#[tokio::test]
async fn test_owner_leaving_hands_ownership_to_co_owner() {
    let fixture = TestFixture::new();
    let alice = fixture.user("alice");
    let bob = fixture.user("bob");
    let org = fixture.org(&alice, "Acme").await;
    fixture.join(&alice, &org, &bob, "owner").await;

    fixture
        .service
        .leave_organization(&alice.ctx, org.id)
        .await
        .unwrap();

    let org = fixture
        .service
        .get_organization(&bob.ctx, org.id)
        .await
        .unwrap();
    assert_eq!(org.owner_id, bob.id);
    let roles = fixture
        .engine
        .get_user_roles(alice.id, Scope::organization(org.id))
        .await
        .unwrap();
    assert!(roles.is_empty());
}

#[tokio::test]
async fn test_transfer_ownership() {
    let fixture = TestFixture::new();
    let alice = fixture.user("alice");
    let bob = fixture.user("bob");
    let carol = fixture.user("carol");
    let org = fixture.org(&alice, "Acme").await;
    fixture.join(&alice, &org, &bob, "member").await;

    let err = fixture
        .service
        .transfer_ownership(&alice.ctx, org.id, alice.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::InvalidState(_)));
    let err = fixture
        .service
        .transfer_ownership(&alice.ctx, org.id, carol.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::InvalidState(_)));

    let org = fixture
        .service
        .transfer_ownership(&alice.ctx, org.id, bob.id, None)
        .await
        .unwrap();
    assert_eq!(org.owner_id, bob.id);

    let scope = Scope::organization(org.id);
    assert_eq!(
        fixture.engine.get_user_roles(bob.id, scope).await.unwrap(),
        vec!["owner".to_string()]
    );
    assert_eq!(
        fixture.engine.get_user_roles(alice.id, scope).await.unwrap(),
        vec!["admin".to_string()]
    );
    assert_eq!(
        fixture.hooks.event_types().last(),
        Some(&"organization.ownership_transferred")
    );

    // Alice is no longer the owner.
    let err = fixture
        .service
        .transfer_ownership(&alice.ctx, org.id, bob.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::Forbidden(_)));
}

// =============================================================================
// Joining without an invitation
// =============================================================================

#[tokio::test]
async fn test_join_by_allowed_domain() {
    let fixture = TestFixture::new();
    let alice = fixture.user("alice");
    let bob = fixture.user("bob");
    let org = fixture.org(&alice, "Acme").await;

    let err = fixture
        .service
        .join_organization(&bob.ctx, org.id)
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::Forbidden(_)));

    fixture
        .service
        .update_organization(
            &alice.ctx,
            org.id,
            OrganizationPatch {
                allowed_domains: Some(vec!["ACME.test".into()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let member = fixture
        .service
        .join_organization(&bob.ctx, org.id)
        .await
        .unwrap();
    assert_eq!(member.role, "member");
    assert!(member.invited_by.is_none());
}
