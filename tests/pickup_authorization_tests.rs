mod common;

use common::{date, fixture, weekday_grant};
use pickup::error::AppError;
use pickup::services::authorization_store::AuthorizationStore;
use pickup::services::authorization_window::AuthorizationStatus;
use pickup::services::pickup_authorizations::UpdateAuthorizationInput;
use uuid::Uuid;

// ─── create ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_stores_grant_owned_by_caller() {
    let f = fixture().await;

    let auth = f
        .service
        .create(f.grantor.id, weekday_grant(&f.grantee, &f.student))
        .await
        .unwrap();

    assert_eq!(auth.authorizing_parent_id, f.grantor.id);
    assert_eq!(auth.authorized_parent_id, f.grantee.id);
    assert_eq!(auth.student_id, f.student.id);
    assert_eq!(auth.student_ids, vec![f.student.id]);
    assert_eq!(auth.allowed_days_of_week, Some(vec![1, 2, 3, 4, 5]));
    assert!(auth.is_active);
}

#[tokio::test]
async fn absent_days_default_to_every_day_but_empty_is_kept() {
    let f = fixture().await;

    let mut input = weekday_grant(&f.grantee, &f.student);
    input.allowed_days_of_week = None;
    let every_day = f.service.create(f.grantor.id, input).await.unwrap();
    assert_eq!(
        every_day.allowed_days_of_week,
        Some(vec![0, 1, 2, 3, 4, 5, 6])
    );

    let mut input = weekday_grant(&f.grantee, &f.student);
    input.allowed_days_of_week = Some(vec![]);
    let no_day = f.service.create(f.grantor.id, input).await.unwrap();
    assert_eq!(no_day.allowed_days_of_week, Some(vec![]));

    let all = f
        .service
        .list_all_for_grantor(f.grantor.id, date("2024-01-15"))
        .await
        .unwrap();
    let status_of = |id: Uuid| all.iter().find(|d| d.authorization.id == id).unwrap().status;
    assert_eq!(status_of(every_day.id), AuthorizationStatus::ActiveToday);
    assert_eq!(status_of(no_day.id), AuthorizationStatus::ActiveNotToday);
}

#[tokio::test]
async fn legacy_student_id_is_merged_into_set() {
    let f = fixture().await;

    let mut input = weekday_grant(&f.grantee, &f.sibling);
    input.student_id = Some(f.student.id.to_string());
    input.student_ids.push(f.student.id.to_string());

    let auth = f.service.create(f.grantor.id, input).await.unwrap();

    assert_eq!(auth.student_id, f.student.id);
    assert_eq!(auth.student_ids, vec![f.student.id, f.sibling.id]);
}

#[tokio::test]
async fn create_rejects_invalid_input_without_writing() {
    let f = fixture().await;

    let mut reversed = weekday_grant(&f.grantee, &f.student);
    reversed.start_date = "2024-02-01".to_string();

    let mut no_students = weekday_grant(&f.grantee, &f.student);
    no_students.student_ids.clear();

    let mut bad_grantee = weekday_grant(&f.grantee, &f.student);
    bad_grantee.authorized_parent_id = "bob".to_string();

    let mut bad_date = weekday_grant(&f.grantee, &f.student);
    bad_date.end_date = "2024-01-32".to_string();

    let mut bad_day = weekday_grant(&f.grantee, &f.student);
    bad_day.allowed_days_of_week = Some(vec![1, 7]);

    let self_grant = weekday_grant(&f.grantor, &f.student);

    for input in [
        reversed,
        no_students,
        bad_grantee,
        bad_date,
        bad_day,
        self_grant,
    ] {
        let err = f.service.create(f.grantor.id, input).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "{err:?}");
    }

    assert_eq!(f.store.authorization_count().await, 0);
}

#[tokio::test]
async fn create_requires_known_parents_and_students() {
    let f = fixture().await;

    let mut unknown_student = weekday_grant(&f.grantee, &f.student);
    unknown_student.student_ids.push(Uuid::new_v4().to_string());

    let mut unknown_grantee = weekday_grant(&f.grantee, &f.student);
    unknown_grantee.authorized_parent_id = Uuid::new_v4().to_string();

    for input in [unknown_student, unknown_grantee] {
        let err = f.service.create(f.grantor.id, input).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)), "{err:?}");
    }

    f.store.soft_delete_parent(f.grantee.id).await;
    let err = f
        .service
        .create(f.grantor.id, weekday_grant(&f.grantee, &f.student))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    assert_eq!(f.store.authorization_count().await, 0);
}

// ─── status & listing ───────────────────────────────────────────────────────

#[tokio::test]
async fn statuses_follow_date_and_weekday() {
    let f = fixture().await;
    f.service
        .create(f.grantor.id, weekday_grant(&f.grantee, &f.student))
        .await
        .unwrap();

    let cases = [
        ("2023-12-29", AuthorizationStatus::Scheduled),
        ("2024-01-15", AuthorizationStatus::ActiveToday),
        ("2024-01-14", AuthorizationStatus::ActiveNotToday),
        ("2024-02-01", AuthorizationStatus::Expired),
    ];

    for (day, expected) in cases {
        let all = f
            .service
            .list_all_for_grantor(f.grantor.id, date(day))
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, expected, "{day}");
    }
}

#[tokio::test]
async fn grantor_list_is_prefiltered_by_today() {
    let f = fixture().await;

    let current = f
        .service
        .create(f.grantor.id, weekday_grant(&f.grantee, &f.student))
        .await
        .unwrap();

    let mut inactive = weekday_grant(&f.grantee, &f.student);
    inactive.is_active = Some(false);
    f.service.create(f.grantor.id, inactive).await.unwrap();

    let mut expired = weekday_grant(&f.grantee, &f.student);
    expired.start_date = "2023-12-01".to_string();
    expired.end_date = "2023-12-31".to_string();
    f.service.create(f.grantor.id, expired).await.unwrap();

    let mut weekends = weekday_grant(&f.grantee, &f.student);
    weekends.allowed_days_of_week = Some(vec![0, 6]);
    f.service.create(f.grantor.id, weekends).await.unwrap();

    // Future start, but Monday is allowed: still listed.
    let mut scheduled = weekday_grant(&f.grantee, &f.student);
    scheduled.start_date = "2024-03-01".to_string();
    scheduled.end_date = "2024-03-31".to_string();
    let scheduled = f.service.create(f.grantor.id, scheduled).await.unwrap();

    let monday = date("2024-01-15");
    let listed = f.service.list_for_grantor(f.grantor.id, monday).await.unwrap();
    let ids: Vec<Uuid> = listed.iter().map(|d| d.authorization.id).collect();
    assert_eq!(ids, vec![current.id, scheduled.id]);
    assert_eq!(listed[1].status, AuthorizationStatus::Scheduled);

    let all = f
        .service
        .list_all_for_grantor(f.grantor.id, monday)
        .await
        .unwrap();
    assert_eq!(all.len(), 5);
}

#[tokio::test]
async fn grantee_list_is_unfiltered_and_scoped() {
    let f = fixture().await;

    let mut expired = weekday_grant(&f.grantee, &f.student);
    expired.end_date = "2024-01-02".to_string();
    f.service.create(f.grantor.id, expired).await.unwrap();

    let mut inactive = weekday_grant(&f.grantee, &f.student);
    inactive.is_active = Some(false);
    f.service.create(f.grantor.id, inactive).await.unwrap();

    f.service
        .create(f.grantor.id, weekday_grant(&f.outsider, &f.student))
        .await
        .unwrap();

    let received = f
        .service
        .list_for_grantee(f.grantee.id, date("2024-01-14"))
        .await
        .unwrap();

    assert_eq!(received.len(), 2);
    assert!(received
        .iter()
        .all(|d| d.authorization.authorized_parent_id == f.grantee.id));
    let mut statuses: Vec<_> = received.iter().map(|d| d.status).collect();
    statuses.sort_by_key(|s| format!("{s:?}"));
    assert_eq!(
        statuses,
        vec![AuthorizationStatus::Expired, AuthorizationStatus::Inactive]
    );
}

#[tokio::test]
async fn details_carry_display_fields() {
    let f = fixture().await;
    let mut input = weekday_grant(&f.grantee, &f.student);
    input.student_ids.push(f.sibling.id.to_string());
    let auth = f.service.create(f.grantor.id, input).await.unwrap();

    let details = f
        .service
        .get(f.grantee.id, &auth.id.to_string(), date("2024-01-15"))
        .await
        .unwrap();

    assert_eq!(details.authorizing_parent.unwrap().name, "Alice");
    assert_eq!(details.authorized_parent.unwrap().name, "Bob");
    let names: Vec<_> = details.students.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Charlie", "Dana"]);

    let json = serde_json::to_value(
        f.service
            .get(f.grantor.id, &auth.id.to_string(), date("2024-01-15"))
            .await
            .unwrap(),
    )
    .unwrap();
    assert_eq!(json["status"], "active_today");
    assert_eq!(json["start_date"], "2024-01-01");
}

#[tokio::test]
async fn outsiders_cannot_read_a_grant() {
    let f = fixture().await;
    let auth = f
        .service
        .create(f.grantor.id, weekday_grant(&f.grantee, &f.student))
        .await
        .unwrap();

    let err = f
        .service
        .get(f.outsider.id, &auth.id.to_string(), date("2024-01-15"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Permission(_)));
}

// ─── update ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn owner_can_patch_fields() {
    let f = fixture().await;
    let auth = f
        .service
        .create(f.grantor.id, weekday_grant(&f.grantee, &f.student))
        .await
        .unwrap();

    let updated = f
        .service
        .update(
            f.grantor.id,
            &auth.id.to_string(),
            UpdateAuthorizationInput {
                end_date: Some("2024-06-30".to_string()),
                allowed_days_of_week: Some(vec![3, 1]),
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.start_date, date("2024-01-01"));
    assert_eq!(updated.end_date, date("2024-06-30"));
    assert_eq!(updated.allowed_days_of_week, Some(vec![1, 3]));
    assert!(!updated.is_active);
    assert_eq!(updated.authorized_parent_id, f.grantee.id);
}

#[tokio::test]
async fn non_owner_update_is_denied_and_leaves_row_untouched() {
    let f = fixture().await;
    let auth = f
        .service
        .create(f.grantor.id, weekday_grant(&f.grantee, &f.student))
        .await
        .unwrap();

    for caller in [f.grantee.id, f.outsider.id, Uuid::new_v4()] {
        let err = f
            .service
            .update(
                caller,
                &auth.id.to_string(),
                UpdateAuthorizationInput {
                    is_active: Some(false),
                    end_date: Some("2030-01-01".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Permission(_)), "{err:?}");
    }

    let stored = f.store.find_by_id(auth.id).await.unwrap().unwrap();
    assert!(stored.is_active);
    assert_eq!(stored.end_date, date("2024-01-31"));
}

#[tokio::test]
async fn update_revalidates_merged_date_order() {
    let f = fixture().await;
    let auth = f
        .service
        .create(f.grantor.id, weekday_grant(&f.grantee, &f.student))
        .await
        .unwrap();

    let err = f
        .service
        .update(
            f.grantor.id,
            &auth.id.to_string(),
            UpdateAuthorizationInput {
                start_date: Some("2024-02-15".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let stored = f.store.find_by_id(auth.id).await.unwrap().unwrap();
    assert_eq!(stored.start_date, date("2024-01-01"));
}

#[tokio::test]
async fn update_rejects_self_grant_and_unknown_ids() {
    let f = fixture().await;
    let auth = f
        .service
        .create(f.grantor.id, weekday_grant(&f.grantee, &f.student))
        .await
        .unwrap();
    let id = auth.id.to_string();

    let err = f
        .service
        .update(
            f.grantor.id,
            &id,
            UpdateAuthorizationInput {
                authorized_parent_id: Some(f.grantor.id.to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = f
        .service
        .update(
            f.grantor.id,
            &id,
            UpdateAuthorizationInput {
                student_ids: Some(vec![Uuid::new_v4().to_string()]),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = f
        .service
        .update(
            f.grantor.id,
            &Uuid::new_v4().to_string(),
            UpdateAuthorizationInput::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = f
        .service
        .update(f.grantor.id, "42", UpdateAuthorizationInput::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn non_owner_update_is_denied_before_patch_validation() {
    let f = fixture().await;
    let auth = f
        .service
        .create(f.grantor.id, weekday_grant(&f.grantee, &f.student))
        .await
        .unwrap();

    let err = f
        .service
        .update(
            f.outsider.id,
            &auth.id.to_string(),
            UpdateAuthorizationInput {
                allowed_days_of_week: Some(vec![9]),
                start_date: Some("2024-1-5".to_string()),
                student_ids: Some(vec!["charlie".to_string()]),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Permission(_)), "{err:?}");
}

#[tokio::test]
async fn legacy_student_id_is_accepted_on_update() {
    let f = fixture().await;
    let auth = f
        .service
        .create(f.grantor.id, weekday_grant(&f.grantee, &f.student))
        .await
        .unwrap();

    let updated = f
        .service
        .update(
            f.grantor.id,
            &auth.id.to_string(),
            UpdateAuthorizationInput {
                student_id: Some(f.sibling.id.to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.student_id, f.sibling.id);
    assert_eq!(updated.student_ids, vec![f.sibling.id]);

    let updated = f
        .service
        .update(
            f.grantor.id,
            &auth.id.to_string(),
            UpdateAuthorizationInput {
                student_id: Some(f.student.id.to_string()),
                student_ids: Some(vec![f.sibling.id.to_string(), f.student.id.to_string()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.student_ids, vec![f.student.id, f.sibling.id]);
}

// ─── delete ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_succeeds_once_then_reports_not_found() {
    let f = fixture().await;
    let auth = f
        .service
        .create(f.grantor.id, weekday_grant(&f.grantee, &f.student))
        .await
        .unwrap();
    let id = auth.id.to_string();

    f.service.delete(f.grantor.id, &id).await.unwrap();

    let err = f.service.delete(f.grantor.id, &id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(f.store.authorization_count().await, 0);
}

#[tokio::test]
async fn non_owner_delete_is_denied() {
    let f = fixture().await;
    let auth = f
        .service
        .create(f.grantor.id, weekday_grant(&f.grantee, &f.student))
        .await
        .unwrap();

    for caller in [f.grantee.id, f.outsider.id] {
        let err = f
            .service
            .delete(caller, &auth.id.to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Permission(_)));
    }

    assert_eq!(f.store.authorization_count().await, 1);
}

// ─── gating check ───────────────────────────────────────────────────────────

#[tokio::test]
async fn check_authorization_applies_window_and_scope() {
    let f = fixture().await;
    let mut input = weekday_grant(&f.grantee, &f.student);
    input.student_ids.push(f.sibling.id.to_string());
    let auth = f.service.create(f.grantor.id, input).await.unwrap();

    let student = f.student.id.to_string();
    let sibling = f.sibling.id.to_string();
    let grantee = f.grantee.id.to_string();
    let outsider = f.outsider.id.to_string();

    let check = |student: &str, parent: &str, day: &str| {
        let (student, parent, day) = (student.to_string(), parent.to_string(), date(day));
        let service = &f.service;
        async move {
            service
                .check_authorization(&student, &parent, day)
                .await
                .unwrap()
        }
    };

    assert!(check(&student, &grantee, "2024-01-15").await);
    assert!(check(&sibling, &grantee, "2024-01-15").await);
    assert!(!check(&student, &grantee, "2024-01-14").await);
    assert!(!check(&student, &grantee, "2024-02-01").await);
    assert!(!check(&student, &grantee, "2023-12-29").await);
    assert!(!check(&student, &outsider, "2024-01-15").await);
    assert!(!check(&Uuid::new_v4().to_string(), &grantee, "2024-01-15").await);

    f.service
        .update(
            f.grantor.id,
            &auth.id.to_string(),
            UpdateAuthorizationInput {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(!check(&student, &grantee, "2024-01-15").await);
}

#[tokio::test]
async fn check_authorization_rejects_malformed_ids() {
    let f = fixture().await;
    let err = f
        .service
        .check_authorization("charlie", &f.grantee.id.to_string(), date("2024-01-15"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}
