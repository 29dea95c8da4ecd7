//! Course catalog and enrollment tests against the in-memory store
//!
//! Run with: cargo test --test courses_tests

use std::sync::Arc;

use waiedu::auth::models::NewUser;
use waiedu::auth::{AuthFailure, PasswordHash, User, UserRole};
use waiedu::courses::{parse_filter, Catalog, CourseFilter, CreateCourseRequest, UpdateCourseRequest};
use waiedu::error::Error;
use waiedu::store::{DataStore, MemoryStore};

struct Fixture {
    catalog: Catalog,
    store: Arc<MemoryStore>,
    teacher: User,
    other_teacher: User,
    student: User,
    admin: User,
}

async fn add_user(store: &MemoryStore, name: &str, role: UserRole) -> User {
    store
        .insert_user(NewUser::new(
            name.to_string(),
            format!("{}@example.com", name.to_lowercase()),
            PasswordHash::from_stored("$2b$04$unused"),
            role,
        ))
        .await
        .unwrap()
}

async fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    store.add_subject("math", "Mathematics").await;
    store.add_subject("physics", "Physics").await;

    Fixture {
        catalog: Catalog::new(store.clone()),
        teacher: add_user(&store, "Lan", UserRole::Teacher).await,
        other_teacher: add_user(&store, "Minh", UserRole::Teacher).await,
        student: add_user(&store, "Hoa", UserRole::Student).await,
        admin: add_user(&store, "Root", UserRole::Admin).await,
        store,
    }
}

fn course(title: &str, price: i64, subject: Option<&str>, published: bool) -> CreateCourseRequest {
    CreateCourseRequest {
        title: Some(title.to_string()),
        price: Some(price),
        subject_id: subject.map(str::to_string),
        is_published: Some(published),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_create_defaults_and_validation() {
    let f = fixture().await;

    let created = f
        .catalog
        .create(&f.teacher, course("Algebra", 100_000, Some("math"), false))
        .await
        .unwrap();
    assert_eq!(created.teacher_user_id, Some(f.teacher.id));
    assert_eq!(created.currency_code, "VND");
    assert!(!created.is_published);

    let err = f
        .catalog
        .create(&f.teacher, course("Cheap", -1, None, true))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Price cannot be negative");

    let err = f
        .catalog
        .create(&f.teacher, course("Lost", 0, Some("history"), true))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Subject with ID history not found");

    let mut usd = course("Dollars", 10, None, true);
    usd.currency_code = Some("USD".to_string());
    assert!(matches!(
        f.catalog.create(&f.teacher, usd).await,
        Err(Error::Validation(_))
    ));

    let untitled = CreateCourseRequest::default();
    assert!(matches!(
        f.catalog.create(&f.teacher, untitled).await,
        Err(Error::Validation(_))
    ));
}

#[tokio::test]
async fn test_listing_shows_published_with_names() {
    let f = fixture().await;
    f.catalog
        .create(&f.teacher, course("Algebra", 100, Some("math"), true))
        .await
        .unwrap();
    f.catalog
        .create(&f.teacher, course("Draft", 100, Some("math"), false))
        .await
        .unwrap();
    f.catalog
        .create(&f.other_teacher, course("Optics", 200, Some("physics"), true))
        .await
        .unwrap();

    let all = f.catalog.list_published(&CourseFilter::published()).await.unwrap();
    let titles: Vec<_> = all.courses.iter().map(|v| v.course.title.as_str()).collect();
    assert_eq!(titles, vec!["Algebra", "Optics"]);
    assert_eq!(all.courses[0].teacher_name.as_deref(), Some("Lan"));
    assert_eq!(all.courses[0].subject_name.as_deref(), Some("Mathematics"));
    assert!(all.subject.is_none());

    let math = f
        .catalog
        .list_published(&parse_filter(Some("math"), None).unwrap())
        .await
        .unwrap();
    assert_eq!(math.courses.len(), 1);
    assert_eq!(math.subject.map(|s| s.name), Some("Mathematics".to_string()));

    let by_teacher = f
        .catalog
        .list_published(&parse_filter(None, Some(&f.other_teacher.id.to_string())).unwrap())
        .await
        .unwrap();
    assert_eq!(by_teacher.courses.len(), 1);
    assert_eq!(by_teacher.teacher.map(|t| t.name), Some("Minh".to_string()));

    // A non-teacher id filters to nothing and is not echoed back
    let by_student = f
        .catalog
        .list_published(&parse_filter(None, Some(&f.student.id.to_string())).unwrap())
        .await
        .unwrap();
    assert!(by_student.courses.is_empty());
    assert!(by_student.teacher.is_none());
}

#[tokio::test]
async fn test_unpublished_course_visible_to_owner_only() {
    let f = fixture().await;
    let draft = f
        .catalog
        .create(&f.teacher, course("Draft", 100, None, false))
        .await
        .unwrap();

    assert!(f.catalog.get_visible(&f.teacher, draft.id).await.is_ok());
    let err = f.catalog.get_visible(&f.student, draft.id).await.unwrap_err();
    assert_eq!(err.to_string(), "Course not found");
}

#[tokio::test]
async fn test_only_owner_updates_and_deletes() {
    let f = fixture().await;
    let created = f
        .catalog
        .create(&f.teacher, course("Algebra", 100, Some("math"), false))
        .await
        .unwrap();

    let publish = || UpdateCourseRequest {
        is_published: Some(true),
        ..Default::default()
    };

    let err = f
        .catalog
        .update(&f.other_teacher, created.id, publish())
        .await
        .unwrap_err();
    assert_eq!(err.auth_failure(), Some(AuthFailure::NotOwner));

    // Ownership is independent of role
    let err = f.catalog.delete(&f.admin, created.id).await.unwrap_err();
    assert_eq!(err.auth_failure(), Some(AuthFailure::NotOwner));

    let updated: UpdateCourseRequest =
        serde_json::from_str(r#"{"subject_id": null, "price": 250}"#).unwrap();
    let updated = f.catalog.update(&f.teacher, created.id, updated).await.unwrap();
    assert_eq!(updated.price, 250);
    assert_eq!(updated.subject_id, None);
    assert_eq!(updated.title, "Algebra");

    let err = f
        .catalog
        .update(
            &f.teacher,
            created.id,
            UpdateCourseRequest {
                title: Some("  ".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    f.catalog.delete(&f.teacher, created.id).await.unwrap();
    assert!(matches!(
        f.catalog.load(created.id).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_enrollment_captures_price_and_is_unique() {
    let f = fixture().await;
    let algebra = f
        .catalog
        .create(&f.teacher, course("Algebra", 150_000, None, true))
        .await
        .unwrap();

    let enrolled = f.catalog.enroll(&f.student, algebra.id).await.unwrap();
    assert_eq!(enrolled.price_at_enrollment, 150_000);
    assert_eq!(enrolled.currency_at_enrollment, "VND");
    assert_eq!(enrolled.progress, 0);

    let err = f.catalog.enroll(&f.student, algebra.id).await.unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    // A later price change does not touch existing enrollments
    f.catalog
        .update(
            &f.teacher,
            algebra.id,
            UpdateCourseRequest {
                price: Some(999),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let mine = f.catalog.student_enrollments(&f.student).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].price_at_enrollment, 150_000);
    assert_eq!(mine[0].course_title.as_deref(), Some("Algebra"));
}

#[tokio::test]
async fn test_cannot_enroll_in_unpublished_or_missing_course() {
    let f = fixture().await;
    let draft = f
        .catalog
        .create(&f.teacher, course("Draft", 10, None, false))
        .await
        .unwrap();

    assert!(matches!(
        f.catalog.enroll(&f.student, draft.id).await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        f.catalog.enroll(&f.student, 9999).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_analytics_sums_revenue_for_owner_and_admin() {
    let f = fixture().await;
    let algebra = f
        .catalog
        .create(&f.teacher, course("Algebra", 100, None, true))
        .await
        .unwrap();
    let second_student = add_user(&f.store, "Tuan", UserRole::Student).await;

    f.catalog.enroll(&f.student, algebra.id).await.unwrap();
    f.catalog
        .update(
            &f.teacher,
            algebra.id,
            UpdateCourseRequest {
                price: Some(300),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    f.catalog.enroll(&second_student, algebra.id).await.unwrap();

    let stats = f.catalog.analytics(&f.teacher, algebra.id).await.unwrap();
    assert_eq!(stats.enrollment_count, 2);
    assert_eq!(stats.total_revenue, 400);

    assert!(f.catalog.analytics(&f.admin, algebra.id).await.is_ok());

    let err = f
        .catalog
        .analytics(&f.other_teacher, algebra.id)
        .await
        .unwrap_err();
    assert_eq!(err.auth_failure(), Some(AuthFailure::NotOwner));
}

#[tokio::test]
async fn test_my_courses_counts_enrollments() {
    let f = fixture().await;
    let published = f
        .catalog
        .create(&f.teacher, course("Algebra", 100, None, true))
        .await
        .unwrap();
    f.catalog
        .create(&f.teacher, course("Draft", 100, None, false))
        .await
        .unwrap();
    f.catalog
        .create(&f.other_teacher, course("Optics", 100, None, true))
        .await
        .unwrap();
    f.catalog.enroll(&f.student, published.id).await.unwrap();

    let mine = f.catalog.my_courses(&f.teacher).await.unwrap();
    assert_eq!(mine.len(), 2);
    let algebra = mine.iter().find(|v| v.course.id == published.id).unwrap();
    assert_eq!(algebra.enrollment_count, Some(1));
}

#[tokio::test]
async fn test_deleting_course_removes_enrollments() {
    let f = fixture().await;
    let algebra = f
        .catalog
        .create(&f.teacher, course("Algebra", 100, None, true))
        .await
        .unwrap();
    f.catalog.enroll(&f.student, algebra.id).await.unwrap();

    f.catalog.delete(&f.teacher, algebra.id).await.unwrap();

    assert!(f
        .store
        .list_enrollments_for_course(algebra.id)
        .await
        .unwrap()
        .is_empty());
    assert!(f.catalog.student_enrollments(&f.student).await.unwrap().is_empty());
}
