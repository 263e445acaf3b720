// Reviews close the project; contractors answer once

#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::*;
use rust_decimal_macros::dec;

use solartrust::core::{Caller, ErrorKind};
use solartrust::modules::projects::services::StatusChangeInput;
use solartrust::modules::projects::{ProjectStatus, TimelineEventType};
use solartrust::modules::reviews::models::ReviewInput;

#[tokio::test]
async fn test_review_requires_verified_installation() {
    let h = TestHarness::new();
    let project = h.awaiting_verification().await.project;

    let err = h
        .services
        .reviews
        .create_review(&user(), &project.id, five_star_review())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BusinessRule);

    let fresh = h.create_project(dec!(9000)).await.project;
    let err = h
        .services
        .reviews
        .create_review(&user(), &fresh.id, five_star_review())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BusinessRule);
}

#[tokio::test]
async fn test_review_completes_project() {
    let h = TestHarness::new();
    let project = h.verified_project().await.project;

    let review = h
        .services
        .reviews
        .create_review(&user(), &project.id, five_star_review())
        .await
        .unwrap();
    assert_eq!(review.rating, 5);
    assert_eq!(review.user_id, USER_ID);
    assert_eq!(review.contractor_id, CONTRACTOR_ID);

    let aggregate = h.services.projects.get_project(&user(), &project.id).await.unwrap();
    assert_eq!(aggregate.project.status, ProjectStatus::Completed);
    assert_eq!(aggregate.project.completed_at, Some(start_time()));
    assert_eq!(aggregate.review.as_ref(), Some(&review));

    let events: Vec<TimelineEventType> = h
        .services
        .projects
        .get_timeline(&user(), &project.id)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.event_type)
        .collect();
    assert!(events.ends_with(&[TimelineEventType::ReviewSubmitted, TimelineEventType::ProjectCompleted]));
}

#[tokio::test]
async fn test_one_review_per_project() {
    let h = TestHarness::new();
    let project = h.verified_project().await.project;
    h.services
        .reviews
        .create_review(&user(), &project.id, five_star_review())
        .await
        .unwrap();

    let err = h
        .services
        .reviews
        .create_review(&user(), &project.id, five_star_review())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_ratings_are_validated() {
    let h = TestHarness::new();
    let project = h.verified_project().await.project;

    let out_of_range = ReviewInput {
        rating: 6,
        ..five_star_review()
    };
    let err = h
        .services
        .reviews
        .create_review(&user(), &project.id, out_of_range)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let bad_sub_rating = ReviewInput {
        quality_rating: Some(0),
        ..five_star_review()
    };
    let err = h
        .services
        .reviews
        .create_review(&user(), &project.id, bad_sub_rating)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let aggregate = h.services.projects.get_project(&user(), &project.id).await.unwrap();
    assert_eq!(aggregate.project.status, ProjectStatus::InstallationCompleted);
    assert!(aggregate.review.is_none());
}

#[tokio::test]
async fn test_only_owner_reviews() {
    let h = TestHarness::new();
    let project = h.verified_project().await.project;

    let err = h
        .services
        .reviews
        .create_review(&contractor(), &project.id, five_star_review())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn test_review_of_already_completed_project() {
    let h = TestHarness::new();
    let project = h.verified_project().await.project;

    // A peer service closed the project first
    h.services
        .projects
        .change_status(
            &Caller::system(),
            &project.id,
            StatusChangeInput {
                status: ProjectStatus::Completed,
                reason: None,
            },
        )
        .await
        .unwrap();

    h.services
        .reviews
        .create_review(&user(), &project.id, five_star_review())
        .await
        .unwrap();

    let timeline = h.services.projects.get_timeline(&user(), &project.id).await.unwrap();
    let completed_entries = timeline
        .iter()
        .filter(|e| e.event_type == TimelineEventType::ProjectCompleted)
        .count();
    assert_eq!(completed_entries, 0);
    assert_eq!(timeline.last().unwrap().event_type, TimelineEventType::ReviewSubmitted);
}

#[tokio::test]
async fn test_contractor_responds_once() {
    let h = TestHarness::new();
    let project = h.verified_project().await.project;

    let err = h
        .services
        .reviews
        .respond_to_review(&contractor(), &project.id, "Thank you!")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    h.services
        .reviews
        .create_review(&user(), &project.id, five_star_review())
        .await
        .unwrap();

    let err = h
        .services
        .reviews
        .respond_to_review(&user(), &project.id, "Replying to myself")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = h
        .services
        .reviews
        .respond_to_review(&contractor(), &project.id, "   ")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let responded = h
        .services
        .reviews
        .respond_to_review(&contractor(), &project.id, "Thank you for choosing us")
        .await
        .unwrap();
    assert_eq!(responded.contractor_response.as_deref(), Some("Thank you for choosing us"));
    assert_eq!(responded.responded_at, Some(start_time()));

    let err = h
        .services
        .reviews
        .respond_to_review(&contractor(), &project.id, "Edited reply")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BusinessRule);

    let stored = h.services.reviews.get_review(&admin(), &project.id).await.unwrap();
    assert_eq!(stored.contractor_response.as_deref(), Some("Thank you for choosing us"));
}

#[tokio::test]
async fn test_get_review_before_submission_is_not_found() {
    let h = TestHarness::new();
    let project = h.verified_project().await.project;

    let err = h.services.reviews.get_review(&user(), &project.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
