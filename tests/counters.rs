use chrono::{Duration, Utc};
use tempfile::TempDir;

use happen::{
    app_state::AppState,
    config::Config,
    models::{
        Category, CreateEventInput, CreateUserInput, CreateVenueInput, LocationInput, ReviewInput,
        RsvpType, UpdateEventInput, UpdateVenueInput,
    },
    AppError,
};

async fn state() -> (AppState, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::in_memory(dir.path().to_string_lossy().to_string());
    (AppState::new(config).await.unwrap(), dir)
}

async fn user(state: &AppState, id: &str) {
    state
        .users
        .create_user_profile(
            id,
            CreateUserInput {
                display_name: id.to_uppercase(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
}

fn venue_input(name: &str) -> CreateVenueInput {
    serde_json::from_value(serde_json::json!({ "name": name, "categories": ["music"] })).unwrap()
}

fn event_input(name: &str, venue_id: &str) -> CreateEventInput {
    let start = Utc::now() + Duration::days(2);
    CreateEventInput {
        name: name.to_string(),
        description: String::new(),
        start_date_time: start,
        end_date_time: start + Duration::hours(2),
        venue_id: Some(venue_id.to_string()),
        venue_name: None,
        location: LocationInput::default(),
        categories: vec!["music".to_string()],
        price: None,
        capacity: None,
        status: None,
    }
}

#[tokio::test]
async fn test_concurrent_rsvps_match_reconciled_counts() {
    let (state, _dir) = state().await;
    user(&state, "host").await;
    let venue = state.venues.create_venue("host", venue_input("Hall")).await.unwrap();
    let event = state
        .events
        .create_event("host", event_input("Open Mic", &venue.id))
        .await
        .unwrap();

    // Each round changes every user's RSVP at once; one task per user per round.
    let rounds = [
        [RsvpType::Going, RsvpType::Going, RsvpType::Interested, RsvpType::Going],
        [RsvpType::Interested, RsvpType::NotGoing, RsvpType::Going, RsvpType::Going],
        [RsvpType::NotGoing, RsvpType::Going, RsvpType::Going, RsvpType::Interested],
    ];
    for round in rounds {
        let tasks: Vec<_> = round
            .iter()
            .enumerate()
            .map(|(i, &response)| {
                let events = state.events.clone();
                let event_id = event.id.clone();
                tokio::spawn(async move {
                    events
                        .rsvp(&event_id, &format!("user-{}", i), response)
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
    }

    let live = state.events.get_event(&event.id).await.unwrap();
    let reconciled = state.events.reconcile_event("host", &event.id).await.unwrap();
    assert_eq!(live.attendee_count, reconciled.attendee_count);
    assert_eq!(live.interested_count, reconciled.interested_count);
    assert_eq!(reconciled.attendee_count, 2);
    assert_eq!(reconciled.interested_count, 1);
}

#[tokio::test]
async fn test_rsvp_transitions_never_go_negative() {
    let (state, _dir) = state().await;
    user(&state, "host").await;
    let venue = state.venues.create_venue("host", venue_input("Hall")).await.unwrap();
    let event = state
        .events
        .create_event("host", event_input("Open Mic", &venue.id))
        .await
        .unwrap();

    let steps = [
        (RsvpType::Going, 1, 0),
        (RsvpType::Going, 1, 0),
        (RsvpType::Interested, 0, 1),
        (RsvpType::NotGoing, 0, 0),
        (RsvpType::NotGoing, 0, 0),
        (RsvpType::Going, 1, 0),
    ];
    for (response, going, interested) in steps {
        state.events.rsvp(&event.id, "guest", response).await.unwrap();
        let current = state.events.get_event(&event.id).await.unwrap();
        assert_eq!(current.attendee_count, going, "after {:?}", response);
        assert_eq!(current.interested_count, interested, "after {:?}", response);
    }
}

#[tokio::test]
async fn test_review_aggregation_and_duplicates() {
    let (state, _dir) = state().await;
    user(&state, "owner").await;
    let venue = state.venues.create_venue("owner", venue_input("Hall")).await.unwrap();

    for (reviewer, rating) in [("r1", 5), ("r2", 4), ("r3", 4), ("r4", 1)] {
        user(&state, reviewer).await;
        state
            .venues
            .submit_review(
                &venue.id,
                reviewer,
                ReviewInput {
                    rating: Some(rating),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    let err = state
        .venues
        .submit_review(&venue.id, "r1", ReviewInput::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let live = state.venues.get_venue(&venue.id).await.unwrap();
    assert_eq!(live.ratings.count, 4);
    assert!((live.ratings.average - 3.5).abs() < 1e-9);
    assert_eq!(live.ratings.distribution, [1, 0, 0, 2, 1]);

    let reconciled = state.venues.reconcile_venue("owner", &venue.id).await.unwrap();
    assert_eq!(reconciled.ratings, live.ratings);

    let reviewer = state.users.get_user_profile("r2").await.unwrap();
    assert_eq!(reviewer.stats.reviews, 1);
}

#[tokio::test]
async fn test_concurrent_reviews_keep_every_rating() {
    let (state, _dir) = state().await;
    user(&state, "owner").await;
    let venue = state.venues.create_venue("owner", venue_input("Hall")).await.unwrap();
    for i in 0..6 {
        user(&state, &format!("critic-{}", i)).await;
    }

    let tasks: Vec<_> = (0..6)
        .map(|i| {
            let venues = state.venues.clone();
            let venue_id = venue.id.clone();
            tokio::spawn(async move {
                venues
                    .submit_review(
                        &venue_id,
                        &format!("critic-{}", i),
                        ReviewInput {
                            rating: Some(3),
                            ..Default::default()
                        },
                    )
                    .await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let live = state.venues.get_venue(&venue.id).await.unwrap();
    assert_eq!(live.ratings.count, 6);
    assert_eq!(live.ratings.distribution[2], 6);
}

#[tokio::test]
async fn test_category_counts_follow_venue_and_event_lifecycle() {
    let (state, _dir) = state().await;
    user(&state, "host").await;
    let venue = state.venues.create_venue("host", venue_input("Hall")).await.unwrap();
    let event = state
        .events
        .create_event("host", event_input("Open Mic", &venue.id))
        .await
        .unwrap();

    let categories = state.users.get_user_followed_categories("host").await.unwrap();
    assert!(categories.is_empty());

    state.users.follow_category("host", "music").await.unwrap();
    let music = &state.users.get_user_followed_categories("host").await.unwrap()[0];
    assert_eq!((music.venue_count, music.event_count), (1, 1));

    state.events.delete_event("host", &event.id).await.unwrap();
    let music = &state.users.get_user_followed_categories("host").await.unwrap()[0];
    assert_eq!(music.event_count, 0);
}

#[tokio::test]
async fn test_concurrent_updates_count_an_added_category_once() {
    let (state, _dir) = state().await;
    user(&state, "host").await;
    let venue = state.venues.create_venue("host", venue_input("Hall")).await.unwrap();
    let event = state
        .events
        .create_event("host", event_input("Open Mic", &venue.id))
        .await
        .unwrap();

    let event_tasks: Vec<_> = (0..4)
        .map(|_| {
            let events = state.events.clone();
            let event_id = event.id.clone();
            tokio::spawn(async move {
                let patch = UpdateEventInput {
                    categories: Some(vec!["music".to_string(), "jazz".to_string()]),
                    ..Default::default()
                };
                events.update_event("host", &event_id, patch).await
            })
        })
        .collect();
    let venue_tasks: Vec<_> = (0..4)
        .map(|_| {
            let venues = state.venues.clone();
            let venue_id = venue.id.clone();
            tokio::spawn(async move {
                let patch = UpdateVenueInput {
                    categories: Some(vec!["music".to_string(), "jazz".to_string()]),
                    ..Default::default()
                };
                venues.update_venue("host", &venue_id, patch).await
            })
        })
        .collect();
    for task in event_tasks {
        task.await.unwrap().unwrap();
    }
    for task in venue_tasks {
        task.await.unwrap().unwrap();
    }

    let jazz = state.docs.require::<Category>("jazz").await.unwrap();
    assert_eq!((jazz.venue_count, jazz.event_count), (1, 1));
    let music = state.docs.require::<Category>("music").await.unwrap();
    assert_eq!((music.venue_count, music.event_count), (1, 1));
}

#[tokio::test]
async fn test_deleting_a_venue_rolls_back_user_stats() {
    let (state, _dir) = state().await;
    user(&state, "owner").await;
    user(&state, "fan").await;
    let venue = state.venues.create_venue("owner", venue_input("Hall")).await.unwrap();

    state.users.follow_venue("fan", &venue.id).await.unwrap();
    state
        .venues
        .submit_review(&venue.id, "fan", ReviewInput::default())
        .await
        .unwrap();
    let fan = state.users.get_user_profile("fan").await.unwrap();
    assert_eq!((fan.stats.reviews, fan.stats.following), (1, 1));

    state.venues.delete_venue("owner", &venue.id).await.unwrap();

    let fan = state.users.get_user_profile("fan").await.unwrap();
    assert_eq!((fan.stats.reviews, fan.stats.following), (0, 0));
    assert!(state.users.get_user_followed_venues("fan").await.unwrap().is_empty());
}
