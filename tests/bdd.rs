use std::{fmt, net::SocketAddr, time::Duration};

use anyhow::Context;
use carpool::{
    config::AppConfig,
    db::{init_pool, run_migrations},
    error::AppError,
    models::{trip::Trip, user::Vehicle},
    services::booking::BookingConfirmation,
    state::AppState,
};
use chrono::FixedOffset;
use cucumber::{given, then, when, World as _};
use serde_json::{json, Value};
use tempfile::TempDir;

#[derive(Debug, cucumber::World, Default)]
struct AppWorld {
    state: Option<TestState>,
    trip_id: Option<String>,
    last_error: Option<String>,
    last_booking: Option<Result<BookingConfirmation, String>>,
    outcomes: Vec<Result<BookingConfirmation, String>>,
}

impl AppWorld {
    fn app_state(&self) -> &AppState {
        self.state
            .as_ref()
            .expect("state must be initialised first")
            .app()
    }

    fn trip_id(&self) -> String {
        self.trip_id.clone().expect("a trip must be published first")
    }

    async fn current_trip(&self) -> Trip {
        self.app_state()
            .trips
            .get_trip(&self.trip_id())
            .await
            .expect("trip should exist")
    }

    fn record<T>(&mut self, result: Result<T, AppError>) -> Option<T> {
        match result {
            Ok(value) => {
                self.last_error = None;
                Some(value)
            }
            Err(err) => {
                self.last_error = Some(reason(&err));
                None
            }
        }
    }
}

struct TestState {
    app: AppState,
    _root: TempDir,
}

impl fmt::Debug for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestState").finish()
    }
}

impl TestState {
    async fn new() -> anyhow::Result<Self> {
        let root = TempDir::new().context("create temp dir for bdd world")?;
        let db_path = root.path().join("bdd.sqlite");
        let database_url = format!("sqlite://{}", db_path.to_string_lossy());

        let config = AppConfig {
            database_url: database_url.clone(),
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            trip_offset: FixedOffset::west_opt(5 * 3600).context("offset")?,
            request_timeout: Duration::from_secs(30),
        };

        let db = init_pool(&config.database_url).await?;
        run_migrations(&db).await?;

        let app = AppState::new(config, db);
        Ok(Self { app, _root: root })
    }

    fn app(&self) -> &AppState {
        &self.app
    }
}

fn reason(err: &AppError) -> String {
    err.body()["reason"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}

fn trip_payload(state: &AppState, route: &str, cost: f64) -> Value {
    let tomorrow = state
        .trips
        .local_now()
        .date()
        .succ_opt()
        .expect("tomorrow exists");
    json!({
        "tripDate": tomorrow.format("%Y-%m-%d").to_string(),
        "origin": "Portal Norte",
        "destination": "Calle 72",
        "departureTime": "07:00",
        "arrivalTime": "08:30",
        "cost": cost,
        "paymentMethods": ["nequi", "efectivo"],
        "routeTag": route,
    })
}

async fn register_driver(world: &mut AppWorld, name: &str, seats: i64) {
    let profiles = &world.app_state().profiles;
    profiles
        .upsert(name, &name.to_uppercase(), None)
        .await
        .expect("upsert profile");
    let vehicle = Vehicle {
        plate: format!("{}-123", name.to_uppercase()),
        color: "Gris".into(),
        brand: "Renault".into(),
        model: "Logan".into(),
        seats,
    };
    profiles
        .register_vehicle(name, &vehicle)
        .await
        .expect("register vehicle");
}

async fn publish(world: &mut AppWorld, driver: &str, route: &str, cost: f64) {
    let payload = trip_payload(world.app_state(), route, cost);
    let result = world.app_state().trips.create_trip(driver, &payload).await;
    if let Some(trip) = world.record(result) {
        world.trip_id = Some(trip.id);
    }
}

async fn book(world: &mut AppWorld, user: &str, trip_id: &str) {
    let result = world.app_state().booking.book(trip_id, user).await;
    world.last_booking = Some(result.map_err(|err| reason(&err)));
}

#[given("a fresh application state")]
async fn given_fresh_state(world: &mut AppWorld) {
    world.state = Some(TestState::new().await.expect("state"));
    world.trip_id = None;
    world.last_error = None;
    world.last_booking = None;
    world.outcomes.clear();
}

#[given(regex = r#"^a driver "([^"]+)" with a (\d+)-seat vehicle$"#)]
async fn given_driver(world: &mut AppWorld, name: String, seats: i64) {
    register_driver(world, &name, seats).await;
}

#[given(regex = r#"^a rider "([^"]+)"$"#)]
async fn given_rider(world: &mut AppWorld, name: String) {
    world
        .app_state()
        .profiles
        .upsert(&name, &name, Some("rider@example.com"))
        .await
        .expect("upsert profile");
}

#[given(regex = r#"^"([^"]+)" has published a trip on route "([^"]+)"$"#)]
async fn given_published_trip(world: &mut AppWorld, driver: String, route: String) {
    publish(world, &driver, &route, 5000.0).await;
    assert_eq!(world.last_error, None, "publishing should succeed");
}

#[given(regex = r#"^"([^"]+)" has booked the trip$"#)]
async fn given_booked(world: &mut AppWorld, user: String) {
    let trip_id = world.trip_id();
    book(world, &user, &trip_id).await;
    assert!(matches!(world.last_booking, Some(Ok(_))));
}

#[when(regex = r#"^"([^"]+)" publishes a trip on route "([^"]+)" costing (\d+)$"#)]
async fn when_publish(world: &mut AppWorld, driver: String, route: String, cost: f64) {
    publish(world, &driver, &route, cost).await;
}

#[when(regex = r#"^"([^"]+)" registers a (\d+)-seat vehicle$"#)]
async fn when_register_vehicle(world: &mut AppWorld, name: String, seats: i64) {
    register_driver(world, &name, seats).await;
}

#[when(regex = r#"^"([^"]+)" updates the trip to cost (\d+)$"#)]
async fn when_update(world: &mut AppWorld, driver: String, cost: f64) {
    let payload = trip_payload(world.app_state(), "suba", cost);
    let result = world
        .app_state()
        .trips
        .update_trip(&world.trip_id(), &driver, &payload)
        .await;
    world.record(result);
}

#[when(regex = r#"^"([^"]+)" deletes the trip$"#)]
async fn when_delete(world: &mut AppWorld, driver: String) {
    let result = world
        .app_state()
        .trips
        .delete_trip(&world.trip_id(), &driver)
        .await;
    world.record(result);
}

#[when(regex = r#"^"([^"]+)" books the trip$"#)]
async fn when_book(world: &mut AppWorld, user: String) {
    let trip_id = world.trip_id();
    book(world, &user, &trip_id).await;
}

#[when(regex = r#"^"([^"]+)" books the trip "([^"]+)"$"#)]
async fn when_book_other(world: &mut AppWorld, user: String, trip_id: String) {
    book(world, &user, &trip_id).await;
}

#[when(regex = r#"^"([^"]+)" cancels the booking$"#)]
async fn when_cancel(world: &mut AppWorld, user: String) {
    let result = world
        .app_state()
        .booking
        .cancel(&world.trip_id(), &user)
        .await;
    world.last_booking = Some(result.map_err(|err| reason(&err)));
}

async fn book_concurrently(world: &mut AppWorld, users: Vec<String>) {
    let trip_id = world.trip_id();
    let handles: Vec<_> = users
        .into_iter()
        .map(|user| {
            let engine = world.app_state().booking.clone();
            let trip_id = trip_id.clone();
            tokio::spawn(async move { engine.book(&trip_id, &user).await })
        })
        .collect();

    world.outcomes = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("booking task panicked").map_err(|err| reason(&err)))
        .collect();
}

#[when(regex = r"^(\d+) different passengers book the trip concurrently$")]
async fn when_many_book(world: &mut AppWorld, count: usize) {
    let users = (0..count).map(|i| format!("passenger-{i}")).collect();
    book_concurrently(world, users).await;
}

#[when(regex = r#"^"([^"]+)" books the trip (\d+) times concurrently$"#)]
async fn when_same_user_books(world: &mut AppWorld, user: String, count: usize) {
    book_concurrently(world, vec![user; count]).await;
}

#[then("the request succeeded")]
async fn then_request_succeeded(world: &mut AppWorld) {
    assert_eq!(world.last_error, None);
}

#[then(regex = r#"^the request fails with "([^"]+)"$"#)]
async fn then_request_fails(world: &mut AppWorld, expected: String) {
    assert_eq!(world.last_error.as_deref(), Some(expected.as_str()));
}

#[then("the last booking succeeded")]
async fn then_booking_succeeded(world: &mut AppWorld) {
    assert!(
        matches!(world.last_booking, Some(Ok(_))),
        "{:?}",
        world.last_booking
    );
}

#[then(regex = r#"^the last booking fails with "([^"]+)"$"#)]
async fn then_booking_fails(world: &mut AppWorld, expected: String) {
    match &world.last_booking {
        Some(Err(reason)) => assert_eq!(reason, &expected),
        other => panic!("expected a refused booking, got {other:?}"),
    }
}

#[then(regex = r"^exactly (\d+) bookings? succeeds?$")]
async fn then_exactly_succeed(world: &mut AppWorld, expected: usize) {
    let successes = world.outcomes.iter().filter(|o| o.is_ok()).count();
    assert_eq!(successes, expected, "{:?}", world.outcomes);
}

#[then(regex = r#"^every other booking fails with "([^"]+)"$"#)]
async fn then_others_fail(world: &mut AppWorld, expected: String) {
    for outcome in world.outcomes.iter().filter_map(|o| o.as_ref().err()) {
        assert_eq!(outcome, &expected);
    }
}

#[then(regex = r"^the trip has (\d+) available seats$")]
async fn then_available_seats(world: &mut AppWorld, expected: i64) {
    let trip = world.current_trip().await;
    assert_eq!(trip.available_seats, expected);
    assert_eq!(
        trip.available_seats,
        trip.capacity() - trip.passengers.len() as i64
    );
}

#[then(regex = r"^the trip has (\d+) passengers$")]
async fn then_passenger_count(world: &mut AppWorld, expected: usize) {
    let trip = world.current_trip().await;
    assert_eq!(trip.passengers.len(), expected);
}

#[then(regex = r#"^the trip passengers are "([^"]*)"$"#)]
async fn then_passengers(world: &mut AppWorld, expected: String) {
    let trip = world.current_trip().await;
    let expected: Vec<String> = expected
        .split(',')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    assert_eq!(trip.passengers, expected);
}

#[then(regex = r"^the trip is scheduled with (\d+) available seats$")]
async fn then_scheduled(world: &mut AppWorld, seats: i64) {
    let trip = world.current_trip().await;
    assert_eq!(trip.status.as_str(), "scheduled");
    assert_eq!(trip.available_seats, seats);
    assert!(trip.passengers.is_empty());
    assert_eq!(trip.details.affinity.as_deref(), Some("No especificada"));
}

#[then(regex = r"^the trip vehicle has (\d+) seats$")]
async fn then_vehicle_seats(world: &mut AppWorld, seats: i64) {
    let trip = world.current_trip().await;
    assert_eq!(trip.driver_vehicle.seats, seats);
}

#[then(regex = r"^the trip costs (\d+)$")]
async fn then_costs(world: &mut AppWorld, cost: f64) {
    let trip = world.current_trip().await;
    assert_eq!(trip.details.cost, cost);
}

#[then("the trip no longer exists")]
async fn then_trip_gone(world: &mut AppWorld) {
    let err = world
        .app_state()
        .trips
        .get_trip(&world.trip_id())
        .await
        .expect_err("trip should be gone");
    assert_eq!(reason(&err), "not_found");
}

#[then(regex = r#"^listing route "([^"]+)" returns (\d+) trips?$"#)]
async fn then_listing(world: &mut AppWorld, route: String, expected: usize) {
    let filter = carpool::validation::validate_search(&carpool::validation::TripSearchParams {
        route_tag: Some(route.clone()),
        ..Default::default()
    })
    .expect("valid filter");
    let trips = world
        .app_state()
        .trips
        .list_trips(&filter)
        .await
        .expect("list trips");
    assert_eq!(trips.len(), expected);
    assert!(trips.iter().all(|t| t.details.route_tag == route));
}

#[tokio::main]
async fn main() {
    AppWorld::cucumber()
        .fail_on_skipped()
        .with_default_cli()
        .run("tests/features")
        .await;
}
