#![cfg(feature = "mock_services")]


use std::sync::Arc;

use saae::location::{Coordinate, MockLocation};
use saae::mock_behaviour::MockBehaviour;
use saae::navigation::Navigation;
use saae::prayer::MockPrayerService;
use saae::screen::{PrayerTimesError, PrayerTimesScreen, PrayerTimesState};

use scenarii::{Device, Reply};


fn build(scenario: &scenarii::PrayerScenario) -> (Arc<MockLocation>, Arc<MockPrayerService>) {
    let location = match scenario.device {
        Device::Denied => MockLocation::denied(),
        Device::At(coordinate) => MockLocation::granted(coordinate),
    }.with_behaviour(scenario.behaviour.clone());

    let service = match &scenario.reply {
        Reply::Json(body) => MockPrayerService::replying(body.clone()),
        Reply::Raw(text) => MockPrayerService::replying_raw(text),
    }.with_behaviour(scenario.behaviour.clone());

    (Arc::new(location), Arc::new(service))
}


#[tokio::test]
async fn test_prayer_scenarii() {
    let _ = env_logger::builder().is_test(true).try_init();

    for scenario in scenarii::scenarii() {
        println!("Scenario: {}", scenario.name);
        let (location, service) = build(&scenario);
        let mut screen = PrayerTimesScreen::new(location, service.clone());
        assert!(screen.is_loading());

        screen.mount().await;

        assert_eq!(screen.is_loading(), false, "{}", scenario.name);
        assert!(scenario.expected_state.matches(screen.state(), &screen.render()),
            "{}: unexpected state {:?}", scenario.name, screen.state());
        assert_eq!(service.requests().is_empty(), scenario.expect_request == false, "{}", scenario.name);
    }
}

#[tokio::test]
async fn the_coordinate_is_sent_to_the_service() {
    let location = Arc::new(MockLocation::granted(Coordinate::new(21.4, 39.8)));
    let service = Arc::new(MockPrayerService::replying(scenarii::mecca_reply()));
    let mut screen = PrayerTimesScreen::new(location.clone(), service.clone());

    screen.mount().await;
    assert_eq!(service.requests(), vec![Coordinate::new(21.4, 39.8)]);
    assert_eq!(location.coordinate_requests(), 1);

    let timings = screen.timings().unwrap();
    assert_eq!(screen.error(), None);
    assert_eq!(timings.get(saae::prayer::Prayer::Isha), Some("19:30"));
}

#[tokio::test]
async fn denied_permission_is_told_apart() {
    let mut screen = PrayerTimesScreen::new(
        Arc::new(MockLocation::denied()),
        Arc::new(MockPrayerService::replying(scenarii::mecca_reply())),
    );
    screen.mount().await;

    assert_eq!(screen.state(), &PrayerTimesState::Error(PrayerTimesError::PermissionDenied));
    assert_eq!(screen.error().map(|e| e.to_string()), Some("Location permission denied".to_string()));
    assert!(screen.timings().is_none());
}

#[tokio::test]
async fn failures_have_fixed_messages() {
    assert_eq!(PrayerTimesError::FetchFailed.to_string(), "Failed to fetch prayer times");
    assert_eq!(PrayerTimesError::Unexpected.to_string(), "Error fetching data");
}

#[tokio::test]
async fn rendering_each_state() {
    let mut screen = PrayerTimesScreen::new(
        Arc::new(MockLocation::granted(scenarii::mecca())),
        Arc::new(MockPrayerService::replying(scenarii::mecca_reply())),
    );
    assert_eq!(screen.render(), vec!["Prayer Times", "Loading...", "[Go Back]"]);

    screen.mount().await;
    assert_eq!(screen.render(), vec![
        "Prayer Times",
        "🕌 Fajr: 05:00",
        "🌅 Dhuhr: 12:10",
        "🌇 Asr: 15:30",
        "🌆 Maghrib: 18:05",
        "🌙 Isha: 19:30",
        "[Go Back]",
    ]);
    assert_eq!(screen.go_back(), Navigation::Back);
}

#[tokio::test]
async fn every_mount_loads_again() {
    let service = Arc::new(MockPrayerService::replying(scenarii::mecca_reply())
        .with_behaviour(MockBehaviour { fetch_timings_behaviour: (0, 1), ..MockBehaviour::default() }));
    let mut screen = PrayerTimesScreen::new(Arc::new(MockLocation::granted(scenarii::mecca())), service.clone());

    screen.mount().await;
    assert_eq!(screen.error(), Some(PrayerTimesError::Unexpected));

    screen.mount().await;
    assert_eq!(screen.error(), None);
    assert!(screen.timings().is_some());
    assert_eq!(service.requests().len(), 2);
}
