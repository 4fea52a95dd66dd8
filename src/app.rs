//! The navigation shell: it mounts the screen of the current route, and only this one

use std::error::Error;
use std::sync::Arc;

use crate::location::LocationProvider;
use crate::navigation::{Navigation, Navigator, Route};
use crate::prayer::PrayerTimesSource;
use crate::screen::{PrayerTimesScreen, TaskListScreen};
use crate::store::TaskStore;


/// The screen that is currently mounted
pub enum ActiveScreen<S, L, P>
where
    S: TaskStore + ?Sized,
    L: LocationProvider + ?Sized,
    P: PrayerTimesSource + ?Sized,
{
    List(TaskListScreen<S>),
    PrayerTimes(PrayerTimesScreen<L, P>),
}


/// The whole app. Screens do not share any state: a screen is created from scratch every time its route is displayed
pub struct App<S, L, P>
where
    S: TaskStore + ?Sized,
    L: LocationProvider + ?Sized,
    P: PrayerTimesSource + ?Sized,
{
    store: Arc<S>,
    location: Arc<L>,
    prayer_times: Arc<P>,

    navigator: Navigator,
    screen: ActiveScreen<S, L, P>,
}

impl<S, L, P> App<S, L, P>
where
    S: TaskStore + ?Sized,
    L: LocationProvider + ?Sized,
    P: PrayerTimesSource + ?Sized,
{
    /// Create the app, and mount its initial route (the task list)
    pub async fn start(store: Arc<S>, location: Arc<L>, prayer_times: Arc<P>) -> Result<Self, Box<dyn Error>> {
        let mut list = TaskListScreen::new(store.clone());
        list.activate().await?;
        log::info!("App started on {}", Route::List);

        Ok(Self {
            store, location, prayer_times,
            navigator: Navigator::new(),
            screen: ActiveScreen::List(list),
        })
    }

    pub fn navigator(&self) -> &Navigator { &self.navigator }
    pub fn route(&self) -> Route { self.navigator.current() }
    pub fn screen(&self) -> &ActiveScreen<S, L, P> { &self.screen }

    /// The task list, if it is the mounted screen
    pub fn task_list(&mut self) -> Option<&mut TaskListScreen<S>> {
        match &mut self.screen {
            ActiveScreen::List(list) => Some(list),
            _ => None,
        }
    }

    /// The prayer times screen, if it is the mounted screen
    pub fn prayer_times(&self) -> Option<&PrayerTimesScreen<L, P>> {
        match &self.screen {
            ActiveScreen::PrayerTimes(screen) => Some(screen),
            _ => None,
        }
    }

    /// Follow a navigation request. If the route changes, the next screen is mounted, then replaces the current one.
    ///
    /// Mounting the prayer times screen completes once its times are loaded (or have failed to load).
    /// Until then, nothing changes: if mounting fails, or if this future is dropped, the current route and screen stay as they were.
    ///
    /// A request for the current route makes an inactive task list listen to the store again
    pub async fn navigate(&mut self, navigation: Navigation) -> Result<(), Box<dyn Error>> {
        let mut navigator = self.navigator.clone();
        if navigator.apply(navigation) == false {
            return self.reactivate().await;
        }

        let next = match navigator.current() {
            Route::List => {
                let mut list = TaskListScreen::new(self.store.clone());
                if let Err(err) = list.activate().await {
                    log::error!("Unable to open {}: {}", Route::List, err);
                    return Err(err);
                }
                ActiveScreen::List(list)
            },
            Route::PrayerTimes => {
                let mut screen = PrayerTimesScreen::new(self.location.clone(), self.prayer_times.clone());
                screen.mount().await;
                ActiveScreen::PrayerTimes(screen)
            },
        };

        if let ActiveScreen::List(list) = &mut self.screen {
            list.deactivate();
        }
        self.screen = next;
        self.navigator = navigator;
        log::info!("Now displaying {}", self.navigator.current());
        Ok(())
    }

    async fn reactivate(&mut self) -> Result<(), Box<dyn Error>> {
        match &mut self.screen {
            ActiveScreen::List(list) => list.activate().await,
            ActiveScreen::PrayerTimes(_) => Ok(()),
        }
    }

    /// The header of the current route, followed by the content of the mounted screen
    pub fn render(&self) -> Vec<String> {
        let mut lines = vec![format!("== {} ==", self.route().title())];
        match &self.screen {
            ActiveScreen::List(list) => lines.extend(list.render()),
            ActiveScreen::PrayerTimes(screen) => lines.extend(screen.render()),
        }
        lines
    }
}
