//! The route graph of the app: a task list, and a prayer-times page on top of it

use std::fmt::{Display, Formatter};


#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    /// The task list. This is where the app starts
    List,
    PrayerTimes,
}

impl Route {
    /// The title shown in the header of this route
    pub fn title(&self) -> &'static str {
        match self {
            Route::List => "SaAe",
            Route::PrayerTimes => "Prayer Times",
        }
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Route::List => write!(f, "List"),
            Route::PrayerTimes => write!(f, "PrayerTimes"),
        }
    }
}

/// A navigation request, as issued by a screen
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Navigation {
    To(Route),
    Back,
}


/// A stack of routes. The last one is the one being displayed
#[derive(Clone, Debug, PartialEq)]
pub struct Navigator {
    stack: Vec<Route>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator {
    pub fn new() -> Self {
        Self { stack: vec![Route::List] }
    }

    pub fn current(&self) -> Route {
        // The root route is never popped
        *self.stack.last().unwrap_or(&Route::List)
    }

    pub fn stack(&self) -> &[Route] {
        &self.stack
    }

    /// Go to a route. If it is already on the stack, pop back to it, otherwise push it.
    ///
    /// Returns whether the current route has changed
    pub fn navigate(&mut self, route: Route) -> bool {
        if self.current() == route {
            return false;
        }
        match self.stack.iter().position(|r| *r == route) {
            Some(index) => self.stack.truncate(index + 1),
            None => self.stack.push(route),
        }
        log::debug!("Navigated to {} (stack: {:?})", route, self.stack);
        true
    }

    /// Pop the current route, unless it is the root one.
    ///
    /// Returns whether the current route has changed
    pub fn go_back(&mut self) -> bool {
        if self.stack.len() <= 1 {
            return false;
        }
        self.stack.pop();
        log::debug!("Went back to {}", self.current());
        true
    }

    pub fn apply(&mut self, navigation: Navigation) -> bool {
        match navigation {
            Navigation::To(route) => self.navigate(route),
            Navigation::Back => self.go_back(),
        }
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn starts_on_the_list() {
        let nav = Navigator::new();
        assert_eq!(nav.current(), Route::List);
        assert_eq!(nav.current().title(), "SaAe");
        assert_eq!(Route::PrayerTimes.title(), "Prayer Times");
    }

    #[test]
    fn push_and_pop() {
        let mut nav = Navigator::new();
        assert!(nav.navigate(Route::PrayerTimes));
        assert_eq!(nav.stack(), &[Route::List, Route::PrayerTimes]);
        assert_eq!(nav.navigate(Route::PrayerTimes), false);

        assert!(nav.go_back());
        assert_eq!(nav.current(), Route::List);
        assert_eq!(nav.go_back(), false);
        assert_eq!(nav.stack(), &[Route::List]);
    }

    #[test]
    fn navigating_to_a_lower_route_pops_back_to_it() {
        let mut nav = Navigator::new();
        nav.apply(Navigation::To(Route::PrayerTimes));
        assert!(nav.apply(Navigation::To(Route::List)));
        assert_eq!(nav.stack(), &[Route::List]);
    }
}
