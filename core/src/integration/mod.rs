//! Integration tests for the recorder core
//!
//! Drives a [`Session`](crate::Session) against the fake host in
//! [`crate::test_utils`] and a temporary replay directory.


#[cfg(test)]
pub(crate) mod test_utils {
    use std::cell::Cell;
    use std::path::Path;
    use std::rc::Rc;

    use chrono::{NaiveDate, NaiveDateTime};

    use crate::host::{HookHandle, HookPoint, HostCapabilities};
    use crate::test_utils::TEST_GAME_VERSION;
    use crate::{RecorderConfig, ReplayStore, Session, StoreLayout};

    /// Wall clock pinned to 2024-05-01 20:15:03.
    pub fn fixed_clock() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .and_then(|date| date.and_hms_opt(20, 15, 3))
            .unwrap()
    }

    pub fn new_store(dir: &Path, config: &RecorderConfig) -> ReplayStore {
        ReplayStore::new(StoreLayout::new(dir), config.retention(), TEST_GAME_VERSION)
    }

    pub fn new_session(dir: &Path) -> Session {
        new_session_with(dir, RecorderConfig::default(), HostCapabilities::none())
    }

    pub fn new_session_with(
        dir: &Path,
        config: RecorderConfig,
        capabilities: HostCapabilities,
    ) -> Session {
        Session::new(new_store(dir, &config), config, capabilities).with_clock(fixed_clock)
    }

    /// Hook handle whose enabled state the test can observe.
    pub struct SharedHook(pub Rc<Cell<bool>>);

    impl HookHandle for SharedHook {
        fn enable(&mut self) {
            self.0.set(true);
        }

        fn disable(&mut self) {
            self.0.set(false);
        }

        fn is_enabled(&self) -> bool {
            self.0.get()
        }
    }

    /// Capabilities with a director timer hook at `offset`.
    pub fn timer_capabilities(offset: u16) -> (HostCapabilities, Rc<Cell<bool>>) {
        let enabled = Rc::new(Cell::new(false));
        let mut capabilities = HostCapabilities::none().with_hook(
            HookPoint::DirectorTimerUpdate,
            Box::new(SharedHook(enabled.clone())),
        );
        capabilities.director_timer_offset = Some(offset);
        (capabilities, enabled)
    }
}
