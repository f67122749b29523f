use std::time::Duration;

/// Blocking wait used for hardware settling
pub trait Delay {
    fn delay(&mut self, duration: Duration);
}

/// Sleeps the calling thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn delay(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
