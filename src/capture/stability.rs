use crate::ocr::TextReading;

pub const DEFAULT_STABLE_FRAMES: u32 = 3;

type LockCallback = Box<dyn FnMut(&TextReading) + Send>;

/// Fires a one-shot callback once the same non-empty reading has repeated
/// `stable_frames` times after it was first seen.
///
/// The first sighting of a reading sets the count to 0, so locking takes
/// `stable_frames + 1` identical observations. Blank readings never touch
/// the streak.
pub struct StabilityLock {
    last_joined_text: String,
    repeat_count: u32,
    locked: bool,
    stable_frames: u32,
    on_lock: Option<LockCallback>,
}

impl StabilityLock {
    pub fn new<F>(stable_frames: u32, on_lock: F) -> Self
    where
        F: FnMut(&TextReading) + Send + 'static,
    {
        Self {
            last_joined_text: String::new(),
            repeat_count: 0,
            locked: false,
            stable_frames,
            on_lock: Some(Box::new(on_lock)),
        }
    }

    pub fn with_default_threshold<F>(on_lock: F) -> Self
    where
        F: FnMut(&TextReading) + Send + 'static,
    {
        Self::new(DEFAULT_STABLE_FRAMES, on_lock)
    }

    pub fn observe(&mut self, reading: &TextReading) {
        if self.locked {
            return;
        }

        let joined = reading.joined();
        if joined.is_empty() {
            return;
        }

        if joined == self.last_joined_text {
            self.repeat_count = self.repeat_count.saturating_add(1);
        } else {
            self.last_joined_text = joined;
            self.repeat_count = 0;
        }

        if self.repeat_count >= self.stable_frames {
            self.locked = true;
            // Taking the callback guarantees it can only ever run once.
            if let Some(mut on_lock) = self.on_lock.take() {
                on_lock(reading);
            }
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn repeat_count(&self) -> u32 {
        self.repeat_count
    }

    pub fn last_joined_text(&self) -> &str {
        &self.last_joined_text
    }

    pub fn stable_frames(&self) -> u32 {
        self.stable_frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    };

    fn counting_lock(stable_frames: u32) -> (StabilityLock, Arc<AtomicU32>) {
        let fired = Arc::new(AtomicU32::new(0));
        let counter = fired.clone();
        let lock = StabilityLock::new(stable_frames, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (lock, fired)
    }

    fn reading(text: &str) -> TextReading {
        TextReading::from_texts([text])
    }

    #[test]
    fn locks_on_fourth_identical_reading_with_default_threshold() {
        let (mut lock, fired) = counting_lock(DEFAULT_STABLE_FRAMES);

        for _ in 0..3 {
            lock.observe(&reading("ABC"));
        }
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!lock.is_locked());
        assert_eq!(lock.repeat_count(), 2);

        lock.observe(&reading("ABC"));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(lock.is_locked());
    }

    #[test]
    fn blank_readings_do_not_break_or_extend_streak() {
        let (mut lock, fired) = counting_lock(3);

        lock.observe(&reading("ABC"));
        lock.observe(&reading(""));
        lock.observe(&TextReading::default());
        assert_eq!(lock.repeat_count(), 0);
        assert_eq!(lock.last_joined_text(), "ABC");

        lock.observe(&reading("ABC"));
        lock.observe(&reading("ABC"));
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        lock.observe(&reading("ABC"));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn changed_reading_resets_streak() {
        let (mut lock, fired) = counting_lock(3);

        lock.observe(&reading("ABC"));
        lock.observe(&reading("ABC"));
        lock.observe(&reading("ABD"));
        assert_eq!(lock.repeat_count(), 0);
        assert_eq!(lock.last_joined_text(), "ABD");

        lock.observe(&reading("ABD"));
        lock.observe(&reading("ABD"));
        lock.observe(&reading("ABD"));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn observations_after_lock_are_ignored() {
        let (mut lock, fired) = counting_lock(1);

        lock.observe(&reading("ABC"));
        lock.observe(&reading("ABC"));
        assert!(lock.is_locked());

        lock.observe(&reading("XYZ"));
        lock.observe(&reading("ABC"));
        lock.observe(&reading("ABC"));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(lock.last_joined_text(), "ABC");
        assert_eq!(lock.repeat_count(), 1);
    }

    #[test]
    fn callback_receives_locking_reading() {
        let seen = Arc::new(std::sync::Mutex::new(None));
        let sink = seen.clone();
        let mut lock = StabilityLock::new(1, move |r: &TextReading| {
            *sink.lock().unwrap() = Some(r.joined());
        });

        lock.observe(&TextReading::from_texts(["ID", "12345"]));
        lock.observe(&TextReading::from_texts(["ID ", " 12345"]));
        assert_eq!(seen.lock().unwrap().as_deref(), Some("ID 12345"));
    }

    #[test]
    fn zero_threshold_locks_on_first_non_empty_reading() {
        let (mut lock, fired) = counting_lock(0);
        lock.observe(&reading(""));
        assert!(!lock.is_locked());
        lock.observe(&reading("ABC"));
        assert!(lock.is_locked());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
