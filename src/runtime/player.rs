use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crate::runtime::slots::ProgramReader;
use crate::runtime::vm::sample_byte;

#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Samples per second.
    pub sample_rate: u32,
    /// Samples rendered per `fill` call in the live loop.
    pub block_size: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        PlayerConfig {
            sample_rate: 8000,
            block_size: 256,
        }
    }
}

impl PlayerConfig {
    /// Wall-clock length of one block.
    pub fn block_duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        let nanos = self.block_size as u64 * 1_000_000_000 / u64::from(self.sample_rate);
        Duration::from_nanos(nanos)
    }
}

/// The shared time counter `t`.
///
/// Advanced by the player, reset by the control side when a preset loads.
#[derive(Debug, Default)]
pub struct SampleCounter(AtomicU32);

impl SampleCounter {
    pub fn new(start: u32) -> Self {
        Self(AtomicU32::new(start))
    }

    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, t: u32) {
        self.0.store(t, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.set(0);
    }

    /// Returns the current value and moves on by one, wrapping at `u32::MAX`.
    fn advance(&self) -> u32 {
        // fetch_add wraps on overflow
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

/// Real-time sample generator: one program evaluation per tick.
pub struct Player {
    reader: ProgramReader,
    counter: Arc<SampleCounter>,
}

impl Player {
    pub fn new(reader: ProgramReader, counter: Arc<SampleCounter>) -> Self {
        Self { reader, counter }
    }

    pub fn counter(&self) -> &Arc<SampleCounter> {
        &self.counter
    }

    /// Evaluates the published program at the current `t`, then advances `t`.
    pub fn next_value(&mut self) -> u32 {
        let t = self.counter.advance();
        self.reader.evaluate(t)
    }

    /// Next unsigned 8-bit sample.
    pub fn next_sample(&mut self) -> u8 {
        sample_byte(self.next_value())
    }

    pub fn fill(&mut self, out: &mut [u8]) {
        for sample in out.iter_mut() {
            *sample = self.next_sample();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::slots::program_slots;

    fn player_for(source: &str) -> (Player, crate::runtime::slots::ProgramWriter) {
        let (mut writer, reader) = program_slots();
        writer.compile(source).unwrap();
        (Player::new(reader, Arc::new(SampleCounter::default())), writer)
    }

    #[test]
    fn test_default_config() {
        let config = PlayerConfig::default();
        assert_eq!(config.sample_rate, 8000);
        assert_eq!(config.block_size, 256);
        assert_eq!(config.block_duration(), Duration::from_millis(32));
    }

    #[test]
    fn test_counter_advances_once_per_sample() {
        let (mut player, _writer) = player_for("t");
        assert_eq!(player.next_value(), 0);
        assert_eq!(player.next_value(), 1);
        assert_eq!(player.next_value(), 2);
        assert_eq!(player.counter().get(), 3);
    }

    #[test]
    fn test_samples_are_low_byte() {
        let (mut player, _writer) = player_for("t*256+t");
        player.counter().set(0x41);
        assert_eq!(player.next_sample(), 0x41);
    }

    #[test]
    fn test_fill_renders_block() {
        let (mut player, _writer) = player_for("t");
        player.counter().set(254);
        let mut block = [0u8; 4];
        player.fill(&mut block);
        assert_eq!(block, [254, 255, 0, 1]);
    }

    #[test]
    fn test_counter_wraps() {
        let (mut player, _writer) = player_for("t");
        player.counter().set(u32::MAX);
        assert_eq!(player.next_value(), u32::MAX);
        assert_eq!(player.next_value(), 0);
    }

    #[test]
    fn test_reset_restarts_time() {
        let (mut player, _writer) = player_for("t");
        let mut block = [0u8; 10];
        player.fill(&mut block);

        let counter = Arc::clone(player.counter());
        counter.reset();
        assert_eq!(player.next_value(), 0);
    }

    #[test]
    fn test_recompile_takes_effect_on_next_sample() {
        let (mut player, mut writer) = player_for("1");
        assert_eq!(player.next_sample(), 1);
        writer.compile("2").unwrap();
        assert_eq!(player.next_sample(), 2);
        // a bad edit keeps the sound going
        assert!(writer.compile("2+").is_err());
        assert_eq!(player.next_sample(), 2);
    }
}
