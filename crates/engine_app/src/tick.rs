//! Fixed-timestep tick loop.
//!
//! Each tick hands the fixed step to [`World::update`](engine_ecs::World::update)
//! on the driven world. The loop sleeps off whatever is left of the step and
//! warns when a tick overruns its budget.

use std::time::{Duration, Instant};

use anyhow::Context;
use engine_ecs::{Registry, World};
use tracing::{debug, info, warn};

/// Configuration for the tick loop.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Target ticks per second.
    pub tick_rate: f64,
    /// Maximum number of ticks to run (0 = unlimited).
    pub max_ticks: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            max_ticks: 0,
        }
    }
}

/// Drives one world of a registry.
#[derive(Debug)]
pub struct TickLoop {
    tick_id: u64,
    config: TickConfig,
    registry: Registry,
    world: String,
}

impl TickLoop {
    /// Create a tick loop driving the world `world` of `registry`.
    #[must_use]
    pub fn new(config: TickConfig, registry: Registry, world: impl Into<String>) -> Self {
        Self {
            tick_id: 0,
            config,
            registry,
            world: world.into(),
        }
    }

    /// Returns the current tick counter.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    /// Returns the registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns the driven world.
    pub fn world(&self) -> anyhow::Result<&World> {
        self.registry
            .get_world(&self.world)
            .with_context(|| format!("world \"{}\" is not registered", self.world))
    }

    /// Run one tick with step `dt` (seconds).
    pub fn tick(&mut self, dt: f64) -> anyhow::Result<()> {
        let world = self
            .registry
            .get_world_mut(&self.world)
            .with_context(|| format!("world \"{}\" is not registered", self.world))?;
        world
            .update(dt)
            .with_context(|| format!("tick {} failed", self.tick_id + 1))?;
        self.tick_id += 1;

        debug!(
            tick_id = self.tick_id,
            dt,
            entities = world.entities().len(),
            "tick complete"
        );
        Ok(())
    }

    /// Run the tick loop for the configured number of ticks, or indefinitely.
    pub fn run(&mut self) -> anyhow::Result<()> {
        let rate = self.config.tick_rate;
        anyhow::ensure!(
            rate > 0.0 && rate.is_finite(),
            "tick rate must be positive and finite, got {rate}"
        );
        let tick_duration = Duration::from_secs_f64(1.0 / rate);
        let mut tick_count = 0u64;

        info!(
            world = %self.world,
            tick_rate = self.config.tick_rate,
            max_ticks = self.config.max_ticks,
            "starting tick loop"
        );

        loop {
            let start = Instant::now();

            let dt = tick_duration.as_secs_f64();
            self.tick(dt)?;

            tick_count += 1;
            if self.config.max_ticks > 0 && tick_count >= self.config.max_ticks {
                info!(ticks = tick_count, "tick loop complete");
                break;
            }

            let elapsed = start.elapsed();
            if elapsed < tick_duration {
                std::thread::sleep(tick_duration - elapsed);
            } else {
                warn!(
                    tick_id = self.tick_id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = tick_duration.as_millis() as u64,
                    "tick exceeded time budget"
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use engine_ecs::{SystemDef, WorldConfig};

    use super::*;
    use crate::demo;

    fn demo_loop(config: TickConfig, particles: usize) -> TickLoop {
        let mut registry = Registry::new();
        demo::build(&mut registry, particles, WorldConfig::default()).unwrap();
        TickLoop::new(config, registry, demo::WORLD)
    }

    #[test]
    fn test_tick_advances_counter() {
        let mut tick_loop = demo_loop(TickConfig::default(), 2);
        assert_eq!(tick_loop.tick_id(), 0);
        tick_loop.tick(1.0 / 60.0).unwrap();
        assert_eq!(tick_loop.tick_id(), 1);
        tick_loop.tick(1.0 / 60.0).unwrap();
        assert_eq!(tick_loop.tick_id(), 2);
        assert_eq!(tick_loop.world().unwrap().tick_count(), 2);
    }

    #[test]
    fn test_run_limited_ticks() {
        let config = TickConfig {
            tick_rate: 1000.0, // fast for testing
            max_ticks: 5,
        };
        let mut tick_loop = demo_loop(config, 1);
        tick_loop.run().unwrap();
        assert_eq!(tick_loop.tick_id(), 5);
    }

    #[test]
    fn test_invalid_tick_rate_is_rejected() {
        for tick_rate in [f64::NAN, 0.0, -5.0, f64::INFINITY] {
            let config = TickConfig {
                tick_rate,
                max_ticks: 1,
            };
            let mut tick_loop = demo_loop(config, 1);
            assert!(tick_loop.run().is_err(), "{tick_rate}");
            assert_eq!(tick_loop.tick_id(), 0);
        }
    }

    #[test]
    fn test_missing_world_is_an_error() {
        let mut tick_loop = TickLoop::new(TickConfig::default(), Registry::new(), "nowhere");
        assert!(tick_loop.tick(0.1).is_err());
        assert!(tick_loop.world().is_err());
    }

    #[test]
    fn test_failing_system_stops_the_loop() {
        let mut registry = Registry::new();
        let world = registry.world("w", &[]).unwrap();
        world
            .add_system_def(
                "faulty",
                SystemDef::new().update(["$time"], |_, _| anyhow::bail!("out of fuel")),
            )
            .unwrap();
        let mut tick_loop = TickLoop::new(
            TickConfig {
                tick_rate: 1000.0,
                max_ticks: 3,
            },
            registry,
            "w",
        );

        let err = tick_loop.run().unwrap_err();
        assert_eq!(err.to_string(), "tick 1 failed");
        assert_eq!(tick_loop.tick_id(), 0);
        assert!(tick_loop.registry().get_world("w").is_some());
    }
}
