//! Resolution registry: the negotiated pulses-per-degree value.
//!
//! The controller announces its resolution in every response. The registry
//! holds the last value that passed validation, so a SET command can be
//! encoded at the resolution the controller expects. It starts at one pulse
//! per degree and is only written after a successful decode.

use std::sync::atomic::{AtomicU8, Ordering};

use rot2prog_core::Resolution;

/// Lock-free holder of the current [`Resolution`].
///
/// The value is a single byte, so readers can never observe a torn write.
#[derive(Debug)]
pub struct ResolutionRegistry {
    pulses: AtomicU8,
}

impl ResolutionRegistry {
    /// Create a registry holding [`Resolution::ONE`].
    pub fn new() -> Self {
        ResolutionRegistry {
            pulses: AtomicU8::new(Resolution::ONE.pulses_per_degree()),
        }
    }

    /// The last validated resolution.
    pub fn get(&self) -> Resolution {
        Resolution::from_pulses(self.pulses.load(Ordering::Acquire)).unwrap_or_default()
    }

    /// Record a resolution that came out of a successful decode.
    pub fn set(&self, resolution: Resolution) {
        self.pulses
            .store(resolution.pulses_per_degree(), Ordering::Release);
    }
}

impl Default for ResolutionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn starts_at_one() {
        assert_eq!(ResolutionRegistry::new().get(), Resolution::ONE);
    }

    #[test]
    fn set_then_get() {
        let registry = ResolutionRegistry::new();
        registry.set(Resolution::FOUR);
        assert_eq!(registry.get(), Resolution::FOUR);
        registry.set(Resolution::TEN);
        assert_eq!(registry.get(), Resolution::TEN);
    }

    #[test]
    fn concurrent_readers_see_whole_values() {
        let registry = Arc::new(ResolutionRegistry::new());
        let writer = {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                for i in 0..1000 {
                    let r = if i % 2 == 0 {
                        Resolution::TWO
                    } else {
                        Resolution::FOUR
                    };
                    registry.set(r);
                }
            })
        };

        for _ in 0..1000 {
            let r = registry.get();
            assert!(
                [Resolution::ONE, Resolution::TWO, Resolution::FOUR].contains(&r),
                "unexpected {r:?}"
            );
        }
        writer.join().unwrap();
    }
}
