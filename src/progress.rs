/// Progress gained per tap.
pub const PROGRESS_STEP: u32 = 10;
/// Progress value at which the bar wraps back to zero.
pub const PROGRESS_CAP: u32 = 100;

/// Decides when a tap bumps the level.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LevelUpRule {
    /// Level up exactly when the bar wraps.
    #[default]
    OnWrap,
    /// Legacy model: the bar may rest at the cap for one tap and only wraps once a
    /// step would overshoot it; the level goes up when `progress + 1` (before the
    /// tap) reaches the cap. With a step of 10 that is every 11th tap.
    LegacyUnitProbe,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Progression {
    pub progress: u32,
    pub level: u32,
}

impl Default for Progression {
    fn default() -> Self {
        Progression {
            progress: 0,
            level: 1,
        }
    }
}

impl Progression {
    /// Applies a single tap and reports whether the level went up.
    pub fn advance(self, rule: LevelUpRule) -> (Self, bool) {
        let next = self.progress.saturating_add(PROGRESS_STEP);
        let (progress, level_up) = match rule {
            LevelUpRule::OnWrap => {
                let wrapped = next >= PROGRESS_CAP;
                (if wrapped { 0 } else { next }, wrapped)
            }
            LevelUpRule::LegacyUnitProbe => {
                let progress = if next > PROGRESS_CAP { 0 } else { next };
                (progress, self.progress.saturating_add(1) >= PROGRESS_CAP)
            }
        };
        let level = if level_up {
            self.level.saturating_add(1)
        } else {
            self.level
        };
        (Progression { progress, level }, level_up)
    }

    pub fn percent(&self) -> u16 {
        (self.progress.min(PROGRESS_CAP) * 100 / PROGRESS_CAP) as u16
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn advance__below_cap__adds_one_step() {
        // given
        let start = Progression {
            progress: 30,
            level: 4,
        };

        // when
        let (next, leveled) = start.advance(LevelUpRule::OnWrap);

        // then
        assert_eq!(
            next,
            Progression {
                progress: 40,
                level: 4
            }
        );
        assert!(!leveled);
    }

    #[test]
    fn advance__from_95__wraps_and_levels_up() {
        // given
        let start = Progression {
            progress: 95,
            level: 1,
        };

        // when
        let (next, leveled) = start.advance(LevelUpRule::OnWrap);

        // then
        assert_eq!(
            next,
            Progression {
                progress: 0,
                level: 2
            }
        );
        assert!(leveled);
    }

    #[test]
    fn advance__ten_taps_from_default__reaches_level_two() {
        // given
        let mut state = Progression::default();

        // when
        for _ in 0..10 {
            state = state.advance(LevelUpRule::OnWrap).0;
        }

        // then
        assert_eq!(
            state,
            Progression {
                progress: 0,
                level: 2
            }
        );
    }

    #[test]
    fn advance__legacy_rule__rests_at_cap_without_leveling() {
        // given
        let start = Progression {
            progress: 90,
            level: 1,
        };

        // when
        let (next, leveled) = start.advance(LevelUpRule::LegacyUnitProbe);

        // then
        assert_eq!(
            next,
            Progression {
                progress: 100,
                level: 1
            }
        );
        assert!(!leveled);
    }

    #[test]
    fn advance__legacy_rule__wraps_and_levels_from_cap() {
        // given
        let start = Progression {
            progress: 100,
            level: 3,
        };

        // when
        let (next, leveled) = start.advance(LevelUpRule::LegacyUnitProbe);

        // then
        assert_eq!(
            next,
            Progression {
                progress: 0,
                level: 4
            }
        );
        assert!(leveled);
    }

    #[test]
    fn advance__legacy_rule__33_taps_from_default__reach_level_four() {
        // given
        let mut state = Progression::default();
        let mut level_ups = 0;

        // when
        for _ in 0..33 {
            let (next, leveled) = state.advance(LevelUpRule::LegacyUnitProbe);
            level_ups += leveled as u32;
            state = next;
        }

        // then
        assert_eq!(
            state,
            Progression {
                progress: 0,
                level: 4
            }
        );
        assert_eq!(level_ups, 3);
    }

    proptest! {
        #[test]
        fn advance__any_sequence__keeps_progress_below_cap_and_level_monotonic(
            start in 0u32..PROGRESS_CAP,
            taps in 0usize..300,
        ) {
            let mut state = Progression { progress: start, level: 1 };
            let mut wraps = 0;
            for _ in 0..taps {
                let before = state;
                let (next, leveled) = state.advance(LevelUpRule::OnWrap);
                prop_assert!(next.progress < PROGRESS_CAP);
                prop_assert!(next.level >= before.level);
                if leveled {
                    wraps += 1;
                    prop_assert_eq!(next.progress, 0);
                }
                state = next;
            }
            prop_assert_eq!(state.level, 1 + wraps);
        }

        #[test]
        fn advance__without_overflow__is_linear_in_taps(
            start in 0u32..10,
            taps in 0u32..9,
        ) {
            let mut state = Progression { progress: start, level: 1 };
            for _ in 0..taps {
                state = state.advance(LevelUpRule::OnWrap).0;
            }
            prop_assert_eq!(state.progress, start + PROGRESS_STEP * taps);
            prop_assert_eq!(state.level, 1);
        }
    }
}
