use serde::Serialize;

/// Lowest contribution count assigned to each level above zero.  The scale is
/// absolute so that walls for different users and years can be compared
/// side by side.
const THRESHOLDS: [u32; Level::MAX as usize] = [1, 4, 7, 10];

/// Quantized intensity of a day's contribution count, from 0 (no activity) to
/// 4 (the busiest bucket)
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub(crate) struct Level(u8);

impl Level {
    pub(crate) const MAX: u8 = 4;

    /// Number of distinct levels, and thus the number of colors a theme must
    /// supply
    pub(crate) const COUNT: usize = Level::MAX as usize + 1;

    pub(crate) fn for_count(count: u32) -> Level {
        let above = THRESHOLDS.iter().take_while(|&&t| count >= t).count();
        Level(u8::try_from(above).unwrap_or(Level::MAX))
    }

    pub(crate) fn index(self) -> usize {
        usize::from(self.0)
    }
}
