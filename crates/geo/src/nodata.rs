/// Describes which pixel values are excluded from processing.
///
/// NaN and infinite values are always considered nodata. An explicit `sentinel` value marks individual band values as nodata.
/// When `zero_is_nodata` is set a pixel where all bands are zero is nodata as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodataPolicy {
    pub sentinel: Option<f64>,
    pub zero_is_nodata: bool,
}

impl NodataPolicy {
    pub fn with_sentinel(sentinel: f64) -> Self {
        NodataPolicy {
            sentinel: Some(sentinel),
            zero_is_nodata: false,
        }
    }

    pub fn with_sentinel_opt(sentinel: Option<f64>) -> Self {
        NodataPolicy {
            sentinel,
            zero_is_nodata: false,
        }
    }

    pub fn zero_is_nodata(mut self, zero_is_nodata: bool) -> Self {
        self.zero_is_nodata = zero_is_nodata;
        self
    }

    /// Band value check, does not consider the `zero_is_nodata` pixel rule
    #[inline]
    pub fn is_nodata(&self, value: f64) -> bool {
        !value.is_finite() || self.sentinel.is_some_and(|nod| value == nod)
    }

    /// Pixel check over all band values of a pixel, only relevant for the `zero_is_nodata` rule
    #[inline]
    pub fn is_nodata_pixel(&self, mut band_values: impl Iterator<Item = f64>) -> bool {
        self.zero_is_nodata && band_values.all(|v| v == 0.0)
    }
}
