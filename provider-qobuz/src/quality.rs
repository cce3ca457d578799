//! Audio quality tier inference
//!
//! Qobuz reports the best sampling rate (kHz) and bit depth a record is
//! available in; the tier is derived from those, first matching rule wins.

use core_library::TrackQuality;

use crate::types::LOSSY_FORMAT_ID;

/// Classify a track by its maximum sampling rate (kHz) and bit depth.
///
/// `format_id` only matters for 16bit/≤48kHz material, where the lossy
/// format code marks an AAC/MP3 stream.
pub fn infer_quality(sampling_rate_khz: f64, bit_depth: u64, format_id: Option<u64>) -> TrackQuality {
    if sampling_rate_khz > 192.0 {
        TrackQuality::FlacLosslessHiRes4
    } else if sampling_rate_khz > 96.0 {
        TrackQuality::FlacLosslessHiRes3
    } else if sampling_rate_khz > 48.0 {
        TrackQuality::FlacLosslessHiRes2
    } else if bit_depth > 16 {
        TrackQuality::FlacLosslessHiRes1
    } else if format_id == Some(LOSSY_FORMAT_ID) {
        TrackQuality::LossyAac
    } else {
        TrackQuality::FlacLossless
    }
}

/// Human readable resolution, e.g. `"96kHz 24bit"`
pub fn quality_details(sampling_rate_khz: f64, bit_depth: u64) -> String {
    format!("{}kHz {}bit", sampling_rate_khz, bit_depth)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_grid() {
        let cases = [
            (200.0, 24, None, TrackQuality::FlacLosslessHiRes4),
            (100.0, 24, None, TrackQuality::FlacLosslessHiRes3),
            (50.0, 24, None, TrackQuality::FlacLosslessHiRes2),
            (44.1, 24, None, TrackQuality::FlacLosslessHiRes1),
            (44.1, 16, Some(6), TrackQuality::FlacLossless),
            (44.1, 16, None, TrackQuality::FlacLossless),
            (44.1, 16, Some(5), TrackQuality::LossyAac),
        ];

        for (rate, depth, format, expected) in cases {
            assert_eq!(
                infer_quality(rate, depth, format),
                expected,
                "{rate}kHz {depth}bit format {format:?}"
            );
        }
    }

    #[test]
    fn test_thresholds_are_exclusive() {
        assert_eq!(infer_quality(192.0, 24, None), TrackQuality::FlacLosslessHiRes3);
        assert_eq!(infer_quality(96.0, 24, None), TrackQuality::FlacLosslessHiRes2);
        assert_eq!(infer_quality(48.0, 24, None), TrackQuality::FlacLosslessHiRes1);
        assert_eq!(infer_quality(48.0, 16, None), TrackQuality::FlacLossless);
    }

    #[test]
    fn test_rate_beats_lossy_format_code() {
        assert_eq!(infer_quality(96.1, 16, Some(5)), TrackQuality::FlacLosslessHiRes2);
        assert_eq!(infer_quality(44.1, 24, Some(5)), TrackQuality::FlacLosslessHiRes1);
    }

    #[test]
    fn test_quality_details() {
        assert_eq!(quality_details(96.0, 24), "96kHz 24bit");
        assert_eq!(quality_details(44.1, 16), "44.1kHz 16bit");
    }
}
