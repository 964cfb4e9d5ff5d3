//! Duration reconciliation engine.
//!
//! Aligns audio tracks against the assembled video. One track is the
//! standard (the flagged one, else the first); its native duration `Ds`
//! caps single-shot and fixed-loop tracks. Adaptive tracks loop to cover
//! `max(Ds, video)`. The trim mode then picks the final length from
//! `(Ds, video)`, and everything is cut (never extended) to it.
//!
//! Pure and deterministic: the same request always yields the same result.

use reel_models::{
    AudioTrack, PlaybackPolicy, ReconciliationRequest, ReconciliationResult, TrackSegment,
};

use crate::error::{ReconcileError, ReconcileResult};

/// Slack for float division when counting repetitions.
const LOOP_EPSILON: f64 = 1e-9;

/// FFmpeg reads `-stream_loop` as a signed int.
const MAX_LOOPS: u32 = i32::MAX as u32;

/// Compute per-track segments and the final duration.
///
/// Every track is validated before anything is computed.
pub fn reconcile(request: &ReconciliationRequest) -> ReconcileResult<ReconciliationResult> {
    let standard_index = validate(request)?;

    let video = request.video_duration_seconds;
    let standard = request.tracks[standard_index].duration_seconds;

    let segments = request
        .tracks
        .iter()
        .enumerate()
        .map(|(index, track)| segment_for(index, track, standard, video))
        .collect::<ReconcileResult<Vec<TrackSegment>>>()?;

    let mixed = segments.iter().map(|s| s.length).fold(0.0, f64::max);
    let final_duration = request.trim_mode.select(standard, video);

    if !final_duration.is_finite() || final_duration <= 0.0 {
        return Err(ReconcileError::InvariantViolation(format!(
            "final duration {} from standard {} and video {}",
            final_duration, standard, video
        )));
    }
    if let Some(bad) = segments
        .iter()
        .position(|s| !s.length.is_finite() || s.length <= 0.0 || s.loops_applied == 0)
    {
        return Err(ReconcileError::InvariantViolation(format!(
            "track {} has degenerate segment {:?}",
            bad, segments[bad]
        )));
    }

    Ok(ReconciliationResult {
        final_duration_seconds: final_duration,
        mixed_duration_seconds: mixed,
        standard_duration_seconds: standard,
        standard_index,
        segments,
    })
}

/// Validate the whole request and return the standard track index.
fn validate(request: &ReconciliationRequest) -> ReconcileResult<usize> {
    if request.tracks.is_empty() {
        return Err(ReconcileError::EmptyTrackSet);
    }

    let video = request.video_duration_seconds;
    if !video.is_finite() || video <= 0.0 {
        return Err(ReconcileError::InvalidVideoDuration(video));
    }

    let mut standard = None;
    for (index, track) in request.tracks.iter().enumerate() {
        validate_track(index, track)?;
        if track.is_standard {
            if standard.is_some() {
                return Err(ReconcileError::invalid_track(
                    index,
                    "more than one track is marked standard",
                ));
            }
            standard = Some(index);
        }
    }

    Ok(standard.unwrap_or(0))
}

fn validate_track(index: usize, track: &AudioTrack) -> ReconcileResult<()> {
    let duration = track.duration_seconds;
    if !duration.is_finite() || duration <= 0.0 {
        return Err(ReconcileError::invalid_track(
            index,
            format!("duration must be positive, got {}", duration),
        ));
    }
    validate_volume(index, track.volume_ratio)
}

/// Reject a non-positive or non-finite gain.
pub fn validate_volume(index: usize, volume_ratio: f64) -> ReconcileResult<()> {
    if !volume_ratio.is_finite() || volume_ratio <= 0.0 {
        return Err(ReconcileError::invalid_track(
            index,
            format!("volume_ratio must be positive, got {}", volume_ratio),
        ));
    }
    Ok(())
}

fn segment_for(
    index: usize,
    track: &AudioTrack,
    standard: f64,
    video: f64,
) -> ReconcileResult<TrackSegment> {
    let native = track.duration_seconds;

    let length = match track.policy {
        PlaybackPolicy::SingleShot => standard.min(native),
        PlaybackPolicy::FixedLoop { count } => (f64::from(count.get()) * native).min(standard),
        PlaybackPolicy::AdaptiveLoop => standard.max(video),
    };

    let loops = repetitions(length, native).map_err(|e| match e {
        ReconcileError::InvariantViolation(msg) => {
            ReconcileError::InvariantViolation(format!("track {}: {}", index, msg))
        }
        other => other,
    })?;
    let tail = length - f64::from(loops - 1) * native;

    // Adaptive tracks always reach the longer of audio and video
    let trailing_silence = match track.policy {
        PlaybackPolicy::AdaptiveLoop => 0.0,
        _ => (standard - length).max(0.0),
    };

    Ok(TrackSegment {
        start_offset: 0.0,
        length,
        loops_applied: loops,
        tail_seconds: tail,
        trailing_silence,
    })
}

/// Repetitions of a `native`-second source needed to cover `length`,
/// counting a partial final one.
///
/// Fails when the count is not representable as an FFmpeg loop count.
pub fn repetitions(length: f64, native: f64) -> ReconcileResult<u32> {
    let loops = (length / native - LOOP_EPSILON).ceil().max(1.0);
    if !loops.is_finite() || loops > f64::from(MAX_LOOPS) {
        return Err(ReconcileError::InvariantViolation(format!(
            "{} s of a {} s source needs {} repetitions",
            length, native, loops
        )));
    }
    Ok(loops as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_models::TrimMode;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn request(video: f64, tracks: Vec<AudioTrack>, trim_mode: TrimMode) -> ReconciliationRequest {
        ReconciliationRequest::new(video, tracks, trim_mode)
    }

    fn narration(duration: f64) -> AudioTrack {
        AudioTrack::new("narration.mp3", duration).standard()
    }

    #[test]
    fn test_single_shot_longer_than_standard_is_cut() {
        let result = reconcile(&request(
            40.0,
            vec![narration(30.0), AudioTrack::new("bgm.mp3", 45.0)],
            TrimMode::Min,
        ))
        .unwrap();

        let bgm = result.segments[1];
        assert!(approx(bgm.length, 30.0));
        assert_eq!(bgm.loops_applied, 1);
        assert!(approx(bgm.trailing_silence, 0.0));
    }

    #[test]
    fn test_single_shot_shorter_than_standard_reports_silence() {
        let result = reconcile(&request(
            40.0,
            vec![narration(30.0), AudioTrack::new("bgm.mp3", 20.0)],
            TrimMode::Min,
        ))
        .unwrap();

        let bgm = result.segments[1];
        assert!(approx(bgm.length, 20.0));
        assert!(approx(bgm.trailing_silence, 10.0));
    }

    #[test]
    fn test_fixed_loop_capped_at_standard() {
        let bgm = AudioTrack::new("bgm.mp3", 16.0)
            .with_policy(PlaybackPolicy::fixed_loop(2).unwrap());
        let result = reconcile(&request(40.0, vec![narration(30.0), bgm], TrimMode::Min)).unwrap();

        let seg = result.segments[1];
        assert!(approx(seg.length, 30.0));
        assert_eq!(seg.loops_applied, 2);
        assert!(approx(seg.tail_seconds, 14.0));
    }

    #[test]
    fn test_fixed_loop_exact_multiple() {
        let bgm = AudioTrack::new("bgm.mp3", 10.0)
            .with_policy(PlaybackPolicy::fixed_loop(3).unwrap());
        let result = reconcile(&request(40.0, vec![narration(30.0), bgm], TrimMode::Min)).unwrap();

        let seg = result.segments[1];
        assert!(approx(seg.length, 30.0));
        assert_eq!(seg.loops_applied, 3);
        assert!(approx(seg.tail_seconds, 10.0));
    }

    #[test]
    fn test_adaptive_loop_covers_longer_of_audio_and_video() {
        let bgm = AudioTrack::new("bgm.mp3", 8.0).with_policy(PlaybackPolicy::AdaptiveLoop);
        let result = reconcile(&request(34.0, vec![narration(30.0), bgm], TrimMode::Min)).unwrap();

        let seg = result.segments[1];
        assert!(approx(seg.length, 34.0));
        assert_eq!(seg.loops_applied, 5);
        assert!(approx(seg.tail_seconds, 2.0));
        assert!(approx(result.mixed_duration_seconds, 34.0));
        assert!(approx(result.final_duration_seconds, 30.0));
    }

    #[test]
    fn test_worked_example_min_mode() {
        let tracks = vec![
            narration(30.0),
            AudioTrack::new("a.mp3", 20.0),
            AudioTrack::new("b.mp3", 16.0).with_policy(PlaybackPolicy::fixed_loop(2).unwrap()),
            AudioTrack::new("c.mp3", 8.0).with_policy(PlaybackPolicy::AdaptiveLoop),
        ];

        let long_video = reconcile(&request(34.0, tracks.clone(), TrimMode::Min)).unwrap();
        assert!(approx(long_video.final_duration_seconds, 30.0));
        assert!(long_video.trims_video(34.0));

        let short_video = reconcile(&request(26.0, tracks, TrimMode::Min)).unwrap();
        assert!(approx(short_video.final_duration_seconds, 26.0));
        // Adaptive track still covers max(Ds, video) before trimming
        assert!(approx(short_video.segments[3].length, 30.0));
        assert!(approx(short_video.segments[3].trimmed_length(26.0), 26.0));
    }

    #[test]
    fn test_trim_modes() {
        let tracks = vec![narration(30.0)];
        let final_for = |mode| {
            reconcile(&request(34.0, tracks.clone(), mode))
                .unwrap()
                .final_duration_seconds
        };
        assert!(approx(final_for(TrimMode::Min), 30.0));
        assert!(approx(final_for(TrimMode::Max), 34.0));
        assert!(approx(final_for(TrimMode::VideoLed), 34.0));
        assert!(approx(final_for(TrimMode::AudioLed), 30.0));
    }

    #[test]
    fn test_video_led_pads_narration_with_silence() {
        let result = reconcile(&request(25.0, vec![narration(22.0)], TrimMode::VideoLed)).unwrap();
        assert!(approx(result.final_duration_seconds, 25.0));
        assert!(approx(result.mixed_duration_seconds, 22.0));
        assert!(approx(result.trailing_silence(), 3.0));
        assert!(!result.trims_video(25.0));
    }

    #[test]
    fn test_single_standard_track_contributes_full_length() {
        let result = reconcile(&request(10.0, vec![narration(12.5)], TrimMode::AudioLed)).unwrap();
        assert_eq!(result.standard_index, 0);
        assert!(approx(result.segments[0].length, 12.5));
        assert_eq!(result.segments[0].loops_applied, 1);
    }

    #[test]
    fn test_first_track_is_standard_by_default() {
        let result = reconcile(&request(
            50.0,
            vec![AudioTrack::new("a.mp3", 20.0), AudioTrack::new("b.mp3", 40.0)],
            TrimMode::AudioLed,
        ))
        .unwrap();
        assert_eq!(result.standard_index, 0);
        assert!(approx(result.final_duration_seconds, 20.0));
        assert!(approx(result.segments[1].length, 20.0));
    }

    #[test]
    fn test_flagged_standard_wins() {
        let result = reconcile(&request(
            50.0,
            vec![AudioTrack::new("bgm.mp3", 40.0), narration(20.0)],
            TrimMode::AudioLed,
        ))
        .unwrap();
        assert_eq!(result.standard_index, 1);
        assert!(approx(result.standard_duration_seconds, 20.0));
    }

    #[test]
    fn test_deterministic() {
        let tracks = vec![
            narration(29.37),
            AudioTrack::new("c.mp3", 7.1).with_policy(PlaybackPolicy::AdaptiveLoop),
        ];
        let req = request(33.3, tracks, TrimMode::Max);
        let first = reconcile(&req).unwrap();
        let second = reconcile(&req).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first.final_duration_seconds.to_bits(),
            second.final_duration_seconds.to_bits()
        );
    }

    #[test]
    fn test_empty_track_set() {
        let err = reconcile(&request(10.0, vec![], TrimMode::Min)).unwrap_err();
        assert_eq!(err, ReconcileError::EmptyTrackSet);
    }

    #[test]
    fn test_zero_volume_is_invalid() {
        let err = reconcile(&request(
            10.0,
            vec![narration(10.0), AudioTrack::new("bgm.mp3", 5.0).with_volume(0.0)],
            TrimMode::Min,
        ))
        .unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidTrack { index: 1, .. }));
    }

    #[test]
    fn test_validation_precedes_computation() {
        // Track 2 is invalid even though track 1 would compute fine
        let err = reconcile(&request(
            10.0,
            vec![
                narration(10.0),
                AudioTrack::new("ok.mp3", 5.0),
                AudioTrack::new("bad.mp3", f64::NAN),
            ],
            TrimMode::Min,
        ))
        .unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidTrack { index: 2, .. }));
    }

    #[test]
    fn test_multiple_standard_tracks_rejected() {
        let err = reconcile(&request(
            10.0,
            vec![narration(10.0), narration(12.0)],
            TrimMode::Min,
        ))
        .unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidTrack { index: 1, .. }));
    }

    #[test]
    fn test_invalid_video_duration() {
        let err = reconcile(&request(0.0, vec![narration(10.0)], TrimMode::Min)).unwrap_err();
        assert_eq!(err, ReconcileError::InvalidVideoDuration(0.0));
    }

    #[test]
    fn test_repetitions_tolerates_float_noise() {
        assert_eq!(repetitions(32.0, 16.0).unwrap(), 2);
        assert_eq!(repetitions(0.3, 0.1).unwrap(), 3);
        assert_eq!(repetitions(34.0, 8.0).unwrap(), 5);
        assert_eq!(repetitions(5.0, 8.0).unwrap(), 1);
    }

    #[test]
    fn test_loop_count_overflow_is_rejected() {
        assert!(matches!(
            repetitions(1e10, 0.001),
            Err(ReconcileError::InvariantViolation(_))
        ));

        let tracks = vec![
            narration(10.0),
            AudioTrack::new("tick.wav", 0.001).with_policy(PlaybackPolicy::AdaptiveLoop),
        ];
        let err = reconcile(&request(1e10, tracks, TrimMode::Min)).unwrap_err();
        match err {
            ReconcileError::InvariantViolation(msg) => assert!(msg.starts_with("track 1:")),
            other => panic!("unexpected error {:?}", other),
        }
    }
}
