//! FFmpeg filter graph builders.

use reel_models::Resolution;

/// Scale into the target frame keeping aspect, pad the rest, then convert frame rate.
///
/// Scaling and padding come first so `fps` always sees a uniform frame size.
pub fn normalize_filter(resolution: Resolution, frame_rate: f64) -> String {
    let Resolution { width, height } = resolution;
    format!(
        "scale={width}:{height}:force_original_aspect_ratio=decrease,\
         pad={width}:{height}:(ow-iw)/2:(oh-ih)/2,\
         setsar=1,\
         fps={}",
        format_rate(frame_rate)
    )
}

/// Build the `-filter_complex` graph overlaying `volumes.len()` audio inputs.
///
/// Input `i` is scaled by `volumes[i]`, written at full precision; the result
/// is labelled `[aout]` and lasts as long as the longest input.
pub fn audio_mix_filter(volumes: &[f64]) -> String {
    let mut filters: Vec<String> = volumes
        .iter()
        .enumerate()
        .map(|(i, volume)| format!("[{i}:a]volume={volume}[a{i}]"))
        .collect();

    if volumes.len() == 1 {
        // amix with one input is rejected by older FFmpeg builds
        filters[0] = format!("[0:a]volume={}[aout]", volumes[0]);
        return filters.join(";");
    }

    let labels: String = (0..volumes.len()).map(|i| format!("[a{i}]")).collect();
    filters.push(format!(
        "{labels}amix=inputs={}:duration=longest:dropout_transition=0:normalize=0[aout]",
        volumes.len()
    ));
    filters.join(";")
}

/// Render a frame rate without trailing zeros ("30", "29.97").
fn format_rate(rate: f64) -> String {
    let s = format!("{:.3}", rate);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Escape a path for an FFmpeg concat list entry.
pub fn concat_list_entry(path: &str) -> String {
    format!("file '{}'", path.replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_filter_orders_scale_before_fps() {
        let filter = normalize_filter(Resolution::FULL_HD, 30.0);
        let scale = filter.find("scale=1920:1080").unwrap();
        let pad = filter.find("pad=1920:1080").unwrap();
        let fps = filter.find("fps=30").unwrap();
        assert!(scale < pad && pad < fps);
        assert!(filter.ends_with("fps=30"));
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(30.0), "30");
        assert_eq!(format_rate(29.97), "29.97");
    }

    #[test]
    fn test_single_track_mix() {
        assert_eq!(audio_mix_filter(&[0.5]), "[0:a]volume=0.5[aout]");
    }

    #[test]
    fn test_multi_track_mix() {
        let graph = audio_mix_filter(&[1.0, 0.3]);
        assert!(graph.contains("[0:a]volume=1[a0]"));
        assert!(graph.contains("[1:a]volume=0.3[a1]"));
        assert!(graph.ends_with("[a0][a1]amix=inputs=2:duration=longest:dropout_transition=0:normalize=0[aout]"));
    }

    #[test]
    fn test_tiny_gain_is_not_rounded_to_silence() {
        let graph = audio_mix_filter(&[1.0, 0.00004]);
        assert!(graph.contains("[1:a]volume=0.00004[a1]"));
        assert!(!graph.contains("volume=0[") && !graph.contains("volume=0.0000"));
    }

    #[test]
    fn test_concat_list_entry_escapes_quotes() {
        assert_eq!(concat_list_entry("/lib/it's.mp4"), r"file '/lib/it'\''s.mp4'");
    }
}
