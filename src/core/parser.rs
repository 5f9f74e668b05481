use super::error::SignalError;
use super::model::PerceptionFrame;

/// Parse one feed line. Blank lines carry no frame.
pub fn parse_frame(line: &str) -> Result<Option<PerceptionFrame>, SignalError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|e| SignalError::Malformed(format!("{}: {}", e, truncate(trimmed, 80))))
}

fn truncate(line: &str, max: usize) -> &str {
    match line.char_indices().nth(max) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vision_frame() {
        let line = r#"{"source":"vision","detections":[{"label":"person","confidence":0.9,"box":{"x1":250,"y1":150,"x2":350,"y2":350}}]}"#;
        match parse_frame(line).unwrap() {
            Some(PerceptionFrame::Vision { detections }) => {
                assert_eq!(detections.len(), 1);
                assert_eq!(detections[0].label, "person");
                assert_eq!(detections[0].bbox.center(), (300.0, 250.0));
            }
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[test]
    fn test_parse_audio_and_empty_pose() {
        let audio = parse_frame(r#"{"source":"audio","text":"help me"}"#).unwrap();
        assert_eq!(
            audio,
            Some(PerceptionFrame::Audio {
                text: "help me".to_string()
            })
        );

        let pose = parse_frame(r#"{"source":"pose","landmarks":null}"#).unwrap();
        assert_eq!(pose, Some(PerceptionFrame::Pose { landmarks: None }));
    }

    #[test]
    fn test_blank_line() {
        assert_eq!(parse_frame("   ").unwrap(), None);
    }

    #[test]
    fn test_malformed_line() {
        assert!(matches!(
            parse_frame("{\"source\":\"radar\"}"),
            Err(SignalError::Malformed(_))
        ));
        assert!(matches!(parse_frame("garbage"), Err(SignalError::Malformed(_))));
    }
}
