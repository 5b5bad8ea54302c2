//! Integration tests for the meshbridge-engine transports
//!
//! The serve loop and the child-process engine speak the same JSON layout,
//! so a request encoded by one side must be understood by the other.

use meshbridge_core::{ErrorKind, GeometrySnapshot, Point3f};
use meshbridge_engine::*;
use std::io::Cursor;

/// Closed octahedron around the origin
fn octahedron() -> GeometrySnapshot {
    GeometrySnapshot::new(
        vec![
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(-1.0, 0.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
            Point3f::new(0.0, -1.0, 0.0),
            Point3f::new(0.0, 0.0, 1.0),
            Point3f::new(0.0, 0.0, -1.0),
        ],
        vec![
            [0, 2, 4], [2, 1, 4], [1, 3, 4], [3, 0, 4],
            [2, 0, 5], [1, 2, 5], [3, 1, 5], [0, 3, 5],
        ],
    )
    .unwrap()
}

#[test]
fn test_serve_answers_each_line() {
    let snapshot = octahedron();
    let segmentation = SegmentationRequest::new(&snapshot, 2, 0.5).unwrap().to_wire();
    let simplification = SimplificationRequest::new(&snapshot, 0.5).unwrap().to_wire();
    let input = format!(
        "{}\n\n{}\nnot json\n",
        serde_json::to_string(&segmentation).unwrap(),
        serde_json::to_string(&simplification).unwrap()
    );

    let mut output = Vec::new();
    let answered = serve(&mut LocalEngine::new(), Cursor::new(input), &mut output).unwrap();
    assert_eq!(answered, 3);

    let responses: Vec<WireResponse> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert!(matches!(responses[0], WireResponse::Segmentation { .. }));
    assert!(matches!(responses[1], WireResponse::Simplification { .. }));
    assert!(matches!(responses[2], WireResponse::Failure { .. }));
}

#[test]
fn test_adapter_over_local_engine() {
    let snapshot = octahedron();
    let mut adapter = EngineAdapter::new(LocalEngine::new());

    let request = SegmentationRequest::new(&snapshot, 3, 0.2).unwrap();
    let result = adapter.segment(&request).unwrap();
    assert_eq!(result.segment_ids().len(), snapshot.face_count());

    let request = SimplificationRequest::new(&snapshot, 0.5).unwrap();
    let result = adapter.simplify(&request).unwrap();
    assert!(result.snapshot().face_count() < snapshot.face_count());
}

#[test]
fn test_boxed_engine_is_an_engine() {
    let snapshot = octahedron();
    let engine: Box<dyn GeometryEngine> = Box::new(LocalEngine::new());
    let mut adapter = EngineAdapter::new(engine);
    let request = SimplificationRequest::new(&snapshot, 0.25).unwrap();
    assert!(adapter.simplify(&request).is_ok());
}

#[cfg(unix)]
mod process {
    use super::*;

    #[test]
    fn test_command_engine_reads_stdout() {
        let snapshot = octahedron();
        let request = SegmentationRequest::new(&snapshot, 2, 0.5).unwrap();
        let engine = CommandEngine::new("sh").arg("-c").arg(
            r#"cat > /dev/null; echo '{"status":"segmentation","segment_ids":[0,0,0,0,1,1,1,1],"segment_count":2}'"#,
        );
        let mut adapter = EngineAdapter::new(engine);
        let result = adapter.segment(&request).unwrap();
        assert_eq!(result.segment_count(), 2);
        assert_eq!(result.segment_ids()[4], 1);
    }

    #[test]
    fn test_command_engine_failure_status() {
        let snapshot = octahedron();
        let request = SimplificationRequest::new(&snapshot, 0.5).unwrap();
        let engine = CommandEngine::new("sh").args(["-c", "echo kernel crashed >&2; exit 3"]);
        let err = EngineAdapter::new(engine).simplify(&request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EngineFailure);
        assert!(err.to_string().contains("kernel crashed"));
    }

    #[test]
    fn test_command_engine_garbage_output() {
        let snapshot = octahedron();
        let request = SimplificationRequest::new(&snapshot, 0.5).unwrap();
        let engine = CommandEngine::new("sh").args(["-c", "cat > /dev/null; echo hello"]);
        let err = EngineAdapter::new(engine).simplify(&request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResult);
    }

    #[test]
    fn test_missing_program() {
        let snapshot = octahedron();
        let request = SimplificationRequest::new(&snapshot, 0.5).unwrap();
        let engine = CommandEngine::new("/nonexistent/meshbridge-kernel");
        let err = EngineAdapter::new(engine).simplify(&request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EngineFailure);
    }
}
