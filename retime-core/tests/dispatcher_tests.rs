// retime-core/tests/dispatcher_tests.rs
//
// Exercises the interpolation dispatcher against a mock executor: strategy
// selection, pass counting, early termination, and exact-target guarantees.

use retime_core::error::{CoreError, CoreResult};
use retime_core::frames::FrameStore;
use retime_core::interpolation::{
    interpolate_to_count, Engine, EngineCapability, FrameInterpolator, InterpolationParams,
};
use std::cell::RefCell;
use std::fs::{self, File};
use std::path::Path;
use tempfile::tempdir;

/// Recorded executor invocation: input count and requested target.
#[derive(Debug, Clone, PartialEq)]
struct Invocation {
    input_count: u64,
    target: Option<u64>,
}

/// Mock executor that fabricates output frames: `target` frames when an
/// explicit count is requested, exactly double the input otherwise.
#[derive(Default)]
struct MockInterpolator {
    calls: RefCell<Vec<Invocation>>,
    fail: bool,
}

impl MockInterpolator {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn invocations(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }
}

impl FrameInterpolator for MockInterpolator {
    fn interpolate(
        &self,
        _engine: &Engine,
        _params: &InterpolationParams,
        input_dir: &Path,
        output_dir: &Path,
        target_frames: Option<u64>,
    ) -> CoreResult<()> {
        let input_count = FrameStore::new(input_dir).count()?;
        self.calls.borrow_mut().push(Invocation {
            input_count,
            target: target_frames,
        });
        if self.fail {
            return Err(CoreError::ExternalTool {
                tool: "mock".to_string(),
                status: "code 1".to_string(),
                stderr: "simulated failure".to_string(),
            });
        }
        let produced = target_frames.unwrap_or(input_count * 2);
        fs::create_dir_all(output_dir)?;
        for i in 1..=produced {
            File::create(output_dir.join(format!("frame_{i:08}.png")))?;
        }
        Ok(())
    }
}

fn store_with_frames(dir: &Path, n: u64) -> FrameStore {
    fs::create_dir_all(dir).unwrap();
    for i in 1..=n {
        File::create(dir.join(format!("frame_{i:08}.png"))).unwrap();
    }
    FrameStore::new(dir)
}

fn explicit_engine() -> Engine {
    let engine = Engine::from_model("rife-v4.6");
    assert_eq!(engine.capability, EngineCapability::ExplicitCount);
    engine
}

fn legacy_engine() -> Engine {
    let engine = Engine::from_model("rife-v2.3");
    assert_eq!(engine.capability, EngineCapability::DoublingOnly);
    engine
}

#[test]
fn explicit_count_engine_uses_a_single_pass() {
    let root = tempdir().unwrap();
    let input = store_with_frames(&root.path().join("in"), 10);
    let output = FrameStore::new(root.path().join("out"));
    let mock = MockInterpolator::default();

    let count = interpolate_to_count(
        &mock,
        &explicit_engine(),
        &InterpolationParams::default(),
        &input,
        &output,
        100,
        false,
        &root.path().join("passes"),
    )
    .unwrap();

    assert_eq!(count, 100);
    assert_eq!(
        mock.invocations(),
        vec![Invocation {
            input_count: 10,
            target: Some(100)
        }]
    );
}

#[test]
fn legacy_engine_doubles_until_target_then_trims() {
    let root = tempdir().unwrap();
    let input = store_with_frames(&root.path().join("in"), 10);
    let output = FrameStore::new(root.path().join("out"));
    let mock = MockInterpolator::default();

    // ceil(log2(100/10)) = 4 passes: 10 -> 20 -> 40 -> 80 -> 160, trim to 100.
    let count = interpolate_to_count(
        &mock,
        &legacy_engine(),
        &InterpolationParams::default(),
        &input,
        &output,
        100,
        false,
        &root.path().join("passes"),
    )
    .unwrap();

    assert_eq!(count, 100);
    let invocations = mock.invocations();
    assert_eq!(invocations.len(), 4);
    assert_eq!(
        invocations.iter().map(|i| i.input_count).collect::<Vec<_>>(),
        vec![10, 20, 40, 80]
    );
    assert!(invocations.iter().all(|i| i.target.is_none()));
}

#[test]
fn doubling_stops_early_once_target_is_reached() {
    let root = tempdir().unwrap();
    let input = store_with_frames(&root.path().join("in"), 10);
    let output = FrameStore::new(root.path().join("out"));
    let mock = MockInterpolator::default();

    // Target 15 computes ceil(log2(1.5)) = 1 pass; one doubling overshoots
    // to 20, the trim brings it back to 15.
    let count = interpolate_to_count(
        &mock,
        &legacy_engine(),
        &InterpolationParams::default(),
        &input,
        &output,
        15,
        false,
        &root.path().join("passes"),
    )
    .unwrap();

    assert_eq!(count, 15);
    assert_eq!(mock.invocations().len(), 1);
}

#[test]
fn equal_count_is_a_direct_copy_with_zero_invocations() {
    let root = tempdir().unwrap();
    let input = store_with_frames(&root.path().join("in"), 42);
    let output = FrameStore::new(root.path().join("out"));
    let mock = MockInterpolator::default();

    let count = interpolate_to_count(
        &mock,
        &explicit_engine(),
        &InterpolationParams::default(),
        &input,
        &output,
        42,
        false,
        &root.path().join("passes"),
    )
    .unwrap();

    assert_eq!(count, 42);
    assert!(mock.invocations().is_empty());
    // Input store untouched.
    assert_eq!(input.count().unwrap(), 42);
}

#[test]
fn oversized_input_is_trimmed_without_invocations() {
    let root = tempdir().unwrap();
    let input = store_with_frames(&root.path().join("in"), 160);
    let output = FrameStore::new(root.path().join("out"));
    let mock = MockInterpolator::default();

    let count = interpolate_to_count(
        &mock,
        &legacy_engine(),
        &InterpolationParams::default(),
        &input,
        &output,
        100,
        false,
        &root.path().join("passes"),
    )
    .unwrap();

    assert_eq!(count, 100);
    assert!(mock.invocations().is_empty());
}

#[test]
fn zero_target_fails_fast() {
    let root = tempdir().unwrap();
    let input = store_with_frames(&root.path().join("in"), 10);
    let output = FrameStore::new(root.path().join("out"));
    let mock = MockInterpolator::default();

    let err = interpolate_to_count(
        &mock,
        &explicit_engine(),
        &InterpolationParams::default(),
        &input,
        &output,
        0,
        false,
        &root.path().join("passes"),
    )
    .unwrap_err();

    assert!(matches!(err, CoreError::InvalidTarget(_)));
    assert!(mock.invocations().is_empty());
}

#[test]
fn empty_input_store_is_an_error() {
    let root = tempdir().unwrap();
    let input = store_with_frames(&root.path().join("in"), 0);
    let output = FrameStore::new(root.path().join("out"));
    let mock = MockInterpolator::default();

    let err = interpolate_to_count(
        &mock,
        &explicit_engine(),
        &InterpolationParams::default(),
        &input,
        &output,
        10,
        false,
        &root.path().join("passes"),
    )
    .unwrap_err();

    assert!(matches!(err, CoreError::EmptyStore(_)));
}

#[test]
fn executor_failure_propagates() {
    let root = tempdir().unwrap();
    let input = store_with_frames(&root.path().join("in"), 10);
    let output = FrameStore::new(root.path().join("out"));
    let mock = MockInterpolator::failing();

    let err = interpolate_to_count(
        &mock,
        &explicit_engine(),
        &InterpolationParams::default(),
        &input,
        &output,
        100,
        false,
        &root.path().join("passes"),
    )
    .unwrap_err();

    assert!(matches!(err, CoreError::ExternalTool { .. }));
}

#[test]
fn dedup_restore_extend_scenario_hits_every_target() {
    // The end-to-end frame accounting from the dedup scenario: 100 frames
    // decimated at rate 2.0 leave 50; restore brings them back to 100; the
    // final dispatch at factor 2.0 lands on 200.
    let root = tempdir().unwrap();
    let decimated = store_with_frames(&root.path().join("decimated"), 50);
    let restored = FrameStore::new(root.path().join("restored"));
    let finals = FrameStore::new(root.path().join("final"));
    let mock = MockInterpolator::default();

    let restored_count = interpolate_to_count(
        &mock,
        &explicit_engine(),
        &InterpolationParams::default(),
        &decimated,
        &restored,
        100,
        false,
        &root.path().join("passes_restore"),
    )
    .unwrap();
    assert_eq!(restored_count, 100);

    let final_count = interpolate_to_count(
        &mock,
        &explicit_engine(),
        &InterpolationParams::default(),
        &restored,
        &finals,
        200,
        false,
        &root.path().join("passes_final"),
    )
    .unwrap();
    assert_eq!(final_count, 200);

    assert_eq!(
        mock.invocations()
            .iter()
            .map(|i| i.target)
            .collect::<Vec<_>>(),
        vec![Some(100), Some(200)]
    );
}
