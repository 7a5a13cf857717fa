// src/data.rs
use crate::error::Result;
use crate::hand_state::RobotHandState;
use crate::pipeline::TickOutput;
use chrono::Local;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
struct RetargetRecord {
    frame: u64,
    timestamp: f64,
    hands_detected: usize,
    tracked_hand: Option<String>,
    skip_reason: Option<String>,
    calibration_scale: Option<f64>,
    scale: f64,
    root_x: f64,
    root_y: f64,
    root_z: f64,
    root_qw: f64,
    root_qx: f64,
    root_qy: f64,
    root_qz: f64,
}

#[derive(Debug, Clone)]
struct SessionFrame {
    timestamp: f64,
    output: TickOutput,
    joints: BTreeMap<String, f64>,
}

/// Collects tick results and writes them out at the end of a session.
pub struct SessionRecorder {
    output_dir: PathBuf,
    session_name: String,
    frames: Vec<SessionFrame>,
}

impl SessionRecorder {
    pub fn new(output_dir: impl AsRef<Path>, session_name: Option<String>) -> Self {
        let session_name = session_name.unwrap_or_else(|| {
            format!("session_{}", Local::now().format("%Y%m%d_%H%M%S"))
        });

        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            session_name,
            frames: Vec::new(),
        }
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    pub fn session_dir(&self) -> PathBuf {
        self.output_dir.join(&self.session_name)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Records one tick. Joint values are snapshotted when a hand state is given.
    pub fn add_frame(&mut self, output: &TickOutput, state: Option<&RobotHandState>, timestamp: f64) {
        self.frames.push(SessionFrame {
            timestamp,
            output: output.clone(),
            joints: state.map(RobotHandState::values).unwrap_or_default(),
        });
    }

    /// Every joint name seen in the session, sorted.
    fn joint_columns(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .frames
            .iter()
            .flat_map(|frame| frame.joints.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn export_csv(&self) -> Result<PathBuf> {
        let csv_path = self.session_dir().join("retarget_data.csv");
        if let Some(parent) = csv_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let joint_columns = self.joint_columns();
        let file = File::create(&csv_path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        let mut header: Vec<String> = [
            "frame",
            "timestamp",
            "hands_detected",
            "tracked_hand",
            "skip_reason",
            "calibration_scale",
            "scale",
            "root_x",
            "root_y",
            "root_z",
            "root_qw",
            "root_qx",
            "root_qy",
            "root_qz",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        header.extend(joint_columns.iter().cloned());
        writer.write_record(&header)?;

        for frame in &self.frames {
            let record = Self::create_record(frame);
            let joints: Vec<Option<f64>> = joint_columns
                .iter()
                .map(|name| frame.joints.get(name).copied())
                .collect();
            // Fixed columns first, then one column per joint.
            writer.serialize((&record, joints))?;
        }

        writer.flush()?;
        tracing::info!("Exported {} frames to {}", self.frames.len(), csv_path.display());
        Ok(csv_path)
    }

    /// Writes the final joint snapshot as JSON.
    pub fn export_joint_values(&self) -> Result<PathBuf> {
        let json_path = self.session_dir().join("joint_values.json");
        if let Some(parent) = json_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let latest = self
            .frames
            .iter()
            .rev()
            .find(|frame| !frame.joints.is_empty())
            .map(|frame| frame.joints.clone())
            .unwrap_or_default();
        let file = File::create(&json_path)?;
        serde_json::to_writer_pretty(file, &latest)?;
        Ok(json_path)
    }

    fn create_record(frame: &SessionFrame) -> RetargetRecord {
        let output = &frame.output;
        let position = output.root.position;
        let rotation = output.root.rotation.quaternion();

        RetargetRecord {
            frame: output.frame,
            timestamp: frame.timestamp,
            hands_detected: output.hands_detected,
            tracked_hand: output.tracked.map(|h| h.to_string()),
            skip_reason: output.skip_reason().map(|r| r.to_string()),
            calibration_scale: output.calibration.map(|c| c.scale),
            scale: output.scale,
            root_x: position.x,
            root_y: position.y,
            root_z: position.z,
            root_qw: rotation.w,
            root_qx: rotation.i,
            root_qy: rotation.j,
            root_qz: rotation.k,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetargetConfig;
    use crate::landmarks::{HandTrackingResult, Landmark};
    use crate::metadata::Handedness;
    use crate::pipeline::RetargetPipeline;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("hand_retarget_{}_{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn detection() -> HandTrackingResult {
        let mut landmarks = vec![Landmark::new(0.5, 0.5, 0.0); 21];
        landmarks[0] = Landmark::new(0.5, 0.8, 0.0);
        landmarks[9] = Landmark::new(0.55, 0.6, 0.0);
        HandTrackingResult::new(Handedness::Right, 0.9, landmarks)
    }

    #[test]
    fn csv_has_one_row_per_tick() {
        let dir = scratch_dir("csv");
        let mut pipeline = RetargetPipeline::new(RetargetConfig::default()).unwrap();
        pipeline.load_builtin("linker-l10-right").unwrap();
        let mut recorder = SessionRecorder::new(&dir, Some("test_session".to_string()));

        for (i, hands) in [vec![detection()], vec![], vec![detection()]].iter().enumerate() {
            let output = pipeline.tick(hands, None);
            recorder.add_frame(&output, pipeline.hand_state(), i as f64 / 60.0);
        }

        let path = recorder.export_csv().unwrap();
        assert_eq!(path, dir.join("test_session").join("retarget_data.csv"));

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("frame,timestamp"));
        assert!(lines[0].contains("thumb_cmc_roll"));
        assert!(lines[2].contains("no_hands"));

        let header: Vec<&str> = lines[0].split(',').collect();
        let first: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(first.len(), header.len());
        assert_eq!(first[0], "1");
        assert_eq!(first[3], "Right");
        assert_eq!(first[4], "");
        let roll = header.iter().position(|h| *h == "thumb_cmc_roll").unwrap();
        assert_eq!(first[roll].parse::<f64>().unwrap(), 0.0);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn joint_snapshot_is_written_as_json() {
        let dir = scratch_dir("json");
        let mut pipeline = RetargetPipeline::new(RetargetConfig::default()).unwrap();
        pipeline.load_builtin("linker-l10-right").unwrap();
        pipeline.set_joints([("ring_pip", 0.6)]).unwrap();

        let mut recorder = SessionRecorder::new(&dir, None);
        assert!(recorder.session_name().starts_with("session_"));
        let output = pipeline.tick(&[], None);
        recorder.add_frame(&output, pipeline.hand_state(), 0.0);

        let path = recorder.export_joint_values().unwrap();
        let values: BTreeMap<String, f64> =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(values.len(), 20);
        assert_eq!(values["ring_pip"], 0.6);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
