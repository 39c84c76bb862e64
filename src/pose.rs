// src/pose.rs - Recorded hand landmarks replayed as a pose source
use crate::hand::{HandFrame, LANDMARK_COUNT};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::info;

/// What the pose source produced for one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum PoseSample {
    Hand(HandFrame),
    NoHand,
    Finished,
}

impl PoseSample {
    pub fn hand(&self) -> Option<&HandFrame> {
        match self {
            PoseSample::Hand(hand) => Some(hand),
            _ => None,
        }
    }
}

/// Anything that can supply at most one hand per loop iteration.
pub trait PoseSource {
    fn next_sample(&mut self) -> PoseSample;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub path: PathBuf,
    pub loop_replay: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("hands.jsonl"),
            loop_replay: false,
        }
    }
}

// One JSON-lines record: every hand the detector saw in that frame.
#[derive(Debug, Deserialize)]
struct JsonFrame {
    #[serde(default)]
    hands: Vec<Vec<[f64; 2]>>,
}

/// Frames loaded up front from a recording, served one per tick.
pub struct ReplaySource {
    frames: Vec<Option<HandFrame>>,
    current_frame: usize,
    loop_replay: bool,
}

impl ReplaySource {
    pub fn new(frames: Vec<Option<HandFrame>>, loop_replay: bool) -> Self {
        Self {
            frames,
            current_frame: 0,
            loop_replay,
        }
    }

    /// Load a `.jsonl` or `.csv` recording, picking the format from the extension.
    pub fn open(config: &ReplayConfig) -> Result<Self> {
        let path = &config.path;
        let file = std::fs::File::open(path)
            .with_context(|| format!("Cannot open replay file {}", path.display()))?;

        let loaded = if has_extension(path, "csv") {
            Self::read_csv(file)
        } else {
            Self::read_json_lines(file)
        };
        let frames = loaded.with_context(|| format!("Invalid replay file {}", path.display()))?;

        info!("Loaded {} frames from {}", frames.len(), path.display());
        Ok(Self::new(frames, config.loop_replay))
    }

    /// One JSON object per line; only the first listed hand is kept.
    pub fn read_json_lines(reader: impl Read) -> Result<Vec<Option<HandFrame>>> {
        let mut frames = Vec::new();
        for (i, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let record: JsonFrame = serde_json::from_str(&line)
                .with_context(|| format!("line {}", i + 1))?;
            let hand = match record.hands.first() {
                Some(points) => Some(
                    HandFrame::from_points(points).with_context(|| format!("line {}", i + 1))?,
                ),
                None => None,
            };
            frames.push(hand);
        }
        Ok(frames)
    }

    /// Headerless rows of `x0,y0,...,x20,y20`. A row of empty fields (`,`)
    /// means no hand; blank lines are skipped.
    pub fn read_csv(reader: impl Read) -> Result<Vec<Option<HandFrame>>> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut frames = Vec::new();
        for (i, record) in csv_reader.records().enumerate() {
            let record = record.with_context(|| format!("row {}", i + 1))?;
            if record.iter().all(|field| field.trim().is_empty()) {
                frames.push(None);
                continue;
            }
            if record.len() != LANDMARK_COUNT * 2 {
                anyhow::bail!(
                    "row {}: expected {} values, got {}",
                    i + 1,
                    LANDMARK_COUNT * 2,
                    record.len()
                );
            }

            let values = record
                .iter()
                .map(|field| field.trim().parse::<f64>())
                .collect::<Result<Vec<f64>, _>>()
                .with_context(|| format!("row {}", i + 1))?;
            let points: Vec<[f64; 2]> = values.chunks(2).map(|xy| [xy[0], xy[1]]).collect();
            frames.push(Some(HandFrame::from_points(&points)?));
        }
        Ok(frames)
    }

    pub fn total_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn progress(&self) -> f32 {
        if self.frames.is_empty() {
            0.0
        } else {
            self.current_frame as f32 / self.frames.len() as f32
        }
    }
}

impl PoseSource for ReplaySource {
    fn next_sample(&mut self) -> PoseSample {
        if self.current_frame >= self.frames.len() {
            if !self.loop_replay || self.frames.is_empty() {
                return PoseSample::Finished;
            }
            self.current_frame = 0;
        }

        let sample = match &self.frames[self.current_frame] {
            Some(hand) => PoseSample::Hand(hand.clone()),
            None => PoseSample::NoHand,
        };
        self.current_frame += 1;
        sample
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case(ext))
}
