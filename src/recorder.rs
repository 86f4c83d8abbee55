// src/recorder.rs
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use log::info;
use crate::drivers::{ScopeError, Snapshot};

/// 将每次刷新的派生信号写入 CSV: timestamp, 各通道..., trigger
pub struct SnapshotRecorder<W: Write> {
    writer: BufWriter<W>,
    header: Option<Vec<String>>,
    rows: u64,
    last_sequence: u64,
}

impl SnapshotRecorder<File> {
    pub fn create(path: &Path) -> Result<Self, ScopeError> {
        let file = File::create(path)?;
        info!("💾 Recording snapshots to {}", path.display());
        Ok(Self::new(file))
    }
}

impl<W: Write> SnapshotRecorder<W> {
    pub fn new(inner: W) -> Self {
        Self { writer: BufWriter::new(inner), header: None, rows: 0, last_sequence: 0 }
    }

    pub fn write_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), ScopeError> {
        // 同一快照只写一次
        if snapshot.sequence <= self.last_sequence {
            return Ok(());
        }
        self.last_sequence = snapshot.sequence;

        let channels: Vec<String> = snapshot.signals.iter().map(|s| s.channel.clone()).collect();
        // 通道集合变化时重新写表头
        if self.header.as_ref() != Some(&channels) {
            write!(self.writer, "timestamp")?;
            for name in &channels {
                write!(self.writer, ",{}", name)?;
            }
            writeln!(self.writer, ",trigger")?;
            self.header = Some(channels);
        }

        for (i, t) in snapshot.timestamps.iter().enumerate() {
            write!(self.writer, "{:.6}", t)?;
            for signal in &snapshot.signals {
                write!(self.writer, ",{:.4}", signal.values.get(i).copied().unwrap_or(f64::NAN))?;
            }
            let labels: Vec<&str> = snapshot.alignment.labels_at(i).collect();
            writeln!(self.writer, ",{}", labels.join("|"))?;
            self.rows += 1;
        }
        Ok(())
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn finish(mut self) -> Result<W, ScopeError> {
        self.writer.flush()?;
        info!("💾 Recording saved ({} rows).", self.rows);
        self.writer.into_inner().map_err(|e| ScopeError::Io(e.into_error()))
    }
}
